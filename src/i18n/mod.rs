//! Language plumbing shared by the translation pipeline.
//!
//! # Architecture
//!
//! - `registry`: catalog of known languages and their display names
//! - `languages`: the configured source/target language set and priority order
//! - `validator`: post-translation quality checks
//! - `metrics`: provider and reconcile counters
//!
//! # Example
//!
//! ```rust,ignore
//! use article_translation_sync::i18n::{LanguageRegistry, LanguageSet};
//!
//! let set = LanguageSet::new(&sources, &targets, &priority)?;
//! for target in set.targets_for("en") {
//!     println!("{}", LanguageRegistry::get().name_of(target).unwrap_or(target));
//! }
//! ```

mod languages;
mod metrics;
mod registry;
mod validator;

pub use languages::LanguageSet;
pub use metrics::{MetricsReport, TranslationMetrics};
pub use registry::{LanguageConfig, LanguageRegistry};
pub use validator::{TranslationValidator, ValidationReport};
