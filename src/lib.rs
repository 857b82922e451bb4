pub mod completeness;
pub mod config;
pub mod detector;
pub mod error;
pub mod i18n;
pub mod model;
pub mod orchestrator;
pub mod policy;
pub mod provider;
pub mod retry;
pub mod security;
pub mod server;
pub mod store;
pub mod sync;
