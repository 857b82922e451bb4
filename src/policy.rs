//! Reconciliation policy: which language is authoritative for a write, which
//! languages may receive machine translations, and whether a snapshot is
//! still current.
//!
//! Everything here is pure so the business rules can be tested without a
//! provider or a store.

use std::collections::{BTreeMap, BTreeSet};

/// Fields changed in one write, per language.
pub type ChangesByLanguage = BTreeMap<String, BTreeSet<String>>;

/// Pick the highest-priority language among `candidates`.
///
/// Candidates missing from `priority` rank after every listed language, in
/// lexical order, so the choice is always deterministic.
pub fn select_authoritative(candidates: &BTreeSet<String>, priority: &[String]) -> Option<String> {
    priority
        .iter()
        .find(|code| candidates.contains(*code))
        .or_else(|| candidates.iter().next())
        .cloned()
}

/// A language is an eligible translation target unless it is the
/// authoritative language, or the same write edited any of its fields
/// (the author supplied that translation by hand).
pub fn is_eligible_target(
    authoritative: &str,
    target: &str,
    changed_this_write: &ChangesByLanguage,
) -> bool {
    if target == authoritative {
        return false;
    }
    changed_this_write
        .get(target)
        .map_or(true, |fields| fields.is_empty())
}

/// Split candidate targets into (eligible, skipped because of a manual edit).
pub fn select_targets<'a>(
    candidates: impl IntoIterator<Item = &'a str>,
    authoritative: &str,
    changed_this_write: &ChangesByLanguage,
) -> (Vec<String>, Vec<String>) {
    let mut eligible = Vec::new();
    let mut manual = Vec::new();
    for target in candidates {
        if target == authoritative {
            continue;
        }
        if is_eligible_target(authoritative, target, changed_this_write) {
            eligible.push(target.to_string());
        } else {
            manual.push(target.to_string());
        }
    }
    (eligible, manual)
}

/// The snapshot a change event was computed from is still the document's
/// current state.
pub fn is_current(base_revision: u64, current_revision: u64) -> bool {
    base_revision == current_revision
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(list: &[&str]) -> BTreeSet<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn order(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    // ==================== select_authoritative ====================

    #[test]
    fn test_select_single_candidate() {
        assert_eq!(
            select_authoritative(&set(&["km"]), &order(&["en", "km"])),
            Some("km".to_string())
        );
    }

    #[test]
    fn test_select_prefers_priority_order() {
        assert_eq!(
            select_authoritative(&set(&["en", "km"]), &order(&["en", "km"])),
            Some("en".to_string())
        );
        assert_eq!(
            select_authoritative(&set(&["en", "km"]), &order(&["km", "en"])),
            Some("km".to_string())
        );
    }

    #[test]
    fn test_select_unlisted_candidates_fall_back_lexically() {
        assert_eq!(
            select_authoritative(&set(&["th", "lo"]), &order(&["en"])),
            Some("lo".to_string())
        );
    }

    #[test]
    fn test_select_empty_candidates() {
        assert_eq!(select_authoritative(&BTreeSet::new(), &order(&["en"])), None);
    }

    // ==================== is_eligible_target ====================

    #[test]
    fn test_authoritative_is_never_a_target() {
        assert!(!is_eligible_target("en", "en", &ChangesByLanguage::new()));
    }

    #[test]
    fn test_untouched_target_is_eligible() {
        let mut changes = ChangesByLanguage::new();
        changes.insert("en".to_string(), set(&["title"]));
        assert!(is_eligible_target("en", "km", &changes));
    }

    #[test]
    fn test_manually_edited_target_is_skipped() {
        let mut changes = ChangesByLanguage::new();
        changes.insert("en".to_string(), set(&["title"]));
        changes.insert("km".to_string(), set(&["title"]));
        assert!(!is_eligible_target("en", "km", &changes));
    }

    #[test]
    fn test_manual_edit_of_other_field_still_protects_language() {
        let mut changes = ChangesByLanguage::new();
        changes.insert("en".to_string(), set(&["title"]));
        changes.insert("km".to_string(), set(&["body"]));
        assert!(!is_eligible_target("en", "km", &changes));
    }

    // ==================== select_targets ====================

    #[test]
    fn test_select_targets_splits_manual_edits() {
        let mut changes = ChangesByLanguage::new();
        changes.insert("en".to_string(), set(&["title"]));
        changes.insert("km".to_string(), set(&["title"]));

        let (eligible, manual) = select_targets(["en", "km", "es"], "en", &changes);
        assert_eq!(eligible, order(&["es"]));
        assert_eq!(manual, order(&["km"]));
    }

    #[test]
    fn test_is_current() {
        assert!(is_current(3, 3));
        assert!(!is_current(3, 4));
        assert!(!is_current(4, 3));
    }
}
