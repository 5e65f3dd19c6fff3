//! Property tests for fault classification.
//!
//! Invariants tested:
//! - A kind is terminal exactly when it is in the configured set
//! - Classification keeps the error's kind
//! - The default set is conservative for transport faults

use proptest::prelude::*;
use self_healing_connection::{Classification, KindClassifier};
use self_healing_core::FaultKind;

fn any_kind() -> impl Strategy<Value = FaultKind> {
    (0..FaultKind::ALL.len()).prop_map(|index| FaultKind::ALL[index])
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Property: terminal iff the kind is in the configured set
    #[test]
    fn terminal_iff_configured(
        terminal in proptest::collection::vec(any_kind(), 0..6),
        kind in any_kind(),
    ) {
        let classifier = KindClassifier::new(terminal.iter().copied());
        let classification = classifier.classify_kind(kind);

        prop_assert_eq!(classification.is_terminal(), terminal.contains(&kind));
        prop_assert_eq!(classification.kind(), kind);
    }

    /// Property: removing a kind makes it non-terminal, other kinds unchanged
    #[test]
    fn without_only_affects_one_kind(
        removed in any_kind(),
        kind in any_kind(),
    ) {
        let full = KindClassifier::default();
        let reduced = full.without(removed);

        if kind == removed {
            prop_assert_eq!(reduced.classify_kind(kind), Classification::NonTerminal(kind));
        } else {
            prop_assert_eq!(reduced.is_terminal_kind(kind), full.is_terminal_kind(kind));
        }
    }

    /// Property: the default set treats every closed or reset transport as terminal
    #[test]
    fn default_set_is_conservative(kind in any_kind()) {
        let classifier = KindClassifier::default();
        if matches!(kind, FaultKind::TransportClosed | FaultKind::ConnectionReset) {
            prop_assert!(classifier.is_terminal_kind(kind));
        }
        if matches!(kind, FaultKind::NotFound | FaultKind::WrongType | FaultKind::Operation) {
            prop_assert!(!classifier.is_terminal_kind(kind));
        }
    }
}
