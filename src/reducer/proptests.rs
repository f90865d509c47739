//! Property-based tests for history reduction
//!
//! These tests verify the fold invariants hold across arbitrary delta
//! sequences.

use super::*;
use crate::types::{Delta, SearchSource};
use proptest::prelude::*;

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_source() -> impl Strategy<Value = SearchSource> {
    ("[a-z]{1,12}", "[a-z]{1,12}").prop_map(|(title, slug)| SearchSource {
        title,
        link: format!("https://example.com/{slug}"),
    })
}

fn arb_delta() -> impl Strategy<Value = Delta> {
    prop_oneof![
        ("[a-zA-Z ]{0,20}", proptest::option::of("[a-z0-9.]{1,10}"))
            .prop_map(|(content, model)| Delta::Text { content, model }),
        (
            proptest::collection::vec(arb_source(), 1..4),
            proptest::option::of("[a-z0-9.]{1,10}")
        )
            .prop_map(|(sources, model)| Delta::Sources { sources, model }),
    ]
}

fn arb_update() -> impl Strategy<Value = Message> {
    prop_oneof![
        arb_delta().prop_map(message_for_delta),
        "[a-zA-Z ]{1,20}".prop_map(|text| Message::user(text, None, false)),
    ]
}

fn fold_all(updates: Vec<Message>) -> Vec<Message> {
    updates
        .into_iter()
        .fold(Vec::new(), |history, update| fold(&history, update))
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    /// Folding text deltas in order produces their exact concatenation in
    /// the trailing assistant entry.
    #[test]
    fn text_deltas_concatenate_in_order(chunks in proptest::collection::vec("[a-zA-Z ]{0,10}", 1..8)) {
        let expected: String = chunks.concat();
        let mut history = vec![Message::user("q", None, false)];
        for chunk in chunks {
            history = fold(&history, message_for_delta(Delta::Text { content: chunk, model: None }));
        }
        prop_assert_eq!(history.len(), 2);
        prop_assert_eq!(history[1].content.clone(), expected);
    }

    /// Every entry's text part mirrors its content, whatever the fold order.
    #[test]
    fn parts_projection_stays_in_sync(updates in proptest::collection::vec(arb_update(), 0..12)) {
        let history = fold_all(updates);
        for message in &history {
            prop_assert!(!message.parts.is_empty());
            prop_assert_eq!(
                &message.parts[0],
                &crate::types::MessagePart::Text { text: message.content.clone() }
            );
        }
    }

    /// A sources delta never lands on an assistant entry that already has
    /// visible text.
    #[test]
    fn sources_get_their_own_entry_after_text(
        prefix in "[a-zA-Z]{1,20}",
        sources in proptest::collection::vec(arb_source(), 1..4),
    ) {
        let history = fold(&[], message_for_delta(Delta::Text { content: prefix.clone(), model: None }));
        let history = fold(&history, message_for_delta(Delta::Sources { sources, model: None }));
        prop_assert_eq!(history.len(), 2);
        prop_assert_eq!(history[0].content.clone(), prefix);
        prop_assert!(history[0].search_sources.is_none());
        prop_assert!(history[1].search_sources.is_some());
    }

    /// Fold never reorders or drops the entries it was given.
    #[test]
    fn fold_preserves_existing_prefix(updates in proptest::collection::vec(arb_update(), 1..10)) {
        let history = fold_all(updates);
        for update in [Message::user("next", None, false), message_for_delta(Delta::Text { content: "x".to_string(), model: None })] {
            let next = fold(&history, update);
            prop_assert!(next.len() >= history.len());
            for (i, message) in history.iter().enumerate().take(history.len().saturating_sub(1)) {
                prop_assert_eq!(&next[i], message);
            }
        }
    }

    /// User entries never merge.
    #[test]
    fn user_updates_always_append(updates in proptest::collection::vec(arb_update(), 0..10)) {
        let history = fold_all(updates);
        let next = fold(&history, Message::user("hello", None, false));
        prop_assert_eq!(next.len(), history.len() + 1);
    }
}
