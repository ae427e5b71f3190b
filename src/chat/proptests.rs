//! Property-based tests for the approval check
//!
//! The check must depend only on the final message:
//! - Approval follows the sentinel in the last message
//! - Prefix contents are irrelevant
//! - The sentinel anywhere inside the last message approves
//! - Case changes to the sentinel do not approve

use super::termination::{is_approved, APPROVAL_SENTINEL};
use super::ChatMessage;
use proptest::prelude::*;

// ============================================================================
// Strategies
// ============================================================================

/// Text paired with whether the sentinel was written into it.
/// Plain text is lower-case only, so it can never spell the sentinel by chance.
fn arb_text() -> impl Strategy<Value = (String, bool)> {
    prop_oneof![
        4 => "[a-z0-9 _.!?,']{0,80}".prop_map(|text| (text, false)),
        1 => ("[a-z ]{0,20}", "[a-z ]{0,20}")
            .prop_map(|(pre, post)| (format!("{pre}{APPROVAL_SENTINEL}{post}"), true)),
    ]
}

fn arb_tagged_message() -> impl Strategy<Value = (ChatMessage, bool)> {
    (
        prop_oneof![
            Just("BusinessAnalyst"),
            Just("SoftwareEngineer"),
            Just("ProductOwner"),
        ],
        arb_text(),
        any::<bool>(),
    )
        .prop_map(|(name, (text, has_sentinel), from_user)| {
            let message = if from_user {
                ChatMessage::user(text)
            } else {
                ChatMessage::assistant(name, text)
            };
            (message, has_sentinel)
        })
}

fn arb_message() -> impl Strategy<Value = ChatMessage> {
    arb_tagged_message().prop_map(|(message, _)| message)
}

fn arb_history() -> impl Strategy<Value = Vec<ChatMessage>> {
    proptest::collection::vec(arb_message(), 0..12)
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    /// Approval follows whether the sentinel was written into the last message
    #[test]
    fn prop_approval_tracks_last_message(
        prefix in arb_history(),
        (last, has_sentinel) in arb_tagged_message()
    ) {
        let mut history = prefix;
        history.push(last);
        prop_assert_eq!(is_approved(&history), has_sentinel);
    }

    /// Anything before the last message is ignored
    #[test]
    fn prop_prefix_is_irrelevant(prefix in arb_history(), last in arb_message()) {
        let mut history = prefix;
        history.push(last.clone());
        prop_assert_eq!(is_approved(&history), is_approved(&[last]));
    }

    /// Sentinel embedded in arbitrary surrounding text approves
    #[test]
    fn prop_embedded_sentinel_approves(
        prefix in arb_history(),
        pre in "[a-zA-Z0-9 .]{0,40}",
        post in "[a-zA-Z0-9 .]{0,40}"
    ) {
        let mut history = prefix;
        history.push(ChatMessage::assistant(
            "ProductOwner",
            format!("{pre}{APPROVAL_SENTINEL}{post}"),
        ));
        prop_assert!(is_approved(&history));
    }

    /// Lower-cased sentinel never approves on its own
    #[test]
    fn prop_lowercase_sentinel_rejected(pre in "[a-z0-9 .]{0,40}") {
        let text = format!("{pre}{}", APPROVAL_SENTINEL.to_lowercase());
        prop_assert!(!is_approved(&[ChatMessage::assistant("ProductOwner", text)]));
    }
}
