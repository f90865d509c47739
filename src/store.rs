//! Conversation history store
//!
//! Owns the ordered entries for one conversation and publishes immutable
//! snapshots over a watch channel. `apply` is the only mutator; readers
//! hold `Arc<[Message]>` snapshots that are never edited in place.

use crate::reducer;
use crate::types::Message;
use tokio::sync::watch;

pub struct ConversationStore {
    conversation_id: String,
    snapshot_tx: watch::Sender<std::sync::Arc<[Message]>>,
}

impl ConversationStore {
    pub fn new(conversation_id: impl Into<String>) -> Self {
        let (snapshot_tx, _) = watch::channel::<std::sync::Arc<[Message]>>(Vec::new().into());
        Self {
            conversation_id: conversation_id.into(),
            snapshot_tx,
        }
    }

    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    /// Folds one update into the history and publishes the new snapshot.
    pub fn apply(&self, update: Message) {
        self.snapshot_tx.send_modify(|snapshot| {
            let next = reducer::fold(snapshot, update);
            *snapshot = next.into();
        });
    }

    /// Current snapshot. Cheap to clone and safe to hold across awaits.
    pub fn snapshot(&self) -> std::sync::Arc<[Message]> {
        self.snapshot_tx.borrow().clone()
    }

    /// Watch receiver that observes every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<std::sync::Arc<[Message]>> {
        self.snapshot_tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reducer::message_for_delta;
    use crate::types::Delta;

    #[test]
    fn apply_publishes_fresh_snapshots() {
        let store = ConversationStore::new("conv-1");
        let before = store.snapshot();
        store.apply(Message::user("hi", None, false));
        let after = store.snapshot();
        assert_eq!(before.len(), 0);
        assert_eq!(after.len(), 1);
        // the earlier snapshot is untouched
        assert_eq!(before.len(), 0);
    }

    #[tokio::test]
    async fn subscribers_observe_applied_updates() {
        let store = ConversationStore::new("conv-1");
        let mut rx = store.subscribe();
        store.apply(Message::user("hi", None, false));
        store.apply(message_for_delta(Delta::Text {
            content: "Hello".to_string(),
            model: None,
        }));
        rx.changed().await.unwrap();
        let snapshot = rx.borrow_and_update().clone();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[1].content, "Hello");
    }
}
