use tokio::sync::broadcast;

use crate::{
    AppResult,
    models::ChatMessage,
    store::{Collection, DocStore},
};

/// Live view of one chat channel.
///
/// Acquiring a feed subscribes it to the process-wide message notifier;
/// dropping it releases the subscription. A feed that never gets dropped
/// would keep a listener alive for the rest of the process, so the websocket
/// task owns its feed for exactly the connection lifetime.
pub struct MessageFeed {
    store: DocStore,
    chat_id: String,
    events: broadcast::Receiver<String>,
}

impl MessageFeed {
    pub fn acquire(store: DocStore, notifier: &broadcast::Sender<String>, chat_id: String) -> Self {
        Self {
            store,
            chat_id,
            events: notifier.subscribe(),
        }
    }

    pub fn chat_id(&self) -> &str {
        &self.chat_id
    }

    /// The channel's current messages, oldest first.
    pub async fn snapshot(&self) -> AppResult<Vec<(String, ChatMessage)>> {
        snapshot(&self.store, &self.chat_id).await
    }

    /// Waits for the next event touching this channel and returns a fresh
    /// snapshot. A lagged receiver re-snapshots immediately: every delivery
    /// is the full channel, so missed events cost staleness, not messages.
    /// `None` once the notifier is gone.
    pub async fn next_snapshot(&mut self) -> AppResult<Option<Vec<(String, ChatMessage)>>> {
        loop {
            match self.events.recv().await {
                Ok(chat_id) if chat_id == self.chat_id => {
                    return Ok(Some(self.snapshot().await?));
                }
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!(chat_id = %self.chat_id, skipped, "feed lagged");
                    return Ok(Some(self.snapshot().await?));
                }
                Err(broadcast::error::RecvError::Closed) => return Ok(None),
            }
        }
    }
}

/// Messages filtered server-side by exact channel id, then re-sorted here by
/// timestamp. Insertion order is not trusted: concurrent writers can land
/// rows out of stamp order. The sort is stable, equal stamps keep store
/// order.
pub async fn snapshot(store: &DocStore, chat_id: &str) -> AppResult<Vec<(String, ChatMessage)>> {
    let docs = store
        .list_by_field(Collection::Messages, "chat_id", chat_id)
        .await?;

    let mut messages = docs
        .iter()
        .map(|doc| Ok((doc.id.clone(), doc.decode::<ChatMessage>(Collection::Messages)?)))
        .collect::<AppResult<Vec<_>>>()?;
    messages.sort_by_key(|(_, message)| message.timestamp);
    Ok(messages)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::chat::send;
    use crate::store::memory_store;

    fn message_doc(chat_id: &str, text: &str, timestamp: i64) -> serde_json::Value {
        json!({
            "chat_id": chat_id,
            "sender_id": "a",
            "receiver_id": "b",
            "text": text,
            "timestamp": timestamp,
            "read": false,
        })
    }

    #[tokio::test]
    async fn snapshot_resorts_out_of_order_timestamps() {
        let store = memory_store().await;
        for (id, text, ts) in [("m1", "third", 30), ("m2", "first", 10), ("m3", "second", 20)] {
            store
                .create(Collection::Messages, id, &message_doc("a_b", text, ts))
                .await
                .unwrap();
        }

        let texts: Vec<String> = snapshot(&store, "a_b")
            .await
            .unwrap()
            .into_iter()
            .map(|(_, m)| m.text)
            .collect();
        assert_eq!(texts, ["first", "second", "third"]);
    }

    #[tokio::test]
    async fn equal_timestamps_keep_store_order() {
        let store = memory_store().await;
        for (id, text) in [("m1", "one"), ("m2", "two"), ("m3", "three")] {
            store
                .create(Collection::Messages, id, &message_doc("a_b", text, 7))
                .await
                .unwrap();
        }

        let ids: Vec<String> = snapshot(&store, "a_b")
            .await
            .unwrap()
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        assert_eq!(ids, ["m1", "m2", "m3"]);
    }

    #[tokio::test]
    async fn snapshot_only_sees_its_own_channel() {
        let store = memory_store().await;
        store
            .create(Collection::Messages, "m1", &message_doc("a_b", "ours", 1))
            .await
            .unwrap();
        store
            .create(Collection::Messages, "m2", &message_doc("a_c", "other", 2))
            .await
            .unwrap();

        let messages = snapshot(&store, "a_b").await.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].1.text, "ours");
    }

    #[tokio::test]
    async fn feed_wakes_for_its_channel_and_skips_the_rest() {
        let store = memory_store().await;
        let (notifier, _guard) = broadcast::channel(8);
        let mut feed = MessageFeed::acquire(store.clone(), &notifier, "a_b".to_owned());

        send(&store, &notifier, "x_y", "x", "y", "elsewhere")
            .await
            .unwrap();
        send(&store, &notifier, "a_b", "a", "b", "hello")
            .await
            .unwrap();

        let messages = feed.next_snapshot().await.unwrap().unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].1.text, "hello");
        assert_eq!(feed.chat_id(), "a_b");
    }

    #[tokio::test]
    async fn dropping_the_feed_releases_the_subscription() {
        let store = memory_store().await;
        let (notifier, guard) = broadcast::channel::<String>(8);
        drop(guard);
        assert_eq!(notifier.receiver_count(), 0);

        let feed = MessageFeed::acquire(store, &notifier, "a_b".to_owned());
        assert_eq!(notifier.receiver_count(), 1);

        drop(feed);
        assert_eq!(notifier.receiver_count(), 0);
    }

    #[tokio::test]
    async fn feed_ends_when_the_notifier_is_gone() {
        let store = memory_store().await;
        let (notifier, guard) = broadcast::channel::<String>(8);
        drop(guard);

        let mut feed = MessageFeed::acquire(store, &notifier, "a_b".to_owned());
        drop(notifier);
        assert!(feed.next_snapshot().await.unwrap().is_none());
    }
}
