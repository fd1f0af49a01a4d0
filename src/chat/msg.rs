use serde::Deserialize;
use tokio::sync::broadcast;

use crate::{
    AppResult, include_res,
    models::{self, ChatMessage},
    store::{Collection, DocStore},
};

/// What arrives over the chat websocket.
#[derive(Deserialize)]
pub(crate) struct SendMessage {
    pub(crate) content: String,
}

/// Appends one message to the channel and wakes its feeds. Whitespace-only
/// text is dropped without a write. Returns the new document id, if any.
pub async fn send(
    store: &DocStore,
    notifier: &broadcast::Sender<String>,
    chat_id: &str,
    sender_id: &str,
    receiver_id: &str,
    text: &str,
) -> AppResult<Option<String>> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }

    let message = ChatMessage {
        chat_id: chat_id.to_owned(),
        sender_id: sender_id.to_owned(),
        receiver_id: receiver_id.to_owned(),
        text: text.to_owned(),
        timestamp: models::now_millis(),
        read: false,
    };
    let id = store.add(Collection::Messages, &message).await?;

    let _ = notifier.send(chat_id.to_owned());
    Ok(Some(id))
}

/// One message rendered for `viewer_id`, markdown body included.
pub(crate) fn message_html(id: &str, message: &ChatMessage, viewer_id: &str) -> String {
    let mut text_html = String::new();
    pulldown_cmark::html::push_html(&mut text_html, pulldown_cmark::Parser::new(&message.text));

    let side = if message.sender_id == viewer_id {
        "mine"
    } else {
        "theirs"
    };

    include_res!(str, "/pages/message.html")
        .replace("{id}", id)
        .replace("{side}", side)
        .replace("{timestamp}", &message.timestamp.to_string())
        .replace("{text}", &text_html)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory_store;

    #[tokio::test]
    async fn whitespace_only_text_is_a_no_op() {
        let store = memory_store().await;
        let (notifier, mut events) = broadcast::channel(8);

        for text in ["", "   ", "\n\t "] {
            let id = send(&store, &notifier, "a_b", "a", "b", text).await.unwrap();
            assert_eq!(id, None, "{text:?} should not be stored");
        }

        assert!(store.list_all(Collection::Messages).await.unwrap().is_empty());
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn send_trims_stamps_and_notifies() {
        let store = memory_store().await;
        let (notifier, mut events) = broadcast::channel(8);

        let before = models::now_millis();
        let id = send(&store, &notifier, "a_b", "a", "b", "  hola!  ")
            .await
            .unwrap()
            .unwrap();
        let after = models::now_millis();

        let message: ChatMessage = store
            .get_as(Collection::Messages, &id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(message.chat_id, "a_b");
        assert_eq!(message.sender_id, "a");
        assert_eq!(message.receiver_id, "b");
        assert_eq!(message.text, "hola!");
        assert!(!message.read);
        assert!((before..=after).contains(&message.timestamp));

        assert_eq!(events.try_recv().unwrap(), "a_b");
    }

    #[test]
    fn rendered_message_is_tagged_with_the_viewer_side() {
        let message = ChatMessage {
            chat_id: "a_b".into(),
            sender_id: "a".into(),
            receiver_id: "b".into(),
            text: "hey *you*".into(),
            timestamp: 42,
            read: false,
        };

        let mine = message_html("m1", &message, "a");
        assert!(mine.contains("mine"));
        assert!(mine.contains("<em>you</em>"));

        let theirs = message_html("m1", &message, "b");
        assert!(theirs.contains("theirs"));
    }
}
