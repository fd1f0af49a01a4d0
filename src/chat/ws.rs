use axum::{
    debug_handler,
    extract::{Path, State, WebSocketUpgrade},
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast;
use tower_sessions::Session;

use crate::{
    AppError, AppResult,
    chat::{channel_id, feed::MessageFeed, msg},
    session::require_uid,
    store::{Collection, DocStore},
};

#[debug_handler(state = crate::AppState)]
pub(crate) async fn chat_ws(
    Path(uid): Path<String>,
    State(store): State<DocStore>,
    State(notifier): State<broadcast::Sender<String>>,
    session: Session,
    ws: WebSocketUpgrade,
) -> AppResult<Response> {
    let me = require_uid(&session).await?;
    if uid == me || store.get(Collection::Users, &uid).await?.is_none() {
        return Err(AppError::NotFound("chat"));
    }

    let chat_id = channel_id(&me, &uid);

    Ok(ws.on_upgrade(async move |stream| {
        let mut feed = MessageFeed::acquire(store.clone(), &notifier, chat_id.clone());
        let (mut sender, mut receiver) = stream.split();

        let viewer = me.clone();
        let push_task = tokio::spawn(async move {
            loop {
                match feed.next_snapshot().await {
                    Ok(Some(messages)) => {
                        let html: String = messages
                            .iter()
                            .map(|(id, message)| msg::message_html(id, message, &viewer))
                            .collect();
                        if sender.send(html.into()).await.is_err() {
                            break;
                        }
                    }
                    Ok(None) => break,
                    Err(err) => {
                        tracing::error!(error = %err, "chat feed failed");
                        break;
                    }
                }
            }
        });

        while let Some(Ok(ws_msg)) = receiver.next().await {
            let Ok(msg::SendMessage { content }) = serde_json::from_slice(&ws_msg.into_data())
            else {
                continue;
            };

            if let Err(err) = msg::send(&store, &notifier, &chat_id, &me, &uid, &content).await {
                tracing::error!(error = %err, "message send failed");
            }
        }

        // connection closed: dropping the task drops the feed with it
        push_task.abort();
    }))
}
