mod feed;
mod msg;
mod ws;

pub use feed::MessageFeed;
pub use msg::send;

use axum::{
    Router, debug_handler,
    extract::{Path, State},
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
};
use tower_sessions::Session;

use crate::{
    AppResult, AppState, include_res, res,
    models::Profile,
    session::current_uid,
    store::{Collection, DocStore},
};

/// Derives the channel id both participants compute independently: the two
/// ids sorted lexicographically, joined with `_`. Symmetric by construction.
pub fn channel_id(a: &str, b: &str) -> String {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    format!("{lo}_{hi}")
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/chat/{uid}", get(chat_page))
        .route("/chat/{uid}/ws", get(ws::chat_ws))
}

#[debug_handler(state = AppState)]
async fn chat_page(
    Path(uid): Path<String>,
    State(store): State<DocStore>,
    session: Session,
) -> AppResult<Response> {
    let Some(me) = current_uid(&session).await? else {
        return Ok(Redirect::to("/login").into_response());
    };
    if uid == me {
        // self-chat is not a modeled scenario
        return Ok(Redirect::to("/matches").into_response());
    }

    let Some(peer) = store.get_as::<Profile>(Collection::Users, &uid).await? else {
        return res::sorry("chat");
    };

    let chat_id = channel_id(&me, &uid);
    let mut rendered = String::new();
    for (id, message) in feed::snapshot(&store, &chat_id).await? {
        rendered += &msg::message_html(&id, &message, &me);
    }

    let body = include_res!(str, "/pages/chat.html")
        .replace("{peer_uid}", &uid)
        .replace("{peer_name}", &peer.full_name())
        .replace("{peer_photo}", peer.primary_photo())
        .replace("{messages}", &rendered);
    Ok(Html(body).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MatchPair;

    #[test]
    fn channel_id_is_symmetric() {
        assert_eq!(channel_id("u1", "u2"), "u1_u2");
        assert_eq!(channel_id("u2", "u1"), "u1_u2");
        assert_eq!(channel_id("zz", "aa"), "aa_zz");
    }

    #[test]
    fn channel_id_matches_the_pair_document_key() {
        assert_eq!(channel_id("u9", "u2"), MatchPair::new("u9", "u2", 0).key());
    }

    #[test]
    fn self_chat_degenerates_to_a_doubled_id() {
        assert_eq!(channel_id("u1", "u1"), "u1_u1");
    }
}
