mod rank;

pub use rank::{FEED_LIMIT, rank};

use axum::{
    Router, debug_handler,
    extract::State,
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
};
use time::OffsetDateTime;
use tower_sessions::Session;

use crate::{
    AppResult, AppState, include_res,
    models::Profile,
    session::current_uid,
    store::{Collection, DocStore},
};

pub fn router() -> Router<AppState> {
    Router::new().route("/feed", get(feed))
}

#[debug_handler(state = AppState)]
async fn feed(State(store): State<DocStore>, session: Session) -> AppResult<Response> {
    let Some(uid) = current_uid(&session).await? else {
        return Ok(Redirect::to("/login").into_response());
    };

    let profiles: Vec<Profile> = store.list_all_as(Collection::Users).await?;
    let ranked = rank(profiles, &uid);

    let today = OffsetDateTime::now_utc().date();
    let mut cards = String::new();
    for profile in &ranked {
        let age = profile
            .age_on(today)
            .map(|age| age.to_string())
            .unwrap_or_default();
        cards += &include_res!(str, "/pages/feed_card.html")
            .replace("{uid}", &profile.uid)
            .replace("{name}", &profile.full_name())
            .replace("{age}", &age)
            .replace("{country}", &profile.country)
            .replace("{photo}", profile.primary_photo());
    }

    let body = include_res!(str, "/pages/feed.html").replace("{cards}", &cards);
    Ok(Html(body).into_response())
}
