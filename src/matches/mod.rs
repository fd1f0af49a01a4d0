mod detect;

pub use detect::find_matches;

use std::collections::BTreeSet;

use axum::{
    Router, debug_handler,
    extract::State,
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
};
use tower_sessions::Session;

use crate::{
    AppResult, AppState, include_res,
    models::{InteractionRecord, LikeAction, MatchPair, Profile, UserMatch},
    session::current_uid,
    store::{Collection, DocStore},
};

pub fn router() -> Router<AppState> {
    Router::new().route("/matches", get(matches_page))
}

#[debug_handler(state = AppState)]
async fn matches_page(State(store): State<DocStore>, session: Session) -> AppResult<Response> {
    let Some(uid) = current_uid(&session).await? else {
        return Ok(Redirect::to("/login").into_response());
    };

    let profiles: Vec<Profile> = store.list_all_as(Collection::Users).await?;

    let mut shown = Vec::new();
    for pair in canonical_pairs(&store, &uid).await? {
        let Some(peer) = pair.peer_of(&uid) else {
            continue;
        };
        let Some(profile) = profiles.iter().find(|p| p.uid == peer) else {
            continue;
        };
        shown.push(detect::user_match_for(profile));
    }

    // The raw like records should tell the same story as the pair documents;
    // divergence means something wrote likes behind the recorder's back.
    let derived = derived_matches(&store, &uid, &profiles).await?;
    let shown_ids: BTreeSet<&str> = shown.iter().map(|m| m.uid.as_str()).collect();
    let derived_ids: BTreeSet<&str> = derived.iter().map(|m| m.uid.as_str()).collect();
    if shown_ids != derived_ids {
        tracing::warn!(
            %uid,
            canonical = ?shown_ids,
            derived = ?derived_ids,
            "match views disagree"
        );
    }

    let mut items = String::new();
    for user_match in &shown {
        items += &include_res!(str, "/pages/match_item.html")
            .replace("{uid}", &user_match.uid)
            .replace("{name}", &user_match.name)
            .replace("{photo}", &user_match.photo)
            .replace("{last_message}", &user_match.last_message)
            .replace("{unread_count}", &user_match.unread_count.to_string());
    }

    let body = include_res!(str, "/pages/matches.html")
        .replace("{count}", &shown.len().to_string())
        .replace("{items}", &items);
    Ok(Html(body).into_response())
}

/// Canonical pair documents containing `uid` in either slot.
pub(crate) async fn canonical_pairs(store: &DocStore, uid: &str) -> AppResult<Vec<MatchPair>> {
    let mut pairs: Vec<MatchPair> = store
        .list_by_field_as(Collection::Matches, "users[0]", uid)
        .await?;
    pairs.extend(
        store
            .list_by_field_as::<MatchPair>(Collection::Matches, "users[1]", uid)
            .await?,
    );
    Ok(pairs)
}

/// Re-derives the actor's matches from like records alone, the way each side
/// did before pair documents existed: the actor's likes, then one lookup per
/// liked target.
pub(crate) async fn derived_matches(
    store: &DocStore,
    uid: &str,
    profiles: &[Profile],
) -> AppResult<Vec<UserMatch>> {
    let mut likes: Vec<InteractionRecord> = store
        .list_by_field_as(Collection::Likes, "user_id", uid)
        .await?;

    let targets: Vec<String> = likes
        .iter()
        .filter(|like| like.action == LikeAction::Like)
        .map(|like| like.matched_user_id.clone())
        .collect();
    for target in targets {
        let theirs: Vec<InteractionRecord> = store
            .list_by_field_as(Collection::Likes, "user_id", &target)
            .await?;
        likes.extend(theirs);
    }

    Ok(detect::find_matches(uid, &likes, profiles))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::likes;
    use crate::models::LikeAction;
    use crate::store::memory_store;

    fn profile(uid: &str) -> Profile {
        Profile {
            uid: uid.to_owned(),
            name: format!("name-{uid}"),
            last_name: String::new(),
            email: format!("{uid}@example.com"),
            birthdate: "2000-01-01".to_owned(),
            gender: "other".to_owned(),
            show_gender_profile: true,
            passions: Some(vec![]),
            photos: vec![],
            country: "ES".to_owned(),
            city: None,
            created_at: None,
            updated_at: None,
        }
    }

    async fn seed_users(store: &DocStore, uids: &[&str]) -> Vec<Profile> {
        let mut profiles = Vec::new();
        for uid in uids {
            let p = profile(uid);
            store.create(Collection::Users, uid, &p).await.unwrap();
            profiles.push(p);
        }
        profiles
    }

    #[tokio::test]
    async fn canonical_and_derived_views_agree_after_reciprocal_likes() {
        let store = memory_store().await;
        let profiles = seed_users(&store, &["a", "b", "c"]).await;

        likes::record(&store, "a", "b", LikeAction::Like).await.unwrap();
        likes::record(&store, "b", "a", LikeAction::Like).await.unwrap();
        likes::record(&store, "a", "c", LikeAction::Like).await.unwrap();

        for (viewer, expected_peer) in [("a", "b"), ("b", "a")] {
            let pairs = canonical_pairs(&store, viewer).await.unwrap();
            assert_eq!(pairs.len(), 1);
            assert_eq!(pairs[0].peer_of(viewer), Some(expected_peer));

            let derived = derived_matches(&store, viewer, &profiles).await.unwrap();
            assert_eq!(derived.len(), 1);
            assert_eq!(derived[0].uid, expected_peer);
        }

        // c never answered a's like
        assert!(canonical_pairs(&store, "c").await.unwrap().is_empty());
        assert!(derived_matches(&store, "c", &profiles).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn a_pass_removes_the_match_from_both_views() {
        let store = memory_store().await;
        let profiles = seed_users(&store, &["a", "b"]).await;

        likes::record(&store, "a", "b", LikeAction::Like).await.unwrap();
        likes::record(&store, "b", "a", LikeAction::Like).await.unwrap();
        likes::record(&store, "b", "a", LikeAction::Pass).await.unwrap();

        assert!(canonical_pairs(&store, "a").await.unwrap().is_empty());
        assert!(derived_matches(&store, "a", &profiles).await.unwrap().is_empty());
    }
}
