use axum::{
    Json, Router, debug_handler,
    extract::{Path, State},
    routing::post,
};
use serde_json::json;
use tower_sessions::Session;

use crate::{
    AppError, AppResult, AppState,
    models::{self, InteractionRecord, LikeAction, MatchPair, like_key},
    session::require_uid,
    store::{self, Collection, DocStore},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/likes/{uid}/like", post(like))
        .route("/likes/{uid}/pass", post(pass))
}

#[debug_handler(state = AppState)]
async fn like(
    State(store): State<DocStore>,
    session: Session,
    Path(uid): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    let actor = require_uid(&session).await?;
    let matched = record(&store, &actor, &uid, LikeAction::Like).await?;
    Ok(Json(json!({ "matched": matched })))
}

#[debug_handler(state = AppState)]
async fn pass(
    State(store): State<DocStore>,
    session: Session,
    Path(uid): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    let actor = require_uid(&session).await?;
    let matched = record(&store, &actor, &uid, LikeAction::Pass).await?;
    Ok(Json(json!({ "matched": matched })))
}

/// Stores the actor's latest action toward the target and keeps the canonical
/// match document in step with it. Returns whether a mutual match now exists.
///
/// The action lives under the composite `{actor}_{target}` id and is
/// upserted, so a directed pair holds one record and rapid double-taps
/// collapse into it. The reciprocal check and the pair write share the
/// upsert's transaction; the pair document under the sorted-pair id is
/// created by whichever like arrives second and deleted again when either
/// side overwrites their like with a pass.
pub async fn record(
    store: &DocStore,
    actor: &str,
    target: &str,
    action: LikeAction,
) -> AppResult<bool> {
    if actor.is_empty() {
        return Err(AppError::Unauthenticated);
    }
    if actor == target {
        // self-directed actions are not a modeled scenario
        tracing::debug!(uid = %actor, "ignoring self-directed action");
        return Ok(false);
    }

    let now = models::now_millis();
    let action_doc = serde_json::to_value(InteractionRecord {
        user_id: actor.to_owned(),
        matched_user_id: target.to_owned(),
        action,
        timestamp: now,
    })?;

    let mut tx = store.pool().begin().await?;
    store::upsert_doc(&mut *tx, Collection::Likes, &like_key(actor, target), &action_doc).await?;

    let pair = MatchPair::new(actor, target, now);
    let mut matched = false;
    match action {
        LikeAction::Like => {
            let reciprocal = store::fetch_doc(&mut *tx, Collection::Likes, &like_key(target, actor))
                .await?
                .map(|doc| doc.decode::<InteractionRecord>(Collection::Likes))
                .transpose()?;

            if reciprocal.is_some_and(|r| r.action == LikeAction::Like) {
                matched = true;
                if store::fetch_doc(&mut *tx, Collection::Matches, &pair.key())
                    .await?
                    .is_none()
                {
                    store::insert_doc(
                        &mut *tx,
                        Collection::Matches,
                        &pair.key(),
                        &serde_json::to_value(&pair)?,
                    )
                    .await?;
                    tracing::info!(pair = %pair.key(), "mutual match");
                }
            }
        }
        LikeAction::Pass => {
            store::delete_doc(&mut *tx, Collection::Matches, &pair.key()).await?;
        }
    }

    tx.commit().await?;
    Ok(matched)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory_store;

    async fn stored_action(store: &DocStore, actor: &str, target: &str) -> InteractionRecord {
        store
            .get_as(Collection::Likes, &like_key(actor, target))
            .await
            .unwrap()
            .unwrap()
    }

    #[tokio::test]
    async fn empty_actor_is_unauthenticated() {
        let store = memory_store().await;
        let err = record(&store, "", "u2", LikeAction::Like).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthenticated));
        assert!(store.list_all(Collection::Likes).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn double_tap_collapses_to_one_record() {
        let store = memory_store().await;
        assert!(!record(&store, "a", "b", LikeAction::Like).await.unwrap());
        assert!(!record(&store, "a", "b", LikeAction::Like).await.unwrap());

        let likes = store.list_all(Collection::Likes).await.unwrap();
        assert_eq!(likes.len(), 1);
        assert_eq!(likes[0].id, "a_b");
        assert_eq!(stored_action(&store, "a", "b").await.action, LikeAction::Like);
    }

    #[tokio::test]
    async fn latest_action_wins_for_a_directed_pair() {
        let store = memory_store().await;
        record(&store, "a", "b", LikeAction::Pass).await.unwrap();
        record(&store, "a", "b", LikeAction::Like).await.unwrap();

        assert_eq!(store.list_all(Collection::Likes).await.unwrap().len(), 1);
        assert_eq!(stored_action(&store, "a", "b").await.action, LikeAction::Like);
    }

    #[tokio::test]
    async fn one_sided_like_is_not_a_match() {
        let store = memory_store().await;
        assert!(!record(&store, "a", "b", LikeAction::Like).await.unwrap());
        assert!(store.list_all(Collection::Matches).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn second_reciprocal_like_creates_exactly_one_pair() {
        let store = memory_store().await;
        assert!(!record(&store, "a", "b", LikeAction::Like).await.unwrap());
        assert!(record(&store, "b", "a", LikeAction::Like).await.unwrap());

        let pairs = store.list_all(Collection::Matches).await.unwrap();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].id, "a_b");

        let pair: MatchPair = pairs[0].decode(Collection::Matches).unwrap();
        assert_eq!(pair.users, ["a".to_owned(), "b".to_owned()]);

        // liking again changes nothing
        assert!(record(&store, "a", "b", LikeAction::Like).await.unwrap());
        assert_eq!(store.list_all(Collection::Matches).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn existing_pair_survives_a_relike_untouched() {
        let store = memory_store().await;
        let pair = MatchPair::new("a", "b", 111);
        store
            .create(Collection::Matches, &pair.key(), &pair)
            .await
            .unwrap();

        record(&store, "b", "a", LikeAction::Like).await.unwrap();
        record(&store, "a", "b", LikeAction::Like).await.unwrap();

        let stored: MatchPair = store
            .get_as(Collection::Matches, "a_b")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.created_at, 111);
    }

    #[tokio::test]
    async fn pass_overwrites_the_like_and_clears_the_pair() {
        let store = memory_store().await;
        record(&store, "a", "b", LikeAction::Like).await.unwrap();
        record(&store, "b", "a", LikeAction::Like).await.unwrap();
        assert!(!record(&store, "a", "b", LikeAction::Pass).await.unwrap());

        assert_eq!(stored_action(&store, "a", "b").await.action, LikeAction::Pass);
        assert!(store.list_all(Collection::Matches).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn self_directed_actions_are_dropped() {
        let store = memory_store().await;
        assert!(!record(&store, "a", "a", LikeAction::Like).await.unwrap());
        assert!(store.list_all(Collection::Likes).await.unwrap().is_empty());
        assert!(store.list_all(Collection::Matches).await.unwrap().is_empty());
    }
}
