use axum::{
    debug_handler,
    extract::{Multipart, State},
    response::{IntoResponse, Redirect, Response},
};
use serde_json::json;
use tower_sessions::Session;

use crate::{
    AppResult, res, uploads,
    config::Config,
    models::{self, Profile},
    session::current_uid,
    store::{Collection, DocStore},
};

/// Uploads a new photo and prepends it, making it the primary one. Earlier
/// photos stay in the list.
#[debug_handler(state = crate::AppState)]
pub(crate) async fn change_photo(
    State(store): State<DocStore>,
    State(config): State<Config>,
    session: Session,
    mut multipart: Multipart,
) -> AppResult<Response> {
    let Some(uid) = current_uid(&session).await? else {
        return Ok(Redirect::to("/login").into_response());
    };
    let Some(profile) = store.get_as::<Profile>(Collection::Users, &uid).await? else {
        return res::sorry("profile");
    };

    while let Some(field) = multipart.next_field().await? {
        if field.file_name().is_none() {
            continue;
        }
        let file_name = field.file_name().map(str::to_owned);
        let data = field.bytes().await?;
        let url = uploads::store_upload(&config.upload_dir, file_name.as_deref(), &data).await?;

        let mut photos = profile.photos;
        photos.insert(0, url);
        store
            .update(
                Collection::Users,
                &uid,
                &json!({ "photos": photos, "updated_at": models::now_millis() }),
            )
            .await?;
        tracing::info!(%uid, "primary photo changed");
        break;
    }

    Ok(Redirect::to("/profile").into_response())
}
