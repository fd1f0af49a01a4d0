use std::path::Path;

use axum::{
    Json, Router, debug_handler,
    extract::{Multipart, State},
    routing::post,
};
use serde_json::json;
use tower_http::cors::CorsLayer;
use uuid::Uuid;

use crate::{
    AppResult, AppState,
    config::Config,
    error::{AppError, FieldError, ValidationKind},
};

/// The upload endpoint acts as a public bucket, so it is CORS-open.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/upload", post(upload))
        .layer(CorsLayer::permissive())
}

/// Accepts one multipart file field and answers with the bucket URL. No
/// session check: the register page uploads a photo before an account exists.
#[debug_handler(state = AppState)]
async fn upload(
    State(config): State<Config>,
    mut multipart: Multipart,
) -> AppResult<Json<serde_json::Value>> {
    while let Some(field) = multipart.next_field().await? {
        if field.file_name().is_none() {
            continue;
        }
        let file_name = field.file_name().map(str::to_owned);
        let data = field.bytes().await?;
        let url = store_upload(&config.upload_dir, file_name.as_deref(), &data).await?;
        return Ok(Json(json!({ "url": url })));
    }

    Err(AppError::Validation(vec![FieldError {
        field: "file",
        kind: ValidationKind::Required,
    }]))
}

/// Writes the bytes into the bucket directory under a fresh name and returns
/// the path it will be served from.
pub(crate) async fn store_upload(
    dir: &Path,
    file_name: Option<&str>,
    data: &[u8],
) -> AppResult<String> {
    tokio::fs::create_dir_all(dir).await?;

    let name = format!("{}.{}", Uuid::now_v7(), sanitize_ext(file_name));
    tokio::fs::write(dir.join(&name), data).await?;

    Ok(format!("/files/{name}"))
}

/// Extension from the client-supplied name, reduced to something safe to put
/// in a filesystem path. Anything weird collapses to `bin`.
fn sanitize_ext(file_name: Option<&str>) -> String {
    let ext: String = file_name
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext)
        .unwrap_or_default()
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .take(8)
        .collect();

    if ext.is_empty() { "bin".to_owned() } else { ext }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_is_kept_lowercased() {
        assert_eq!(sanitize_ext(Some("me.JPG")), "jpg");
        assert_eq!(sanitize_ext(Some("archive.tar.gz")), "gz");
    }

    #[test]
    fn hostile_or_missing_names_fall_back_to_bin() {
        assert_eq!(sanitize_ext(None), "bin");
        assert_eq!(sanitize_ext(Some("noext")), "bin");
        assert_eq!(sanitize_ext(Some("spooky.../../")), "bin");
    }

    #[tokio::test]
    async fn stored_upload_lands_in_the_bucket() {
        let dir = std::env::temp_dir().join(format!("embers-test-{}", Uuid::now_v7()));
        let url = store_upload(&dir, Some("pic.png"), b"\x89PNG").await.unwrap();

        assert!(url.starts_with("/files/"));
        assert!(url.ends_with(".png"));

        let name = url.trim_start_matches("/files/");
        let bytes = tokio::fs::read(dir.join(name)).await.unwrap();
        assert_eq!(bytes, b"\x89PNG");

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }
}
