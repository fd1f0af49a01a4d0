use tower_sessions::Session;

use crate::{AppError, AppResult};

pub const USER_ID: &str = "user_id";

/// The signed-in user's uid, if any.
pub async fn current_uid(session: &Session) -> AppResult<Option<String>> {
    Ok(session.get::<String>(USER_ID).await?)
}

/// The signed-in user's uid, or `Unauthenticated`.
pub async fn require_uid(session: &Session) -> AppResult<String> {
    current_uid(session).await?.ok_or(AppError::Unauthenticated)
}
