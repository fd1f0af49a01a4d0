mod me;
mod page;
mod password;
mod photo;

use axum::{
    Router,
    routing::{get, post},
};

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/p/{uid}", get(page::profile))
        .route("/profile", get(me::profile_page).post(me::update_profile))
        .route("/profile/password", post(password::change_password))
        .route("/profile/photo", post(photo::change_photo))
}
