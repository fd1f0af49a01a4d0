mod identity;
mod login;
mod logout;
mod register;

pub use identity::{AuthedUser, IdentityClient};

use axum::{Router, routing::get};

use crate::AppState;

pub(crate) const MIN_PASSWORD_LEN: usize = 6;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", get(login::login_page).post(login::login))
        .route(
            "/register",
            get(register::register_page).post(register::register),
        )
        .route("/logout", get(logout::logout))
}
