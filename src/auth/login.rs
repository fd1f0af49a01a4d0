use axum::{
    Form, debug_handler,
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;

use crate::{
    AppError, AppResult, AppState, include_res,
    auth::IdentityClient,
    session::{USER_ID, current_uid},
};

#[derive(Deserialize)]
pub(crate) struct LoginForm {
    email: String,
    password: String,
}

#[debug_handler]
pub(crate) async fn login_page(session: Session) -> AppResult<Response> {
    if current_uid(&session).await?.is_some() {
        return Ok(Redirect::to("/feed").into_response());
    }
    Ok(Html(include_res!(str, "/pages/login.html").replace("{note}", "")).into_response())
}

#[debug_handler(state = AppState)]
pub(crate) async fn login(
    State(identity): State<IdentityClient>,
    session: Session,
    Form(LoginForm { email, password }): Form<LoginForm>,
) -> AppResult<Response> {
    let user = match identity.sign_in(email.trim(), &password).await {
        Ok(user) => user,
        Err(AppError::Auth { code }) => {
            tracing::warn!(%code, "sign-in rejected");
            let body = include_res!(str, "/pages/login.html")
                .replace("{note}", "Wrong email or password.");
            return Ok((StatusCode::UNAUTHORIZED, Html(body)).into_response());
        }
        Err(err) => return Err(err),
    };

    session.insert(USER_ID, user.uid.clone()).await?;
    tracing::info!(uid = %user.uid, "signed in");

    Ok(Redirect::to("/feed").into_response())
}
