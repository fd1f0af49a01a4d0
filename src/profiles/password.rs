use axum::{
    Form, debug_handler,
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;

use crate::{
    AppError, AppResult, res,
    auth::{IdentityClient, MIN_PASSWORD_LEN},
    error::{FieldError, ValidationKind},
    models::Profile,
    profiles::me,
    session::current_uid,
    store::{Collection, DocStore},
};

#[derive(Deserialize)]
pub(crate) struct PasswordForm {
    #[serde(default)]
    old_password: String,
    #[serde(default)]
    new_password: String,
    #[serde(default)]
    confirm_password: String,
}

/// Reauthenticates against the identity provider with the old password, then
/// updates to the new one. A wrong old password comes back as an inline
/// message, not a process failure.
#[debug_handler(state = crate::AppState)]
pub(crate) async fn change_password(
    State(store): State<DocStore>,
    State(identity): State<IdentityClient>,
    session: Session,
    Form(form): Form<PasswordForm>,
) -> AppResult<Response> {
    let Some(uid) = current_uid(&session).await? else {
        return Ok(Redirect::to("/login").into_response());
    };
    let Some(profile) = store.get_as::<Profile>(Collection::Users, &uid).await? else {
        return res::sorry("profile");
    };

    let errors = validate(&form);
    if !errors.is_empty() {
        return Ok((
            StatusCode::UNPROCESSABLE_ENTITY,
            Html(me::render(&profile, &errors, "")),
        )
            .into_response());
    }

    let authed = match identity.sign_in(&profile.email, &form.old_password).await {
        Ok(authed) => authed,
        Err(AppError::Auth { code }) => {
            tracing::warn!(%uid, %code, "reauthentication rejected");
            let note = match code.as_str() {
                "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" => {
                    "Wrong current password.".to_owned()
                }
                code => format!("Could not verify your identity ({code})."),
            };
            return Ok((
                StatusCode::UNAUTHORIZED,
                Html(me::render(&profile, &[], &note)),
            )
                .into_response());
        }
        Err(err) => return Err(err),
    };

    identity
        .update_password(&authed.id_token, &form.new_password)
        .await?;
    tracing::info!(%uid, "password changed");

    Ok(Html(me::render(&profile, &[], "Password updated.")).into_response())
}

pub(crate) fn validate(form: &PasswordForm) -> Vec<FieldError> {
    let mut errors = Vec::new();

    if form.old_password.is_empty() {
        errors.push(FieldError::new("old_password", ValidationKind::Required));
    }

    if form.new_password.is_empty() {
        errors.push(FieldError::new("new_password", ValidationKind::Required));
    } else if form.new_password.chars().count() < MIN_PASSWORD_LEN {
        errors.push(FieldError::new(
            "new_password",
            ValidationKind::MinLength(MIN_PASSWORD_LEN),
        ));
    }

    if form.confirm_password != form.new_password {
        errors.push(FieldError::new("confirm_password", ValidationKind::Mismatch));
    }

    errors
}
