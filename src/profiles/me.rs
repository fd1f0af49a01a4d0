use axum::{
    Form, debug_handler,
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use serde_json::json;
use tower_sessions::Session;

use crate::{
    AppResult, include_res, res,
    error::{FieldError, ValidationKind},
    models::{self, Profile},
    session::current_uid,
    store::{Collection, DocStore},
};

#[derive(Deserialize)]
pub(crate) struct UpdateProfileForm {
    #[serde(default)]
    name: String,
    #[serde(default)]
    last_name: String,
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn profile_page(
    State(store): State<DocStore>,
    session: Session,
) -> AppResult<Response> {
    let Some(uid) = current_uid(&session).await? else {
        return Ok(Redirect::to("/login").into_response());
    };
    let Some(profile) = store.get_as::<Profile>(Collection::Users, &uid).await? else {
        return res::sorry("profile");
    };

    Ok(Html(render(&profile, &[], "")).into_response())
}

/// Changes display names only; the email field stays bound to the identity
/// provider's account and is never editable here.
#[debug_handler(state = crate::AppState)]
pub(crate) async fn update_profile(
    State(store): State<DocStore>,
    session: Session,
    Form(form): Form<UpdateProfileForm>,
) -> AppResult<Response> {
    let Some(uid) = current_uid(&session).await? else {
        return Ok(Redirect::to("/login").into_response());
    };

    let name = form.name.trim();
    let last_name = form.last_name.trim();

    let mut errors = Vec::new();
    if name.is_empty() {
        errors.push(FieldError::new("name", ValidationKind::Required));
    }
    if last_name.is_empty() {
        errors.push(FieldError::new("last_name", ValidationKind::Required));
    }
    if !errors.is_empty() {
        let Some(profile) = store.get_as::<Profile>(Collection::Users, &uid).await? else {
            return res::sorry("profile");
        };
        return Ok((
            StatusCode::UNPROCESSABLE_ENTITY,
            Html(render(&profile, &errors, "")),
        )
            .into_response());
    }

    store
        .update(
            Collection::Users,
            &uid,
            &json!({
                "name": name,
                "last_name": last_name,
                "updated_at": models::now_millis(),
            }),
        )
        .await?;
    tracing::info!(%uid, "profile updated");

    Ok(Redirect::to("/profile").into_response())
}

pub(crate) fn render(profile: &Profile, errors: &[FieldError], note: &str) -> String {
    let mut page = include_res!(str, "/pages/profile.html")
        .replace("{note}", note)
        .replace("{full_name}", &profile.full_name())
        .replace("{photo}", profile.primary_photo())
        .replace("{name}", &profile.name)
        .replace("{last_name}", &profile.last_name)
        .replace("{email}", &profile.email);

    for field in [
        "name",
        "last_name",
        "old_password",
        "new_password",
        "confirm_password",
    ] {
        let message = errors
            .iter()
            .find(|error| error.field == field)
            .map(FieldError::message)
            .unwrap_or_default();
        page = page.replace(&format!("{{error_{field}}}"), &message);
    }
    page
}
