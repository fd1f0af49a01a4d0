use axum::{
    debug_handler,
    extract::{Path, State},
    response::{Html, IntoResponse, Redirect, Response},
};
use time::OffsetDateTime;
use tower_sessions::Session;

use crate::{
    AppResult, include_res, res,
    models::Profile,
    session::current_uid,
    store::{Collection, DocStore},
};

#[debug_handler(state = crate::AppState)]
pub(crate) async fn profile(
    Path(uid): Path<String>,
    State(store): State<DocStore>,
    session: Session,
) -> AppResult<Response> {
    if current_uid(&session).await?.is_none() {
        return Ok(Redirect::to("/login").into_response());
    }

    let Some(profile) = store.get_as::<Profile>(Collection::Users, &uid).await? else {
        return res::sorry("profile");
    };

    let today = OffsetDateTime::now_utc().date();
    let age = profile
        .age_on(today)
        .map(|age| age.to_string())
        .unwrap_or_default();
    let gender = if profile.show_gender_profile {
        profile.gender.as_str()
    } else {
        ""
    };
    let location = match &profile.city {
        Some(city) => format!("{city}, {}", profile.country),
        None => profile.country.clone(),
    };

    let passions: String = profile
        .passions
        .iter()
        .flatten()
        .map(|interest| format!("<span class=\"chip\">{}</span>", interest.category))
        .collect();
    let photos: String = profile
        .photos
        .iter()
        .map(|photo| format!("<img src=\"{photo}\" alt=\"\">"))
        .collect();

    Ok(Html(
        include_res!(str, "/pages/profile_view.html")
            .replace("{uid}", &profile.uid)
            .replace("{name}", &profile.full_name())
            .replace("{age}", &age)
            .replace("{gender}", gender)
            .replace("{location}", &location)
            .replace("{passions}", &passions)
            .replace("{photos}", &photos),
    )
    .into_response())
}
