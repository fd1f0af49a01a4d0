use axum::{
    Form, debug_handler,
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use time::{Date, OffsetDateTime};
use tower_sessions::Session;

use crate::{
    AppError, AppResult, AppState, include_res,
    auth::{IdentityClient, MIN_PASSWORD_LEN},
    error::{FieldError, ValidationKind},
    models::{self, BIRTHDATE_FORMAT, Interest, Profile},
    session::{USER_ID, current_uid},
    store::{Collection, DocStore},
};

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RegisterForm {
    #[serde(default)]
    name: String,
    #[serde(default)]
    last_name: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
    #[serde(default)]
    birthdate: String,
    #[serde(default)]
    gender: String,
    #[serde(default)]
    show_gender_profile: Option<String>,
    #[serde(default)]
    country: String,
    #[serde(default)]
    city: String,
    /// Comma-separated interest categories picked on the form.
    #[serde(default)]
    passions: String,
    /// Comma-separated URLs handed back by `/upload`.
    #[serde(default)]
    photos: String,
}

#[debug_handler]
pub(crate) async fn register_page(session: Session) -> AppResult<Response> {
    if current_uid(&session).await?.is_some() {
        return Ok(Redirect::to("/feed").into_response());
    }
    Ok(Html(render_form(&RegisterForm::default(), &[], "")).into_response())
}

#[debug_handler(state = AppState)]
pub(crate) async fn register(
    State(store): State<DocStore>,
    State(identity): State<IdentityClient>,
    session: Session,
    Form(form): Form<RegisterForm>,
) -> AppResult<Response> {
    if current_uid(&session).await?.is_some() {
        return Ok(Redirect::to("/feed").into_response());
    }

    let today = OffsetDateTime::now_utc().date();
    let valid = match validate(&form, today) {
        Ok(valid) => valid,
        Err(errors) => {
            return Ok((
                StatusCode::UNPROCESSABLE_ENTITY,
                Html(render_form(&form, &errors, "")),
            )
                .into_response());
        }
    };

    let user = match identity.sign_up(&valid.email, &form.password).await {
        Ok(user) => user,
        Err(AppError::Auth { code }) => {
            tracing::warn!(%code, "sign-up rejected");
            let note = match code.as_str() {
                "EMAIL_EXISTS" => "An account with this email already exists.".to_owned(),
                code => format!("The identity service rejected the sign-up ({code})."),
            };
            return Ok((
                StatusCode::UNPROCESSABLE_ENTITY,
                Html(render_form(&form, &[], &note)),
            )
                .into_response());
        }
        Err(err) => return Err(err),
    };

    let now = models::now_millis();
    let profile = Profile {
        uid: user.uid.clone(),
        name: valid.name,
        last_name: valid.last_name,
        email: valid.email,
        birthdate: valid.birthdate,
        gender: valid.gender,
        show_gender_profile: valid.show_gender_profile,
        passions: Some(valid.passions),
        photos: valid.photos,
        country: valid.country,
        city: valid.city,
        created_at: Some(now),
        updated_at: Some(now),
    };
    store.create(Collection::Users, &user.uid, &profile).await?;

    session.insert(USER_ID, user.uid.clone()).await?;
    tracing::info!(uid = %user.uid, "registered");

    Ok(Redirect::to("/feed").into_response())
}

/// What survives validation, ready to become a profile document.
#[derive(Debug, PartialEq)]
pub(crate) struct NewProfile {
    name: String,
    last_name: String,
    email: String,
    birthdate: String,
    gender: String,
    show_gender_profile: bool,
    country: String,
    city: Option<String>,
    passions: Vec<Interest>,
    photos: Vec<String>,
}

pub(crate) fn validate(form: &RegisterForm, today: Date) -> Result<NewProfile, Vec<FieldError>> {
    let mut errors = Vec::new();
    let mut require = |field: &'static str, value: &str| {
        if value.is_empty() {
            errors.push(FieldError::new(field, ValidationKind::Required));
        }
    };

    let name = form.name.trim();
    require("name", name);
    let last_name = form.last_name.trim();
    require("last_name", last_name);
    let country = form.country.trim();
    require("country", country);
    let gender = form.gender.trim();
    require("gender", gender);

    let email = form.email.trim();
    if email.is_empty() {
        errors.push(FieldError::new("email", ValidationKind::Required));
    } else if !plausible_email(email) {
        errors.push(FieldError::new("email", ValidationKind::Email));
    }

    if form.password.is_empty() {
        errors.push(FieldError::new("password", ValidationKind::Required));
    } else if form.password.chars().count() < MIN_PASSWORD_LEN {
        errors.push(FieldError::new(
            "password",
            ValidationKind::MinLength(MIN_PASSWORD_LEN),
        ));
    }

    let passions: Vec<Interest> = split_list(&form.passions)
        .into_iter()
        .map(Interest::new)
        .collect();
    if passions.is_empty() {
        errors.push(FieldError::new("passions", ValidationKind::Required));
    }

    let photos = split_list(&form.photos);
    if photos.is_empty() {
        errors.push(FieldError::new("photos", ValidationKind::Required));
    }

    let birthdate = form.birthdate.trim();
    if birthdate.is_empty() {
        errors.push(FieldError::new("birthdate", ValidationKind::Required));
    } else {
        match Date::parse(birthdate, BIRTHDATE_FORMAT) {
            Err(_) => errors.push(FieldError::new("birthdate", ValidationKind::InvalidDate)),
            Ok(born) => {
                // Age is measured against yesterday, one day of slack for
                // client timezones behind the server clock.
                let measured = today.previous_day().unwrap_or(today);
                let age = models::age_on(born, measured);
                if age < 18 {
                    errors.push(FieldError::new("birthdate", ValidationKind::Underage(age)));
                }
            }
        }
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    let city = form.city.trim();
    Ok(NewProfile {
        name: name.to_owned(),
        last_name: last_name.to_owned(),
        email: email.to_owned(),
        birthdate: birthdate.to_owned(),
        gender: gender.to_owned(),
        show_gender_profile: form.show_gender_profile.is_some(),
        country: country.to_owned(),
        city: (!city.is_empty()).then(|| city.to_owned()),
        passions,
        photos,
    })
}

fn plausible_email(s: &str) -> bool {
    let Some((local, domain)) = s.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

fn split_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_owned)
        .collect()
}

const FORM_FIELDS: [&str; 9] = [
    "name",
    "last_name",
    "email",
    "password",
    "country",
    "gender",
    "birthdate",
    "passions",
    "photos",
];

fn render_form(form: &RegisterForm, errors: &[FieldError], note: &str) -> String {
    let mut page = include_res!(str, "/pages/register.html")
        .replace("{note}", note)
        .replace("{name}", &form.name)
        .replace("{last_name}", &form.last_name)
        .replace("{email}", &form.email)
        .replace("{birthdate}", &form.birthdate)
        .replace("{gender}", &form.gender)
        .replace("{country}", &form.country)
        .replace("{city}", &form.city)
        .replace("{passions}", &form.passions)
        .replace("{photos}", &form.photos);

    for field in FORM_FIELDS {
        let message = errors
            .iter()
            .find(|error| error.field == field)
            .map(FieldError::message)
            .unwrap_or_default();
        page = page.replace(&format!("{{error_{field}}}"), &message);
    }
    page
}
