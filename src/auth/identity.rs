use serde::Serialize;
use serde_json::Value;

use crate::{AppError, AppResult, GetField, config::Config};

/// REST client for the identity-toolkit password endpoints. Credentials never
/// touch this process beyond the request body; the provider owns them.
#[derive(Clone)]
pub struct IdentityClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

/// Identity established by a successful sign-up or sign-in.
pub struct AuthedUser {
    pub uid: String,
    pub email: String,
    pub id_token: String,
}

impl AuthedUser {
    fn from_value(body: &Value) -> AppResult<Self> {
        Ok(Self {
            uid: body.get_str_field("localId")?,
            email: body.get_str_field("email")?,
            id_token: body.get_str_field("idToken")?,
        })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordGrant<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordUpdate<'a> {
    id_token: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

impl IdentityClient {
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.identity_url.clone(),
            api_key: config.identity_api_key.clone(),
        }
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> AppResult<AuthedUser> {
        let body = self
            .call(
                "signUp",
                &PasswordGrant {
                    email,
                    password,
                    return_secure_token: true,
                },
            )
            .await?;
        AuthedUser::from_value(&body)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> AppResult<AuthedUser> {
        let body = self
            .call(
                "signInWithPassword",
                &PasswordGrant {
                    email,
                    password,
                    return_secure_token: true,
                },
            )
            .await?;
        AuthedUser::from_value(&body)
    }

    /// Requires a token from a fresh sign-in; callers reauthenticate first.
    pub async fn update_password(&self, id_token: &str, new_password: &str) -> AppResult<()> {
        self.call(
            "update",
            &PasswordUpdate {
                id_token,
                password: new_password,
                return_secure_token: true,
            },
        )
        .await?;
        Ok(())
    }

    async fn call(&self, endpoint: &str, request: &impl Serialize) -> AppResult<Value> {
        let url = format!(
            "{}/accounts:{endpoint}?key={}",
            self.base_url, self.api_key
        );
        let body: Value = self.http.post(url).json(request).send().await?.json().await?;

        if let Some(err) = provider_error(&body) {
            return Err(err);
        }
        Ok(body)
    }
}

/// The toolkit reports failures as `{"error": {"message": "EMAIL_EXISTS"}}`
/// with a 200-family-agnostic body, so the code is read out of the payload.
fn provider_error(body: &Value) -> Option<AppError> {
    let error = body.get("error")?;
    let code = error
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("UNKNOWN")
        .to_owned();
    Some(AppError::Auth { code })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn success_payload_yields_an_authed_user() {
        let body = json!({
            "localId": "u1",
            "email": "ana@example.com",
            "idToken": "tok",
            "refreshToken": "r",
        });
        let user = AuthedUser::from_value(&body).unwrap();
        assert_eq!(user.uid, "u1");
        assert_eq!(user.email, "ana@example.com");
        assert_eq!(user.id_token, "tok");
    }

    #[test]
    fn error_payload_carries_the_provider_code() {
        let body = json!({"error": {"code": 400, "message": "INVALID_PASSWORD"}});
        match provider_error(&body) {
            Some(AppError::Auth { code }) => assert_eq!(code, "INVALID_PASSWORD"),
            other => panic!("expected Auth error, got {other:?}"),
        }
    }

    #[test]
    fn clean_payload_is_not_an_error() {
        assert!(provider_error(&json!({"localId": "u1"})).is_none());
    }
}
