use std::path::PathBuf;

/// Runtime configuration, read from the environment (a `.env` file works too).
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    pub identity_url: String,
    pub identity_api_key: String,
    pub upload_dir: PathBuf,
}

impl Config {
    pub fn load() -> Self {
        Self {
            database_url: try_load("DATABASE_URL", "sqlite:embers.db?mode=rwc"),
            bind_addr: try_load("BIND_ADDR", "0.0.0.0:8080"),
            identity_url: try_load(
                "IDENTITY_URL",
                "https://identitytoolkit.googleapis.com/v1",
            ),
            identity_api_key: dotenv::var("IDENTITY_API_KEY").unwrap_or_else(|_| {
                tracing::warn!(
                    "IDENTITY_API_KEY not set, sign-up/sign-in will fail against the live identity service"
                );
                String::new()
            }),
            upload_dir: PathBuf::from(try_load("UPLOAD_DIR", "uploads")),
        }
    }
}

fn try_load(key: &str, default: &str) -> String {
    dotenv::var(key).unwrap_or_else(|_| {
        tracing::info!("{key} not set, using default: {default}");
        default.to_owned()
    })
}
