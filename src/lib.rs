pub mod auth;
pub mod chat;
pub mod config;
pub mod error;
pub mod likes;
pub mod matches;
pub mod models;
pub mod profiles;
pub mod recs;
pub mod res;
pub mod session;
pub mod store;
pub mod uploads;

use axum::extract::FromRef;
use serde_json::Value;
use tokio::sync::broadcast;

pub use error::{AppError, AppResult};

use crate::{auth::IdentityClient, config::Config, store::DocStore};

#[derive(Clone, FromRef)]
pub struct AppState {
    pub store: DocStore,
    pub identity: IdentityClient,
    pub config: Config,
    /// Chat fan-out: carries the channel id of every freshly stored message.
    pub notifier: broadcast::Sender<String>,
}

pub trait GetField {
    fn get_str_field(&self, field: &str) -> AppResult<String>;
    fn get_obj_field(&self, field: &str) -> AppResult<&Value>;
}

impl GetField for serde_json::Value {
    fn get_str_field(&self, field: &str) -> AppResult<String> {
        Ok(self
            .get(field)
            .ok_or(format!("expected {field} in {self}"))?
            .as_str()
            .ok_or(format!("expected {field} in {self} to be string"))?
            .to_owned())
    }

    fn get_obj_field(&self, field: &str) -> AppResult<&Value> {
        self.get(field)
            .ok_or(format!("expected {field} in {self}").into())
    }
}
