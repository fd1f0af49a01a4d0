use anyhow::Context;
use axum::{Router, debug_handler, response::Redirect, routing::get};
use sqlx::sqlite::SqlitePoolOptions;
use tokio::sync::broadcast;
use tower_http::services::ServeDir;
use tower_sessions::{Expiry, MemoryStore, Session, SessionManagerLayer, cookie::SameSite};
use tracing_subscriber::EnvFilter;

use embers::{
    AppResult, AppState,
    auth::{self, IdentityClient},
    chat,
    config::Config,
    likes, matches, profiles, recs, res,
    session::current_uid,
    store::DocStore,
    uploads,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenv::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::load();

    let pool = SqlitePoolOptions::new()
        .max_connections(16)
        .connect(&config.database_url)
        .await
        .context("connecting to the database")?;

    let store = DocStore::new(pool);
    store.migrate().await.context("creating collections")?;

    let app_state = AppState {
        identity: IdentityClient::new(&config),
        store,
        notifier: broadcast::channel(64).0,
        config: config.clone(),
    };

    let session_store = MemoryStore::default();
    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(false)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::minutes(30)));

    let app = Router::new()
        .route("/", get(index))
        .route("/styles.css", get(res::styles))
        .merge(auth::router())
        .merge(recs::router())
        .merge(likes::router())
        .merge(matches::router())
        .merge(chat::router())
        .merge(profiles::router())
        .merge(uploads::router())
        .nest_service("/files", ServeDir::new(&config.upload_dir))
        .with_state(app_state)
        .layer(session_layer);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("binding {}", config.bind_addr))?;
    tracing::info!(addr = %config.bind_addr, "listening");
    axum::serve(listener, app).await.context("serving")?;

    Ok(())
}

#[debug_handler]
async fn index(session: Session) -> AppResult<Redirect> {
    Ok(if current_uid(&session).await?.is_some() {
        Redirect::to("/feed")
    } else {
        Redirect::to("/login")
    })
}
