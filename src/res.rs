use axum::{
    debug_handler,
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
};

use crate::AppResult;

#[macro_export]
macro_rules! include_res {
    (bytes, $p:expr) => {
        include_bytes!(concat!(env!("CARGO_MANIFEST_DIR"), "/res", $p))
    };
    (str, $p:expr) => {
        include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/res", $p))
    };
}

#[debug_handler]
pub async fn styles() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/css")],
        include_res!(str, "/styles.css"),
    )
}

/// Friendly 404 page, named after the thing that could not be found.
pub fn sorry(what: &str) -> AppResult<Response> {
    Ok((
        StatusCode::NOT_FOUND,
        Html(include_res!(str, "/pages/sorry.html").replace("{what}", what)),
    )
        .into_response())
}
