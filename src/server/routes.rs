//! HTTP routes for both front ends

use super::protocol::{AnalyzeRequest, RelayRequest};
use super::{AppState, RelayState, WebError};
use crate::analysis::{self, Submission};
use crate::page::Page;
use crate::relay as relay_handler;
use actix_web::http::header::ContentType;
use actix_web::{get, post, web, HttpResponse, Responder};
use anyhow::anyhow;
use serde_json::json;
use tracing::*;

type Result<T> = std::result::Result<T, WebError>;

const ANALYZE_HTML: &str = include_str!("analyze.html");
const RELAY_HTML: &str = include_str!("relay.html");
const RENDER_JS: &str = include_str!("render.js");

#[get("/")]
pub async fn analyze_page() -> impl Responder {
    HttpResponse::Ok()
        .content_type(ContentType::html())
        .body(ANALYZE_HTML)
}

/// Run one interaction of the analyze page
#[post("/analyze")]
pub async fn analyze(
    req: web::Json<AnalyzeRequest>,
    state: web::Data<AppState>,
) -> Result<web::Json<Page>> {
    let req = req.into_inner();
    let max_files = state.settings.images.max_files;
    if req.images.len() > max_files {
        warn!("rejected request with {} images", req.images.len());
        return Err(WebError::bad_request(anyhow!(
            "too many images: at most {max_files} can be analyzed at once"
        )));
    }

    debug!("analyze request: {req:?}");
    let submission = Submission::from(req);
    let page = analysis::analyze(&state.settings, state.client.as_ref(), submission).await;

    info!("finished serving analyze request");
    Ok(web::Json(page))
}

#[get("/")]
pub async fn relay_page() -> impl Responder {
    HttpResponse::Ok()
        .content_type(ContentType::html())
        .body(RELAY_HTML)
}

#[post("/relay")]
pub async fn relay(req: web::Json<RelayRequest>, state: web::Data<RelayState>) -> impl Responder {
    let page = relay_handler::relay(state.client.as_ref(), &req.input).await;
    info!("finished serving relay request");
    web::Json(page)
}

/// The script both pages use to draw a `Page`
#[get("/render.js")]
pub async fn render_js() -> impl Responder {
    HttpResponse::Ok()
        .content_type("application/javascript; charset=utf-8")
        .body(RENDER_JS)
}

#[get("/health")]
pub async fn health() -> impl Responder {
    web::Json(json!({ "status": "ok" }))
}
