//! The browser-facing JSON web server. Each front end gets a static page and
//! one POST route that turns the page's current input state into a render
//! description.

use crate::config::Settings;
use crate::gemini::ModelClient;
use crate::relay::Relay;
use actix_web::http::header::ContentType;
use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse};
use std::collections::HashMap;
use std::sync::Arc;

mod protocol;
pub mod routes;

pub use protocol::*;

/// Shared state of the analyze front end
pub struct AppState {
    pub settings: Settings,
    pub client: Arc<dyn ModelClient>,
}

/// Shared state of the relay front end
pub struct RelayState {
    pub client: Arc<dyn Relay>,
}

#[derive(Debug)]
pub struct WebError {
    err: anyhow::Error,
    status: StatusCode,
}

impl WebError {
    pub fn bad_request(err: anyhow::Error) -> Self {
        WebError {
            err,
            status: StatusCode::BAD_REQUEST,
        }
    }
}

impl std::fmt::Display for WebError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.err)
    }
}

impl actix_web::error::ResponseError for WebError {
    fn error_response(&self) -> HttpResponse {
        let err = HashMap::from([("errors", vec![self.to_string()])]);

        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .json(err)
    }

    fn status_code(&self) -> StatusCode {
        self.status
    }
}

impl From<anyhow::Error> for WebError {
    fn from(err: anyhow::Error) -> WebError {
        WebError {
            err,
            status: StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// JSON extractor config: body limit, and errors rendered like `WebError`
fn json_config(limit: usize) -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(limit)
        .error_handler(|err, _req| {
            WebError::bad_request(anyhow::anyhow!("invalid request body: {err}")).into()
        })
}

/// Register the analyze front end's routes
pub fn configure_analyze(state: web::Data<AppState>) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg: &mut web::ServiceConfig| {
        let limit = state.settings.server.max_payload_bytes;
        cfg.app_data(state)
            .app_data(json_config(limit))
            .service(routes::analyze_page)
            .service(routes::analyze)
            .service(routes::render_js)
            .service(routes::health);
    }
}

/// Register the relay front end's routes
pub fn configure_relay(
    state: web::Data<RelayState>,
    limit: usize,
) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg: &mut web::ServiceConfig| {
        cfg.app_data(state)
            .app_data(json_config(limit))
            .service(routes::relay_page)
            .service(routes::relay)
            .service(routes::render_js)
            .service(routes::health);
    }
}
