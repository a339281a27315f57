//! Core library for the code feedback service. This module holds the
//! request/response structures, the shared application state and the HTTP
//! handler for `/code`. Listener and shutdown handling live in `server`.

pub mod analyzer;
mod config;
pub mod server;

pub use config::{AppConfig, DEFAULT_PORT, DEFAULT_SHUTDOWN_TIMEOUT};

use std::fmt;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{routing::post, Router};
use serde::de::{self, IgnoredAny, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

use crate::analyzer::{Analyzer, MockAnalyzer};

/// Code submitted for review. Decoding is lenient in the same places a
/// streaming JSON decoder into a struct is: a missing or `null` `code` leaves
/// it empty, the key matches case-insensitively, the last duplicate wins and
/// unknown fields are ignored. Anything that is not an object (or `null`) is
/// rejected.
#[derive(Debug, Serialize, Default, Clone, PartialEq, Eq)]
pub struct CodeRequest {
    pub code: String,
}

impl<'de> Deserialize<'de> for CodeRequest {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(CodeRequestVisitor)
    }
}

struct CodeRequestVisitor;

impl<'de> Visitor<'de> for CodeRequestVisitor {
    type Value = CodeRequest;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a JSON object with an optional \"code\" string")
    }

    fn visit_unit<E: de::Error>(self) -> Result<CodeRequest, E> {
        Ok(CodeRequest::default())
    }

    fn visit_none<E: de::Error>(self) -> Result<CodeRequest, E> {
        Ok(CodeRequest::default())
    }

    fn visit_map<A>(self, mut map: A) -> Result<CodeRequest, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut req = CodeRequest::default();
        while let Some(key) = map.next_key::<String>()? {
            if key.eq_ignore_ascii_case("code") {
                // null leaves the previous value in place
                if let Some(code) = map.next_value::<Option<String>>()? {
                    req.code = code;
                }
            } else {
                map.next_value::<IgnoredAny>()?;
            }
        }
        Ok(req)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct CodeResponse {
    pub feedback: String,
}

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("request body is empty")]
    Empty,
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Decode the first JSON value in `body`. Bytes after that value are not
/// inspected. Invalid UTF-8 is replaced with U+FFFD before parsing.
pub fn decode_code_request(body: &[u8]) -> Result<CodeRequest, DecodeError> {
    let text = String::from_utf8_lossy(body);
    let mut values = serde_json::Deserializer::from_str(&text).into_iter::<CodeRequest>();
    match values.next() {
        Some(value) => Ok(value?),
        None => Err(DecodeError::Empty),
    }
}

/// State shared by every request. Holds nothing mutable.
#[derive(Clone)]
pub struct AppState {
    pub analyzer: Arc<dyn Analyzer>,
}

impl AppState {
    pub fn new<A: Analyzer + 'static>(analyzer: A) -> Self {
        Self {
            analyzer: Arc::new(analyzer),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(MockAnalyzer)
    }
}

/// Build the Axum router. Only `/code` is routed; other paths fall through
/// to the default 404.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route(
            "/code",
            post(analyze_code_handler).fallback(method_not_allowed_handler),
        )
        .with_state(state)
}

const INVALID_BODY: &str = "Invalid request body";
const INTERNAL_ERROR: &str = "Internal server error";

fn plain_error(status: StatusCode, message: &str) -> Response {
    (
        status,
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
            (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
        ],
        format!("{}\n", message),
    )
        .into_response()
}

/// Any method other than POST on `/code`. The body is never read.
async fn method_not_allowed_handler() -> Response {
    let mut resp = plain_error(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed");
    resp.headers_mut()
        .insert(header::ALLOW, header::HeaderValue::from_static("POST"));
    resp
}

/// Handler for `POST /code`. Decodes the body, asks the analyzer for
/// feedback and returns it as JSON. Every failure is answered here and
/// logged once.
async fn analyze_code_handler(State(state): State<AppState>, body: Bytes) -> Response {
    let request = match decode_code_request(&body) {
        Ok(req) => req,
        Err(e) => {
            tracing::error!(error = %e, body_len = body.len(), "failed to decode request body");
            return plain_error(StatusCode::BAD_REQUEST, INVALID_BODY);
        }
    };

    let feedback = match state.analyzer.analyze(&request.code).await {
        Ok(feedback) => feedback,
        Err(e) => {
            tracing::error!(analyzer = %state.analyzer.name(), error = %e, "error calling analyzer");
            return plain_error(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR);
        }
    };

    match serde_json::to_vec(&CodeResponse { feedback }) {
        Ok(bytes) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/json")],
            bytes,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "failed to encode response");
            plain_error(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR)
        }
    }
}
