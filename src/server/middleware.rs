use std::time::Instant;

use axum::extract::{MatchedPath, Request, State};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::{Instrument, info, info_span};
use uuid::Uuid;

use super::AppState;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

const ALLOWED_METHODS: &str = "GET,POST,DELETE,OPTIONS";
const DEFAULT_ALLOWED_HEADERS: &str = "authorization,content-type,x-request-id";
const PREFLIGHT_MAX_AGE: &str = "600";

fn header_value(headers: &HeaderMap, key: &str, max_len: usize) -> Option<String> {
    let raw = headers.get(key)?.to_str().ok()?.trim();
    if raw.is_empty() || raw.len() > max_len {
        return None;
    }
    Some(raw.to_string())
}

/// Run each request inside an `http.request` span and echo its request id
pub async fn request_context(req: Request, next: Next) -> Response {
    let request_id = header_value(req.headers(), REQUEST_ID_HEADER, 128)
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let method = req.method().clone();
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());

    let span = info_span!("http.request", %method, %route, %request_id);
    let started = Instant::now();
    let mut resp = next.run(req).instrument(span.clone()).await;

    info!(
        parent: &span,
        status = resp.status().as_u16(),
        latency_ms = started.elapsed().as_millis() as u64,
        "Request completed"
    );

    if let Ok(v) = HeaderValue::from_str(&request_id) {
        resp.headers_mut().insert(REQUEST_ID_HEADER, v);
    }
    resp
}

/// Cross-origin handling for the configured origin list; `*` admits any
/// origin, which is then echoed back so credentials keep working.
pub async fn cors(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let origin = header_value(req.headers(), "origin", 256);
    let allowed = origin
        .as_deref()
        .filter(|o| state.allows_origin(o))
        .and_then(|o| HeaderValue::from_str(o).ok());

    let is_preflight = req.method() == Method::OPTIONS
        && req
            .headers()
            .contains_key(header::ACCESS_CONTROL_REQUEST_METHOD);

    if is_preflight {
        let mut resp = StatusCode::NO_CONTENT.into_response();
        if let Some(origin) = allowed {
            let requested_headers = req
                .headers()
                .get(header::ACCESS_CONTROL_REQUEST_HEADERS)
                .cloned()
                .unwrap_or_else(|| HeaderValue::from_static(DEFAULT_ALLOWED_HEADERS));

            let headers = resp.headers_mut();
            headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin);
            headers.insert(
                header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
                HeaderValue::from_static("true"),
            );
            headers.insert(
                header::ACCESS_CONTROL_ALLOW_METHODS,
                HeaderValue::from_static(ALLOWED_METHODS),
            );
            headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, requested_headers);
            headers.insert(
                header::ACCESS_CONTROL_MAX_AGE,
                HeaderValue::from_static(PREFLIGHT_MAX_AGE),
            );
            headers.insert(header::VARY, HeaderValue::from_static("Origin"));
        }
        return resp;
    }

    let mut resp = next.run(req).await;
    if let Some(origin) = allowed {
        let headers = resp.headers_mut();
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin);
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
            HeaderValue::from_static("true"),
        );
        headers.insert(header::VARY, HeaderValue::from_static("Origin"));
    }
    resp
}
