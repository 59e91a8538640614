// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Per-request trace id and response envelope.
//!
//! Every request gets a trace id: the inbound `X-Trace-Id` (or, failing
//! that, `X-Request-Id`) verbatim, else a generated one. The id is
//!
//! - recorded on the `request` span, so every log line carries it
//! - available to handlers via [`TraceContext`] and [`current_trace_id`]
//! - echoed on every response under both `X-Trace-Id` and `X-Request-Id`
//!
//! Error responses that did not come from [`ApiError`] (framework
//! rejections, unknown routes) are rewritten into the same envelope.
//! 5xx bodies from outside `ApiError` keep their status but get a generic
//! message; the original body is only logged.

use std::any::Any;
use std::convert::Infallible;

use axum::{
    body::{to_bytes, Body},
    extract::{FromRequestParts, Request},
    http::{header, request::Parts, HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::Value;
use tracing::Instrument;
use uuid::Uuid;

use crate::error::{ApiError, Enveloped};

pub const TRACE_ID_HEADER: &str = "x-trace-id";
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Largest non-envelope error body read back for rewriting.
const MAX_ERROR_BODY: usize = 64 * 1024;

tokio::task_local! {
    static TRACE_ID: String;
}

/// Trace id of the request being handled, if called inside one.
pub fn current_trace_id() -> Option<String> {
    TRACE_ID.try_with(|id| id.clone()).ok()
}

/// Short random id with a time suffix, e.g. `3f2a9c1e-k9xq`.
///
/// Meant for log correlation only; uniqueness is not guaranteed.
pub fn generate_trace_id() -> String {
    let random = Uuid::new_v4().simple().to_string();
    let millis = chrono::Utc::now().timestamp_millis().unsigned_abs();
    let time = base36(millis);
    let suffix = &time[time.len().saturating_sub(4)..];
    format!("{}-{}", &random[..8], suffix)
}

fn base36(mut n: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut out = Vec::new();
    loop {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
        if n == 0 {
            break;
        }
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}

/// Inbound trace id, `X-Trace-Id` first.
pub fn inbound_trace_id(headers: &HeaderMap) -> Option<String> {
    [TRACE_ID_HEADER, REQUEST_ID_HEADER].into_iter().find_map(|name| {
        let value = headers.get(name)?;
        match value.to_str() {
            Ok(id) if !id.is_empty() => Some(id.to_owned()),
            Ok(_) => None,
            Err(_) => {
                tracing::debug!(header = name, "ignoring inbound trace id that is not visible ASCII");
                None
            }
        }
    })
}

/// The current request's trace id, for handlers that put it in a body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceContext {
    pub trace_id: String,
}

impl<S: Send + Sync> FromRequestParts<S> for TraceContext {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let trace_id = parts
            .extensions
            .get::<TraceContext>()
            .map(|ctx| ctx.trace_id.clone())
            .or_else(current_trace_id)
            .unwrap_or_else(generate_trace_id);
        Ok(TraceContext { trace_id })
    }
}

/// Outermost middleware: assigns the trace id and enforces the envelope.
pub async fn request_envelope(mut req: Request, next: Next) -> Response {
    let trace_id = inbound_trace_id(req.headers()).unwrap_or_else(generate_trace_id);
    req.extensions_mut().insert(TraceContext {
        trace_id: trace_id.clone(),
    });

    let span = tracing::info_span!(
        "request",
        trace_id = %trace_id,
        method = %req.method(),
        path = %req.uri().path(),
    );

    let response = TRACE_ID
        .scope(trace_id.clone(), next.run(req))
        .instrument(span.clone())
        .await;

    let mut response = ensure_error_envelope(response, &trace_id)
        .instrument(span)
        .await;
    stamp_trace_headers(response.headers_mut(), &trace_id);
    response
}

fn stamp_trace_headers(headers: &mut HeaderMap, trace_id: &str) {
    if let Ok(value) = HeaderValue::from_str(trace_id) {
        headers.insert(TRACE_ID_HEADER, value.clone());
        headers.insert(REQUEST_ID_HEADER, value);
    }
}

async fn ensure_error_envelope(response: Response, trace_id: &str) -> Response {
    let status = response.status();
    if status.as_u16() < 400 || response.extensions().get::<Enveloped>().is_some() {
        return response;
    }

    let (parts, body) = response.into_parts();
    let bytes = to_bytes(body, MAX_ERROR_BODY).await.unwrap_or_default();

    let error = if status.is_server_error() {
        tracing::error!(
            status = status.as_u16(),
            body = %String::from_utf8_lossy(&bytes),
            "unenveloped server error replaced"
        );
        ApiError::new(status, ApiError::internal().message)
    } else {
        let (message, details) = describe(&bytes);
        let mut error = ApiError::new(status, message);
        error.details = details;
        error
    };

    let mut rewritten = error.into_response_with_trace(trace_id);
    for (name, value) in parts.headers.iter() {
        if name != header::CONTENT_TYPE && name != header::CONTENT_LENGTH {
            rewritten.headers_mut().insert(name.clone(), value.clone());
        }
    }
    rewritten
}

/// Message and details from an arbitrary error body.
fn describe(bytes: &[u8]) -> (String, Option<Value>) {
    const FALLBACK: &str = "Request failed";

    match serde_json::from_slice::<Value>(bytes) {
        Ok(Value::Object(map)) => {
            let message = ["error", "message"]
                .iter()
                .find_map(|field| map.get(*field).and_then(Value::as_str))
                .filter(|m| !m.is_empty())
                .unwrap_or(FALLBACK)
                .to_string();
            let details = map.get("details").filter(|d| !d.is_null()).cloned();
            (message, details)
        }
        _ => {
            let text = String::from_utf8_lossy(bytes).trim().to_string();
            if text.is_empty() {
                (FALLBACK.to_string(), None)
            } else {
                (text, None)
            }
        }
    }
}

/// Handler for `CatchPanicLayer::custom`: logs the panic, returns a
/// generic 500.
pub fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response<Body> {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s
    } else {
        "non-string panic payload"
    };
    tracing::error!(panic = %detail, "handler panicked");
    ApiError::internal().into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, middleware, routing::get, Json, Router};
    use tower::ServiceExt;
    use tower_http::catch_panic::CatchPanicLayer;

    fn app() -> Router {
        Router::new()
            .route("/ok", get(|| async { Json(serde_json::json!({ "hello": "world" })) }))
            .route(
                "/trace",
                get(|ctx: TraceContext| async move { ctx.trace_id }),
            )
            .route(
                "/api-error",
                get(|| async { ApiError::bad_request("bad input") }),
            )
            .route(
                "/plain-4xx",
                get(|| async { (StatusCode::CONFLICT, "already exists") }),
            )
            .route(
                "/json-4xx",
                get(|| async {
                    (
                        StatusCode::UNPROCESSABLE_ENTITY,
                        Json(serde_json::json!({ "message": "nope", "details": { "field": "x" } })),
                    )
                }),
            )
            .route(
                "/raw-5xx",
                get(|| async { (StatusCode::BAD_GATEWAY, "upstream said secret things") }),
            )
            .route(
                "/panic",
                get(|| async {
                    if true {
                        panic!("boom with internals");
                    }
                    "unreachable"
                }),
            )
            .layer(CatchPanicLayer::custom(panic_response))
            .layer(middleware::from_fn(request_envelope))
    }

    async fn call(path: &str, headers: &[(&str, &str)]) -> (StatusCode, HeaderMap, Value) {
        let mut builder = Request::builder().uri(path);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let response = app()
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
        (status, headers, body)
    }

    #[test]
    fn generated_ids_have_random_and_time_parts() {
        let id = generate_trace_id();
        let (random, time) = id.split_once('-').unwrap();
        assert_eq!(random.len(), 8);
        assert!(random.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(time.len(), 4);
        assert_ne!(generate_trace_id(), generate_trace_id());
    }

    #[test]
    fn base36_encodes() {
        assert_eq!(base36(0), "0");
        assert_eq!(base36(35), "z");
        assert_eq!(base36(36), "10");
    }

    #[test]
    fn trace_header_wins_over_request_id() {
        let mut headers = HeaderMap::new();
        headers.insert(REQUEST_ID_HEADER, HeaderValue::from_static("req-1"));
        assert_eq!(inbound_trace_id(&headers).as_deref(), Some("req-1"));

        headers.insert(TRACE_ID_HEADER, HeaderValue::from_static("trace-1"));
        assert_eq!(inbound_trace_id(&headers).as_deref(), Some("trace-1"));

        headers.insert(TRACE_ID_HEADER, HeaderValue::from_static(""));
        assert_eq!(inbound_trace_id(&headers).as_deref(), Some("req-1"));
    }

    #[test]
    fn opaque_trace_header_is_skipped() {
        let mut headers = HeaderMap::new();
        headers.insert(TRACE_ID_HEADER, HeaderValue::from_bytes(b"caf\xc3\xa9").unwrap());
        assert_eq!(inbound_trace_id(&headers), None);

        headers.insert(REQUEST_ID_HEADER, HeaderValue::from_static("req-2"));
        assert_eq!(inbound_trace_id(&headers).as_deref(), Some("req-2"));
    }

    #[tokio::test]
    async fn success_keeps_body_and_gains_headers() {
        let (status, headers, body) = call("/ok", &[("X-Trace-Id", "abc-123")]).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!({ "hello": "world" }));
        assert_eq!(headers[TRACE_ID_HEADER], "abc-123");
        assert_eq!(headers[REQUEST_ID_HEADER], "abc-123");
    }

    #[tokio::test]
    async fn handlers_see_the_same_trace_id() {
        let (_, headers, body) = call("/trace", &[("X-Request-Id", "from-lb")]).await;
        assert_eq!(body, "from-lb");
        assert_eq!(headers[TRACE_ID_HEADER], "from-lb");

        let (_, headers, body) = call("/trace", &[]).await;
        assert_eq!(body, headers[TRACE_ID_HEADER].to_str().unwrap());
    }

    #[tokio::test]
    async fn api_errors_use_the_request_trace_id() {
        let (status, headers, body) = call("/api-error", &[("X-Trace-Id", "t-42")]).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "bad input");
        assert_eq!(body["traceId"], "t-42");
        assert_eq!(body["requestId"], "t-42");
        assert_eq!(headers[TRACE_ID_HEADER], "t-42");
    }

    #[tokio::test]
    async fn plain_client_errors_are_enveloped() {
        let (status, _, body) = call("/plain-4xx", &[("X-Trace-Id", "t-1")]).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "already exists");
        assert_eq!(body["details"], Value::Null);
        assert_eq!(body["statusCode"], 409);
        assert_eq!(body["traceId"], "t-1");
    }

    #[tokio::test]
    async fn json_client_errors_keep_message_and_details() {
        let (status, _, body) = call("/json-4xx", &[]).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], "nope");
        assert_eq!(body["details"]["field"], "x");
    }

    #[tokio::test]
    async fn raw_server_errors_are_made_generic() {
        let (status, headers, body) = call("/raw-5xx", &[]).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["statusCode"], 502);
        assert_eq!(body["error"], "Internal server error");
        assert!(!body.to_string().contains("secret"));
        assert_eq!(body["traceId"], headers[TRACE_ID_HEADER].to_str().unwrap());
    }

    #[tokio::test]
    async fn panics_become_generic_500_with_trace_id() {
        let (status, headers, body) = call("/panic", &[("X-Trace-Id", "p-1")]).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Internal server error");
        assert_eq!(body["details"], Value::Null);
        assert_eq!(body["traceId"], "p-1");
        assert_eq!(headers[TRACE_ID_HEADER], "p-1");
        assert!(!body.to_string().contains("boom"));
    }

    #[tokio::test]
    async fn unknown_routes_are_enveloped() {
        let (status, headers, body) = call("/nowhere", &[]).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["statusCode"], 404);
        assert_eq!(body["traceId"], headers[TRACE_ID_HEADER].to_str().unwrap());
    }
}
