// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::{header, HeaderName, Method},
    middleware,
    routing::{get, post},
    Router,
};
use chrono::{SecondsFormat, Utc};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::{CacheStatus, ReasonCode, Role},
    envelope::{self, REQUEST_ID_HEADER, TRACE_ID_HEADER},
    error::{ApiError, ErrorBody},
    models::{
        AiRequest, AiResponse, AuditEntry, AuditEventRequest, ClientDetail, ClientSummary,
        ClientsResponse, Exercise, Onboarding, PrEntry, PrRequest, Program, ProgramSaveRequest,
        ProgramStatus, ProgramWeek, TrainingGoal, Units, UserInfo, UserProfile, WhoAmIResponse,
        WorkoutDay, WorkoutSaveRequest,
    },
    providers::CompletionMode,
    state::AppState,
};

pub mod admin;
pub mod ai;
pub mod audit;
pub mod health;
pub mod profile;
pub mod program;
pub mod prs;
pub mod users;
pub mod workouts;

/// Millisecond-precision UTC timestamp, the format every stored document uses.
pub(crate) fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Today's UTC calendar day, `YYYY-MM-DD`. Workouts are keyed by it.
pub(crate) fn today_iso() -> String {
    Utc::now().format("%Y-%m-%d").to_string()
}

async fn not_found() -> ApiError {
    ApiError::not_found("Not found")
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static(TRACE_ID_HEADER),
            HeaderName::from_static(REQUEST_ID_HEADER),
        ])
        .expose_headers([
            HeaderName::from_static(TRACE_ID_HEADER),
            HeaderName::from_static(REQUEST_ID_HEADER),
        ])
}

pub fn router(state: AppState) -> Router {
    let v1_routes = Router::new()
        .route("/whoami", get(users::whoami))
        .route(
            "/profile",
            get(profile::get_profile).put(profile::save_profile),
        )
        .route(
            "/program",
            get(program::get_program).put(program::save_program),
        )
        .route("/workouts", get(workouts::list_workouts))
        .route(
            "/workout",
            get(workouts::get_workout).put(workouts::save_workout),
        )
        .route("/prs", get(prs::list_prs).post(prs::add_pr))
        .route("/audit-events", post(audit::record_event))
        .route("/admin/clients", get(admin::list_clients))
        .route("/admin/audit", get(admin::list_audit_events))
        .route("/admin/client", get(admin::get_client))
        .route("/ai", post(ai::suggest));

    Router::new()
        .route("/health", get(health::health))
        .nest("/v1", v1_routes)
        .fallback(not_found)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(CatchPanicLayer::custom(envelope::panic_response))
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(envelope::request_envelope))
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        users::whoami,
        profile::get_profile,
        profile::save_profile,
        program::get_program,
        program::save_program,
        workouts::list_workouts,
        workouts::get_workout,
        workouts::save_workout,
        prs::list_prs,
        prs::add_pr,
        audit::record_event,
        admin::list_clients,
        admin::list_audit_events,
        admin::get_client,
        ai::suggest
    ),
    components(
        schemas(
            ErrorBody,
            ReasonCode,
            Role,
            CacheStatus,
            health::HealthResponse,
            health::HealthChecks,
            UserInfo,
            WhoAmIResponse,
            UserProfile,
            Onboarding,
            Units,
            TrainingGoal,
            Exercise,
            WorkoutDay,
            WorkoutSaveRequest,
            ProgramStatus,
            ProgramWeek,
            Program,
            ProgramSaveRequest,
            PrEntry,
            PrRequest,
            ClientSummary,
            ClientsResponse,
            ClientDetail,
            AuditEntry,
            AuditEventRequest,
            CompletionMode,
            AiRequest,
            AiResponse
        )
    ),
    tags(
        (name = "Health", description = "Service health"),
        (name = "Users", description = "Caller identity"),
        (name = "Profile", description = "Caller profile"),
        (name = "Training", description = "Caller program, workouts and personal records"),
        (name = "Audit", description = "Audit event recording"),
        (name = "Admin", description = "Coach views, allowlisted callers only"),
        (name = "AI", description = "Completion-backed coaching suggestions")
    )
)]
struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{
        call, default_claims, default_header, publishing_fetcher, request, sign_token, test_state,
        valid_token, StaticFetcher,
    };
    use axum::http::StatusCode;
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn router_builds_with_all_routes() {
        let app = router(test_state(publishing_fetcher()));
        // Ensure the router can be converted into a service without panicking.
        let _ = app.into_make_service();
    }

    #[tokio::test]
    async fn missing_credentials_carry_inbound_trace_id() {
        let app = router(test_state(publishing_fetcher()));
        let mut req = request("GET", "/v1/whoami", None, None);
        req.headers_mut()
            .insert("x-trace-id", "caller-trace-1".parse().unwrap());

        let (status, headers, body) = call(app, req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Unauthorized");
        assert!(body.get("reason").is_none());
        assert_eq!(body["traceId"], "caller-trace-1");
        assert_eq!(body["requestId"], "caller-trace-1");
        assert_eq!(headers[TRACE_ID_HEADER], "caller-trace-1");
        assert_eq!(headers[REQUEST_ID_HEADER], "caller-trace-1");
    }

    #[tokio::test]
    async fn rejected_token_surfaces_reason_only() {
        let app = router(test_state(publishing_fetcher()));
        let mut claims = default_claims();
        claims["exp"] = json!(crate::test_support::now() - 3600);
        let token = sign_token(&default_header(), &claims);

        let (status, headers, body) =
            call(app, request("GET", "/v1/profile", Some(&token), None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Unauthorized");
        assert_eq!(body["reason"], "EXPIRED");
        assert_eq!(body["statusCode"], 401);
        assert_eq!(body["traceId"], headers[TRACE_ID_HEADER].to_str().unwrap());
    }

    #[tokio::test]
    async fn unreachable_key_set_is_keyset_fetch_failed() {
        let app = router(test_state(Arc::new(StaticFetcher::new())));
        let token = valid_token();

        let (status, _, body) = call(app, request("GET", "/v1/whoami", Some(&token), None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["reason"], "KEYSET_FETCH_FAILED");
    }

    #[tokio::test]
    async fn success_responses_carry_trace_headers() {
        let app = router(test_state(publishing_fetcher()));
        let token = valid_token();

        let (status, headers, body) =
            call(app, request("GET", "/v1/profile", Some(&token), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.get("traceId").is_none());
        assert!(!headers[TRACE_ID_HEADER].is_empty());
        assert_eq!(headers[TRACE_ID_HEADER], headers[REQUEST_ID_HEADER]);
    }

    #[tokio::test]
    async fn health_is_public_and_echoes_trace_id() {
        let app = router(test_state(publishing_fetcher()));
        let mut req = request("GET", "/health", None, None);
        req.headers_mut()
            .insert("x-trace-id", "health-trace".parse().unwrap());

        let (status, _, body) = call(app, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);
        assert_eq!(body["traceId"], "health-trace");
    }

    #[tokio::test]
    async fn unknown_routes_are_enveloped_404s() {
        let app = router(test_state(publishing_fetcher()));

        let (status, headers, body) = call(app, request("GET", "/v1/nope", None, None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["statusCode"], 404);
        assert_eq!(body["traceId"], headers[TRACE_ID_HEADER].to_str().unwrap());
    }

    #[tokio::test]
    async fn malformed_json_body_is_enveloped() {
        let app = router(test_state(publishing_fetcher()));
        let token = valid_token();
        let req = axum::http::Request::builder()
            .method("POST")
            .uri("/v1/audit-events")
            .header("Authorization", format!("Bearer {token}"))
            .header("Content-Type", "application/json")
            .body(axum::body::Body::from("{"))
            .unwrap();

        let (status, _, body) = call(app, req).await;
        assert!(status.is_client_error());
        assert_eq!(body["statusCode"], status.as_u16());
        assert!(body["error"].is_string());
        assert!(body["traceId"].is_string());
    }

    #[test]
    fn openapi_lists_every_route() {
        let doc = ApiDoc::openapi();
        for path in [
            "/health",
            "/v1/whoami",
            "/v1/profile",
            "/v1/program",
            "/v1/workouts",
            "/v1/workout",
            "/v1/prs",
            "/v1/audit-events",
            "/v1/admin/clients",
            "/v1/admin/audit",
            "/v1/admin/client",
            "/v1/ai",
        ] {
            assert!(doc.paths.paths.contains_key(path), "{path}");
        }
    }
}
