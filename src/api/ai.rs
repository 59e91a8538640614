// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Coaching suggestions from the completion service.

use axum::{extract::State, http::StatusCode, Json};

use crate::{
    auth::Auth,
    error::ApiError,
    models::{keys, AiRequest, AiResponse, TodayAdjustRevision, REVISION_LIMIT},
    providers::{CompletionError, CompletionMode},
    state::AppState,
    store::{ScopedStore, StoreError},
};

fn completion_error(err: CompletionError) -> ApiError {
    match err {
        CompletionError::Timeout(after) => {
            tracing::warn!(timeout = ?after, "completion request timed out");
            ApiError::new(StatusCode::GATEWAY_TIMEOUT, "Completion service timed out")
        }
        CompletionError::Upstream { status, body } => {
            tracing::error!(status, body = %body, "completion service rejected request");
            ApiError::new(StatusCode::BAD_GATEWAY, "Completion service failed")
        }
        other => {
            tracing::error!(error = %other, "completion request failed");
            ApiError::new(StatusCode::BAD_GATEWAY, "Completion service failed")
        }
    }
}

/// Ask for a program or workout suggestion.
///
/// `today_adjust` answers are also kept as the caller's most recent revisions.
#[utoipa::path(
    post,
    path = "/v1/ai",
    tag = "AI",
    security(("bearer" = [])),
    request_body = AiRequest,
    responses(
        (status = 200, description = "Suggestion text", body = AiResponse),
        (status = 400, description = "Missing mode or prompt", body = crate::error::ErrorBody),
        (status = 401, description = "Unauthorized", body = crate::error::ErrorBody),
        (status = 502, description = "Completion service failed", body = crate::error::ErrorBody),
        (status = 503, description = "Completion service not configured", body = crate::error::ErrorBody),
        (status = 504, description = "Completion service timed out", body = crate::error::ErrorBody),
    )
)]
pub async fn suggest(
    State(state): State<AppState>,
    Auth(identity): Auth,
    Json(request): Json<AiRequest>,
) -> Result<Json<AiResponse>, ApiError> {
    let (Some(mode), Some(prompt)) = (request.mode, request.prompt.filter(|p| !p.is_empty())) else {
        return Err(ApiError::bad_request("Missing mode or prompt"));
    };

    let client = state.completion.as_ref().ok_or_else(|| {
        ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            "Completion service is not configured",
        )
    })?;

    let context = match mode {
        CompletionMode::ProgramRefine => request.program.as_ref(),
        CompletionMode::TodayAdjust => request.workout.as_ref(),
    };
    let message = client
        .complete(mode, &prompt, context)
        .await
        .map_err(completion_error)?;

    if mode == CompletionMode::TodayAdjust {
        let store = ScopedStore::user(state.store.clone(), identity.subject_id());
        let mut revisions: Vec<TodayAdjustRevision> = store
            .get_as(keys::TODAY_ADJUST_REVISIONS)
            .await?
            .unwrap_or_default();
        revisions.insert(
            0,
            TodayAdjustRevision {
                created_at: super::now_iso(),
                prompt,
                response: message.clone(),
            },
        );
        revisions.truncate(REVISION_LIMIT);

        let value = serde_json::to_value(&revisions).map_err(|source| StoreError::Shape {
            key: keys::TODAY_ADJUST_REVISIONS.to_string(),
            source,
        })?;
        store.set(keys::TODAY_ADJUST_REVISIONS, value).await?;
    }

    Ok(Json(AiResponse { message }))
}
