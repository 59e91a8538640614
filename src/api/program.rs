// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Caller training program.

use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::{
    auth::Auth,
    error::ApiError,
    models::{keys, Program, ProgramSaveRequest, REVISION_LIMIT},
    state::AppState,
    store::{ScopedStore, StoreError},
};

/// Get the caller's current program, or `null`.
#[utoipa::path(
    get,
    path = "/v1/program",
    tag = "Training",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Stored program, or null", body = Program),
        (status = 401, description = "Unauthorized", body = crate::error::ErrorBody),
    )
)]
pub async fn get_program(
    State(state): State<AppState>,
    Auth(identity): Auth,
) -> Result<Json<Value>, ApiError> {
    let program = ScopedStore::user(state.store.clone(), identity.subject_id())
        .get(keys::PROGRAM)
        .await?
        .unwrap_or(Value::Null);
    Ok(Json(program))
}

/// Replace the caller's program and keep the previous versions.
///
/// `updatedAt` is stamped by the server. Each save is also prepended to
/// `programRevisions`.
#[utoipa::path(
    put,
    path = "/v1/program",
    tag = "Training",
    security(("bearer" = [])),
    request_body = ProgramSaveRequest,
    responses(
        (status = 200, description = "Saved program", body = Program),
        (status = 400, description = "Missing or invalid program", body = crate::error::ErrorBody),
        (status = 401, description = "Unauthorized", body = crate::error::ErrorBody),
    )
)]
pub async fn save_program(
    State(state): State<AppState>,
    Auth(identity): Auth,
    Json(request): Json<ProgramSaveRequest>,
) -> Result<Json<Program>, ApiError> {
    let mut program = match request.program {
        None | Some(Value::Null) => return Err(ApiError::bad_request("Missing program")),
        Some(Value::Object(program)) => program,
        Some(_) => return Err(ApiError::bad_request("Program schema invalid")),
    };
    program.insert("updatedAt".into(), json!(super::now_iso()));

    let program: Program = serde_json::from_value(Value::Object(program)).map_err(|e| {
        ApiError::bad_request("Program schema invalid").with_details(json!({ "message": e.to_string() }))
    })?;

    let store = ScopedStore::user(state.store.clone(), identity.subject_id());
    let shape = |source| StoreError::Shape {
        key: keys::PROGRAM.to_string(),
        source,
    };
    store
        .set(keys::PROGRAM, serde_json::to_value(&program).map_err(shape)?)
        .await?;

    let mut revisions: Vec<Value> = store
        .get_as(keys::PROGRAM_REVISIONS)
        .await?
        .unwrap_or_default();
    revisions.insert(0, serde_json::to_value(&program).map_err(shape)?);
    revisions.truncate(REVISION_LIMIT);
    store.set(keys::PROGRAM_REVISIONS, Value::Array(revisions)).await?;

    tracing::info!(subject = identity.subject_id(), program = %program.id, "program saved");
    Ok(Json(program))
}
