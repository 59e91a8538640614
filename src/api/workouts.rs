// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Caller workouts, keyed by calendar day.

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{Days, NaiveDate, Utc};
use serde_json::{json, Map, Value};

use crate::{
    auth::Auth,
    error::ApiError,
    models::{keys, Program, WorkoutDay, WorkoutQuery, WorkoutSaveRequest},
    state::AppState,
    store::{ScopedStore, StoreError},
};

/// Lay the program's days out on consecutive dates starting at `start`.
/// Each entry is the program day named after its theme.
fn schedule(program: &Program, start: NaiveDate) -> Result<Map<String, Value>, serde_json::Error> {
    let days = program.weeks.iter().flat_map(|week| week.days.iter());

    let mut workouts = Map::new();
    for (offset, day) in (0u64..).zip(days) {
        let Some(date) = start.checked_add_days(Days::new(offset)) else {
            break;
        };
        let date = date.format("%Y-%m-%d").to_string();
        let mut entry = serde_json::to_value(day)?;
        if let Some(fields) = entry.as_object_mut() {
            fields.insert("name".into(), Value::String(day.theme.clone()));
            fields.insert("date".into(), Value::String(date.clone()));
        }
        workouts.insert(date, entry);
    }
    Ok(workouts)
}

fn required_date(query: WorkoutQuery) -> Result<String, ApiError> {
    query
        .date
        .filter(|date| !date.is_empty())
        .ok_or_else(|| ApiError::bad_request("Missing date"))
}

/// All of the caller's workouts by date.
///
/// When none are stored yet but a program is, the program is laid out from
/// today onward and stored as the caller's workouts.
#[utoipa::path(
    get,
    path = "/v1/workouts",
    tag = "Training",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Workouts keyed by YYYY-MM-DD", body = Object),
        (status = 401, description = "Unauthorized", body = crate::error::ErrorBody),
    )
)]
pub async fn list_workouts(
    State(state): State<AppState>,
    Auth(identity): Auth,
) -> Result<Json<Map<String, Value>>, ApiError> {
    let store = ScopedStore::user(state.store.clone(), identity.subject_id());
    let workouts = match store.get(keys::WORKOUTS).await? {
        Some(Value::Object(workouts)) => workouts,
        _ => Map::new(),
    };
    if !workouts.is_empty() {
        return Ok(Json(workouts));
    }

    let Some(program) = store.get_as::<Program>(keys::PROGRAM).await? else {
        return Ok(Json(workouts));
    };
    let workouts = schedule(&program, Utc::now().date_naive()).map_err(|source| StoreError::Shape {
        key: keys::WORKOUTS.to_string(),
        source,
    })?;
    if !workouts.is_empty() {
        store.set(keys::WORKOUTS, Value::Object(workouts.clone())).await?;
        tracing::debug!(subject = identity.subject_id(), days = workouts.len(), "workouts laid out from program");
    }
    Ok(Json(workouts))
}

/// One day's workout, or `null`.
#[utoipa::path(
    get,
    path = "/v1/workout",
    tag = "Training",
    security(("bearer" = [])),
    params(WorkoutQuery),
    responses(
        (status = 200, description = "Workout for the day, or null", body = WorkoutDay),
        (status = 400, description = "Missing date", body = crate::error::ErrorBody),
        (status = 401, description = "Unauthorized", body = crate::error::ErrorBody),
    )
)]
pub async fn get_workout(
    State(state): State<AppState>,
    Auth(identity): Auth,
    Query(query): Query<WorkoutQuery>,
) -> Result<Json<Value>, ApiError> {
    let date = required_date(query)?;
    let workout = ScopedStore::user(state.store.clone(), identity.subject_id())
        .get(keys::WORKOUTS)
        .await?
        .and_then(|mut workouts| workouts.get_mut(&date).map(Value::take))
        .unwrap_or(Value::Null);
    Ok(Json(workout))
}

/// Store the workout for one day, replacing any existing one.
#[utoipa::path(
    put,
    path = "/v1/workout",
    tag = "Training",
    security(("bearer" = [])),
    params(WorkoutQuery),
    request_body = WorkoutSaveRequest,
    responses(
        (status = 200, description = "Stored workout with its date", body = WorkoutDay),
        (status = 400, description = "Missing date or workout, or invalid workout", body = crate::error::ErrorBody),
        (status = 401, description = "Unauthorized", body = crate::error::ErrorBody),
    )
)]
pub async fn save_workout(
    State(state): State<AppState>,
    Auth(identity): Auth,
    Query(query): Query<WorkoutQuery>,
    Json(request): Json<WorkoutSaveRequest>,
) -> Result<Json<Value>, ApiError> {
    let date = required_date(query)?;
    let workout = match request.workout {
        None | Some(Value::Null) => return Err(ApiError::bad_request("Missing workout")),
        Some(workout) => workout,
    };
    let workout: WorkoutDay = serde_json::from_value(workout).map_err(|e| {
        ApiError::bad_request("Invalid workout schema").with_details(json!({ "message": e.to_string() }))
    })?;

    let shape = |source| StoreError::Shape {
        key: keys::WORKOUTS.to_string(),
        source,
    };
    let mut entry = serde_json::to_value(&workout).map_err(shape)?;
    if let Some(fields) = entry.as_object_mut() {
        fields.insert("date".into(), Value::String(date.clone()));
    }

    let store = ScopedStore::user(state.store.clone(), identity.subject_id());
    let mut workouts = match store.get(keys::WORKOUTS).await? {
        Some(Value::Object(workouts)) => workouts,
        _ => Map::new(),
    };
    workouts.insert(date, entry.clone());
    store.set(keys::WORKOUTS, Value::Object(workouts)).await?;

    Ok(Json(entry))
}
