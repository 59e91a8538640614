// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Personal records.

use axum::{extract::State, Json};
use serde_json::{Number, Value};

use crate::{
    auth::Auth,
    error::ApiError,
    models::{keys, PrEntry, PrRequest, PR_LIMIT},
    state::AppState,
    store::{ScopedStore, StoreError},
};

/// Epley one-rep-max estimate, rounded half away from zero.
fn estimate_1rm(weight: f64, reps: f64) -> Option<i64> {
    let estimate = (weight * (1.0 + reps / 30.0)).round();
    estimate.is_finite().then_some(estimate as i64)
}

/// A JSON number, or text that parses as one.
fn numeric(value: Option<Value>) -> Option<Number> {
    match value? {
        Value::Number(n) => Some(n),
        Value::String(text) => {
            let text = text.trim();
            text.parse::<i64>()
                .map(Number::from)
                .ok()
                .or_else(|| text.parse::<f64>().ok().and_then(Number::from_f64))
        }
        _ => None,
    }
}

/// The caller's personal records, newest first.
#[utoipa::path(
    get,
    path = "/v1/prs",
    tag = "Training",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Personal records", body = [PrEntry]),
        (status = 401, description = "Unauthorized", body = crate::error::ErrorBody),
    )
)]
pub async fn list_prs(
    State(state): State<AppState>,
    Auth(identity): Auth,
) -> Result<Json<Vec<PrEntry>>, ApiError> {
    let prs = ScopedStore::user(state.store.clone(), identity.subject_id())
        .get_as(keys::PRS)
        .await?
        .unwrap_or_default();
    Ok(Json(prs))
}

/// Record a personal record dated today, with its estimated one-rep max.
#[utoipa::path(
    post,
    path = "/v1/prs",
    tag = "Training",
    security(("bearer" = [])),
    request_body = PrRequest,
    responses(
        (status = 200, description = "Recorded entry", body = PrEntry),
        (status = 400, description = "Invalid PR", body = crate::error::ErrorBody),
        (status = 401, description = "Unauthorized", body = crate::error::ErrorBody),
    )
)]
pub async fn add_pr(
    State(state): State<AppState>,
    Auth(identity): Auth,
    Json(request): Json<PrRequest>,
) -> Result<Json<PrEntry>, ApiError> {
    let invalid = || ApiError::bad_request("Invalid PR schema");

    let Some(Value::String(lift)) = request.lift else {
        return Err(invalid());
    };
    let weight = numeric(request.weight).ok_or_else(invalid)?;
    let reps = numeric(request.reps).ok_or_else(invalid)?;
    let rpe = match request.rpe {
        None | Some(Value::Null) => None,
        Some(Value::Number(n)) => Some(n),
        Some(_) => return Err(invalid()),
    };
    let estimated_1rm = weight
        .as_f64()
        .zip(reps.as_f64())
        .and_then(|(weight, reps)| estimate_1rm(weight, reps))
        .ok_or_else(invalid)?;

    let entry = PrEntry {
        lift,
        weight,
        reps,
        rpe,
        date: super::today_iso(),
        estimated_1rm,
    };

    let store = ScopedStore::user(state.store.clone(), identity.subject_id());
    let mut prs: Vec<PrEntry> = store.get_as(keys::PRS).await?.unwrap_or_default();
    prs.insert(0, entry.clone());
    prs.truncate(PR_LIMIT);

    let value = serde_json::to_value(&prs).map_err(|source| StoreError::Shape {
        key: keys::PRS.to_string(),
        source,
    })?;
    store.set(keys::PRS, value).await?;

    tracing::info!(subject = identity.subject_id(), lift = %entry.lift, "personal record added");
    Ok(Json(entry))
}
