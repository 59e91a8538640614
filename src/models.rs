// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use utoipa::ToSchema;

use crate::auth::Role;
use crate::providers::CompletionMode;

/// Roster and audit logs keep at most this many entries, newest first.
pub const ROSTER_LIMIT: usize = 200;

/// Stored `todayAdjustRevisions` and `programRevisions` per user.
pub const REVISION_LIMIT: usize = 10;

/// Personal records kept per user, newest first.
pub const PR_LIMIT: usize = 50;

/// Storage keys.
pub mod keys {
    pub const PROFILE: &str = "profile";
    pub const PROGRAM: &str = "program";
    pub const WORKOUTS: &str = "workouts";
    pub const PROGRAM_REVISIONS: &str = "programRevisions";
    pub const PRS: &str = "prs";
    pub const TODAY_ADJUST_REVISIONS: &str = "todayAdjustRevisions";
    pub const CLIENTS: &str = "clients";
    pub const AUDIT_EVENTS: &str = "auditEvents";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    #[default]
    Lb,
    Kg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TrainingGoal {
    Bodybuilding,
    Powerlifting,
    General,
}

impl TrainingGoal {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrainingGoal::Bodybuilding => "bodybuilding",
            TrainingGoal::Powerlifting => "powerlifting",
            TrainingGoal::General => "general",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Onboarding {
    pub goal: TrainingGoal,
    /// Training days per week, 1 to 7
    pub days: u8,
    pub experience: String,
    pub equipment: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraints: Option<String>,
    /// Number or free text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub bench_pr: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub squat_pr: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub deadlift_pr: Option<Value>,
    #[serde(default)]
    pub units: Units,
}

/// A user's stored profile document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UserProfile {
    #[serde(default)]
    pub units: Units,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub onboarding: Option<Onboarding>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl UserProfile {
    /// Checks serde cannot express.
    pub fn validate(&self) -> Result<(), &'static str> {
        if let Some(onboarding) = &self.onboarding {
            if !(1..=7).contains(&onboarding.days) {
                return Err("onboarding.days must be between 1 and 7");
            }
            for pr in [&onboarding.bench_pr, &onboarding.squat_pr, &onboarding.deadlift_pr]
                .into_iter()
                .flatten()
            {
                if !(pr.is_number() || pr.is_string() || pr.is_null()) {
                    return Err("personal records must be numbers or text");
                }
            }
        }
        Ok(())
    }

    pub fn goal(&self) -> String {
        self.onboarding
            .as_ref()
            .map(|o| o.goal.as_str().to_string())
            .unwrap_or_default()
    }
}

/// Entry in the global client roster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClientSummary {
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub last_login: String,
    #[serde(default)]
    pub goal: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ClientsResponse {
    pub clients: Vec<ClientSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub detail: String,
    pub created_at: String,
    pub user_id: String,
    #[serde(default)]
    pub email: String,
}

/// Loosely typed so shape problems surface as 400s from the handler.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct AuditEventRequest {
    #[serde(default, rename = "type")]
    #[schema(value_type = Option<String>)]
    pub event_type: Option<Value>,
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub detail: Option<Value>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub role: Role,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct WhoAmIResponse {
    pub user: UserInfo,
    #[schema(value_type = Object)]
    pub profile: Value,
}

/// Everything stored for one client, for coach review.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClientDetail {
    pub user_id: String,
    pub email: String,
    #[schema(value_type = Option<Object>)]
    pub profile: Option<Value>,
    #[schema(value_type = Option<Object>)]
    pub program: Option<Value>,
    #[schema(value_type = Object)]
    pub workouts: Value,
    #[schema(value_type = Vec<Object>)]
    pub prs: Value,
    #[schema(value_type = Option<Object>)]
    pub today_workout: Option<Value>,
}

/// One prescribed exercise in a workout day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct Exercise {
    pub name: String,
    #[schema(value_type = f64)]
    pub sets: Number,
    /// Rep scheme as written, e.g. "8-10"
    pub reps: String,
    pub intensity: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Vec<Object>>)]
    pub logs: Option<Vec<Map<String, Value>>>,
}

/// A single training day. Stored workouts additionally carry their `date`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct WorkoutDay {
    pub name: String,
    pub theme: String,
    pub exercises: Vec<Exercise>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct WorkoutSaveRequest {
    #[serde(default)]
    #[schema(value_type = Option<WorkoutDay>)]
    pub workout: Option<Value>,
}

/// Query for the single-day workout routes.
#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct WorkoutQuery {
    /// Calendar day, `YYYY-MM-DD`
    pub date: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ProgramStatus {
    #[default]
    Draft,
    Finalized,
}

/// Unknown week-level fields are dropped on save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ProgramWeek {
    pub title: String,
    pub focus: String,
    pub days: Vec<WorkoutDay>,
}

/// A multi-week training program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Program {
    pub id: String,
    pub status: ProgramStatus,
    pub created_at: String,
    pub updated_at: String,
    pub weeks: Vec<ProgramWeek>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ProgramSaveRequest {
    #[serde(default)]
    #[schema(value_type = Option<Program>)]
    pub program: Option<Value>,
}

/// A logged personal record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PrEntry {
    pub lift: String,
    #[schema(value_type = f64)]
    pub weight: Number,
    #[schema(value_type = f64)]
    pub reps: Number,
    #[schema(value_type = Option<f64>)]
    pub rpe: Option<Number>,
    /// Day recorded, `YYYY-MM-DD`
    pub date: String,
    /// Epley estimate, rounded
    #[serde(rename = "estimated1Rm")]
    pub estimated_1rm: i64,
}

/// Loosely typed; `weight` and `reps` may arrive as numeric text.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct PrRequest {
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub lift: Option<Value>,
    #[serde(default)]
    #[schema(value_type = Option<f64>)]
    pub weight: Option<Value>,
    #[serde(default)]
    #[schema(value_type = Option<f64>)]
    pub reps: Option<Value>,
    #[serde(default)]
    #[schema(value_type = Option<f64>)]
    pub rpe: Option<Value>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AiRequest {
    #[serde(default)]
    pub mode: Option<CompletionMode>,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub program: Option<Value>,
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub workout: Option<Value>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AiResponse {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TodayAdjustRevision {
    pub created_at: String,
    pub prompt: String,
    pub response: String,
}
