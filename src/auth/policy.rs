// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Flat allowlist authorization on top of a verified identity.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::identity::Identity;

/// Role derived from the access policy.
///
/// - `Admin` - email on the privileged allowlist; may read every client's data
/// - `User` - any other verified caller; may only touch their own data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

impl Default for Role {
    /// Least privilege for authenticated callers.
    fn default() -> Self {
        Role::User
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Admin => write!(f, "admin"),
            Role::User => write!(f, "user"),
        }
    }
}

/// Statically configured allowlist of privileged emails.
///
/// Emails are compared trimmed and case-insensitively. An empty allowlist
/// privileges nobody.
#[derive(Debug, Clone, Default)]
pub struct AccessPolicy {
    admin_emails: HashSet<String>,
}

impl AccessPolicy {
    pub fn new<I, S>(emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            admin_emails: emails
                .into_iter()
                .map(|e| e.as_ref().trim().to_lowercase())
                .filter(|e| !e.is_empty())
                .collect(),
        }
    }

    /// Parse a comma-separated allowlist.
    pub fn from_csv(csv: &str) -> Self {
        Self::new(csv.split(','))
    }

    /// Pure check; no I/O.
    pub fn is_privileged(&self, identity: &Identity) -> bool {
        identity
            .email()
            .map(|email| self.admin_emails.contains(&email.trim().to_lowercase()))
            .unwrap_or(false)
    }

    pub fn role_for(&self, identity: &Identity) -> Role {
        if self.is_privileged(identity) {
            Role::Admin
        } else {
            Role::User
        }
    }

    pub fn len(&self) -> usize {
        self.admin_emails.len()
    }

    pub fn is_empty(&self) -> bool {
        self.admin_emails.is_empty()
    }
}
