// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Verified caller identity.

use std::fmt;

/// A caller whose bearer token verified.
///
/// Only [`TrustGateway`](super::gateway::TrustGateway) constructs this, after
/// the signature check succeeds. It lives for one request and is never
/// persisted.
#[derive(Clone, PartialEq, Eq)]
pub struct Identity {
    subject_id: String,
    email: Option<String>,
    raw_token: String,
}

impl Identity {
    pub(in crate::auth) fn new(subject_id: String, email: Option<String>, raw_token: String) -> Self {
        Self {
            subject_id,
            email,
            raw_token,
        }
    }

    /// The token's `sub` claim; the canonical user id.
    pub fn subject_id(&self) -> &str {
        &self.subject_id
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    /// The bearer token as presented, for forwarding to downstream services.
    pub fn raw_token(&self) -> &str {
        &self.raw_token
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("subject_id", &self.subject_id)
            .field("email", &self.email)
            .field("raw_token", &"<redacted>")
            .finish()
    }
}
