// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Issuer to key set resolution.
//!
//! An issuer does not say where its key set lives. Two layouts are common:
//!
//! 1. `iss = https://<site>/<identity path>`, keys at `<iss>/.well-known/jwks.json`
//! 2. `iss = https://<site>`, keys at `<site>/<identity path>/.well-known/jwks.json`
//!
//! [`IssuerKeySetResolver::candidate_urls`] lists the places to look, in the
//! order they are tried. Resolution stops at the first candidate that
//! fetches and parses.

use std::sync::Arc;

use serde_json::json;

use super::error::{AuthFailure, ReasonCode};
use super::jwks::{KeySetDocument, KeySetProvider};

/// Discovery document location relative to an issuer root.
pub const DISCOVERY_PATH: &str = ".well-known/jwks.json";

/// Identity-service path of the hosting platform.
pub const DEFAULT_IDENTITY_SERVICE_PATH: &str = ".netlify/identity";

pub struct IssuerKeySetResolver {
    provider: Arc<dyn KeySetProvider>,
    identity_service_path: String,
}

impl IssuerKeySetResolver {
    pub fn new(provider: Arc<dyn KeySetProvider>, identity_service_path: impl Into<String>) -> Self {
        Self {
            provider,
            identity_service_path: identity_service_path.into().trim_matches('/').to_string(),
        }
    }

    /// Candidate discovery URLs for `issuer`, first to try first.
    ///
    /// Trailing slashes on the issuer are ignored. Yields one or two URLs:
    /// the direct path always, then the identity-service path rooted at the
    /// site. When the issuer already is the identity-service path both
    /// forms coincide and only one URL is returned.
    pub fn candidate_urls(&self, issuer: &str) -> Vec<String> {
        let issuer = issuer.trim_end_matches('/');
        let suffix = &self.identity_service_path;

        let mut candidates = vec![format!("{issuer}/{DISCOVERY_PATH}")];

        let site_root = issuer
            .strip_suffix(suffix.as_str())
            .and_then(|rest| rest.strip_suffix('/'))
            .unwrap_or(issuer);
        let fallback = format!("{site_root}/{suffix}/{DISCOVERY_PATH}");

        if !candidates.contains(&fallback) {
            candidates.push(fallback);
        }
        candidates
    }

    /// Fetch the issuer's key set through the cache.
    ///
    /// Every candidate failing is `KEYSET_FETCH_FAILED` carrying the issuer;
    /// the per-candidate errors are logged, not returned.
    pub async fn resolve(&self, issuer: &str) -> Result<Arc<KeySetDocument>, AuthFailure> {
        let mut last_error = None;

        for url in self.candidate_urls(issuer) {
            match self.provider.get_or_fetch(&url).await {
                Ok(document) => return Ok(document),
                Err(e) => {
                    tracing::warn!(url = %url, error = %e, "key set candidate failed");
                    last_error = Some(e);
                }
            }
        }

        let message = match last_error {
            Some(e) => format!("key set fetch failed: {e}"),
            None => "key set fetch failed".to_string(),
        };
        Err(AuthFailure::new(ReasonCode::KeysetFetchFailed, message)
            .with_detail(json!({ "issuer": issuer.trim_end_matches('/') })))
    }
}
