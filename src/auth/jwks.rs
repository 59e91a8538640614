// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Key set (JWKS) documents, fetching and caching.
//!
//! ## Security
//!
//! - Key sets are fetched via HTTPS only, unless plain HTTP is explicitly
//!   allowed for local development
//! - Every fetch is bounded by the client timeout
//! - A fetched document is untrusted until a signature verifies against it
//!
//! ## Caching
//!
//! [`KeySetCache`] keeps one entry per resolved URL for a freshness window
//! (10 minutes by default). The lock is only held to read or replace an
//! entry, never across a fetch, so concurrent misses for the same URL each
//! fetch and the last one to finish wins. A failed refetch leaves the old
//! entry in place but does not serve it; the failure is returned.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tokio::time::Instant;
use utoipa::ToSchema;

/// Default key set freshness window (10 minutes).
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(600);

/// Default bound on a single key set fetch.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// A published set of issuer public keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeySetDocument {
    #[serde(default)]
    pub keys: Vec<KeyRecord>,
}

/// One key in a key set. Only the RSA fields are read.
///
/// Kept looser than `jsonwebtoken::jwk::Jwk` so that a set mixing key types,
/// or carrying empty fields, still parses and the unusable record surfaces
/// as `KEY_INVALID` only if it is the one selected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeyRecord {
    #[serde(default)]
    pub kid: Option<String>,
    #[serde(default)]
    pub kty: Option<String>,
    #[serde(default)]
    pub alg: Option<String>,
    /// RSA modulus, base64url
    #[serde(default)]
    pub n: Option<String>,
    /// RSA public exponent, base64url
    #[serde(default)]
    pub e: Option<String>,
}

impl KeySetDocument {
    /// Record whose `kid` matches exactly.
    pub fn find(&self, kid: &str) -> Option<&KeyRecord> {
        self.keys.iter().find(|k| k.kid.as_deref() == Some(kid))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum KeySetError {
    #[error("timed out fetching {url}")]
    Timeout { url: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("HTTP {0} from key set endpoint")]
    Status(u16),

    #[error("invalid key set document: {0}")]
    Parse(String),

    #[error("refusing non-HTTPS key set URL {0}")]
    InsecureUrl(String),
}

/// Fetches a key set document from a URL. No caching.
#[async_trait]
pub trait KeySetFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<KeySetDocument, KeySetError>;
}

/// Cache-aware source of key set documents.
///
/// The gateway depends on this rather than on [`KeySetCache`] directly so
/// the cache can be swapped out or mocked.
#[async_trait]
pub trait KeySetProvider: Send + Sync {
    async fn get_or_fetch(&self, url: &str) -> Result<Arc<KeySetDocument>, KeySetError>;
}

/// HTTP key set fetcher backed by a shared `reqwest` client.
#[derive(Clone)]
pub struct HttpKeySetFetcher {
    client: reqwest::Client,
    allow_insecure_http: bool,
}

impl HttpKeySetFetcher {
    pub fn new(timeout: Duration) -> Result<Self, KeySetError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| KeySetError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            allow_insecure_http: false,
        })
    }

    /// Permit `http://` URLs. Local development only.
    pub fn allow_insecure_http(mut self, allow: bool) -> Self {
        self.allow_insecure_http = allow;
        self
    }

    fn check_scheme(&self, url: &str) -> Result<(), KeySetError> {
        if url.starts_with("https://") || (self.allow_insecure_http && url.starts_with("http://"))
        {
            Ok(())
        } else {
            Err(KeySetError::InsecureUrl(url.to_string()))
        }
    }
}

#[async_trait]
impl KeySetFetcher for HttpKeySetFetcher {
    async fn fetch(&self, url: &str) -> Result<KeySetDocument, KeySetError> {
        self.check_scheme(url)?;

        let classify = |e: reqwest::Error| {
            if e.is_timeout() {
                KeySetError::Timeout {
                    url: url.to_string(),
                }
            } else {
                KeySetError::Transport(e.to_string())
            }
        };

        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(classify)?;

        if !response.status().is_success() {
            return Err(KeySetError::Status(response.status().as_u16()));
        }

        let body = response.bytes().await.map_err(classify)?;
        serde_json::from_slice(&body).map_err(|e| KeySetError::Parse(e.to_string()))
    }
}

struct CacheEntry {
    document: Arc<KeySetDocument>,
    fetched_at: Instant,
}

/// Cache occupancy, reported by the health endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct CacheStatus {
    pub entries: usize,
    pub fresh: usize,
}

/// Process-wide key set cache keyed by resolved URL.
pub struct KeySetCache {
    fetcher: Arc<dyn KeySetFetcher>,
    ttl: Duration,
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl KeySetCache {
    pub fn new(fetcher: Arc<dyn KeySetFetcher>) -> Self {
        Self {
            fetcher,
            ttl: DEFAULT_CACHE_TTL,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Create with custom freshness window.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Count of cached URLs and how many are still within the window.
    pub async fn status(&self) -> CacheStatus {
        let entries = self.entries.read().await;
        CacheStatus {
            entries: entries.len(),
            fresh: entries
                .values()
                .filter(|entry| entry.fetched_at.elapsed() < self.ttl)
                .count(),
        }
    }

    async fn fresh(&self, url: &str) -> Option<Arc<KeySetDocument>> {
        let entries = self.entries.read().await;
        entries
            .get(url)
            .filter(|entry| entry.fetched_at.elapsed() < self.ttl)
            .map(|entry| Arc::clone(&entry.document))
    }
}

#[async_trait]
impl KeySetProvider for KeySetCache {
    async fn get_or_fetch(&self, url: &str) -> Result<Arc<KeySetDocument>, KeySetError> {
        if let Some(document) = self.fresh(url).await {
            tracing::debug!(url, "key set cache hit");
            return Ok(document);
        }

        let document = match self.fetcher.fetch(url).await {
            Ok(document) => Arc::new(document),
            Err(e) => {
                if self.entries.read().await.contains_key(url) {
                    tracing::warn!(url, error = %e, "key set refetch failed; stale entry not served");
                }
                return Err(e);
            }
        };

        tracing::info!(url, keys = document.keys.len(), "key set fetched");

        self.entries.write().await.insert(
            url.to_string(),
            CacheEntry {
                document: Arc::clone(&document),
                fetched_at: Instant::now(),
            },
        );

        Ok(document)
    }
}
