// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Environment variable names, defaults, and the [`Config`] loaded from them
//! at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |
//! | `ADMIN_EMAIL_ALLOWLIST` | Comma-separated privileged emails | empty |
//! | `TRUSTED_ISSUERS` | Comma-separated accepted token issuers | any issuer |
//! | `IDENTITY_SERVICE_PATH` | Identity-service path used for key set discovery | `.netlify/identity` |
//! | `KEYSET_CACHE_TTL_SECS` | Key set freshness window | `600` |
//! | `KEYSET_FETCH_TIMEOUT_SECS` | Key set fetch timeout | `10` |
//! | `KEYSET_ALLOW_HTTP` | Allow plain-HTTP key set URLs (development only) | `false` |
//! | `OPENAI_API_KEY` | Completion API key; unset disables `/v1/ai` | unset |
//! | `OPENAI_MODEL` | Completion model | `gpt-4o-mini` |
//! | `COMPLETION_API_URL` | Completion endpoint | `https://api.openai.com/v1/chat/completions` |
//! | `COMPLETION_TIMEOUT_SECS` | Completion timeout | `30` |
//!
//! Malformed numbers and booleans fail startup rather than falling back to
//! the default.

use std::net::SocketAddr;
use std::time::Duration;

use crate::auth::discovery::DEFAULT_IDENTITY_SERVICE_PATH;
use crate::auth::jwks::{DEFAULT_CACHE_TTL, DEFAULT_FETCH_TIMEOUT};
use crate::logging::LogFormat;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Comma-separated emails granted the admin role.
///
/// # Default
/// Empty: nobody is privileged until an operator opts someone in.
pub const ADMIN_EMAIL_ALLOWLIST_ENV: &str = "ADMIN_EMAIL_ALLOWLIST";

/// Comma-separated issuers the gateway accepts. Unset accepts any issuer
/// whose key set can be discovered.
pub const TRUSTED_ISSUERS_ENV: &str = "TRUSTED_ISSUERS";

pub const IDENTITY_SERVICE_PATH_ENV: &str = "IDENTITY_SERVICE_PATH";
pub const KEYSET_CACHE_TTL_ENV: &str = "KEYSET_CACHE_TTL_SECS";
pub const KEYSET_FETCH_TIMEOUT_ENV: &str = "KEYSET_FETCH_TIMEOUT_SECS";

/// Permit `http://` key set URLs.
///
/// # Security
/// Never enable in production: a key set fetched in clear text can be
/// swapped by anyone on the path, and every token it "verifies" is forged.
pub const KEYSET_ALLOW_HTTP_ENV: &str = "KEYSET_ALLOW_HTTP";

pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const OPENAI_MODEL_ENV: &str = "OPENAI_MODEL";
pub const COMPLETION_API_URL_ENV: &str = "COMPLETION_API_URL";
pub const COMPLETION_TIMEOUT_ENV: &str = "COMPLETION_TIMEOUT_SECS";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_COMPLETION_API_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_COMPLETION_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} must be {expected}, got {value:?}")]
    Invalid {
        name: &'static str,
        expected: &'static str,
        value: String,
    },

    #[error("invalid bind address {0}")]
    BindAddress(String),
}

/// Outbound completion settings; present only when an API key is set.
#[derive(Clone)]
pub struct CompletionConfig {
    pub api_key: String,
    pub model: String,
    pub api_url: String,
    pub timeout: Duration,
}

impl std::fmt::Debug for CompletionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("api_url", &self.api_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_format: LogFormat,
    pub admin_emails: Vec<String>,
    pub trusted_issuers: Option<Vec<String>>,
    pub identity_service_path: String,
    pub keyset_cache_ttl: Duration,
    pub keyset_fetch_timeout: Duration,
    pub keyset_allow_http: bool,
    pub completion: Option<CompletionConfig>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let log_format = match var(LOG_FORMAT_ENV).as_deref() {
            None => LogFormat::Pretty,
            Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                name: LOG_FORMAT_ENV,
                expected: "json or pretty",
                value: raw.to_string(),
            })?,
        };

        let completion = var(OPENAI_API_KEY_ENV)
            .map(|api_key| {
                Ok::<_, ConfigError>(CompletionConfig {
                    api_key,
                    model: var(OPENAI_MODEL_ENV).unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
                    api_url: var(COMPLETION_API_URL_ENV)
                        .unwrap_or_else(|| DEFAULT_COMPLETION_API_URL.to_string()),
                    timeout: seconds(COMPLETION_TIMEOUT_ENV, var(COMPLETION_TIMEOUT_ENV))?
                        .unwrap_or(DEFAULT_COMPLETION_TIMEOUT),
                })
            })
            .transpose()?;

        Ok(Self {
            host: var(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: match var(PORT_ENV) {
                None => DEFAULT_PORT,
                Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                    name: PORT_ENV,
                    expected: "a port number",
                    value: raw,
                })?,
            },
            log_format,
            admin_emails: var(ADMIN_EMAIL_ALLOWLIST_ENV)
                .map(|raw| csv(&raw))
                .unwrap_or_default(),
            trusted_issuers: var(TRUSTED_ISSUERS_ENV)
                .map(|raw| csv(&raw))
                .filter(|list| !list.is_empty()),
            identity_service_path: var(IDENTITY_SERVICE_PATH_ENV)
                .unwrap_or_else(|| DEFAULT_IDENTITY_SERVICE_PATH.to_string()),
            keyset_cache_ttl: seconds(KEYSET_CACHE_TTL_ENV, var(KEYSET_CACHE_TTL_ENV))?
                .unwrap_or(DEFAULT_CACHE_TTL),
            keyset_fetch_timeout: seconds(KEYSET_FETCH_TIMEOUT_ENV, var(KEYSET_FETCH_TIMEOUT_ENV))?
                .unwrap_or(DEFAULT_FETCH_TIMEOUT),
            keyset_allow_http: flag(KEYSET_ALLOW_HTTP_ENV, var(KEYSET_ALLOW_HTTP_ENV))?,
            completion,
        })
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr = format!("{}:{}", self.host, self.port);
        addr.parse().map_err(|_| ConfigError::BindAddress(addr))
    }
}

fn csv(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn seconds(name: &'static str, raw: Option<String>) -> Result<Option<Duration>, ConfigError> {
    raw.map(|raw| match raw.parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(ConfigError::Invalid {
            name,
            expected: "a positive number of seconds",
            value: raw,
        }),
    })
    .transpose()
}

fn flag(name: &'static str, raw: Option<String>) -> Result<bool, ConfigError> {
    match raw.as_deref().map(str::to_ascii_lowercase).as_deref() {
        None | Some("0") | Some("false") | Some("no") => Ok(false),
        Some("1") | Some("true") | Some("yes") => Ok(true),
        Some(_) => Err(ConfigError::Invalid {
            name,
            expected: "a boolean",
            value: raw.unwrap_or_default(),
        }),
    }
}
