// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Trust Gateway - Bearer Token Verification Service
//!
//! This crate verifies third-party-issued RS256 bearer tokens without a
//! session store and serves a small coaching API behind them. Every response
//! carries a trace id, and every failure uses one JSON envelope.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Token verification, key set discovery and caching, access policy
//! - `envelope` - Trace ids, request span, error envelope and panic boundary
//! - `store` - Namespaced key-value persistence
//! - `providers` - Outbound completion service client

pub mod api;
pub mod auth;
pub mod config;
pub mod envelope;
pub mod error;
pub mod logging;
pub mod models;
pub mod providers;
pub mod state;
pub mod store;

#[cfg(test)]
pub(crate) mod test_support;
