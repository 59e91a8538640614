// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::auth::discovery::IssuerKeySetResolver;
use crate::auth::jwks::{HttpKeySetFetcher, KeySetCache, KeySetError};
use crate::auth::{AccessPolicy, TrustGateway};
use crate::config::Config;
use crate::providers::{CompletionClient, CompletionError};
use crate::store::{InMemoryKvStore, KvStore};

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error(transparent)]
    KeySet(#[from] KeySetError),

    #[error(transparent)]
    Completion(#[from] CompletionError),
}

#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<TrustGateway>,
    /// Same cache the gateway resolves through; held for health reporting.
    pub key_sets: Arc<KeySetCache>,
    pub policy: Arc<AccessPolicy>,
    pub store: Arc<dyn KvStore>,
    /// `None` when no completion API key is configured.
    pub completion: Option<Arc<CompletionClient>>,
}

impl AppState {
    pub fn new(gateway: TrustGateway, key_sets: Arc<KeySetCache>, store: Arc<dyn KvStore>) -> Self {
        Self {
            gateway: Arc::new(gateway),
            key_sets,
            policy: Arc::new(AccessPolicy::default()),
            store,
            completion: None,
        }
    }

    pub fn with_policy(mut self, policy: AccessPolicy) -> Self {
        self.policy = Arc::new(policy);
        self
    }

    pub fn with_completion(mut self, client: CompletionClient) -> Self {
        self.completion = Some(Arc::new(client));
        self
    }

    /// Production wiring: HTTP key set fetcher behind the cache, in-memory
    /// store, optional completion client.
    pub fn from_config(config: &Config) -> Result<Self, StateError> {
        let fetcher = HttpKeySetFetcher::new(config.keyset_fetch_timeout)?
            .allow_insecure_http(config.keyset_allow_http);
        let key_sets =
            Arc::new(KeySetCache::new(Arc::new(fetcher)).with_ttl(config.keyset_cache_ttl));
        let resolver = IssuerKeySetResolver::new(key_sets.clone(), &config.identity_service_path);

        let mut gateway = TrustGateway::new(resolver);
        if let Some(issuers) = &config.trusted_issuers {
            gateway = gateway.with_trusted_issuers(issuers);
        }

        let mut state = Self::new(gateway, key_sets, Arc::new(InMemoryKvStore::new()))
            .with_policy(AccessPolicy::new(&config.admin_emails));

        if let Some(completion) = &config.completion {
            state = state.with_completion(CompletionClient::new(completion)?);
        }

        Ok(state)
    }
}
