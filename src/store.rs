// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Namespaced key-value persistence.
//!
//! Handlers never see the backend directly. They get a [`ScopedStore`] bound
//! to one namespace: `user:<subject id>` for a caller's own documents, or
//! `global` for shared rosters such as the client list and audit log.
//!
//! The only backend shipped is [`InMemoryKvStore`] (process lifetime).
//! Concurrent writes to the same key resolve last-write-wins.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::RwLock;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("stored value for {key} has unexpected shape: {source}")]
    Shape {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Storage namespace.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Namespace(String);

impl Namespace {
    pub fn user(subject_id: &str) -> Self {
        Self(format!("user:{subject_id}"))
    }

    pub fn global() -> Self {
        Self("global".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Namespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Backend interface, keyed by namespace and key.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, ns: &Namespace, key: &str) -> Result<Option<Value>, StoreError>;

    async fn set(&self, ns: &Namespace, key: &str, value: Value) -> Result<(), StoreError>;

    async fn delete(&self, ns: &Namespace, key: &str) -> Result<(), StoreError>;

    /// Keys in `ns` starting with `prefix`, ascending.
    async fn list(&self, ns: &Namespace, prefix: &str) -> Result<Vec<String>, StoreError>;

    /// Cheap liveness probe for the health endpoint.
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// A store bound to one namespace.
#[derive(Clone)]
pub struct ScopedStore {
    backend: Arc<dyn KvStore>,
    namespace: Namespace,
}

impl ScopedStore {
    pub fn new(backend: Arc<dyn KvStore>, namespace: Namespace) -> Self {
        Self { backend, namespace }
    }

    pub fn user(backend: Arc<dyn KvStore>, subject_id: &str) -> Self {
        Self::new(backend, Namespace::user(subject_id))
    }

    pub fn global(backend: Arc<dyn KvStore>) -> Self {
        Self::new(backend, Namespace::global())
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    pub async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        self.backend.get(&self.namespace, key).await
    }

    /// Typed read. A stored value that does not deserialize is an error, not
    /// `None`.
    pub async fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        match self.get(key).await? {
            None | Some(Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|source| StoreError::Shape {
                    key: key.to_string(),
                    source,
                }),
        }
    }

    pub async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        self.backend.set(&self.namespace, key, value).await
    }

    pub async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.backend.delete(&self.namespace, key).await
    }

    pub async fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        self.backend.list(&self.namespace, prefix).await
    }
}

/// Process-lifetime store.
#[derive(Default)]
pub struct InMemoryKvStore {
    entries: RwLock<BTreeMap<(Namespace, String), Value>>,
}

impl InMemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for InMemoryKvStore {
    async fn get(&self, ns: &Namespace, key: &str) -> Result<Option<Value>, StoreError> {
        let entries = self.entries.read().await;
        Ok(entries.get(&(ns.clone(), key.to_string())).cloned())
    }

    async fn set(&self, ns: &Namespace, key: &str, value: Value) -> Result<(), StoreError> {
        self.entries
            .write()
            .await
            .insert((ns.clone(), key.to_string()), value);
        Ok(())
    }

    async fn delete(&self, ns: &Namespace, key: &str) -> Result<(), StoreError> {
        self.entries
            .write()
            .await
            .remove(&(ns.clone(), key.to_string()));
        Ok(())
    }

    async fn list(&self, ns: &Namespace, prefix: &str) -> Result<Vec<String>, StoreError> {
        let entries = self.entries.read().await;
        Ok(entries
            .range((ns.clone(), prefix.to_string())..)
            .take_while(|((entry_ns, key), _)| entry_ns == ns && key.starts_with(prefix))
            .map(|((_, key), _)| key.clone())
            .collect())
    }
}
