use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::{
    ContextStoreError, Result, StoredContext, Version,
    store::{ContextStore, StoreOptions},
};

/// In-memory context store.
///
/// Provides the same interface and version semantics as the PostgreSQL
/// implementation. Clones share the same underlying map.
#[derive(Clone, Default)]
pub struct InMemoryContextStore {
    contexts: Arc<RwLock<HashMap<String, StoredContext>>>,
}

impl InMemoryContextStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored contexts.
    pub async fn len(&self) -> usize {
        self.contexts.read().await.len()
    }

    /// Returns true if nothing is stored.
    pub async fn is_empty(&self) -> bool {
        self.contexts.read().await.is_empty()
    }
}

#[async_trait]
impl ContextStore for InMemoryContextStore {
    async fn store(
        &self,
        key: &str,
        mut context: StoredContext,
        options: StoreOptions,
    ) -> Result<Version> {
        let mut contexts = self.contexts.write().await;

        let current_version = contexts
            .get(key)
            .map(|c| c.version)
            .unwrap_or(Version::initial());

        if let Some(expected) = options.expected_version
            && current_version != expected
        {
            metrics::counter!("context_store_conflicts_total").increment(1);
            return Err(ContextStoreError::ConcurrencyConflict {
                key: key.to_string(),
                expected,
                actual: current_version,
            });
        }

        let new_version = current_version.next();
        context.version = new_version;
        context.updated_at = Utc::now();
        contexts.insert(key.to_string(), context);

        Ok(new_version)
    }

    async fn get(&self, key: &str) -> Result<Option<StoredContext>> {
        Ok(self.contexts.read().await.get(key).cloned())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.contexts.write().await.remove(key);
        Ok(())
    }
}
