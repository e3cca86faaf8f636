use async_trait::async_trait;

use crate::{Result, StoredContext, Version};

/// Options for storing a context.
#[derive(Debug, Clone, Default)]
pub struct StoreOptions {
    /// Version the caller read the context at.
    /// If None, the write is unconditional (use with caution).
    pub expected_version: Option<Version>,
}

impl StoreOptions {
    /// Creates options with no version check.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates options expecting the stored context to be at a specific version.
    pub fn expect_version(version: Version) -> Self {
        Self {
            expected_version: Some(version),
        }
    }

    /// Creates options expecting no context to be stored under the key yet.
    pub fn expect_new() -> Self {
        Self {
            expected_version: Some(Version::initial()),
        }
    }
}

/// Persistence port for saga contexts.
///
/// Implementations must give back exactly the payload that was stored.
/// Together with `StoreOptions::expect_version` this is what keeps two
/// concurrent commands for the same key from interleaving their writes.
#[async_trait]
pub trait ContextStore: Send + Sync {
    /// Stores a context under `key`, replacing any previous one.
    ///
    /// Fails with `ConcurrencyConflict` if `options.expected_version` is set
    /// and does not match. Returns the new version.
    async fn store(&self, key: &str, context: StoredContext, options: StoreOptions)
    -> Result<Version>;

    /// Loads the context stored under `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<StoredContext>>;

    /// Removes the context stored under `key`. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;
}

#[async_trait]
impl<T: ContextStore + ?Sized> ContextStore for std::sync::Arc<T> {
    async fn store(
        &self,
        key: &str,
        context: StoredContext,
        options: StoreOptions,
    ) -> Result<Version> {
        (**self).store(key, context, options).await
    }

    async fn get(&self, key: &str) -> Result<Option<StoredContext>> {
        (**self).get(key).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        (**self).delete(key).await
    }
}
