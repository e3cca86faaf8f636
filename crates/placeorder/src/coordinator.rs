//! Command handler for place-order sagas.
//!
//! Loads the caller's context, drives the process until it suspends and
//! persists after every step.

use std::time::Instant;

use common::SagaId;
use context_store::{ContextStore, StoreOptions, StoredContext, Version};

use crate::commands::{PlaceOrderStatus, StartPlaceOrder};
use crate::error::{PlaceOrderError, Result};
use crate::factory::ProcessFactory;
use crate::locks::KeyLocks;
use crate::process::Process;
use crate::process::context::{Context, FailedReason};
use crate::states::Success;

/// Engine-side limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinatorConfig {
    /// Steps a single command may run before it must reach a blocking or
    /// final state.
    pub max_transitions: usize,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            max_transitions: 32,
        }
    }
}

/// Runs the Start, Refresh and Cancel commands against a context store.
///
/// Sagas are keyed by a caller key such as a session id. Commands that
/// change a saga hold a per-key lock for their whole run, so a step or a
/// rollback never executes twice because two requests arrived together.
/// Writes still carry the version read at load time; a second coordinator
/// sharing the store gets a `ConcurrencyConflict` instead of overwriting.
pub struct PlaceOrderCoordinator<S: ContextStore> {
    store: S,
    factory: ProcessFactory,
    config: CoordinatorConfig,
    locks: KeyLocks,
}

impl<S: ContextStore> PlaceOrderCoordinator<S> {
    pub fn new(store: S, factory: ProcessFactory) -> Self {
        Self::with_config(store, factory, CoordinatorConfig::default())
    }

    pub fn with_config(store: S, factory: ProcessFactory, config: CoordinatorConfig) -> Self {
        Self {
            store,
            factory,
            config,
            locks: KeyLocks::default(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> CoordinatorConfig {
        self.config
    }

    /// Starts a saga for `key` and runs it until it suspends.
    ///
    /// Rejected while the key has an unfinished saga. A finished one is
    /// replaced.
    #[tracing::instrument(skip(self, command), fields(cart_id = %command.cart.id))]
    pub async fn start(&self, key: &str, command: StartPlaceOrder) -> Result<SagaId> {
        let _guard = self.locks.acquire(key).await;
        let expected = match self.store.get(key).await? {
            Some(record) => {
                let version = record.version;
                let existing = self.factory.restore(record.into_context()?);
                if !existing.is_final() {
                    return Err(PlaceOrderError::ProcessAlreadyRunning);
                }
                version
            }
            None => Version::initial(),
        };

        let mut process = self
            .factory
            .new_process(command.cart, &command.return_address)?;
        let saga_id = process.context().id();

        let version = self.persist(key, &process, expected).await?;
        metrics::counter!("placeorder_started_total").increment(1);
        tracing::info!(%saga_id, "place order started");

        self.drive(key, &mut process, version).await?;
        Ok(saga_id)
    }

    /// Resumes the saga stored under `key`. No-op on a final saga.
    #[tracing::instrument(skip(self))]
    pub async fn refresh(&self, key: &str) -> Result<PlaceOrderStatus> {
        let started = Instant::now();
        let _guard = self.locks.acquire(key).await;
        let (mut process, version) = self.load(key).await?;

        if !process.is_final() {
            self.drive(key, &mut process, version).await?;
        }

        metrics::histogram!("placeorder_refresh_duration_seconds")
            .record(started.elapsed().as_secs_f64());
        Ok(PlaceOrderStatus::from(process.context()))
    }

    /// Cancels the saga under `key`, undoing every completed step.
    ///
    /// No-op on a final saga. The Failed state is persisted before any
    /// compensation failure is returned.
    #[tracing::instrument(skip(self))]
    pub async fn cancel(&self, key: &str) -> Result<PlaceOrderStatus> {
        let _guard = self.locks.acquire(key).await;
        let (mut process, version) = self.load(key).await?;
        if process.is_final() {
            return Ok(PlaceOrderStatus::from(process.context()));
        }

        let compensation = process.fail(FailedReason::Canceled).await;
        self.persist(key, &process, version).await?;
        metrics::counter!("placeorder_failed_total").increment(1);
        tracing::info!(saga_id = %process.context().id(), "place order canceled");

        if let Err(e) = compensation {
            metrics::counter!("placeorder_compensation_failures_total")
                .increment(e.failures.len() as u64);
            return Err(e.into());
        }
        Ok(PlaceOrderStatus::from(process.context()))
    }

    /// Reports the saga under `key` without running it.
    pub async fn current(&self, key: &str) -> Result<PlaceOrderStatus> {
        let (process, _) = self.load(key).await?;
        Ok(PlaceOrderStatus::from(process.context()))
    }

    /// Returns the stored context under `key`, if any.
    pub async fn context(&self, key: &str) -> Result<Option<Context>> {
        match self.store.get(key).await? {
            Some(record) => Ok(Some(record.into_context()?)),
            None => Ok(None),
        }
    }

    /// True when `key` has a saga that has not reached Success or Failed.
    pub async fn has_unfinished(&self, key: &str) -> Result<bool> {
        match self.context(key).await? {
            Some(context) => Ok(!self.factory.restore(context).is_final()),
            None => Ok(false),
        }
    }

    /// Deletes the saga under `key`. Completed steps are not undone.
    #[tracing::instrument(skip(self))]
    pub async fn clear(&self, key: &str) -> Result<()> {
        let _guard = self.locks.acquire(key).await;
        self.store.delete(key).await?;
        Ok(())
    }

    async fn load(&self, key: &str) -> Result<(Process, Version)> {
        let record = self
            .store
            .get(key)
            .await?
            .ok_or(PlaceOrderError::NoPlaceOrderProcess)?;
        let version = record.version;
        let context: Context = record.into_context()?;
        Ok((self.factory.restore(context), version))
    }

    async fn persist(&self, key: &str, process: &Process, expected: Version) -> Result<Version> {
        let context = process.context();
        let record =
            StoredContext::from_context(context.id(), context.current_state_name(), context)?;
        let version = self
            .store
            .store(key, record, StoreOptions::expect_version(expected))
            .await?;
        Ok(version)
    }

    /// Runs states until the saga suspends, persisting after each one.
    ///
    /// A failing step moves the saga to Failed and compensates. Rollback
    /// failures on this path are logged; the step failure is what the caller
    /// sees in the status.
    async fn drive(&self, key: &str, process: &mut Process, mut version: Version) -> Result<()> {
        let saga_id = process.context().id();
        let mut transitions = 0;

        while !process.is_final() {
            if transitions == self.config.max_transitions {
                tracing::error!(%saga_id, limit = transitions, "transition limit exceeded");
                return Err(PlaceOrderError::TransitionLimitExceeded {
                    saga_id,
                    limit: self.config.max_transitions,
                });
            }
            transitions += 1;

            let failed = process.run().await;
            version = self.persist(key, process, version).await?;

            if let Some(reason) = failed {
                if let Err(e) = process.fail(reason).await {
                    tracing::warn!(%saga_id, error = %e, "compensation incomplete");
                    metrics::counter!("placeorder_compensation_failures_total")
                        .increment(e.failures.len() as u64);
                }
                self.persist(key, process, version).await?;
                metrics::counter!("placeorder_failed_total").increment(1);
                return Ok(());
            }

            if process.is_suspended() {
                break;
            }
        }

        if process.context().current_state_name() == Success::NAME {
            metrics::counter!("placeorder_completed_total").increment(1);
            tracing::info!(%saga_id, "place order completed");
        }
        Ok(())
    }
}

impl<S: ContextStore> std::fmt::Debug for PlaceOrderCoordinator<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaceOrderCoordinator")
            .field("factory", &self.factory)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
