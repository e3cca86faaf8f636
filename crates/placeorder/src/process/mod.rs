//! The saga engine: a context plus the states that may act on it.

pub mod context;
pub mod registry;
pub mod state;

use std::sync::Arc;

use domain::PlaceOrderInfo;

use crate::error::{CompensationError, CompensationFailure, RollbackError};
use context::{Context, FailedReason, RollbackReference, StateData};
use registry::StateRegistry;
use state::State;

/// Owns one saga context and is the only way to change it.
pub struct Process {
    context: Context,
    registry: Arc<StateRegistry>,
}

impl Process {
    /// Wraps a context, new or reloaded from the store.
    pub fn new(context: Context, registry: Arc<StateRegistry>) -> Self {
        Self { context, registry }
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn into_context(self) -> Context {
        self.context
    }

    pub fn registry(&self) -> &Arc<StateRegistry> {
        &self.registry
    }

    /// Returns the state owning control, if it is registered.
    pub fn current_state(&self) -> Option<Arc<dyn State>> {
        self.registry.get(self.context.current_state_name())
    }

    /// True once the saga is in Success or Failed.
    pub fn is_final(&self) -> bool {
        self.current_state().is_some_and(|s| s.is_final())
    }

    /// True when the driving loop has to hand control back to the caller.
    pub fn is_suspended(&self) -> bool {
        self.current_state()
            .is_some_and(|s| s.is_final() || s.is_blocking())
    }

    /// Moves the saga to `name`. Called by states from within `run`.
    ///
    /// Ignored once the saga is final.
    pub fn update_state(&mut self, name: &str, data: StateData) {
        if self.is_final() {
            tracing::warn!(
                saga_id = %self.context.id(),
                current = self.context.current_state_name(),
                requested = name,
                "ignoring transition out of final state"
            );
            return;
        }
        tracing::debug!(
            saga_id = %self.context.id(),
            from = self.context.current_state_name(),
            to = name,
            "state transition"
        );
        self.context.set_state(name, data);
    }

    /// Records the placed order. Ignored once the saga is final.
    pub fn update_order_info(&mut self, info: PlaceOrderInfo) {
        if self.is_final() {
            tracing::warn!(saga_id = %self.context.id(), "ignoring order info on final saga");
            return;
        }
        self.context.set_order_info(info);
    }

    /// Runs the current state once.
    ///
    /// Appends any rollback data the state returned and hands back its
    /// failure reason, if any. The caller decides whether to call `fail`.
    #[tracing::instrument(
        skip(self),
        fields(saga_id = %self.context.id(), state = %self.context.current_state_name())
    )]
    pub async fn run(&mut self) -> Option<FailedReason> {
        let Some(state) = self.current_state() else {
            let name = self.context.current_state_name().to_string();
            tracing::warn!(state = %name, "current state is not registered");
            return Some(FailedReason::error_occurred(format!(
                "state '{}' is not registered",
                name
            )));
        };

        if state.is_final() {
            return None;
        }

        metrics::counter!("placeorder_state_runs_total", "state" => state.name()).increment(1);
        let result = state.run(self).await;

        if let Some(data) = result.rollback_data {
            self.context.push_rollback(RollbackReference {
                state_name: state.name().to_string(),
                data,
            });
        }

        if let Some(reason) = &result.failed {
            tracing::info!(reason = %reason, "state failed");
        }

        result.failed
    }

    /// Moves the saga to Failed and compensates every recorded step.
    ///
    /// No-op on a final saga. Every rollback reference is attempted in
    /// reverse order, even after a failure; all failures are returned
    /// together.
    #[tracing::instrument(skip(self), fields(saga_id = %self.context.id()))]
    pub async fn fail(&mut self, reason: FailedReason) -> Result<(), CompensationError> {
        if self.is_final() {
            return Ok(());
        }

        tracing::info!(
            from = self.context.current_state_name(),
            reason = %reason,
            "saga failed"
        );
        let failed_state = self.registry.failed_state();
        self.context.set_state(failed_state, StateData::None);
        self.context.set_failed_reason(reason);

        self.compensate().await
    }

    async fn compensate(&self) -> Result<(), CompensationError> {
        let mut failures = Vec::new();

        for reference in self.context.rollback_references().iter().rev() {
            let result = match self.registry.get(&reference.state_name) {
                Some(state) => state.rollback(&reference.data).await,
                None => Err(RollbackError::UnknownState(reference.state_name.clone())),
            };

            if let Err(error) = result {
                tracing::warn!(
                    state = %reference.state_name,
                    error = %error,
                    "rollback step failed"
                );
                failures.push(CompensationFailure {
                    state_name: reference.state_name.clone(),
                    error,
                });
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(CompensationError { failures })
        }
    }
}

impl std::fmt::Debug for Process {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Process")
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use common::SagaId;
    use domain::{Cart, CartItem, Money};
    use url::Url;

    use super::*;
    use crate::process::context::RollbackData;
    use crate::process::state::RunResult;
    use crate::states::{Failed, Success};

    type Log = Arc<Mutex<Vec<String>>>;

    /// Advances to `next` and records a rollback reference carrying its own name.
    struct Step {
        name: &'static str,
        next: &'static str,
        blocking: bool,
        fail_run: bool,
        fail_rollback: bool,
        log: Log,
    }

    impl Step {
        fn new(name: &'static str, next: &'static str, log: &Log) -> Self {
            Self {
                name,
                next,
                blocking: false,
                fail_run: false,
                fail_rollback: false,
                log: log.clone(),
            }
        }
    }

    #[async_trait]
    impl State for Step {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn run(&self, process: &mut Process) -> RunResult {
            if self.fail_run {
                return RunResult::failed(FailedReason::error_occurred("boom"));
            }
            process.update_state(self.next, StateData::None);
            RunResult::with_rollback(RollbackData::CreatePayment {
                gateway: "test".to_string(),
                payment_id: self.name.to_string(),
            })
        }

        async fn rollback(&self, data: &RollbackData) -> Result<(), RollbackError> {
            if let RollbackData::CreatePayment { payment_id, .. } = data {
                self.log.lock().unwrap().push(payment_id.clone());
            }
            if self.fail_rollback {
                return Err(RollbackError::UnknownState(self.name.to_string()));
            }
            Ok(())
        }

        fn is_final(&self) -> bool {
            false
        }

        fn is_blocking(&self) -> bool {
            self.blocking
        }
    }

    fn process_with(steps: Vec<Step>) -> Process {
        let mut builder = StateRegistry::builder();
        let start = steps[0].name;
        for step in steps {
            builder = builder.register(step);
        }
        let registry = builder
            .register(Success)
            .register(Failed)
            .start_state(start)
            .failed_state(Failed::NAME)
            .build()
            .unwrap();

        let cart =
            Cart::new("cart-1").with_item(CartItem::new("SKU-1", "Widget", 1, Money::from_cents(100)));
        let context = Context::new(
            SagaId::new(),
            start,
            cart,
            Url::parse("https://shop.example.com/return").unwrap(),
        );
        Process::new(context, Arc::new(registry))
    }

    async fn run_to_end(process: &mut Process) {
        while !process.is_final() {
            assert!(process.run().await.is_none());
        }
    }

    #[tokio::test]
    async fn test_run_records_rollback_references_in_order() {
        let log = Log::default();
        let mut process = process_with(vec![
            Step::new("A", "B", &log),
            Step::new("B", "C", &log),
            Step::new("C", Success::NAME, &log),
        ]);

        run_to_end(&mut process).await;

        let names: Vec<_> = process
            .context()
            .rollback_references()
            .iter()
            .map(|r| r.state_name.as_str())
            .collect();
        assert_eq!(names, vec!["A", "B", "C"]);
        assert_eq!(process.context().current_state_name(), "Success");
    }

    #[tokio::test]
    async fn test_fail_compensates_in_reverse_order() {
        let log = Log::default();
        let mut process = process_with(vec![
            Step::new("A", "B", &log),
            Step::new("B", "C", &log),
            Step::new("C", "D", &log),
            Step::new("D", Success::NAME, &log),
        ]);

        for _ in 0..3 {
            assert!(process.run().await.is_none());
        }
        process.fail(FailedReason::Canceled).await.unwrap();

        assert_eq!(*log.lock().unwrap(), vec!["C", "B", "A"]);
        assert_eq!(process.context().current_state_name(), "Failed");
        assert_eq!(
            process.context().failed_reason(),
            Some(&FailedReason::Canceled)
        );
    }

    #[tokio::test]
    async fn test_compensation_attempts_every_entry() {
        let log = Log::default();
        let mut failing = Step::new("B", "C", &log);
        failing.fail_rollback = true;
        let mut process = process_with(vec![
            Step::new("A", "B", &log),
            failing,
            Step::new("C", Success::NAME, &log),
        ]);

        assert!(process.run().await.is_none());
        assert!(process.run().await.is_none());
        let err = process.fail(FailedReason::Canceled).await.unwrap_err();

        // A is still undone after B failed
        assert_eq!(*log.lock().unwrap(), vec!["B", "A"]);
        assert_eq!(err.failures.len(), 1);
        assert_eq!(err.failures[0].state_name, "B");
        assert_eq!(process.context().current_state_name(), "Failed");
    }

    #[tokio::test]
    async fn test_failed_run_reports_reason_without_advancing() {
        let log = Log::default();
        let mut failing = Step::new("B", "C", &log);
        failing.fail_run = true;
        let mut process = process_with(vec![Step::new("A", "B", &log), failing]);

        assert!(process.run().await.is_none());
        let reason = process.run().await;

        assert_eq!(reason, Some(FailedReason::error_occurred("boom")));
        assert_eq!(process.context().current_state_name(), "B");
        assert_eq!(process.context().rollback_references().len(), 1);
    }

    #[tokio::test]
    async fn test_final_state_is_immutable() {
        let log = Log::default();
        let mut process = process_with(vec![Step::new("A", Success::NAME, &log)]);
        run_to_end(&mut process).await;
        let before = process.context().clone();

        process.update_state("A", StateData::None);
        process.update_order_info(domain::PlaceOrderInfo {
            placed_orders: vec![],
            payment_infos: vec![],
            contact_email: None,
        });
        assert!(process.run().await.is_none());
        process.fail(FailedReason::Canceled).await.unwrap();

        assert_eq!(process.context(), &before);
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_state_fails_run() {
        let log = Log::default();
        let mut process = process_with(vec![Step::new("A", "Nowhere", &log)]);

        assert!(process.run().await.is_none());
        assert!(!process.is_final());
        assert!(!process.is_suspended());

        let reason = process.run().await.unwrap();
        assert!(reason.reason().contains("Nowhere"));
    }

    #[tokio::test]
    async fn test_blocking_state_suspends() {
        let log = Log::default();
        let mut waiting = Step::new("B", Success::NAME, &log);
        waiting.blocking = true;
        let mut process = process_with(vec![Step::new("A", "B", &log), waiting]);

        assert!(!process.is_suspended());
        assert!(process.run().await.is_none());
        assert!(process.is_suspended());
        assert!(!process.is_final());
    }
}
