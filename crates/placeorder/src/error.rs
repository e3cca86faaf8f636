//! Place-order error types.

use common::SagaId;
use context_store::ContextStoreError;
use thiserror::Error;

/// Errors returned by the place-order commands.
///
/// Step failures are not errors: a failing step ends the saga in the
/// Failed state with a `FailedReason`. These variants cover everything the
/// caller of a command has to handle.
#[derive(Debug, Error)]
pub enum PlaceOrderError {
    /// Context store error.
    #[error("Context store error: {0}")]
    ContextStore(#[from] ContextStoreError),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// No saga is stored for the caller.
    #[error("No place order process found")]
    NoPlaceOrderProcess,

    /// The caller already has a saga that has not reached a final state.
    #[error("A place order process is already running")]
    ProcessAlreadyRunning,

    /// The return address could not be parsed.
    #[error("Invalid return address '{address}': {reason}")]
    InvalidReturnAddress { address: String, reason: String },

    /// The cart cannot be placed.
    #[error("Invalid cart: {0}")]
    InvalidCart(String),

    /// A single command ran more steps than allowed without suspending.
    #[error("Saga {saga_id} exceeded {limit} transitions without suspending")]
    TransitionLimitExceeded { saga_id: SagaId, limit: usize },

    /// One or more rollback steps failed while cancelling.
    #[error(transparent)]
    Compensation(#[from] CompensationError),

    /// The state registry is misconfigured.
    #[error("State registry error: {0}")]
    Registry(#[from] RegistryError),
}

/// Convenience type alias for place-order results.
pub type Result<T> = std::result::Result<T, PlaceOrderError>;

/// Errors raised while undoing a step.
#[derive(Debug, Error)]
pub enum RollbackError {
    /// The state was handed rollback data it did not produce.
    #[error("Unexpected rollback data for {state}: expected {expected}, found {found}")]
    UnexpectedData {
        state: &'static str,
        expected: &'static str,
        found: &'static str,
    },

    /// A rollback reference names a state that is not registered.
    #[error("No state registered under '{0}'")]
    UnknownState(String),

    /// Payment gateway error.
    #[error("Payment gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// Payment service error.
    #[error("Payment service error: {0}")]
    PaymentService(#[from] PaymentServiceError),

    /// Order service error.
    #[error("Order service error: {0}")]
    Order(#[from] OrderServiceError),

    /// Cart service error.
    #[error("Cart service error: {0}")]
    Cart(#[from] CartServiceError),
}

/// A rollback entry that could not be undone.
#[derive(Debug)]
pub struct CompensationFailure {
    pub state_name: String,
    pub error: RollbackError,
}

/// Every failed entry of one compensation run.
///
/// Compensation attempts all entries; a failure does not stop earlier
/// entries from being undone.
#[derive(Debug, Error)]
#[error("Compensation failed for {} step(s): {}", .failures.len(), summarize(.failures))]
pub struct CompensationError {
    pub failures: Vec<CompensationFailure>,
}

fn summarize(failures: &[CompensationFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{}: {}", f.state_name, f.error))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors reported by a payment gateway.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// No flow exists for the correlation ID.
    #[error("No payment flow for correlation ID {0}")]
    FlowNotFound(String),

    /// The gateway refused the request.
    #[error("Payment gateway rejected the request: {0}")]
    Rejected(String),
}

/// Errors raised when resolving a payment gateway.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaymentServiceError {
    /// The cart carries no payment selection.
    #[error("PaymentSelection not set")]
    PaymentSelectionNotSet,

    /// No gateway is registered under the code.
    #[error("Payment gateway '{0}' not found")]
    GatewayNotFound(String),
}

/// Errors reported by the order service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderServiceError {
    /// The order could not be created.
    #[error("Order placement failed: {0}")]
    PlacementFailed(String),

    /// The order could not be cancelled.
    #[error("Order cancellation failed: {0}")]
    CancellationFailed(String),
}

/// Errors reported by the cart service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartServiceError {
    /// The cart could not be completed.
    #[error("Cart completion failed: {0}")]
    CompletionFailed(String),

    /// The cart could not be restored.
    #[error("Cart restore failed: {0}")]
    RestoreFailed(String),
}

/// Errors raised when building a state registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// Two states share a name.
    #[error("State '{0}' registered twice")]
    DuplicateState(String),

    /// No start state was configured.
    #[error("No start state configured")]
    MissingStartState,

    /// No failed state was configured.
    #[error("No failed state configured")]
    MissingFailedState,

    /// A configured state name is not registered.
    #[error("State '{0}' is not registered")]
    UnknownState(String),

    /// The configured failed state is not final.
    #[error("Failed state '{0}' must be final")]
    FailedStateNotFinal(String),
}
