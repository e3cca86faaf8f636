use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::SagaId;

/// Version of a stored context, used for optimistic concurrency control.
///
/// A key that was never written (or was deleted) is at version 0; every
/// successful store increments it by one.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Version(i64);

impl Version {
    /// Creates a new version from a raw value.
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the version of a key that does not exist.
    pub fn initial() -> Self {
        Self(0)
    }

    /// Returns the next version.
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    /// Returns the raw value.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A persisted saga context.
///
/// The store never interprets `payload`; `saga_id` and `state_name` are kept
/// beside it so backends can index and report on them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredContext {
    pub saga_id: SagaId,
    pub state_name: String,
    /// Version as read from the store. Ignored on write.
    pub version: Version,
    pub updated_at: DateTime<Utc>,
    pub payload: serde_json::Value,
}

impl StoredContext {
    /// Creates a record around an already serialized payload.
    pub fn new(
        saga_id: SagaId,
        state_name: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            saga_id,
            state_name: state_name.into(),
            version: Version::initial(),
            updated_at: Utc::now(),
            payload,
        }
    }

    /// Creates a record from a serializable context.
    pub fn from_context<T: Serialize>(
        saga_id: SagaId,
        state_name: impl Into<String>,
        context: &T,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self::new(saga_id, state_name, serde_json::to_value(context)?))
    }

    /// Deserializes the payload back into a concrete context type.
    pub fn into_context<T: DeserializeOwned>(self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.payload)
    }
}
