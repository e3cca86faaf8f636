//! Shared identifiers used across the place-order crates.

pub mod types;

pub use types::SagaId;
