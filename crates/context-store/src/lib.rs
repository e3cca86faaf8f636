pub mod error;
pub mod memory;
pub mod postgres;
pub mod record;
pub mod store;

pub use common::SagaId;
pub use error::{ContextStoreError, Result};
pub use memory::InMemoryContextStore;
pub use postgres::PostgresContextStore;
pub use record::{StoredContext, Version};
pub use store::{ContextStore, StoreOptions};
