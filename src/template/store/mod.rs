//! Template storage.
//!
//! The store uses a backend abstraction to support different storage
//! implementations:
//!
//! - `MemoryTemplateStore`: In-memory storage using DashMap (default)
//! - `PostgresTemplateStore`: Persistent storage using PostgreSQL
//!
//! Use `create_template_store()` to create the appropriate backend based on configuration.

pub mod backend;
mod factory;
pub mod memory;
pub mod postgres;

pub use backend::{StoreError, StoreResult, StoreStats, TemplateRepository};
pub use factory::{connect_template_store, create_template_store};
pub use memory::MemoryTemplateStore;
pub use postgres::PostgresTemplateStore;
