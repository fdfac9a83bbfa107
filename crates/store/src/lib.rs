//! Store of record for the checkout engine.
//!
//! The [`Store`] trait is the transactional boundary checkout commits
//! against. Two implementations are provided: [`InMemoryStore`] for tests and
//! single-process demos, and [`PostgresStore`] backed by sqlx.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use store::{Store, StoreTransaction};
