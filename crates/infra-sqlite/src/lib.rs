// taskq Infrastructure - SQLite Adapter
// Implements: OrderedStore (durable, multi-process safe via WAL + transactions)

mod connection;
mod error;
mod migration;
mod ordered_store;

pub use connection::create_pool;
pub use migration::run_migrations;
pub use ordered_store::{SqliteOrderedStore, CLAIM_POLL_INTERVAL};

// Note: sqlx::Error conversion is handled by wrapping in helper functions
// due to Rust's orphan rules (cannot implement From<sqlx::Error> for AppError here)
