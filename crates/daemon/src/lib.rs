//! taskq daemons - shared composition code
//!
//! Environment configuration, logging setup and store selection used by the
//! `taskq-worker`, `taskq-producer` and `taskq-monitor` binaries.

pub mod config;
pub mod logging;
pub mod store;

pub use config::{DaemonConfig, LogFormat};
pub use logging::init_logging;
pub use store::{connect_store, StoreKind};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
