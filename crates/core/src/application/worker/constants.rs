// Worker constants (No magic values)
use std::time::Duration;

/// Pause after a store error while claiming before trying again (3s)
pub const DEFAULT_RECONNECT_BACKOFF: Duration = Duration::from_secs(3);

/// Name used in logs when a worker is not given one
pub const DEFAULT_WORKER_NAME: &str = "worker-0";
