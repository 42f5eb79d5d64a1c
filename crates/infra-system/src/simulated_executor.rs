// Simulated executor
// Stand-in work function: sleeps for a fixed latency, then fails with a
// fixed probability. Real deployments plug in their own TaskExecutor.
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;
use std::time::Duration;
use tracing::debug;

use taskq_core::domain::Task;
use taskq_core::error::{AppError, Result};
use taskq_core::port::{ExecutionError, TaskExecutor};

/// Default simulated work duration (1s)
pub const DEFAULT_LATENCY: Duration = Duration::from_secs(1);

/// Default probability that an attempt fails (25%)
pub const DEFAULT_FAILURE_RATE: f64 = 0.25;

pub struct SimulatedExecutor {
    latency: Duration,
    failure_rate: f64,
    rng: Mutex<StdRng>,
}

impl SimulatedExecutor {
    /// # Errors
    /// `AppError::Config` if `failure_rate` is outside `0.0..=1.0`
    pub fn new(latency: Duration, failure_rate: f64) -> Result<Self> {
        Self::with_rng(latency, failure_rate, StdRng::from_entropy())
    }

    /// Deterministic outcomes for tests
    pub fn with_seed(latency: Duration, failure_rate: f64, seed: u64) -> Result<Self> {
        Self::with_rng(latency, failure_rate, StdRng::seed_from_u64(seed))
    }

    fn with_rng(latency: Duration, failure_rate: f64, rng: StdRng) -> Result<Self> {
        if !(0.0..=1.0).contains(&failure_rate) {
            return Err(AppError::Config(format!(
                "failure rate must be between 0 and 1, got {}",
                failure_rate
            )));
        }
        Ok(Self {
            latency,
            failure_rate,
            rng: Mutex::new(rng),
        })
    }

    pub fn latency(&self) -> Duration {
        self.latency
    }

    pub fn failure_rate(&self) -> f64 {
        self.failure_rate
    }
}

impl Default for SimulatedExecutor {
    fn default() -> Self {
        Self {
            latency: DEFAULT_LATENCY,
            failure_rate: DEFAULT_FAILURE_RATE,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }
}

#[async_trait]
impl TaskExecutor for SimulatedExecutor {
    async fn execute(&self, task: &Task) -> std::result::Result<(), ExecutionError> {
        tokio::time::sleep(self.latency).await;

        let fail = self
            .rng
            .lock()
            .map_err(|_| ExecutionError::Failed("rng lock poisoned".to_string()))?
            .gen_bool(self.failure_rate);

        if fail {
            return Err(ExecutionError::Failed(format!(
                "random simulated failure for task {}",
                task.id
            )));
        }

        debug!(task_id = %task.id, latency_ms = self.latency.as_millis() as u64, "Simulated work done");
        Ok(())
    }
}
