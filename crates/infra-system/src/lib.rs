// taskq Infrastructure - System Adapters
// Implements: TaskExecutor

pub mod simulated_executor;

pub use simulated_executor::SimulatedExecutor;
