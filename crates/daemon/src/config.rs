// Daemon configuration from environment variables

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use taskq_api_http::server::{DEFAULT_MONITOR_ADDR, DEFAULT_PRODUCER_ADDR};
use taskq_core::application::retry::DEFAULT_MAX_RETRIES;
use taskq_core::error::{AppError, Result};

pub const DEFAULT_STORE_URL: &str = "redis://127.0.0.1:6379";
pub const DEFAULT_WORKER_CONCURRENCY: usize = 1;
pub const DEFAULT_RECONNECT_BACKOFF_MS: u64 = 3000;
pub const DEFAULT_SIM_LATENCY_MS: u64 = 1000;
pub const DEFAULT_SIM_FAILURE_RATE: f64 = 0.25;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(AppError::Config(format!(
                "TASKQ_LOG_FORMAT must be 'pretty' or 'json', got '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub store_url: String,
    pub producer_addr: SocketAddr,
    pub monitor_addr: SocketAddr,
    pub worker_concurrency: usize,
    pub max_retries: u32,
    pub reconnect_backoff: Duration,
    pub execution_timeout: Option<Duration>,
    pub sim_latency: Duration,
    pub sim_failure_rate: f64,
    pub log_format: LogFormat,
    pub log_dir: Option<PathBuf>,
}

impl DaemonConfig {
    /// Read configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from any key lookup. Unset or blank values take
    /// their defaults; unparsable values are `AppError::Config`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let worker_concurrency =
            parse_or(get("TASKQ_WORKER_CONCURRENCY"), "TASKQ_WORKER_CONCURRENCY", DEFAULT_WORKER_CONCURRENCY)?;
        if worker_concurrency == 0 {
            return Err(AppError::Config(
                "TASKQ_WORKER_CONCURRENCY must be at least 1".to_string(),
            ));
        }

        let sim_failure_rate =
            parse_or(get("TASKQ_SIM_FAILURE_RATE"), "TASKQ_SIM_FAILURE_RATE", DEFAULT_SIM_FAILURE_RATE)?;
        if !(0.0..=1.0).contains(&sim_failure_rate) {
            return Err(AppError::Config(format!(
                "TASKQ_SIM_FAILURE_RATE must be within [0, 1], got {}",
                sim_failure_rate
            )));
        }

        let execution_timeout = match get("TASKQ_EXECUTION_TIMEOUT_MS") {
            Some(raw) => Some(Duration::from_millis(parse_value::<u64>(
                &raw,
                "TASKQ_EXECUTION_TIMEOUT_MS",
            )?)),
            None => None,
        };

        Ok(Self {
            store_url: get("TASKQ_STORE_URL").unwrap_or_else(|| DEFAULT_STORE_URL.to_string()),
            producer_addr: parse_or(
                get("TASKQ_PRODUCER_ADDR"),
                "TASKQ_PRODUCER_ADDR",
                default_addr(DEFAULT_PRODUCER_ADDR)?,
            )?,
            monitor_addr: parse_or(
                get("TASKQ_MONITOR_ADDR"),
                "TASKQ_MONITOR_ADDR",
                default_addr(DEFAULT_MONITOR_ADDR)?,
            )?,
            worker_concurrency,
            max_retries: parse_or(get("TASKQ_MAX_RETRIES"), "TASKQ_MAX_RETRIES", DEFAULT_MAX_RETRIES)?,
            reconnect_backoff: Duration::from_millis(parse_or(
                get("TASKQ_RECONNECT_BACKOFF_MS"),
                "TASKQ_RECONNECT_BACKOFF_MS",
                DEFAULT_RECONNECT_BACKOFF_MS,
            )?),
            execution_timeout,
            sim_latency: Duration::from_millis(parse_or(
                get("TASKQ_SIM_LATENCY_MS"),
                "TASKQ_SIM_LATENCY_MS",
                DEFAULT_SIM_LATENCY_MS,
            )?),
            sim_failure_rate,
            log_format: match get("TASKQ_LOG_FORMAT") {
                Some(raw) => raw.parse()?,
                None => LogFormat::default(),
            },
            log_dir: get("TASKQ_LOG_DIR").map(|dir| PathBuf::from(shellexpand::tilde(&dir).into_owned())),
        })
    }
}

fn parse_value<T>(raw: &str, key: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| AppError::Config(format!("Invalid {} '{}': {}", key, raw, e)))
}

fn parse_or<T>(raw: Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        Some(raw) => parse_value(&raw, key),
        None => Ok(default),
    }
}

fn default_addr(addr: &str) -> Result<SocketAddr> {
    addr.parse()
        .map_err(|e| AppError::Internal(format!("Bad default address {}: {}", addr, e)))
}
