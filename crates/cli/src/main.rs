//! taskq CLI - submit tasks, inspect queue depths, generate load

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tabled::{Table, Tabled};
use tokio::task::JoinSet;

const DEFAULT_PRODUCER_URL: &str = "http://127.0.0.1:8085";
const DEFAULT_MONITOR_URL: &str = "http://127.0.0.1:8081";

#[derive(Parser)]
#[command(name = "taskq")]
#[command(about = "taskq task queue CLI", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Producer API base URL
    #[arg(long, env = "TASKQ_PRODUCER_URL", default_value = DEFAULT_PRODUCER_URL)]
    producer_url: String,

    /// Monitor API base URL
    #[arg(long, env = "TASKQ_MONITOR_URL", default_value = DEFAULT_MONITOR_URL)]
    monitor_url: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit one task
    Submit {
        /// Task type (e.g., Email, Resize, Export)
        #[arg(short = 't', long = "type")]
        task_type: String,

        /// Opaque payload string
        #[arg(short, long, default_value = "")]
        payload: String,

        /// Explicit task ID (generated by the producer if omitted)
        #[arg(long)]
        id: Option<String>,
    },

    /// Show queue depths
    Stats,

    /// Send many concurrent submissions and report throughput
    Stress {
        /// Number of requests
        #[arg(short = 'n', long, default_value = "50")]
        count: usize,

        /// Task types to pick from at random
        #[arg(long, value_delimiter = ',', default_value = "Email,Resize,Export")]
        types: Vec<String>,
    },
}

#[derive(Serialize)]
struct SubmitBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<&'a str>,
    #[serde(rename = "type")]
    task_type: &'a str,
    payload: &'a str,
}

#[derive(Deserialize)]
struct SubmitResult {
    task_id: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Deserialize)]
struct StatsResult {
    pending: u64,
    processing: u64,
    dead_letter: u64,
    status: String,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Tabled)]
struct QueueRow {
    queue: &'static str,
    depth: u64,
}

/// Outcome counts of one stress run
#[derive(Debug, Default, PartialEq)]
struct StressReport {
    accepted: usize,
    rejected: usize,
    failed: usize,
    elapsed: Duration,
}

impl StressReport {
    fn throughput(&self, count: usize) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            count as f64 / secs
        } else {
            0.0
        }
    }
}

fn endpoint(base: &str, path: &str) -> String {
    format!("{}{}", base.trim_end_matches('/'), path)
}

async fn submit(client: &reqwest::Client, base: &str, body: &SubmitBody<'_>) -> Result<String> {
    let response = client
        .post(endpoint(base, "/task"))
        .json(body)
        .send()
        .await
        .context("Failed to connect to producer")?;

    let status = response.status();
    if status != reqwest::StatusCode::ACCEPTED {
        let message = response
            .json::<ErrorBody>()
            .await
            .map(|b| b.error)
            .unwrap_or_else(|_| "no error body".to_string());
        anyhow::bail!("Producer returned {}: {}", status, message);
    }

    let result: SubmitResult = response
        .json()
        .await
        .context("Failed to parse producer response")?;
    Ok(result.task_id)
}

async fn stress(producer_url: &str, count: usize, types: Vec<String>) -> Result<StressReport> {
    if types.is_empty() {
        anyhow::bail!("--types must name at least one task type");
    }

    let client = reqwest::Client::new();
    let url = endpoint(producer_url, "/task");
    let mut set = JoinSet::new();
    let start = Instant::now();

    for i in 0..count {
        let client = client.clone();
        let url = url.clone();
        let task_type = types
            .choose(&mut rand::thread_rng())
            .cloned()
            .unwrap_or_default();

        set.spawn(async move {
            let payload = format!("stress-test-data-{}", i);
            let body = SubmitBody {
                id: None,
                task_type: &task_type,
                payload: &payload,
            };
            let result = client.post(&url).json(&body).send().await;
            (i, result.map(|r| r.status()))
        });
    }

    let mut report = StressReport::default();
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((_, Ok(status))) if status == reqwest::StatusCode::ACCEPTED => report.accepted += 1,
            Ok((i, Ok(status))) => {
                println!("  {} Request {} got status: {}", "⚠".yellow(), i, status);
                report.rejected += 1;
            }
            Ok((i, Err(e))) => {
                println!("  {} Request {} failed: {}", "✗".red(), i, e);
                report.failed += 1;
            }
            Err(e) => {
                println!("  {} Request task aborted: {}", "✗".red(), e);
                report.failed += 1;
            }
        }
    }
    report.elapsed = start.elapsed();

    Ok(report)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Submit {
            task_type,
            payload,
            id,
        } => {
            let client = reqwest::Client::new();
            let body = SubmitBody {
                id: id.as_deref(),
                task_type: &task_type,
                payload: &payload,
            };

            let task_id = submit(&client, &cli.producer_url, &body).await?;

            println!("{}", "✓ Task queued".green().bold());
            println!("  {} {}", "Task ID:".bold(), task_id);
        }

        Commands::Stats => {
            println!("{}", "Queue Status".cyan().bold());
            println!();

            let stats: StatsResult = reqwest::get(endpoint(&cli.monitor_url, "/stats"))
                .await
                .context("Failed to connect to monitor")?
                .json()
                .await
                .context("Failed to parse monitor response")?;

            let status = if stats.status == "healthy" {
                "HEALTHY".green()
            } else {
                "DEGRADED".red()
            };
            println!("  {} {}", "Monitor URL:".bold(), cli.monitor_url);
            println!("  {} {}", "Store:".bold(), status);
            if let Some(error) = &stats.error {
                println!("  {} {}", "Error:".bold(), error);
            }
            println!();

            let rows = vec![
                QueueRow {
                    queue: "pending",
                    depth: stats.pending,
                },
                QueueRow {
                    queue: "processing",
                    depth: stats.processing,
                },
                QueueRow {
                    queue: "dead-letter",
                    depth: stats.dead_letter,
                },
            ];
            println!("{}", Table::new(rows));
        }

        Commands::Stress { count, types } => {
            println!(
                "{}",
                format!(
                    "Starting stress test: sending {} requests to {}...",
                    count,
                    endpoint(&cli.producer_url, "/task")
                )
                .cyan()
                .bold()
            );

            let report = stress(&cli.producer_url, count, types).await?;

            println!();
            println!(
                "{}",
                format!("✓ Stress test complete in {:.2?}", report.elapsed).green().bold()
            );
            println!("  {} {}", "Accepted:".bold(), report.accepted);
            println!("  {} {}", "Rejected:".bold(), report.rejected);
            println!("  {} {}", "Failed:".bold(), report.failed);
            println!(
                "  {} {:.2} req/sec",
                "Throughput:".bold(),
                report.throughput(count)
            );
        }
    }

    Ok(())
}
