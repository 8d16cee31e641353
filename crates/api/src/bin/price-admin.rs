//! Administration CLI for a running price predictor server
//!
//! # Commands
//!
//! - `status` - Server health and headline statistics
//! - `cache-stats` - Prediction cache statistics
//! - `cleanup-cache` - Drop old cache entries
//! - `metrics` - Request metrics
//! - `export` - Write metrics or cache statistics to a JSON file
//! - `errors` - Recent errors

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::Value;

/// Price predictor administration tool
#[derive(Parser)]
#[command(name = "price-admin")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Base URL of the server
    #[arg(long, global = true, default_value = "http://127.0.0.1:8080")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show server status and health
    Status,
    /// Show prediction cache statistics
    CacheStats,
    /// Remove cache entries older than the given age
    ///
    /// Examples:
    ///   price-admin cleanup-cache --days 7
    CleanupCache {
        /// Days to keep
        #[arg(long, default_value = "30")]
        days: u32,
    },
    /// Show request metrics
    Metrics {
        /// Hours of history to summarize
        #[arg(long, default_value = "24")]
        hours: u32,
    },
    /// Export data to a JSON file
    ///
    /// Examples:
    ///   price-admin export --type metrics --output metrics.json
    Export {
        /// What to export
        #[arg(long = "type", value_enum)]
        kind: ExportKind,
        /// Output file path
        #[arg(long)]
        output: String,
    },
    /// Show recent errors
    Errors {
        /// Number of errors to show
        #[arg(long, default_value = "10")]
        limit: usize,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ExportKind {
    Metrics,
    Cache,
}

struct AdminClient {
    client: reqwest::Client,
    base: String,
}

impl AdminClient {
    fn new(base: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .context("failed to create HTTP client")?;
        Ok(Self {
            client,
            base: base.trim_end_matches('/').to_string(),
        })
    }

    async fn get(&self, path: &str) -> Result<Value> {
        let url = format!("{}{}", self.base, path);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("request to {url} failed"))?;
        Self::json(response).await
    }

    async fn post(&self, path: &str) -> Result<Value> {
        let url = format!("{}{}", self.base, path);
        let response = self
            .client
            .post(&url)
            .send()
            .await
            .with_context(|| format!("request to {url} failed"))?;
        Self::json(response).await
    }

    async fn json(response: reqwest::Response) -> Result<Value> {
        let status = response.status();
        if !status.is_success() {
            bail!("server answered HTTP {}", status.as_u16());
        }
        response.json().await.context("invalid JSON from server")
    }
}

fn num(value: &Value, key: &str) -> f64 {
    value.get(key).and_then(Value::as_f64).unwrap_or(0.0)
}

fn text<'a>(value: &'a Value, key: &str) -> &'a str {
    value.get(key).and_then(Value::as_str).unwrap_or("-")
}

fn print_cache_stats(stats: &Value) {
    let hits = num(stats, "cache_hits");
    let misses = num(stats, "cache_misses");
    println!("Total Predictions: {}", num(stats, "total_predictions"));
    println!("Total Accesses: {}", num(stats, "total_accesses"));
    println!("Recent (24h): {}", num(stats, "recent_predictions_24h"));
    println!("Logged Requests: {}", num(stats, "logged_requests"));
    if hits + misses > 0.0 {
        println!("Cache Hit Rate: {:.1}%", hits / (hits + misses) * 100.0);
    }
}

async fn status(client: &AdminClient) -> Result<()> {
    let health = client.get("/api/v1/health").await?;
    let predictor = &health["predictor"];
    let metrics = &health["metrics"];

    println!("Status: {} (v{})", text(&health, "status"), text(&health, "version"));
    println!("Uptime: {}s", num(&health, "uptime_seconds"));
    println!(
        "Predictor: {} [{}] region={} timeout={}ms",
        text(predictor, "endpoint"),
        text(predictor, "backend"),
        text(predictor, "region"),
        num(predictor, "timeout_ms")
    );
    println!("Total Requests: {}", num(metrics, "total_requests"));
    println!("Failed Requests: {}", num(metrics, "failed_requests"));
    println!(
        "Avg Response Time: {:.2}ms",
        num(metrics, "average_response_time_ms")
    );
    if let Some(cache) = health.get("cache").filter(|c| !c.is_null()) {
        print_cache_stats(cache);
    }
    Ok(())
}

async fn metrics(client: &AdminClient, hours: u32) -> Result<()> {
    let data = client.get(&format!("/api/v1/metrics?hours={hours}")).await?;
    let current = &data["current"];
    let total = num(current, "total_requests");

    println!("Application Metrics (last {hours} hours)");
    println!("Total Requests: {total}");
    println!(
        "Success Rate: {:.1}%",
        num(current, "successful_requests") / total.max(1.0) * 100.0
    );
    println!(
        "Avg Response Time: {:.2}ms ({})",
        num(current, "average_response_time_ms"),
        text(current, "response_time_trend")
    );
    println!("Request Trend: {}", text(current, "request_trend"));

    let latencies: Vec<f64> = data["history"]
        .as_array()
        .map(|samples| samples.iter().map(|s| num(s, "latency_ms")).collect())
        .unwrap_or_default();
    if !latencies.is_empty() {
        let min = latencies.iter().copied().fold(f64::INFINITY, f64::min);
        let max = latencies.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let avg = latencies.iter().sum::<f64>() / latencies.len() as f64;
        println!(
            "Response Time ({} samples): Min {min:.2}ms, Max {max:.2}ms, Avg {avg:.2}ms",
            latencies.len()
        );
    }
    Ok(())
}

async fn errors(client: &AdminClient, limit: usize) -> Result<()> {
    let data = client.get(&format!("/api/v1/errors?limit={limit}")).await?;
    let recent = data["recent_errors"].as_array().cloned().unwrap_or_default();

    if recent.is_empty() {
        println!("No errors recorded");
        return Ok(());
    }
    println!("Recent Errors (last {limit}):");
    for entry in recent {
        println!();
        println!("{}", text(&entry, "timestamp"));
        println!("  Type: {}", text(&entry, "kind"));
        println!("  Message: {}", text(&entry, "message"));
    }
    Ok(())
}

async fn export(client: &AdminClient, kind: ExportKind, output: &str) -> Result<()> {
    let data = match kind {
        ExportKind::Metrics => client.get("/api/v1/metrics?hours=8760").await?,
        ExportKind::Cache => client.get("/api/v1/cache/stats").await?,
    };
    let json = serde_json::to_string_pretty(&data)?;
    std::fs::write(output, json).with_context(|| format!("failed to write {output}"))?;
    println!("Data exported to {output}");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let client = AdminClient::new(&cli.server)?;

    match cli.command {
        Commands::Status => status(&client).await,
        Commands::CacheStats => {
            let stats = client.get("/api/v1/cache/stats").await?;
            print_cache_stats(&stats);
            Ok(())
        }
        Commands::CleanupCache { days } => {
            let result = client
                .post(&format!("/api/v1/cache/cleanup?days={days}"))
                .await?;
            println!(
                "Cleaned up {} predictions older than {days} days",
                num(&result, "removed")
            );
            print_cache_stats(&result["stats"]);
            Ok(())
        }
        Commands::Metrics { hours } => metrics(&client, hours).await,
        Commands::Export { kind, output } => export(&client, kind, &output).await,
        Commands::Errors { limit } => errors(&client, limit).await,
    }
}
