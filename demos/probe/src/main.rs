//! Connectivity Probe
//!
//! Exercises the no-pool transport against a public echo service and, when
//! a bot token is configured, against the bot API.
//!
//! # Usage
//!
//! ```bash
//! # Plain HTTP checks, no token needed
//! cargo run --package nopool-probe -- connectivity --count 10
//!
//! # Bot-API checks (reads TELEGRAM_BOT_TOKEN / ALLOWED_TELEGRAM_USER_ID)
//! cargo run --package nopool-probe -- bot --send
//! ```
//!
//! Proxy settings come from `HTTPS_PROXY`/`HTTP_PROXY`, `nopool.toml`, or
//! `--proxy`.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use nopool::prelude::*;
use nopool::runtime::ConfigLoader;
use serde_json::json;

#[derive(Parser, Debug)]
#[command(name = "nopool-probe", version, about = "Probe the no-pool HTTP transport")]
struct Cli {
    /// Configuration file (default: search nopool.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Configuration profile
    #[arg(long, global = true)]
    profile: Option<String>,

    /// Proxy URL, overrides configuration and environment
    #[arg(long, global = true)]
    proxy: Option<String>,

    /// Keep one client with no idle connections instead of one per request
    #[arg(long, global = true)]
    shared: bool,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// GET, POST and a burst of requests against an echo service
    Connectivity {
        /// Echo service base URL
        #[arg(long, default_value = "https://httpbin.org")]
        base_url: String,

        /// Number of rapid requests
        #[arg(short = 'n', long, default_value_t = 10)]
        count: usize,
    },
    /// getMe, optional sendMessage, and a burst of getMe calls
    Bot {
        /// Send a message to the allowed user
        #[arg(long)]
        send: bool,

        /// Message text
        #[arg(long, default_value = "nopool probe: connection OK")]
        message: String,

        /// Number of rapid getMe calls
        #[arg(short = 'n', long, default_value_t = 5)]
        count: usize,
    },
}

fn build_runtime(cli: &Cli) -> Result<NoPoolRuntime> {
    let mut loader = ConfigLoader::new();
    if let Some(path) = &cli.config {
        loader = loader.file(path);
    }
    if let Some(profile) = &cli.profile {
        loader = loader.profile(profile);
    }
    if let Some(proxy) = &cli.proxy {
        loader = loader.set("transport.proxy_url", proxy);
    }
    if cli.shared {
        loader = loader.set("transport.strategy", PoolStrategy::SharedNoIdle);
    }
    if cli.verbose {
        loader = loader.set("logging.level", "debug");
    }

    NoPoolRuntime::builder()
        .loader(loader)
        .build()
        .context("failed to build runtime")
}

/// Runs `count` sequential calls and returns how many succeeded.
async fn burst<F, Fut, T>(count: usize, mut call: F) -> usize
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AdapterError>>,
{
    let mut succeeded = 0;
    for i in 1..=count {
        let started = Instant::now();
        match call().await {
            Ok(_) => {
                succeeded += 1;
                println!("  Request {i}: ok ({} ms)", started.elapsed().as_millis());
            }
            Err(e) => println!("  Request {i}: FAILED - {e}"),
        }
    }
    println!("  {succeeded}/{count} requests succeeded");
    succeeded
}

async fn connectivity(runtime: &NoPoolRuntime, base_url: &str, count: usize) -> Result<bool> {
    let request = runtime.request();
    let base_url = base_url.trim_end_matches('/');

    println!("GET {base_url}/get");
    let body = request
        .retrieve(&format!("{base_url}/get"))
        .await
        .context("GET request failed")?;
    println!("  ok, {} bytes", body.len());

    println!("POST {base_url}/post");
    let response = request
        .post(
            &format!("{base_url}/post"),
            Some(json!({ "message": "Hello from nopool", "test": true })),
            TimeoutOverrides::NONE,
        )
        .await
        .context("POST request failed")?;
    let keys: Vec<&String> = response
        .as_object()
        .map(|map| map.keys().collect())
        .unwrap_or_default();
    println!("  ok, response keys: {keys:?}");

    println!("{count} rapid requests to {base_url}/uuid");
    let url = format!("{base_url}/uuid");
    let succeeded = burst(count, || request.retrieve(&url)).await;

    Ok(succeeded * 10 >= count * 8)
}

async fn bot(runtime: &NoPoolRuntime, send: bool, message: &str, count: usize) -> Result<bool> {
    let bot = runtime.bot_api()?;

    println!("getMe");
    let me = bot.get_me().await.context("getMe failed")?;
    println!(
        "  ok, bot @{} (id {})",
        me["username"].as_str().unwrap_or("?"),
        me["id"]
    );

    if send {
        let chat_id = runtime
            .config()
            .bot
            .allowed_user_id
            .context("--send needs ALLOWED_TELEGRAM_USER_ID or bot.allowed_user_id")?;
        println!("sendMessage to {chat_id}");
        let sent = bot
            .send_message(chat_id, message, None)
            .await
            .context("sendMessage failed")?;
        println!("  ok, message id {}", sent["message_id"]);
    }

    println!("{count} rapid getMe calls");
    let succeeded = burst(count, || bot.get_me()).await;

    Ok(succeeded == count)
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let runtime = build_runtime(&cli)?;
    runtime.initialize().await?;

    let config = runtime.config();
    match &config.transport.proxy_url {
        Some(proxy) => match ProxySpec::parse(proxy) {
            Ok(spec) => println!("Using proxy: {spec}"),
            Err(e) => println!("Ignoring proxy: {e}"),
        },
        None => println!("No proxy configured - direct connection"),
    }
    println!("Strategy: {}", config.transport.strategy);

    let outcome = match &cli.command {
        Command::Connectivity { base_url, count } => {
            connectivity(&runtime, base_url, *count).await
        }
        Command::Bot {
            send,
            message,
            count,
        } => bot(&runtime, *send, message, *count).await,
    };

    let stats = runtime.stats();
    runtime.shutdown().await?;
    println!(
        "Transport: {} started, {} succeeded, {} failed, {} still in flight",
        stats.started, stats.succeeded, stats.failed, stats.in_flight
    );

    match outcome {
        Ok(true) if stats.in_flight == 0 => {
            println!("All checks passed");
            Ok(ExitCode::SUCCESS)
        }
        Ok(_) => {
            println!("Some checks failed");
            Ok(ExitCode::FAILURE)
        }
        Err(e) => {
            tracing::error!("Probe failed: {e:#}");
            println!("Probe failed: {e:#}");
            Ok(ExitCode::FAILURE)
        }
    }
}
