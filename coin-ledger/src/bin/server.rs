//! Local ledger dispatcher
//!
//! Reads one command per line from stdin as `<caller> <command> [args...]`
//! and prints the reply. Callers listed in `platform_admins` hold the
//! platform administrator role. A bare `metrics` line prints the Prometheus
//! text exposition.

use anyhow::Context;
use coin_ledger::{dispatch, AccountId, Command, Config, Ledger, PlatformRole};
use tokio::io::{AsyncBufReadExt, BufReader};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Starting coin ledger");

    // Load configuration
    let config = match std::env::args().nth(1) {
        Some(path) => Config::from_file(&path)
            .with_context(|| format!("loading config from {}", path))?,
        None => Config::from_env().context("loading config from environment")?,
    };
    let platform_admins = config.platform_admins.clone();

    // Open ledger
    let ledger = Ledger::open(config).await.context("opening ledger")?;
    tracing::info!("Ledger opened successfully");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.context("reading stdin")?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else { break };

        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if line == "metrics" {
            print!("{}", ledger.metrics().gather_text());
            continue;
        }

        let Some((caller, rest)) = line.split_once(char::is_whitespace) else {
            println!("error: expected `<caller> <command> [args...]`");
            continue;
        };
        let role = if platform_admins.iter().any(|id| id == caller) {
            PlatformRole::Administrator
        } else {
            PlatformRole::Member
        };

        let result = match Command::parse_line(rest) {
            Ok(command) => dispatch(&ledger, &AccountId::new(caller), role, command).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(reply) => println!("{}", reply),
            Err(e) => {
                tracing::debug!(caller, kind = ?e.kind(), "Command failed");
                println!("error: {}", e);
            }
        }
    }

    tracing::info!("Shutting down coin ledger");
    ledger.shutdown().await?;
    Ok(())
}
