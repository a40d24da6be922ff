// ABOUTME: Main entry point for the gitdrop relay bot

use anyhow::{Context, Result};
use clap::Parser;
use std::io::{self, Write};
use std::path::PathBuf;

use gitdrop::bot::Bot;
use gitdrop::config::ConfigStore;

#[derive(Parser)]
#[command(name = "gitdrop", about = "Telegram bot that relays files into a GitHub repository")]
struct Args {
    /// Path to the JSON config file
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    setup_logging()?;

    let path = args.config.unwrap_or_else(ConfigStore::default_path);
    let mut config = ConfigStore::load(path)?;
    first_run_setup(&mut config)?;

    println!("✅ Bot ready! Press Ctrl+C to stop.");
    let mut bot = Bot::new(config);
    bot.run().await
}

fn setup_logging() -> Result<()> {
    use std::fs::OpenOptions;
    use tracing_subscriber::prelude::*;

    let log_dir = dirs::home_dir()
        .map(|home| home.join(".gitdrop").join("logs"))
        .unwrap_or_else(|| PathBuf::from(".gitdrop/logs"));
    std::fs::create_dir_all(&log_dir)?;

    let log_file = log_dir.join(format!(
        "gitdrop-{}.log",
        chrono::Local::now().format("%Y%m%d-%H%M%S")
    ));
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_file)
        .with_context(|| format!("failed to create log file {log_file:?}"))?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(file)
                .with_ansi(false),
        )
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gitdrop=info".into()),
        )
        .init();
    Ok(())
}

/// One-time interactive setup: the bot cannot start without a bot token and
/// at least one admin.
fn first_run_setup(config: &mut ConfigStore) -> Result<()> {
    if config.config().bot_token.is_empty() {
        let token = prompt("Enter bot token: ")?;
        config.set_bot_token(&token)?;
    }
    if config.config().admin_ids.is_empty() {
        let admin = prompt("Enter your Telegram user ID (admin): ")?;
        config.add_admin(&admin)?;
    }
    Ok(())
}

fn prompt(label: &str) -> Result<String> {
    print!("{label}");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin()
        .read_line(&mut line)
        .context("failed to read input")?;
    Ok(line.trim().to_string())
}
