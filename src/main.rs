//! Helix Channels - look up and update channel information from the terminal
//!
//! Loads client options, then runs one `get` or `modify` command against the
//! Helix API and prints the result as JSON.

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use futures::future::join_all;
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use helix_channels::cli::{Cli, Command, ModifyArgs};
use helix_channels::{Client, ClientOptions};

/// Initialize the tracing subscriber for logging.
///
/// Log level is controlled by:
/// 1. `--debug` flag sets level to DEBUG
/// 2. `RUST_LOG` environment variable (if set)
/// 3. Default is WARN
fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let options = ClientOptions::load(cli.config.as_deref()).context("failed to load options")?;
    let options = cli.apply_overrides(options);
    let token = cli.token.clone().unwrap_or_default();

    let client = Client::new(options, token).context("invalid client options")?;
    debug!(base_url = %client.options().base_url, "client ready");

    match &cli.command {
        Command::Get { ids, force } => get_channels(&client, ids, *force).await,
        Command::Modify(args) => modify_channel(&client, args).await,
    }
}

/// Fetches all ids concurrently and prints each result on its own line
async fn get_channels(client: &Client, ids: &[String], force: bool) -> Result<ExitCode> {
    let channels = client.channels();
    let results = join_all(ids.iter().map(|id| channels.fetch(id, force))).await;

    let mut code = ExitCode::SUCCESS;
    for (id, result) in ids.iter().zip(results) {
        match result {
            Ok(Some(channel)) => println!("{}", serde_json::to_string(channel.as_ref())?),
            Ok(None) => println!("{}: not found", id),
            Err(e) => {
                eprintln!("{}: {}", id, e);
                code = ExitCode::FAILURE;
            }
        }
    }
    Ok(code)
}

async fn modify_channel(client: &Client, args: &ModifyArgs) -> Result<ExitCode> {
    let response = client
        .channels()
        .modify(&args.id, &args.to_options())
        .await
        .with_context(|| format!("failed to modify channel {}", args.id))?;

    let Some(response) = response else {
        println!("{}: no response", args.id);
        return Ok(ExitCode::SUCCESS);
    };

    println!("status: {}", response.status);
    if !response.body.is_empty() {
        println!("{}", response.body);
    }
    if !response.is_success() {
        return Ok(ExitCode::FAILURE);
    }

    if args.refetch {
        match client.channels().fetch(&args.id, true).await? {
            Some(channel) => println!("{}", serde_json::to_string(channel.as_ref())?),
            None => println!("{}: not found", args.id),
        }
    }
    Ok(ExitCode::SUCCESS)
}
