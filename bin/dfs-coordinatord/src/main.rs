#![deny(unsafe_code)]

//! Process entry point for the DFS coordinator: parses flags, installs a
//! `tracing-subscriber` `EnvFilter` sink, and runs [`dfs_coordinator::run`]
//! until signalled to stop.

use std::net::SocketAddr;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

/// The DFS coordinator: tracks chunk versions and brokers peer-to-peer
/// chunk transfers between connected clients.
#[derive(Parser, Debug)]
#[command(name = "dfs-coordinatord", version)]
struct Cli {
    /// Address to listen on for client control-link connections.
    #[arg(long, default_value = "127.0.0.1:9000")]
    listen: SocketAddr,

    /// Increase logging verbosity; may be supplied multiple times.
    /// Ignored if `RUST_LOG` is set.
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(env_filter(cli.verbose))
        .init();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(error) => {
            tracing::error!(%error, "failed to start async runtime");
            return ExitCode::FAILURE;
        }
    };

    runtime.block_on(run(cli))
}

async fn run(cli: Cli) -> ExitCode {
    let coordinator = dfs_coordinator::Coordinator::new();

    tokio::select! {
        result = dfs_coordinator::run(cli.listen, coordinator) => {
            if let Err(error) = result {
                tracing::error!(%error, "coordinator exited with an error");
                return ExitCode::FAILURE;
            }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("received interrupt, shutting down");
        }
    }

    ExitCode::SUCCESS
}

/// `RUST_LOG` always wins; otherwise `-v` maps 0..=3 onto
/// warn/info/debug/trace.
fn env_filter(verbose: u8) -> EnvFilter {
    if std::env::var_os("RUST_LOG").is_some() {
        return EnvFilter::from_default_env();
    }
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    EnvFilter::new(level)
}
