#![deny(unsafe_code)]

//! A thin demonstration/test client: mounts the DFS, performs one
//! operation, and exits. Exercises the `dfs-client` library surface
//! end-to-end.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use dfs_client::Session;
use dfs_wire::{DfsError, FileMode, BYTES_PER_CHUNK};
use tracing_subscriber::EnvFilter;

/// A minimal DFS client: mount, perform one file operation, unmount.
#[derive(Parser, Debug)]
#[command(name = "dfs-client-cli", version)]
struct Cli {
    /// Address of the coordinator's control link.
    #[arg(long)]
    coordinator: SocketAddr,

    /// Local address to bind the reverse-RPC listener on.
    #[arg(long, default_value = "127.0.0.1:0")]
    bind: SocketAddr,

    /// Local directory backing this client's chunk store and identity
    /// cache.
    #[arg(long)]
    local_path: PathBuf,

    /// Increase logging verbosity; may be supplied multiple times.
    /// Ignored if `RUST_LOG` is set.
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write `text` (padded or truncated to 32 bytes) to a chunk.
    Write {
        /// Filename to open in WRITE mode.
        name: String,
        /// Chunk index, 0-255.
        idx: u8,
        /// Text to write.
        text: String,
    },
    /// Read a chunk and print it as UTF-8 (lossily), trailing zero bytes
    /// stripped.
    Read {
        /// Filename to open.
        name: String,
        /// Chunk index, 0-255.
        idx: u8,
        /// Mode to open the file in.
        #[arg(long, value_enum, default_value = "read")]
        mode: ReadMode,
    },
    /// Ask the coordinator whether a file has ever existed.
    Exists {
        /// Filename to check.
        name: String,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ReadMode {
    /// Strict-newest read; requires a live session.
    Read,
    /// Disconnection-tolerant best-effort read.
    Dread,
}

impl From<ReadMode> for FileMode {
    fn from(mode: ReadMode) -> Self {
        match mode {
            ReadMode::Read => FileMode::Read,
            ReadMode::Dread => FileMode::Dread,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(env_filter(cli.verbose))
        .init();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(error) => {
            eprintln!("failed to start async runtime: {error}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("error: {error}");
            ExitCode::FAILURE
        }
    }
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

async fn run(cli: Cli) -> Result<(), DfsError> {
    let session = Session::mount(cli.coordinator, cli.bind, cli.local_path).await?;

    let result = match cli.command {
        Command::Write { name, idx, text } => write_chunk(&session, &name, idx, &text).await,
        Command::Read { name, idx, mode } => read_chunk(&session, &name, idx, mode.into()).await,
        Command::Exists { name } => session.global_file_exists(&name).await.map(|exists| {
            println!("{exists}");
        }),
    };

    let _ = session.unmount().await;
    result
}

async fn write_chunk(session: &Session, name: &str, idx: u8, text: &str) -> Result<(), DfsError> {
    let mut payload = [0u8; BYTES_PER_CHUNK];
    let bytes = text.as_bytes();
    let n = bytes.len().min(BYTES_PER_CHUNK);
    payload[..n].copy_from_slice(&bytes[..n]);

    let handle = session.open(name, FileMode::Write).await?;
    handle.write(idx, &payload).await?;
    handle.close().await?;
    println!("wrote chunk {idx} of {name}");
    Ok(())
}

async fn read_chunk(session: &Session, name: &str, idx: u8, mode: FileMode) -> Result<(), DfsError> {
    let handle = session.open(name, mode).await?;
    let mut buf = [0u8; BYTES_PER_CHUNK];
    handle.read(idx, &mut buf).await?;
    let _ = handle.close().await;

    let text = String::from_utf8_lossy(&buf);
    println!("{}", text.trim_end_matches('\0'));
    Ok(())
}
