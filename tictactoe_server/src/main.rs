// CLI entry point for the tic-tac-toe session server.
//
// Starts a standalone server that two players connect to. See `server.rs`
// for the networking architecture and `game.rs` for the rules.
//
// Usage:
//   tictactoe-server [OPTIONS]
//     --host <HOST>                Bind address (default: 127.0.0.1)
//     --port <PORT>                Listen port (default: 12345)
//     --idle-timeout-secs <SECS>   Drop peers silent for this long (optional)
//
// Log verbosity follows `RUST_LOG` and defaults to `info`.

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tictactoe_server::{ServerConfig, start_server};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Two-player tic-tac-toe session server
#[derive(Parser, Debug)]
#[command(name = "tictactoe-server")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value_t = 12345)]
    port: u16,

    /// Disconnect a player that sends nothing for this many seconds
    #[arg(long)]
    idle_timeout_secs: Option<u64>,
}

impl From<Cli> for ServerConfig {
    fn from(cli: Cli) -> Self {
        Self {
            host: cli.host,
            port: cli.port,
            idle_timeout: cli.idle_timeout_secs.map(Duration::from_secs),
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::from(Cli::parse());
    let bind = format!("{}:{}", config.host, config.port);

    let (handle, addr) =
        start_server(config).with_context(|| format!("failed to start server on {bind}"))?;
    info!(%addr, "ready for players; press Ctrl+C to stop");

    // The server only exits on `stop`; a standalone process runs until killed.
    handle.join();
    Ok(())
}
