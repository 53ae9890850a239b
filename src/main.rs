//! bufdev: a shared byte device over a Unix socket
//!
//! A single fixed-capacity buffer is shared by every client connection.
//! Each connection gets its own read position and read/write permissions.
//!
//! Features:
//! - Append-only writes with a strict capacity bound
//! - Per-session read cursor with seek
//! - Per-session permission flags
//! - Configuration via CLI arguments or TOML file

mod config;
mod device;
mod protocols;
mod server;
mod session;

use config::Config;
use server::Server;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::load()?;

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(&config))
        .with_target(false)
        .init();

    info!(
        socket = %config.socket_path.display(),
        capacity = config.capacity,
        backlog = config.backlog,
        verbose = config.verbose,
        "Starting bufdev server"
    );

    let server = Server::new(config);
    server.run(shutdown_signal()).await?;

    Ok(())
}

/// Build the log filter. `RUST_LOG` wins unless `--verbose` was given.
fn log_filter(config: &Config) -> EnvFilter {
    if config.verbose {
        return EnvFilter::new(&config.log_level);
    }
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level))
}

/// Resolve on SIGINT or SIGTERM
async fn shutdown_signal() {
    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(stream) => Some(stream),
        Err(e) => {
            warn!(error = %e, "Failed to install SIGTERM handler");
            None
        }
    };

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                warn!(error = %e, "Failed to listen for SIGINT");
                std::future::pending::<()>().await;
            }
            info!("Received SIGINT");
        }
        _ = async {
            match terminate.as_mut() {
                Some(stream) => { stream.recv().await; }
                None => std::future::pending::<()>().await,
            }
        } => {
            info!("Received SIGTERM");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn test_config(verbose: bool, log_level: &str) -> Config {
        Config {
            socket_path: PathBuf::from("/tmp/bufdev-test.sock"),
            socket_mode: 0o666,
            backlog: 8,
            capacity: 1024,
            verbose,
            log_level: log_level.to_string(),
        }
    }

    #[test]
    fn test_verbose_overrides_rust_log() {
        std::env::set_var("RUST_LOG", "warn");

        let verbose = log_filter(&test_config(true, "debug"));
        assert_eq!(verbose.to_string(), "debug");

        let quiet = log_filter(&test_config(false, "info"));
        assert_eq!(quiet.to_string(), "warn");

        std::env::remove_var("RUST_LOG");
    }
}
