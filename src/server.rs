//! Unix socket server for the shared device.
//!
//! Binds the socket, accepts connections, and spawns one task per
//! connection against the shared device.

use crate::config::Config;
use crate::device::Device;
use crate::protocols::device::handle_connection;
use std::fs;
use std::future::Future;
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::net::UnixListener;
use tracing::{debug, error, info, warn};

/// Server instance
pub struct Server {
    config: Config,
    device: Arc<Device>,
}

impl Server {
    /// Create a new server instance
    pub fn new(config: Config) -> Self {
        let device = Device::new(config.capacity);
        Server { config, device }
    }

    /// Accept connections until `shutdown` resolves or accept fails.
    ///
    /// The socket file is removed when this returns.
    pub async fn run<F>(&self, shutdown: F) -> io::Result<()>
    where
        F: Future<Output = ()>,
    {
        let (listener, _guard) = bind_listener(&self.config)?;
        info!(
            path = %self.config.socket_path.display(),
            capacity = self.device.capacity(),
            "Server listening"
        );

        tokio::pin!(shutdown);
        let mut next_conn: u64 = 0;

        loop {
            let accepted = tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutting down");
                    return Ok(());
                }
                accepted = listener.accept() => accepted,
            };

            match accepted {
                Ok((stream, _)) => {
                    next_conn += 1;
                    let conn = next_conn;
                    debug!(conn, "New connection");

                    let device = Arc::clone(&self.device);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, device, conn).await {
                            debug!(conn, error = %e, "Connection error");
                        }
                        debug!(conn, "Connection closed");
                    });
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    error!(error = %e, "Failed to accept connection");
                    return Err(e);
                }
            }
        }
    }

    /// Get a reference to the device for testing
    #[cfg(test)]
    pub fn device(&self) -> &Arc<Device> {
        &self.device
    }
}

/// Removes the socket file when dropped
struct SocketGuard {
    path: PathBuf,
}

impl Drop for SocketGuard {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "Removed socket"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), error = %e, "Failed to remove socket"),
        }
    }
}

/// Remove a stale socket, bind, apply the file mode and start listening.
fn bind_listener(config: &Config) -> io::Result<(UnixListener, SocketGuard)> {
    let path = config.socket_path.as_path();
    remove_stale(path)?;

    let socket = socket2::Socket::new(socket2::Domain::UNIX, socket2::Type::STREAM, None)?;
    socket.bind(&socket2::SockAddr::unix(path)?)?;
    let guard = SocketGuard {
        path: path.to_path_buf(),
    };

    fs::set_permissions(path, fs::Permissions::from_mode(config.socket_mode))?;
    socket.listen(config.backlog)?;
    socket.set_nonblocking(true)?;

    let listener = UnixListener::from_std(socket.into())?;
    Ok((listener, guard))
}

fn remove_stale(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => {
            debug!(path = %path.display(), "Removed stale socket");
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}
