//! Device protocol connection handler.
//!
//! Drives one session: read a chunk, interpret it, write the reply, repeat
//! until EOF, a transport error, or EXIT.

use super::interpreter::execute;
use super::parser::Parser;
use crate::device::Device;
use crate::session::Session;
use std::io;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, trace, Level};

/// Largest chunk taken from the socket per command
const READ_CHUNK: usize = 1023;

/// Handle a single client connection.
///
/// Each read is one command; a command split across reads is seen as
/// separate fragments.
pub async fn handle_connection<S>(mut stream: S, device: Arc<Device>, conn: u64) -> io::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut session = Session::new();
    let mut chunk = [0u8; READ_CHUNK];

    loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            trace!(conn, "Connection closed by client");
            return Ok(());
        }

        if tracing::enabled!(Level::DEBUG) {
            let raw = String::from_utf8_lossy(&chunk[..n]);
            debug!(conn, bytes = n, command = %raw.trim_end(), "Received command");
        }

        let command = Parser::parse(&chunk[..n]);
        let reply = execute(&command, &mut session, &device);

        stream.write_all(&reply.data).await?;

        if reply.close {
            trace!(conn, "Session ended by EXIT");
            stream.shutdown().await?;
            return Ok(());
        }
    }
}
