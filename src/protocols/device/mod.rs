//! Device protocol implementation.
//!
//! A line-oriented text protocol over a Unix stream socket. Every received
//! chunk is one command; every command gets exactly one reply ending in `\n`.
//!
//! ## Commands
//!
//! ```text
//! WRITE <text>      append text to the device           -> OK
//! READ              read from session position to end   -> <data>\nOK
//! CLEAR             empty the device, rewind session    -> OK
//! STATUS            cursor, content length, flags       -> Cursor: 5, Buf_len: 5, Flags: RW
//! SETFLAG <flag>    READ | WRITE | NOREAD | NOWRITE     -> OK
//! SEEK <n>          move session position (n <= cursor) -> OK
//! EXIT              close the connection                -> BYE
//! ```
//!
//! ## Errors
//!
//! Errors are session-scoped and never close the connection:
//!
//! ```text
//! ERR: no write permission
//! ERR: no read permission
//! ERR: overflow
//! ERR: unknown flag
//! ERR: invalid position
//! ERR: unknown command
//! ```

pub mod handler;
pub mod interpreter;
pub mod parser;

pub use handler::handle_connection;
