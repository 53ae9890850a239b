//! Command execution against a session and the shared device.
//!
//! Every command is interpreted on its own from the current session and
//! device state; nothing is carried between commands except the session.

use super::parser::{parse_position, Command, Flag, Response};
use crate::device::{Device, DeviceError};
use crate::session::{Access, Session};
use bytes::BytesMut;

/// Client-visible command failures.
///
/// `Display` renders the exact text sent after `ERR: `.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandError {
    PermissionDenied(Access),
    Overflow,
    InvalidPosition,
    UnknownFlag,
    UnknownCommand,
}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandError::PermissionDenied(Access::Read) => write!(f, "no read permission"),
            CommandError::PermissionDenied(Access::Write) => write!(f, "no write permission"),
            CommandError::Overflow => write!(f, "overflow"),
            CommandError::InvalidPosition => write!(f, "invalid position"),
            CommandError::UnknownFlag => write!(f, "unknown flag"),
            CommandError::UnknownCommand => write!(f, "unknown command"),
        }
    }
}

impl std::error::Error for CommandError {}

impl From<DeviceError> for CommandError {
    fn from(e: DeviceError) -> Self {
        match e {
            DeviceError::Overflow => CommandError::Overflow,
        }
    }
}

/// Outcome of one command
#[derive(Debug)]
pub struct Reply {
    pub data: BytesMut,
    /// Close the connection after sending
    pub close: bool,
}

impl Reply {
    fn send(data: impl Into<BytesMut>) -> Self {
        Reply {
            data: data.into(),
            close: false,
        }
    }
}

/// Execute a command, producing exactly one reply
pub fn execute(command: &Command, session: &mut Session, device: &Device) -> Reply {
    match dispatch(command, session, device) {
        Ok(reply) => reply,
        Err(e) => Reply::send(Response::error(&e.to_string())),
    }
}

fn dispatch(
    command: &Command,
    session: &mut Session,
    device: &Device,
) -> Result<Reply, CommandError> {
    match command {
        Command::Write { data } => {
            require(session, Access::Write)?;
            device.append(data)?;
            Ok(Reply::send(Response::ok()))
        }

        Command::Read => {
            require(session, Access::Read)?;
            let data = device.read_from(session.position);
            session.position += data.len();
            Ok(Reply::send(Response::payload(&data)))
        }

        Command::Clear => {
            device.reset();
            session.position = 0;
            Ok(Reply::send(Response::ok()))
        }

        Command::Status => {
            let snapshot = device.snapshot();
            Ok(Reply::send(Response::status(
                snapshot.cursor,
                snapshot.content_len,
                &session.permissions.letters(),
            )))
        }

        Command::SetFlag { name } => {
            let perms = &mut session.permissions;
            match Flag::parse(name).ok_or(CommandError::UnknownFlag)? {
                Flag::Read => perms.grant(Access::Read),
                Flag::Write => perms.grant(Access::Write),
                Flag::NoRead => perms.revoke(Access::Read),
                Flag::NoWrite => perms.revoke(Access::Write),
            }
            Ok(Reply::send(Response::ok()))
        }

        Command::Seek { target } => {
            let position = parse_position(target).ok_or(CommandError::InvalidPosition)?;
            if position > device.cursor() {
                return Err(CommandError::InvalidPosition);
            }
            session.position = position;
            Ok(Reply::send(Response::ok()))
        }

        Command::Exit => Ok(Reply {
            data: BytesMut::from(Response::bye()),
            close: true,
        }),

        Command::Unknown => Err(CommandError::UnknownCommand),
    }
}

fn require(session: &Session, access: Access) -> Result<(), CommandError> {
    if session.permissions.allows(access) {
        Ok(())
    } else {
        Err(CommandError::PermissionDenied(access))
    }
}
