//! Device protocol parser and response generator.

use bytes::{Bytes, BytesMut};
use std::str;

/// Parsed device command.
///
/// Arguments are kept raw; the interpreter decides whether they are valid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Append data to the device
    Write { data: Bytes },
    /// Read from the session position to the cursor
    Read,
    /// Empty the device and rewind the session
    Clear,
    /// Report cursor, content length and permissions
    Status,
    /// Grant or revoke a permission
    SetFlag { name: Bytes },
    /// Close the connection
    Exit,
    /// Move the session position
    Seek { target: Bytes },
    /// Anything else
    Unknown,
}

/// Permission change requested by SETFLAG
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flag {
    Read,
    Write,
    NoRead,
    NoWrite,
}

impl Flag {
    /// Match a flag name exactly (case-sensitive)
    pub fn parse(name: &[u8]) -> Option<Self> {
        match name {
            b"READ" => Some(Flag::Read),
            b"WRITE" => Some(Flag::Write),
            b"NOREAD" => Some(Flag::NoRead),
            b"NOWRITE" => Some(Flag::NoWrite),
            _ => None,
        }
    }
}

/// Parse a SEEK target as a non-negative offset
pub fn parse_position(target: &[u8]) -> Option<usize> {
    str::from_utf8(target).ok()?.trim().parse().ok()
}

/// Keywords in match order. Matching is by prefix, so order matters.
const KEYWORDS: &[&[u8]] = &[
    b"WRITE", b"READ", b"CLEAR", b"STATUS", b"SETFLAG", b"EXIT", b"SEEK",
];

/// Parser for the device text protocol
pub struct Parser;

impl Parser {
    /// Parse one received chunk as a single command line
    pub fn parse(chunk: &[u8]) -> Command {
        let line = strip_line_ending(chunk);

        let Some(keyword) = KEYWORDS.iter().find(|k| line.starts_with(k)) else {
            return Command::Unknown;
        };
        let arg = || Bytes::copy_from_slice(argument(&line[keyword.len()..]));

        match *keyword {
            b"WRITE" => Command::Write { data: arg() },
            b"READ" => Command::Read,
            b"CLEAR" => Command::Clear,
            b"STATUS" => Command::Status,
            b"SETFLAG" => Command::SetFlag { name: arg() },
            b"EXIT" => Command::Exit,
            b"SEEK" => Command::Seek { target: arg() },
            _ => Command::Unknown,
        }
    }
}

/// Drop a single trailing `\n` or `\r\n`
fn strip_line_ending(chunk: &[u8]) -> &[u8] {
    chunk
        .strip_suffix(b"\r\n")
        .or_else(|| chunk.strip_suffix(b"\n"))
        .unwrap_or(chunk)
}

/// Skip the one whitespace byte separating keyword and argument
fn argument(rest: &[u8]) -> &[u8] {
    match rest.first() {
        Some(b) if b.is_ascii_whitespace() => &rest[1..],
        _ => rest,
    }
}

/// Response generator for the device protocol
pub struct Response;

impl Response {
    pub fn ok() -> &'static [u8] {
        b"OK\n"
    }

    pub fn bye() -> &'static [u8] {
        b"BYE\n"
    }

    /// READ payload followed by its trailer
    pub fn payload(data: &[u8]) -> BytesMut {
        let mut response = BytesMut::with_capacity(data.len() + 4);
        response.extend_from_slice(data);
        response.extend_from_slice(b"\nOK\n");
        response
    }

    pub fn status(cursor: usize, content_len: usize, flags: &str) -> BytesMut {
        let mut response = BytesMut::new();
        response.extend_from_slice(
            format!("Cursor: {cursor}, Buf_len: {content_len}, Flags: {flags}\n").as_bytes(),
        );
        response
    }

    /// Generate an `ERR: <msg>` line
    pub fn error(msg: &str) -> BytesMut {
        let mut response = BytesMut::new();
        response.extend_from_slice(format!("ERR: {msg}\n").as_bytes());
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_write() {
        assert_eq!(
            Parser::parse(b"WRITE hello world\n"),
            Command::Write {
                data: Bytes::from_static(b"hello world")
            }
        );
    }

    #[test]
    fn test_parse_write_keeps_inner_whitespace() {
        assert_eq!(
            Parser::parse(b"WRITE   padded  \r\n"),
            Command::Write {
                data: Bytes::from_static(b"  padded  ")
            }
        );
    }

    #[test]
    fn test_parse_write_without_argument() {
        assert_eq!(
            Parser::parse(b"WRITE"),
            Command::Write { data: Bytes::new() }
        );
    }

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!(Parser::parse(b"READ\n"), Command::Read);
        assert_eq!(Parser::parse(b"CLEAR"), Command::Clear);
        assert_eq!(Parser::parse(b"STATUS\r\n"), Command::Status);
        assert_eq!(Parser::parse(b"EXIT\n"), Command::Exit);
    }

    #[test]
    fn test_parse_prefix_match() {
        // Keywords match by prefix, trailing bytes are ignored
        assert_eq!(Parser::parse(b"READALL\n"), Command::Read);
        assert_eq!(Parser::parse(b"EXITNOW"), Command::Exit);
    }

    #[test]
    fn test_parse_setflag() {
        assert_eq!(
            Parser::parse(b"SETFLAG NOWRITE\n"),
            Command::SetFlag {
                name: Bytes::from_static(b"NOWRITE")
            }
        );
    }

    #[test]
    fn test_parse_seek() {
        assert_eq!(
            Parser::parse(b"SEEK 42\n"),
            Command::Seek {
                target: Bytes::from_static(b"42")
            }
        );
    }

    #[test]
    fn test_parse_is_case_sensitive() {
        assert_eq!(Parser::parse(b"write hello\n"), Command::Unknown);
        assert_eq!(Parser::parse(b"Status\n"), Command::Unknown);
    }

    #[test]
    fn test_parse_unknown() {
        assert_eq!(Parser::parse(b"HELLO\n"), Command::Unknown);
        assert_eq!(Parser::parse(b"\n"), Command::Unknown);
        // A command split across two reads arrives as two fragments
        assert_eq!(Parser::parse(b"WRI"), Command::Unknown);
    }

    #[test]
    fn test_flag_parse() {
        assert_eq!(Flag::parse(b"READ"), Some(Flag::Read));
        assert_eq!(Flag::parse(b"WRITE"), Some(Flag::Write));
        assert_eq!(Flag::parse(b"NOREAD"), Some(Flag::NoRead));
        assert_eq!(Flag::parse(b"NOWRITE"), Some(Flag::NoWrite));
        assert_eq!(Flag::parse(b"nowrite"), None);
        assert_eq!(Flag::parse(b"EXEC"), None);
        assert_eq!(Flag::parse(b""), None);
    }

    #[test]
    fn test_parse_position() {
        assert_eq!(parse_position(b"0"), Some(0));
        assert_eq!(parse_position(b" 17 "), Some(17));
        assert_eq!(parse_position(b"-1"), None);
        assert_eq!(parse_position(b"abc"), None);
        assert_eq!(parse_position(b""), None);
        assert_eq!(parse_position(b"99999999999999999999999"), None);
    }

    #[test]
    fn test_response_payload() {
        assert_eq!(&Response::payload(b"hello")[..], b"hello\nOK\n");
        assert_eq!(&Response::payload(b"")[..], b"\nOK\n");
    }

    #[test]
    fn test_response_status() {
        assert_eq!(
            &Response::status(5, 5, "RW")[..],
            b"Cursor: 5, Buf_len: 5, Flags: RW\n"
        );
        assert_eq!(
            &Response::status(0, 0, "")[..],
            b"Cursor: 0, Buf_len: 0, Flags: \n"
        );
    }

    #[test]
    fn test_response_error() {
        assert_eq!(&Response::error("overflow")[..], b"ERR: overflow\n");
    }
}
