//! SMTP reply decoder.
//!
//! Replies arrive as CRLF-terminated lines of the form `DDD<sep>text`,
//! where `sep` is `-` on every line of a multi-line reply except the
//! last, which uses a space:
//!
//! ```text
//! 250-smtp.example.com greets you
//! 250-STARTTLS
//! 250 AUTH LOGIN PLAIN
//! ```
//!
//! [`ReplyDecoder`] is sans-I/O: the caller appends received bytes to a
//! buffer and asks for the next complete [`Reply`].

use bytes::{Buf, BytesMut};

use crate::error::{Error, Result};
use crate::types::{Reply, ReplyCode, ReplyLine};

/// Maximum line length to prevent memory exhaustion.
pub const MAX_LINE_LENGTH: usize = 64 * 1024;

/// Parses a single reply line (without its CRLF).
///
/// A bare three-digit code is accepted as a last line with empty text.
///
/// # Errors
///
/// Returns [`Error::Protocol`] naming the offending bytes if the line is
/// not `<3 digits><'-' or ' '><text>`.
pub fn parse_line(line: &[u8]) -> Result<ReplyLine> {
    let malformed = || Error::Protocol(format!("Malformed reply line: \"{}\"", line.escape_ascii()));

    let digits = line.get(..3).ok_or_else(malformed)?;
    if !digits.iter().all(u8::is_ascii_digit) {
        return Err(malformed());
    }
    let code = digits
        .iter()
        .fold(0u16, |acc, d| acc * 10 + u16::from(d - b'0'));

    let is_last = match line.get(3) {
        None | Some(b' ') => true,
        Some(b'-') => false,
        Some(_) => return Err(malformed()),
    };
    let text = line
        .get(4..)
        .map(|rest| String::from_utf8_lossy(rest).into_owned())
        .unwrap_or_default();

    Ok(ReplyLine {
        code: ReplyCode::new(code),
        text,
        is_last,
    })
}

/// Folds reply lines from a byte buffer into complete replies.
#[derive(Debug, Default)]
pub struct ReplyDecoder {
    /// Code and text of a multi-line reply still waiting for its last line.
    pending: Option<(ReplyCode, Vec<String>)>,
}

impl ReplyDecoder {
    /// Creates a new decoder.
    #[must_use]
    pub const fn new() -> Self {
        Self { pending: None }
    }

    /// Consumes complete lines from `buf` until a full reply is assembled.
    ///
    /// Returns `Ok(None)` when more bytes are needed; any incomplete line
    /// stays in `buf`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] for a malformed line, a code change
    /// inside a multi-line reply, or a line longer than [`MAX_LINE_LENGTH`].
    pub fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<Reply>> {
        loop {
            let Some(pos) = find_crlf(buf) else {
                if buf.len() > MAX_LINE_LENGTH {
                    return Err(Error::Protocol("Reply line too long".into()));
                }
                return Ok(None);
            };

            let line = parse_line(&buf[..pos])?;
            buf.advance(pos + 2);

            let (code, mut message) = match self.pending.take() {
                Some((code, _)) if code != line.code => {
                    return Err(Error::Protocol(format!(
                        "Reply code changed from {code} to {} inside multi-line reply",
                        line.code
                    )));
                }
                Some(pending) => pending,
                None => (line.code, Vec::new()),
            };
            message.push(line.text);

            if line.is_last {
                return Ok(Some(Reply::new(code, message)));
            }
            self.pending = Some((code, message));
        }
    }

    /// Like [`decode`](Self::decode), for when the peer has closed the
    /// connection.
    ///
    /// Returns `Ok(None)` only if the stream ended cleanly between replies.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if the stream ended inside a line or
    /// inside a multi-line reply.
    pub fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Reply>> {
        if let Some(reply) = self.decode(buf)? {
            return Ok(Some(reply));
        }
        if !buf.is_empty() {
            return Err(Error::Protocol(format!(
                "Connection closed inside reply line: \"{}\"",
                buf.escape_ascii()
            )));
        }
        if let Some((code, _)) = self.pending.take() {
            return Err(Error::Protocol(format!(
                "Connection closed inside multi-line {code} reply"
            )));
        }
        Ok(None)
    }
}

/// Finds the position of CRLF in a buffer.
fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\r\n")
}
