use std::io::{self, BufRead, Read};

use super::error::SessionError;

/// Longest reply line kept, CRLF included (RFC 5321 4.5.3.1.5).
pub const MAX_LINE_LEN: usize = 512;
/// Lines accepted in one multi-line reply before reading stops.
pub const MAX_REPLY_LINES: usize = 100;

/// One parsed reply line: `<code><sep><text>`.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub code: u16,
    /// `true` when the line ends in `-` position, i.e. more lines follow.
    pub continuation: bool,
    pub text: String,
}

impl Reply {
    pub fn parse(line: &str) -> Result<Self, SessionError> {
        let raw = line.trim_end_matches(['\r', '\n']);
        let bytes = raw.as_bytes();
        if bytes.len() < 3 || !bytes[..3].iter().all(u8::is_ascii_digit) {
            return Err(SessionError::UnparseableReply {
                line: raw.to_string(),
            });
        }
        let code = raw[..3]
            .parse::<u16>()
            .map_err(|_| SessionError::UnparseableReply {
                line: raw.to_string(),
            })?;
        let continuation = bytes.get(3).copied() == Some(b'-');
        let text = raw.get(4..).unwrap_or_default().trim().to_string();
        Ok(Self {
            code,
            continuation,
            text,
        })
    }
}

/// Leading three-digit code of an accumulated reply.
pub fn reply_code(text: &str) -> Result<u16, SessionError> {
    Reply::parse(text.trim_start()).map(|reply| reply.code)
}

/// A line continues its reply when it starts with three digits followed by `-`.
pub fn is_continuation(line: &str) -> bool {
    Reply::parse(line).is_ok_and(|reply| reply.continuation)
}

/// Read one line, CRLF included, at most [`MAX_LINE_LEN`] bytes. `Ok(None)`
/// on end of stream.
pub(crate) fn read_line<R: BufRead + ?Sized>(reader: &mut R) -> io::Result<Option<String>> {
    Ok(read_bounded(reader)?.map(|(line, _)| line))
}

/// Like [`read_line`], also telling whether the line was cut at the limit.
fn read_bounded<R: BufRead + ?Sized>(reader: &mut R) -> io::Result<Option<(String, bool)>> {
    let mut buf = Vec::new();
    let read = (&mut *reader)
        .take(MAX_LINE_LEN as u64)
        .read_until(b'\n', &mut buf)?;
    if read == 0 {
        return Ok(None);
    }
    let truncated = !buf.ends_with(b"\n") && read == MAX_LINE_LEN;
    Ok(Some((String::from_utf8_lossy(&buf).into_owned(), truncated)))
}

/// Collected lines of a (possibly multi-line) reply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplyLines {
    pub lines: Vec<String>,
}

impl ReplyLines {
    /// Read until the first line whose parsed [`Reply`] does not continue.
    /// A read error, EOF, an overlong line or [`MAX_REPLY_LINES`] stops
    /// accumulation and keeps what was read.
    pub(crate) fn read<R: BufRead + ?Sized>(reader: &mut R) -> Self {
        let mut lines = Vec::new();
        while lines.len() < MAX_REPLY_LINES {
            let (line, truncated) = match read_bounded(reader) {
                Ok(Some(read)) => read,
                Ok(None) => break,
                Err(err) => {
                    tracing::debug!(error = %err, "reply read interrupted");
                    break;
                }
            };
            let more = !truncated && is_continuation(&line);
            lines.push(line);
            if !more {
                break;
            }
        }
        if lines.len() == MAX_REPLY_LINES {
            tracing::debug!(limit = MAX_REPLY_LINES, "reply cut at line limit");
        }
        Self { lines }
    }

    pub fn contains_ignore_case(&self, token: &str) -> bool {
        let needle = token.to_ascii_uppercase();
        self.lines
            .iter()
            .any(|line| line.to_ascii_uppercase().contains(&needle))
    }

    pub fn text(&self) -> String {
        self.lines
            .iter()
            .map(|line| line.trim())
            .collect::<Vec<_>>()
            .join("\n")
            .trim()
            .to_string()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}
