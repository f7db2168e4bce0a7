//! Control-socket wire protocol.
//!
//! The protocol is plain text: one newline-terminated command goes out, one
//! unstructured reply comes back (CSV for `show stat`, `key: value` lines for
//! `show info`, free text otherwise). Replies are returned undecoded.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::num::NonZeroUsize;

/// Default read buffer size.
pub const DEFAULT_BUFFER_SIZE: NonZeroUsize = match NonZeroUsize::new(2000) {
    Some(size) => size,
    None => panic!("buffer size must be non-zero"),
};

/// Default upper bound on a reply collected with [`ReadMode::ToEnd`] (16 MiB).
pub const DEFAULT_MAX_RESPONSE_BYTES: NonZeroUsize = match NonZeroUsize::new(16 * 1024 * 1024) {
    Some(size) => size,
    None => panic!("response limit must be non-zero"),
};

/// A control command, normalized to end with a newline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command(String);

impl Command {
    /// Create a command, appending a newline unless one is already present.
    /// The contents are not escaped or validated.
    pub fn new(line: impl Into<String>) -> Self {
        let mut line = line.into();
        if !line.ends_with('\n') {
            line.push('\n');
        }
        Self(line)
    }

    /// The exact bytes transmitted to the peer.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// The command without its terminating newline, for display.
    pub fn line(&self) -> &str {
        self.0.strip_suffix('\n').unwrap_or(&self.0)
    }
}

/// How much of the reply to collect.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReadMode {
    /// One read of at most `buffer_size` bytes. Longer replies are truncated.
    #[default]
    Single,
    /// Read `buffer_size` chunks until the peer closes its side.
    ///
    /// Without a timeout this waits as long as the peer keeps the connection
    /// open, so it only suits commands after which the peer closes (the
    /// non-interactive admin socket does). The collected reply is capped at
    /// `max_response_bytes`.
    ToEnd,
}

/// Raw bytes read back from the control socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    bytes: Vec<u8>,
    capacity: usize,
    mode: ReadMode,
}

impl Response {
    pub fn new(bytes: Vec<u8>, capacity: usize, mode: ReadMode) -> Self {
        Self {
            bytes,
            capacity,
            mode,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Lossy UTF-8 view of the reply.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.bytes)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// The peer closed without sending anything.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// A single read filled the whole buffer, so the peer may have had more to send.
    pub fn may_be_truncated(&self) -> bool {
        self.mode == ReadMode::Single && self.bytes.len() >= self.capacity
    }
}

/// Single-shot command writing and reply reading.
pub mod wire {
    use super::{Command, ReadMode, Response};
    use std::io;
    use std::num::NonZeroUsize;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    /// Write the command with exactly one write call.
    ///
    /// A short write is an error; the remainder is never retried.
    pub async fn write_command<W>(writer: &mut W, command: &Command) -> io::Result<()>
    where
        W: AsyncWriteExt + Unpin,
    {
        let bytes = command.as_bytes();
        let written = writer.write(bytes).await?;
        if written < bytes.len() {
            return Err(io::Error::new(
                io::ErrorKind::WriteZero,
                format!("short write: {} of {} bytes", written, bytes.len()),
            ));
        }
        writer.flush().await?;
        Ok(())
    }

    /// Read the reply into an owned buffer of `capacity` bytes.
    ///
    /// In [`ReadMode::Single`] exactly one read is issued and zero bytes is a
    /// valid empty reply. In [`ReadMode::ToEnd`] reads repeat until EOF; a
    /// reply longer than `max_len` fails with [`io::ErrorKind::InvalidData`].
    pub async fn read_response<R>(
        reader: &mut R,
        capacity: NonZeroUsize,
        mode: ReadMode,
        max_len: NonZeroUsize,
    ) -> io::Result<Response>
    where
        R: AsyncReadExt + Unpin,
    {
        let capacity = capacity.get();
        let mut buf = vec![0u8; capacity];
        let bytes = match mode {
            ReadMode::Single => {
                let n = reader.read(&mut buf).await?;
                buf.truncate(n);
                buf
            }
            ReadMode::ToEnd => {
                let mut collected = Vec::with_capacity(capacity);
                loop {
                    let n = reader.read(&mut buf).await?;
                    if n == 0 {
                        break;
                    }
                    if collected.len() + n > max_len.get() {
                        return Err(io::Error::new(
                            io::ErrorKind::InvalidData,
                            format!("reply exceeds {} bytes", max_len),
                        ));
                    }
                    collected.extend_from_slice(&buf[..n]);
                }
                collected
            }
        };
        Ok(Response::new(bytes, capacity, mode))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn size(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    #[test]
    fn test_command_appends_newline() {
        let cmd = Command::new("show stat");
        assert_eq!(cmd.as_bytes(), b"show stat\n");
        assert_eq!(cmd.line(), "show stat");
    }

    #[test]
    fn test_command_no_double_newline() {
        let cmd = Command::new("show info\n");
        assert_eq!(cmd.as_bytes(), b"show info\n");
    }

    #[test]
    fn test_command_not_escaped() {
        let cmd = Command::new("set weight be/srv 10; show stat");
        assert_eq!(cmd.as_bytes(), b"set weight be/srv 10; show stat\n");

        let empty = Command::new("");
        assert_eq!(empty.as_bytes(), b"\n");
    }

    #[test]
    fn test_read_mode_serde() {
        #[derive(Deserialize)]
        struct Wrapper {
            mode: ReadMode,
        }
        let w: Wrapper = toml::from_str(r#"mode = "to-end""#).unwrap();
        assert_eq!(w.mode, ReadMode::ToEnd);
        let w: Wrapper = toml::from_str(r#"mode = "single""#).unwrap();
        assert_eq!(w.mode, ReadMode::Single);
    }

    #[test]
    fn test_response_truncation_hint() {
        let full = Response::new(vec![b'x'; 16], 16, ReadMode::Single);
        assert!(full.may_be_truncated());

        let partial = Response::new(vec![b'x'; 15], 16, ReadMode::Single);
        assert!(!partial.may_be_truncated());

        let drained = Response::new(vec![b'x'; 64], 16, ReadMode::ToEnd);
        assert!(!drained.may_be_truncated());
    }

    #[tokio::test]
    async fn test_write_command_single_write() {
        let mut out = Vec::new();
        wire::write_command(&mut out, &Command::new("show pools"))
            .await
            .unwrap();
        assert_eq!(out, b"show pools\n");
    }

    #[tokio::test]
    async fn test_read_single_truncates() {
        let reply = vec![b'a'; 5000];
        let mut reader = &reply[..];
        let resp = wire::read_response(
            &mut reader,
            DEFAULT_BUFFER_SIZE,
            ReadMode::Single,
            DEFAULT_MAX_RESPONSE_BYTES,
        )
        .await
            .unwrap();
        assert_eq!(resp.len(), DEFAULT_BUFFER_SIZE.get());
        assert!(resp.may_be_truncated());
    }

    #[tokio::test]
    async fn test_read_to_end_collects_everything() {
        let reply = vec![b'a'; 5000];
        let mut reader = &reply[..];
        let resp = wire::read_response(
            &mut reader,
            DEFAULT_BUFFER_SIZE,
            ReadMode::ToEnd,
            DEFAULT_MAX_RESPONSE_BYTES,
        )
        .await
            .unwrap();
        assert_eq!(resp.as_bytes(), &reply[..]);
    }

    #[tokio::test]
    async fn test_read_empty_is_ok() {
        let mut reader: &[u8] = &[];
        let resp = wire::read_response(&mut reader, size(16), ReadMode::Single, size(16))
            .await
            .unwrap();
        assert!(resp.is_empty());
    }

    #[tokio::test]
    async fn test_read_one_byte_buffer() {
        let mut reader: &[u8] = b"ready\n";
        let resp = wire::read_response(&mut reader, size(1), ReadMode::Single, size(16))
            .await
            .unwrap();
        assert_eq!(resp.as_bytes(), b"r");
        assert!(resp.may_be_truncated());
    }

    #[tokio::test]
    async fn test_read_to_end_limit() {
        let reply = vec![b'a'; 100];

        let mut reader = &reply[..];
        let resp = wire::read_response(&mut reader, size(16), ReadMode::ToEnd, size(100))
            .await
            .unwrap();
        assert_eq!(resp.len(), 100);

        let mut reader = &reply[..];
        let err = wire::read_response(&mut reader, size(16), ReadMode::ToEnd, size(99))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }
}
