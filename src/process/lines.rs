//! Line splitting for tool output streams
//!
//! ffmpeg rewrites its status line in place with a bare `\r`, so both `\r`
//! and `\n` terminate a line here. Empty segments (from `\r\n`) are skipped.

use std::io;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

/// Longest line kept in memory; longer runs without a terminator are split
pub const MAX_LINE_BYTES: usize = 64 * 1024;

/// Reads `\r`/`\n` terminated lines from an async buffered reader.
///
/// `next_line` is cancel safe: partial data is kept in the reader between polls,
/// so it can be used as a `tokio::select!` branch.
pub struct LineReader<R> {
    inner: R,
    pending: Vec<u8>,
}

impl<R: AsyncBufRead + Unpin> LineReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            pending: Vec::new(),
        }
    }

    /// Next non-empty line, or `None` at end of stream
    pub async fn next_line(&mut self) -> io::Result<Option<String>> {
        loop {
            let available = self.inner.fill_buf().await?;

            if available.is_empty() {
                if self.pending.is_empty() {
                    return Ok(None);
                }
                return Ok(Some(self.take_pending()));
            }

            match available.iter().position(|b| *b == b'\n' || *b == b'\r') {
                Some(pos) => {
                    self.pending.extend_from_slice(&available[..pos]);
                    self.inner.consume(pos + 1);
                    if self.pending.is_empty() {
                        continue;
                    }
                    return Ok(Some(self.take_pending()));
                }
                None => {
                    let room = MAX_LINE_BYTES.saturating_sub(self.pending.len());
                    let len = available.len().min(room);
                    self.pending.extend_from_slice(&available[..len]);
                    self.inner.consume(len);
                    if self.pending.len() >= MAX_LINE_BYTES {
                        return Ok(Some(self.take_pending()));
                    }
                }
            }
        }
    }

    fn take_pending(&mut self) -> String {
        let bytes = std::mem::take(&mut self.pending);
        String::from_utf8_lossy(&bytes).into_owned()
    }
}
