use std::borrow::Cow;
use tokio::io::{self, AsyncBufRead, AsyncBufReadExt};
use tracing::debug;

/// Line reader that never fails on bad encoding.
///
/// Bytes that are not valid UTF-8 are replaced with U+FFFD instead of ending
/// the stream. Partially read lines are kept in the buffer, so a `next_line`
/// future dropped by a timeout or `select!` loses nothing.
pub struct LineReader<R> {
    reader: R,
    buf: Vec<u8>,
}

impl<R: AsyncBufRead + Unpin> LineReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
        }
    }

    /// Next line without its `\n` / `\r\n` terminator, `None` at end of input
    pub async fn next_line(&mut self) -> io::Result<Option<String>> {
        let read = self.reader.read_until(b'\n', &mut self.buf).await?;
        if read == 0 && self.buf.is_empty() {
            return Ok(None);
        }

        let mut end = self.buf.len();
        if self.buf.ends_with(b"\n") {
            end -= 1;
            if end > 0 && self.buf[end - 1] == b'\r' {
                end -= 1;
            }
        }

        let line = match String::from_utf8_lossy(&self.buf[..end]) {
            Cow::Borrowed(text) => text.to_string(),
            Cow::Owned(text) => {
                debug!("Replaced invalid UTF-8 in line: {text}");
                text
            }
        };
        self.buf.clear();
        Ok(Some(line))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::io::{AsyncWriteExt, BufReader};

    async fn collect(input: &[u8]) -> Vec<String> {
        let mut reader = LineReader::new(input);
        let mut lines = Vec::new();
        while let Some(line) = reader.next_line().await.unwrap() {
            lines.push(line);
        }
        lines
    }

    #[tokio::test]
    async fn test_plain_lines() {
        assert_eq!(collect(b"uci\nisready\n").await, ["uci", "isready"]);
        assert_eq!(collect(b"uci\r\nquit").await, ["uci", "quit"]);
        assert!(collect(b"").await.is_empty());
        assert_eq!(collect(b"\n\n").await, ["", ""]);
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_replaced() {
        let lines = collect(b"stop\n\xff\xfe\nisready\n").await;
        assert_eq!(lines, ["stop", "\u{FFFD}\u{FFFD}", "isready"]);
    }

    #[tokio::test]
    async fn test_partial_line_survives_cancellation() {
        let (mut writer, reader) = tokio::io::duplex(64);
        let mut lines = LineReader::new(BufReader::new(reader));

        writer.write_all(b"best").await.unwrap();
        let timed_out = tokio::time::timeout(Duration::from_millis(50), lines.next_line()).await;
        assert!(timed_out.is_err());

        writer.write_all(b"move e2e4\n").await.unwrap();
        assert_eq!(lines.next_line().await.unwrap().as_deref(), Some("bestmove e2e4"));
    }
}
