use std::io;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

/// Result of a bounded line read.
#[derive(Debug, PartialEq, Eq)]
pub enum ReadLineResult {
    /// A complete line, newline included when one was present.
    Line(Vec<u8>),
    /// The line exceeded the limit; holds the first `max_len` bytes. The
    /// remainder of the line has been consumed from the reader.
    Truncated(Vec<u8>),
    Eof,
}

/// Read a line with a size limit, preventing unbounded memory growth.
///
/// A final line without a trailing newline is still returned as a `Line`.
pub async fn read_line_with_limit<R: AsyncBufRead + Unpin>(
    reader: &mut R,
    buf: &mut Vec<u8>,
    max_len: usize,
) -> io::Result<ReadLineResult> {
    buf.clear();
    let mut seen = 0usize;

    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            if seen == 0 {
                return Ok(ReadLineResult::Eof);
            }
            return Ok(finish(buf, seen, max_len));
        }

        let (chunk_len, found_newline) = match available.iter().position(|&b| b == b'\n') {
            Some(pos) => (pos + 1, true),
            None => (available.len(), false),
        };

        let room = max_len.saturating_sub(buf.len());
        let keep = room.min(chunk_len);
        buf.extend_from_slice(&available[..keep]);
        seen += chunk_len;
        reader.consume(chunk_len);

        if found_newline {
            return Ok(finish(buf, seen, max_len));
        }
    }
}

fn finish(buf: &[u8], seen: usize, max_len: usize) -> ReadLineResult {
    if seen > max_len {
        ReadLineResult::Truncated(buf.to_vec())
    } else {
        ReadLineResult::Line(buf.to_vec())
    }
}

/// Strip a trailing `\n` / `\r\n` and decode lossily.
pub fn decode_line(bytes: &[u8]) -> String {
    let trimmed = bytes
        .strip_suffix(b"\n")
        .map(|rest| rest.strip_suffix(b"\r").unwrap_or(rest))
        .unwrap_or(bytes);
    String::from_utf8_lossy(trimmed).into_owned()
}

/// Line-at-a-time reader with a per-line byte ceiling.
pub struct LineReader<R> {
    inner: R,
    buf: Vec<u8>,
    max_len: usize,
}

/// One decoded line, flagged when it was cut at the ceiling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedLine {
    pub text: String,
    pub truncated: bool,
}

impl<R: AsyncBufRead + Unpin> LineReader<R> {
    pub fn new(inner: R, max_len: usize) -> Self {
        Self {
            inner,
            buf: Vec::new(),
            max_len,
        }
    }

    /// Next line, or `None` at end of stream.
    pub async fn next_line(&mut self) -> io::Result<Option<DecodedLine>> {
        match read_line_with_limit(&mut self.inner, &mut self.buf, self.max_len).await? {
            ReadLineResult::Line(bytes) => Ok(Some(DecodedLine {
                text: decode_line(&bytes),
                truncated: false,
            })),
            ReadLineResult::Truncated(bytes) => Ok(Some(DecodedLine {
                text: decode_line(&bytes),
                truncated: true,
            })),
            ReadLineResult::Eof => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{LineReader, ReadLineResult, decode_line, read_line_with_limit};
    use tokio::io::BufReader;

    #[tokio::test]
    async fn read_line_with_limit_truncates() -> std::io::Result<()> {
        let data = "hello world\nnext\n";
        let mut reader = BufReader::new(data.as_bytes());
        let mut buf = Vec::new();

        let result = read_line_with_limit(&mut reader, &mut buf, 5).await?;
        assert_eq!(result, ReadLineResult::Truncated(b"hello".to_vec()));

        // The rest of the oversized line was consumed.
        let result = read_line_with_limit(&mut reader, &mut buf, 5).await?;
        assert_eq!(result, ReadLineResult::Line(b"next\n".to_vec()));
        Ok(())
    }

    #[tokio::test]
    async fn final_line_without_newline_is_returned() -> std::io::Result<()> {
        let mut reader = LineReader::new(BufReader::new("a\r\nlast".as_bytes()), 1024);
        assert_eq!(reader.next_line().await?.map(|l| l.text), Some("a".into()));
        assert_eq!(
            reader.next_line().await?.map(|l| l.text),
            Some("last".into())
        );
        assert_eq!(reader.next_line().await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn small_buffer_still_assembles_long_lines() -> std::io::Result<()> {
        let data = "0123456789abcdef\n";
        let mut reader = LineReader::new(BufReader::with_capacity(4, data.as_bytes()), 64);
        let line = reader.next_line().await?.expect("line");
        assert_eq!(line.text, "0123456789abcdef");
        assert!(!line.truncated);
        Ok(())
    }

    #[test]
    fn decode_line_is_lossy() {
        assert_eq!(decode_line(b"ok\xff\n"), "ok\u{fffd}");
    }
}
