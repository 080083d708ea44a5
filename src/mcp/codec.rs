//! Line codec for the MCP stdio transport.
//!
//! Message format: one UTF-8 JSON document per line, terminated by `\n`
//! (a trailing `\r` is tolerated). Lines longer than `max_message_bytes` are
//! discarded up to the next newline and reported as [`Inbound::Oversized`].

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// One unit read from the transport.
#[derive(Debug, PartialEq, Eq)]
pub enum Inbound {
    Message(Vec<u8>),
    /// Line exceeded the limit; carries the number of bytes dropped.
    Oversized(usize),
}

/// Read the next non-empty line. Returns `None` on clean EOF.
pub async fn read_message<R: AsyncBufRead + Unpin>(
    reader: &mut R,
    max_message_bytes: usize,
) -> std::io::Result<Option<Inbound>> {
    loop {
        let mut buf = Vec::new();
        let limit = max_message_bytes as u64 + 1;
        let read = (&mut *reader).take(limit).read_until(b'\n', &mut buf).await?;
        if read == 0 {
            return Ok(None);
        }

        let terminated = buf.last() == Some(&b'\n');
        if !terminated && buf.len() > max_message_bytes {
            let dropped = buf.len() + discard_line(reader).await?;
            return Ok(Some(Inbound::Oversized(dropped)));
        }

        while matches!(buf.last(), Some(b'\n' | b'\r')) {
            buf.pop();
        }
        if buf.iter().all(u8::is_ascii_whitespace) {
            if !terminated {
                return Ok(None);
            }
            continue;
        }
        return Ok(Some(Inbound::Message(buf)));
    }
}

/// Skip input up to and including the next newline.
async fn discard_line<R: AsyncBufRead + Unpin>(reader: &mut R) -> std::io::Result<usize> {
    let mut dropped = 0;
    loop {
        let chunk = reader.fill_buf().await?;
        if chunk.is_empty() {
            return Ok(dropped);
        }
        match chunk.iter().position(|b| *b == b'\n') {
            Some(pos) => {
                reader.consume(pos + 1);
                return Ok(dropped + pos + 1);
            }
            None => {
                let len = chunk.len();
                reader.consume(len);
                dropped += len;
            }
        }
    }
}

/// Write one message followed by a newline and flush.
pub async fn write_message<W: AsyncWrite + Unpin>(
    writer: &mut W,
    message: &serde_json::Value,
) -> std::io::Result<()> {
    let mut bytes = serde_json::to_vec(message)?;
    bytes.push(b'\n');
    writer.write_all(&bytes).await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::BufReader;

    async fn read_all(input: &[u8], max: usize) -> Vec<Inbound> {
        let mut reader = BufReader::new(input);
        let mut out = Vec::new();
        while let Some(item) = read_message(&mut reader, max).await.unwrap() {
            out.push(item);
        }
        out
    }

    #[tokio::test]
    async fn test_reads_lines_and_skips_blank() {
        let items = read_all(b"{\"a\":1}\r\n\n  \n{\"b\":2}", 64).await;
        assert_eq!(
            items,
            vec![
                Inbound::Message(b"{\"a\":1}".to_vec()),
                Inbound::Message(b"{\"b\":2}".to_vec()),
            ]
        );
    }

    #[tokio::test]
    async fn test_oversized_line_is_dropped_and_stream_continues() {
        let mut input = vec![b'x'; 100];
        input.extend_from_slice(b"\n{\"ok\":true}\n");
        let items = read_all(&input, 16).await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0], Inbound::Oversized(101));
        assert_eq!(items[1], Inbound::Message(b"{\"ok\":true}".to_vec()));
    }

    #[tokio::test]
    async fn test_exactly_max_bytes_is_accepted() {
        let items = read_all(b"1234\n", 4).await;
        assert_eq!(items, vec![Inbound::Message(b"1234".to_vec())]);
    }

    #[tokio::test]
    async fn test_write_message_appends_newline() {
        let mut out = Vec::new();
        write_message(&mut out, &serde_json::json!({"id": 1}))
            .await
            .unwrap();
        assert_eq!(out, b"{\"id\":1}\n");
    }
}
