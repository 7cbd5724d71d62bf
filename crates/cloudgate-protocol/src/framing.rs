//! Newline-delimited JSON framing for the stdio transport.
//!
//! Each message is one JSON document on a single line:
//!
//! ```text
//! {"jsonrpc":"2.0","id":1,"method":"ping"}\n
//! ```
//!
//! `serde_json` never emits raw newlines inside a compact document, so a line
//! boundary is always a message boundary.

use serde::{Serialize, de::DeserializeOwned};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::MAX_MESSAGE_SIZE;
use crate::error::{ProtocolError, ProtocolResult};

/// Encodes a message followed by `\n`.
pub fn encode_line<T: Serialize>(message: &T) -> ProtocolResult<Vec<u8>> {
    let mut json = serde_json::to_vec(message)?;

    if json.len() > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::MessageTooLarge {
            size: json.len(),
            max: MAX_MESSAGE_SIZE,
        });
    }

    json.push(b'\n');
    Ok(json)
}

/// Decodes one line. Surrounding whitespace, including the terminator, is
/// ignored.
pub fn decode_line<T: DeserializeOwned>(line: &str) -> ProtocolResult<T> {
    let line = line.trim();
    if line.is_empty() {
        return Err(ProtocolError::EmptyMessage);
    }
    if line.len() > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::MessageTooLarge {
            size: line.len(),
            max: MAX_MESSAGE_SIZE,
        });
    }
    Ok(serde_json::from_str(line)?)
}

/// Reads lines from a buffered async stream.
pub struct LineReader<R> {
    reader: R,
    buffer: String,
}

impl<R: AsyncBufRead + Unpin> LineReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buffer: String::new(),
        }
    }

    /// Reads the next non-blank line.
    ///
    /// Returns `Ok(None)` at end of stream. Decoding is left to the caller so
    /// that a malformed line can be answered instead of ending the stream.
    pub async fn next_line(&mut self) -> ProtocolResult<Option<String>> {
        loop {
            self.buffer.clear();
            let read = self.reader.read_line(&mut self.buffer).await?;
            if read == 0 {
                return Ok(None);
            }
            if self.buffer.len() > MAX_MESSAGE_SIZE {
                return Err(ProtocolError::MessageTooLarge {
                    size: self.buffer.len(),
                    max: MAX_MESSAGE_SIZE,
                });
            }
            let line = self.buffer.trim();
            if !line.is_empty() {
                return Ok(Some(line.to_string()));
            }
        }
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}

/// Writes one message per line and flushes after each.
pub struct LineWriter<W> {
    writer: W,
}

impl<W: AsyncWrite + Unpin> LineWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub async fn write_message<T: Serialize>(&mut self, message: &T) -> ProtocolResult<()> {
        let data = encode_line(message)?;
        self.writer.write_all(&data).await?;
        self.writer.flush().await?;
        Ok(())
    }

    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jsonrpc::{RpcRequest, RpcResponse};
    use serde_json::json;
    use tokio::io::BufReader;

    #[test]
    fn encode_appends_newline() {
        let req = RpcRequest::new(1, "ping", None);
        let bytes = encode_line(&req).unwrap();
        assert_eq!(bytes.last(), Some(&b'\n'));
        assert_eq!(bytes.iter().filter(|b| **b == b'\n').count(), 1);
    }

    #[test]
    fn encode_escapes_embedded_newlines() {
        let bytes = encode_line(&json!({"text": "a\nb"})).unwrap();
        assert_eq!(bytes.iter().filter(|b| **b == b'\n').count(), 1);
    }

    #[test]
    fn decode_blank_line() {
        let result: ProtocolResult<RpcRequest> = decode_line("  \n");
        assert!(matches!(result, Err(ProtocolError::EmptyMessage)));
    }

    #[test]
    fn decode_garbage() {
        let result: ProtocolResult<RpcRequest> = decode_line("{not json");
        assert!(matches!(result, Err(ProtocolError::Serialization(_))));
    }

    #[tokio::test]
    async fn reader_skips_blank_lines() {
        let input = b"\n{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"ping\"}\n\n{\"jsonrpc\":\"2.0\",\"method\":\"x\"}\n";
        let mut reader = LineReader::new(BufReader::new(&input[..]));

        let first = reader.next_line().await.unwrap().unwrap();
        let req: RpcRequest = decode_line(&first).unwrap();
        assert_eq!(req.method, "ping");

        let second = reader.next_line().await.unwrap().unwrap();
        let note: RpcRequest = decode_line(&second).unwrap();
        assert!(note.is_notification());

        assert!(reader.next_line().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn writer_reader_roundtrip() {
        let mut buffer = Vec::new();
        {
            let mut writer = LineWriter::new(&mut buffer);
            writer
                .write_message(&RpcResponse::result(json!(1), json!({})))
                .await
                .unwrap();
            writer
                .write_message(&RpcResponse::result(json!(2), json!([])))
                .await
                .unwrap();
        }

        let mut reader = LineReader::new(BufReader::new(&buffer[..]));
        let a: RpcResponse = decode_line(&reader.next_line().await.unwrap().unwrap()).unwrap();
        let b: RpcResponse = decode_line(&reader.next_line().await.unwrap().unwrap()).unwrap();
        assert_eq!(a.id, json!(1));
        assert_eq!(b.id, json!(2));
    }
}
