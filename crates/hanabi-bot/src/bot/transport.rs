use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};

use hanabi_core::game::message::{ClientRequest, SessionMessage};
use thiserror::Error;

/// Message channel to the game session.
pub trait Transport {
    fn send(&mut self, request: &ClientRequest) -> Result<(), TransportError>;

    /// Blocks until the next message arrives.
    fn recv(&mut self) -> Result<SessionMessage, TransportError>;
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("session connection closed")]
    Closed,
    #[error("session i/o failed: {0}")]
    Io(#[from] io::Error),
    #[error("failed to encode request: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("undecodable message '{line}': {source}")]
    Decode {
        line: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Newline-delimited JSON in both directions.
pub struct JsonLinesTransport<R, W> {
    reader: BufReader<R>,
    writer: W,
    line: String,
}

impl JsonLinesTransport<TcpStream, TcpStream> {
    pub fn connect(addr: impl ToSocketAddrs) -> io::Result<Self> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;
        let reader = stream.try_clone()?;
        Ok(Self::new(reader, stream))
    }
}

impl<R: Read, W: Write> JsonLinesTransport<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader: BufReader::new(reader),
            writer,
            line: String::new(),
        }
    }

    pub fn into_writer(self) -> W {
        self.writer
    }
}

impl<R: Read, W: Write> Transport for JsonLinesTransport<R, W> {
    fn send(&mut self, request: &ClientRequest) -> Result<(), TransportError> {
        serde_json::to_writer(&mut self.writer, request).map_err(TransportError::Encode)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }

    fn recv(&mut self) -> Result<SessionMessage, TransportError> {
        loop {
            self.line.clear();
            if self.reader.read_line(&mut self.line)? == 0 {
                return Err(TransportError::Closed);
            }
            let trimmed = self.line.trim();
            if trimmed.is_empty() {
                continue;
            }
            return serde_json::from_str(trimmed).map_err(|source| TransportError::Decode {
                line: trimmed.to_string(),
                source,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{JsonLinesTransport, Transport, TransportError};
    use hanabi_core::game::message::{ClientRequest, SessionMessage};
    use std::io::Cursor;

    #[test]
    fn reads_one_message_per_line_skipping_blanks() {
        let input = "{\"type\":\"connection_ok\"}\n\n{\"type\":\"move_ok\"}\n";
        let mut transport = JsonLinesTransport::new(Cursor::new(input), Vec::new());
        assert_eq!(transport.recv().unwrap(), SessionMessage::ConnectionOk);
        assert_eq!(transport.recv().unwrap(), SessionMessage::MoveOk);
        assert!(matches!(transport.recv(), Err(TransportError::Closed)));
    }

    #[test]
    fn malformed_line_is_a_decode_error() {
        let mut transport = JsonLinesTransport::new(Cursor::new("not json\n"), Vec::new());
        assert!(matches!(
            transport.recv(),
            Err(TransportError::Decode { .. })
        ));
    }

    #[test]
    fn writes_newline_terminated_requests() {
        let mut transport = JsonLinesTransport::new(Cursor::new(""), Vec::new());
        transport
            .send(&ClientRequest::Ready { name: "a".into() })
            .unwrap();
        let written = String::from_utf8(transport.into_writer()).unwrap();
        assert_eq!(written, "{\"type\":\"ready\",\"name\":\"a\"}\n");
    }
}
