//! Async client for the Remote In protocol.
//!
//! Implements the collaborator contract external tooling relies on: write
//! one request line, read one response line, correlate by request ID. IDs
//! follow the conventional 4-hex-digit counter; the server itself treats
//! them as opaque tokens.

use std::collections::HashMap;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpStream, ToSocketAddrs};

use crate::protocol::codec::{self, DecodeError};
use crate::protocol::{CommandKind, Request, Response};

/// Client-side failures.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("connection closed by server")]
    ConnectionClosed,

    #[error("malformed response: {0}")]
    Protocol(#[from] DecodeError),

    #[error("response ID '{got}' does not match request ID '{sent}'")]
    IdMismatch { sent: String, got: String },
}

/// One protocol connection with strict request/response pairing.
pub struct RemoteClient {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    next_id: u32,
}

impl RemoteClient {
    /// Connects to a Remote In endpoint.
    pub async fn connect(addr: impl ToSocketAddrs) -> Result<Self, ClientError> {
        let stream = TcpStream::connect(addr).await?;
        let (reader, writer) = stream.into_split();
        Ok(Self {
            reader: BufReader::new(reader),
            writer,
            next_id: 0,
        })
    }

    fn next_req_id(&mut self) -> String {
        self.next_id = self.next_id.wrapping_add(1);
        format!("{:04X}", self.next_id & 0xFFFF)
    }

    /// Sends one command and waits for its response.
    pub async fn send(
        &mut self,
        command: CommandKind,
        params: &[(&str, &str)],
    ) -> Result<Response, ClientError> {
        let request = Request {
            req_id: self.next_req_id(),
            command,
            params: params
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<HashMap<_, _>>(),
        };

        let line = codec::encode_request(&request);
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.flush().await?;

        let mut reply = String::new();
        if self.reader.read_line(&mut reply).await? == 0 {
            return Err(ClientError::ConnectionClosed);
        }
        let response = codec::decode_response(reply.trim())?;
        if response.req_id != request.req_id {
            return Err(ClientError::IdMismatch {
                sent: request.req_id,
                got: response.req_id,
            });
        }
        Ok(response)
    }
}
