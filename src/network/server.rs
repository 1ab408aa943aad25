//! TCP dispatcher for the Remote In protocol.
//!
//! One task per connection, each owning its [`Session`] exclusively. A
//! command is processed to completion before the next line is read, so
//! requests on a single connection never pipeline. Frames are reassembled
//! with a buffered line reader, there is no fixed message size cap.

use log::{debug, error, info, warn};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

use crate::clock::Clock;
use crate::config::{AnalyzerSettings, Settings};
use crate::error::EngineResult;
use crate::protocol::codec::{self, DecodeError};
use crate::protocol::Response;
use crate::session::{ControlFlow, Session};

/// Accepts connections and runs one session per client.
pub struct RemoteInServer {
    listener: TcpListener,
    settings: Arc<Settings>,
    clock: Arc<dyn Clock>,
}

impl RemoteInServer {
    /// Binds the listener described by `settings`.
    pub async fn bind(settings: Arc<Settings>, clock: Arc<dyn Clock>) -> EngineResult<Self> {
        let addr = format!("{}:{}", settings.server.host, settings.server.port);
        let listener = TcpListener::bind(&addr).await?;
        info!("Remote In server listening on {}", addr);
        Ok(Self {
            listener,
            settings,
            clock,
        })
    }

    /// Address the listener actually bound. Useful with port 0.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept loop. Runs until the listener itself fails.
    pub async fn run(self) -> EngineResult<()> {
        loop {
            match self.listener.accept().await {
                Ok((socket, addr)) => {
                    let analyzer = self.settings.analyzer.clone();
                    let clock = self.clock.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(socket, addr, analyzer, clock).await {
                            warn!("Client {} error: {}", addr, e);
                        }
                    });
                }
                Err(e) => {
                    error!("Accept error: {}", e);
                    return Err(e.into());
                }
            }
        }
    }
}

async fn handle_connection(
    socket: TcpStream,
    addr: SocketAddr,
    analyzer: AnalyzerSettings,
    clock: Arc<dyn Clock>,
) -> EngineResult<()> {
    info!("Client connected: {}", addr);

    let (reader, mut writer) = socket.into_split();
    let mut reader = BufReader::new(reader);
    let mut session = Session::new(addr.to_string(), analyzer, clock);
    let mut line = String::new();

    loop {
        line.clear();
        if reader.read_line(&mut line).await? == 0 {
            info!("Client {} disconnected", addr);
            break;
        }
        let frame = line.trim();
        if frame.is_empty() {
            continue;
        }
        debug!("{} RX: {}", addr, frame);

        let (response, flow) = match codec::decode_request(frame) {
            Ok(request) => session.handle(&request),
            Err(err) => match err.req_id() {
                Some(req_id) => (decode_error_response(req_id, &err), ControlFlow::Continue),
                None => {
                    // No ID to echo means no way to answer this frame.
                    warn!("{}: dropping connection on unanswerable frame: {}", addr, err);
                    break;
                }
            },
        };

        let encoded = codec::encode_response(&response);
        debug!("{} TX: {}", addr, encoded.trim_end());
        writer.write_all(encoded.as_bytes()).await?;
        writer.flush().await?;

        if flow == ControlFlow::Close {
            info!("Client {} requested disconnect", addr);
            break;
        }
    }

    Ok(())
}

fn decode_error_response(req_id: &str, err: &DecodeError) -> Response {
    // Detail values may echo client input; literal double quotes would break
    // the frame grammar, so they are downgraded.
    let response = Response::error(req_id, err.tag());
    match err {
        DecodeError::UnknownCommand { name, .. } => {
            response.with_param("Command", name.replace('"', "'"))
        }
        DecodeError::MalformedParameter { token, .. } => {
            response.with_param("Token", token.replace('"', "'"))
        }
        _ => response.with_param("Reason", err.to_string().replace('"', "'")),
    }
}
