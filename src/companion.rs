use std::sync::Arc;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{client_async, WebSocketStream};
use tracing::{debug, warn};

use crate::actions::{CompanionOutcome, CompanionPort};
use crate::config::SiteConfig;

/// The single-frame requests the companion app understands.
///
/// Serializes to exactly the wire frames, e.g. `{"Download":"<id>"}`.
#[derive(Clone, Debug, Serialize)]
pub enum CompanionRequest {
    Download(String),
    Remove(String),
}

#[derive(Error, Debug)]
pub enum CompanionError {
    #[error("connect failed: {0}")]
    Connect(#[from] std::io::Error),
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("request not encodable: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("companion closed without replying")]
    NoReply,
}

/// Opens the custom launch URI so the OS can wake the companion app
/// before the socket attempt; the live implementation is a browser
/// navigation and stays with the embedder.
pub trait Launcher: Send + Sync {
    fn launch(&self, uri: &str);
}

/// Talks to the locally-running companion app over its WebSocket.
///
/// Each hand-off nudges the launch URI, connects with a bounded wait,
/// sends one JSON text frame, and surfaces the companion's single
/// human-readable reply.  An unreachable companion becomes a fallback
/// navigation to the help page rather than an indefinite wait; only
/// the connection attempt is bounded, the reply may take as long as
/// the companion needs.
pub struct CompanionClient {
    config: Arc<SiteConfig>,
    launcher: Arc<dyn Launcher>,
}

impl CompanionClient {
    pub fn new(config: Arc<SiteConfig>, launcher: Arc<dyn Launcher>) -> Self {
        CompanionClient { config, launcher }
    }

    async fn request(&self, request: CompanionRequest) -> CompanionOutcome {
        self.launcher.launch(&self.config.launch_uri);
        let socket = match timeout(self.config.companion_connect_timeout, self.connect()).await {
            Ok(Ok(socket)) => socket,
            Ok(Err(err)) => {
                warn!(%err, "companion unreachable");
                return self.fallback();
            }
            Err(_) => {
                warn!("companion connect timed out");
                return self.fallback();
            }
        };
        match Self::exchange(socket, &request).await {
            Ok(reply) => {
                debug!(%reply, "companion replied");
                CompanionOutcome::Reply(reply)
            }
            Err(err) => {
                warn!(%err, "companion exchange failed");
                self.fallback()
            }
        }
    }

    async fn connect(&self) -> Result<WebSocketStream<TcpStream>, CompanionError> {
        let addr = format!("127.0.0.1:{}", self.config.companion_port);
        let stream = TcpStream::connect(&addr).await?;
        let (socket, _) = client_async(format!("ws://{addr}"), stream).await?;
        Ok(socket)
    }

    async fn exchange(
        mut socket: WebSocketStream<TcpStream>,
        request: &CompanionRequest,
    ) -> Result<String, CompanionError> {
        socket
            .send(Message::Text(serde_json::to_string(request)?))
            .await?;
        while let Some(frame) = socket.next().await {
            match frame? {
                Message::Text(reply) => return Ok(reply),
                Message::Close(_) => break,
                _ => continue,
            }
        }
        Err(CompanionError::NoReply)
    }

    fn fallback(&self) -> CompanionOutcome {
        CompanionOutcome::Fallback {
            page: self.config.fallback_page.clone(),
        }
    }
}

#[async_trait]
impl CompanionPort for CompanionClient {
    async fn download(&self, map_id: &str) -> CompanionOutcome {
        self.request(CompanionRequest::Download(map_id.to_string()))
            .await
    }

    async fn remove(&self, map_id: &str) -> CompanionOutcome {
        self.request(CompanionRequest::Remove(map_id.to_string()))
            .await
    }
}
