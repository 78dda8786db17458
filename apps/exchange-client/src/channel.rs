//! WebSocket channel client
//!
//! Connects to the exchange server, runs the handshake as initiator and
//! exchanges sealed messages over the resulting session.

use crypto_session::{ChannelSession, CryptoError, SealedMessage};
use exchange_protocol::{ChannelMessage, ProtocolError};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    connect_async, tungstenite::protocol::Message, MaybeTlsStream, WebSocketStream,
};
use tracing::{debug, info, warn};

/// Channel client error
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Connection failed: {0}")]
    Connection(String),
    #[error("Socket error: {0}")]
    Socket(String),
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),
    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),
    #[error("Server error: {0}")]
    Server(String),
    #[error("Unexpected message: expected {0}")]
    Unexpected(&'static str),
    #[error("Connection closed by server")]
    Closed,
}

pub type ClientResult<T> = Result<T, ClientError>;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Channel client
pub struct ChannelClient {
    server_url: String,
}

impl ChannelClient {
    /// Create a new channel client
    pub fn new(server_url: String) -> Self {
        Self { server_url }
    }

    /// Connect and complete the key exchange
    pub async fn connect(&self) -> ClientResult<SecureChannel> {
        info!("Connecting to exchange server: {}", self.server_url);

        let (mut socket, _) = connect_async(self.server_url.as_str())
            .await
            .map_err(|e| ClientError::Connection(e.to_string()))?;

        info!("WebSocket connected");

        let session = ChannelSession::new_initiator();
        let hello = ChannelMessage::hello(session.initiate()?);
        send(&mut socket, &hello).await?;

        match recv(&mut socket).await? {
            ChannelMessage::HelloAck { public_key } => {
                if let Err(e) = session.complete_with(&public_key) {
                    // Tell the server before dropping the socket
                    let _ = send(&mut socket, &ChannelMessage::Close {
                        reason: "handshake failed".to_string(),
                    })
                    .await;
                    return Err(e.into());
                }
            }
            ChannelMessage::Error { message } => return Err(ClientError::Server(message)),
            _ => return Err(ClientError::Unexpected("hello_ack")),
        }

        info!("Secure channel established");
        Ok(SecureChannel { session, socket })
    }
}

/// An established channel
pub struct SecureChannel {
    session: ChannelSession,
    socket: Socket,
}

impl SecureChannel {
    /// Seal a message, send it and open the server's echo
    pub async fn round_trip(&mut self, plaintext: &[u8]) -> ClientResult<Vec<u8>> {
        let sealed = self.session.seal(plaintext)?;
        debug!("Sending {} sealed bytes", sealed.ciphertext.len());
        send(&mut self.socket, &ChannelMessage::Sealed(sealed.to_wire())).await?;

        match recv(&mut self.socket).await? {
            ChannelMessage::Sealed(wire) => {
                let reply = SealedMessage::from_wire(&wire)?;
                Ok(self.session.open(&reply)?)
            }
            ChannelMessage::Error { message } => Err(ClientError::Server(message)),
            _ => Err(ClientError::Unexpected("sealed")),
        }
    }

    /// End the session gracefully and drop the keys
    pub async fn close(mut self, reason: &str) -> ClientResult<()> {
        self.session.close();
        send(
            &mut self.socket,
            &ChannelMessage::Close {
                reason: reason.to_string(),
            },
        )
        .await?;
        self.socket
            .close(None)
            .await
            .map_err(|e| ClientError::Socket(e.to_string()))
    }
}

async fn send(socket: &mut Socket, msg: &ChannelMessage) -> ClientResult<()> {
    let json = msg.to_json()?;
    socket
        .send(Message::Text(json.into()))
        .await
        .map_err(|e| ClientError::Socket(e.to_string()))
}

/// Wait for the next channel message, skipping control frames
async fn recv(socket: &mut Socket) -> ClientResult<ChannelMessage> {
    while let Some(frame) = socket.next().await {
        match frame {
            Ok(Message::Text(text)) => return Ok(ChannelMessage::from_json(text.as_str())?),
            Ok(Message::Binary(_)) => warn!("Ignoring binary frame"),
            Ok(Message::Close(_)) => {
                info!("Server closed connection");
                return Err(ClientError::Closed);
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) | Ok(Message::Frame(_)) => {}
            Err(e) => return Err(ClientError::Socket(e.to_string())),
        }
    }
    Err(ClientError::Closed)
}
