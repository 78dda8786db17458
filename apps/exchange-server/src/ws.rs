//! WebSocket channel: one connection is one responder session

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use crypto_session::{ChannelSession, CryptoError, SealedMessage};
use exchange_protocol::{ChannelMessage, ProtocolError, PROTOCOL_VERSION};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::state::AppState;

/// What to do after processing one inbound message
#[derive(Debug)]
enum Step {
    Reply(ChannelMessage),
    Continue,
    Close,
    /// Send the reply, then close; the session cannot continue
    Fail(ChannelMessage),
}

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_websocket(socket, state))
}

/// Handle a WebSocket connection
async fn handle_websocket(socket: WebSocket, state: AppState) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let (msg_tx, mut msg_rx) = mpsc::channel::<ChannelMessage>(100);

    let session = ChannelSession::new_responder();
    state.channel_opened();
    info!("Channel opened");

    // Spawn task to forward messages from channel to WebSocket
    let forward_task = tokio::spawn(async move {
        while let Some(msg) = msg_rx.recv().await {
            let json = match msg.to_json() {
                Ok(j) => j,
                Err(e) => {
                    error!("Failed to serialize message: {}", e);
                    continue;
                }
            };

            if ws_tx.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    // Process incoming messages
    while let Some(result) = ws_rx.next().await {
        let msg = match result {
            Ok(Message::Text(text)) => match ChannelMessage::from_json(text.as_str()) {
                Ok(m) => m,
                Err(e) => {
                    warn!("Invalid message format: {}", e);
                    let _ = msg_tx
                        .send(ChannelMessage::Error {
                            message: "Invalid message format".to_string(),
                        })
                        .await;
                    continue;
                }
            },
            Ok(Message::Binary(_)) => {
                warn!("Binary frames are not supported");
                continue;
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => continue,
            Ok(Message::Close(_)) => break,
            Err(e) => {
                warn!("WebSocket error: {}", e);
                break;
            }
        };

        match handle_message(&session, &state, msg) {
            Step::Reply(reply) => {
                if msg_tx.send(reply).await.is_err() {
                    break;
                }
            }
            Step::Continue => {}
            Step::Close => break,
            Step::Fail(reply) => {
                let _ = msg_tx.send(reply).await;
                break;
            }
        }
    }

    // Cleanup on disconnect
    session.close();
    state.channel_closed();
    info!("Channel closed");

    // Let queued replies drain before the socket goes away
    drop(msg_tx);
    let _ = forward_task.await;
}

fn handle_message(session: &ChannelSession, state: &AppState, msg: ChannelMessage) -> Step {
    match msg {
        ChannelMessage::Hello {
            protocol_version,
            public_key,
        } => {
            if protocol_version != PROTOCOL_VERSION {
                warn!("Protocol version mismatch: {}", protocol_version);
                let mismatch = ProtocolError::VersionMismatch {
                    expected: PROTOCOL_VERSION,
                    actual: protocol_version,
                };
                return Step::Reply(error_reply(&mismatch.to_string()));
            }
            if let Err(e) = public_key.check_shape() {
                warn!("Rejected public key record: {}", e);
                return Step::Reply(error_reply(&e.to_string()));
            }

            match session.respond(&public_key) {
                Ok(ours) => {
                    info!("Channel handshake complete");
                    Step::Reply(ChannelMessage::HelloAck { public_key: ours })
                }
                Err(e) => {
                    warn!("Handshake failed: {}", e);
                    failure_step(e)
                }
            }
        }

        ChannelMessage::Sealed(wire) => {
            let echoed = SealedMessage::from_wire(&wire)
                .and_then(|message| session.open(&message))
                .and_then(|plaintext| {
                    state.record_opened();
                    debug!("Echoing {} bytes", plaintext.len());
                    session.seal(&plaintext)
                });

            match echoed {
                Ok(reply) => {
                    state.record_sealed();
                    Step::Reply(ChannelMessage::Sealed(reply.to_wire()))
                }
                Err(e) => {
                    debug!("Channel error: {}", e);
                    failure_step(e)
                }
            }
        }

        ChannelMessage::Close { reason } => {
            info!("Peer closed channel: {}", reason);
            Step::Close
        }

        ChannelMessage::Error { message } => {
            warn!("Peer reported error: {}", message);
            Step::Continue
        }

        ChannelMessage::HelloAck { .. } => {
            debug!("Unexpected HelloAck from initiator");
            Step::Reply(error_reply("Unexpected message"))
        }
    }
}

/// Reply to a session error; fatal errors end the channel
fn failure_step(err: CryptoError) -> Step {
    match err {
        CryptoError::AuthenticationFailed | CryptoError::MalformedCiphertext(_) => {
            Step::Reply(error_reply("Decryption failed"))
        }
        e if e.is_fatal() => {
            warn!("Closing channel after fatal error: {}", e);
            Step::Fail(error_reply(&e.to_string()))
        }
        e => Step::Reply(error_reply(&e.to_string())),
    }
}

fn error_reply(message: &str) -> ChannelMessage {
    ChannelMessage::Error {
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crypto_session::ChannelState;

    fn hello(client: &ChannelSession) -> ChannelMessage {
        ChannelMessage::hello(client.initiate().unwrap())
    }

    fn expect_reply(step: Step) -> ChannelMessage {
        match step {
            Step::Reply(msg) => msg,
            other => panic!("expected reply, got {:?}", other),
        }
    }

    #[test]
    fn test_handshake_and_echo() {
        let state = AppState::new(8);
        let server = ChannelSession::new_responder();
        let client = ChannelSession::new_initiator();

        match expect_reply(handle_message(&server, &state, hello(&client))) {
            ChannelMessage::HelloAck { public_key } => client.complete_with(&public_key).unwrap(),
            other => panic!("unexpected reply: {:?}", other),
        }

        let sealed = client.seal(b"ping").unwrap();
        let reply = expect_reply(handle_message(
            &server,
            &state,
            ChannelMessage::Sealed(sealed.to_wire()),
        ));
        match reply {
            ChannelMessage::Sealed(wire) => {
                let echoed = SealedMessage::from_wire(&wire).unwrap();
                assert_ne!(echoed.nonce, sealed.nonce);
                assert_eq!(client.open(&echoed).unwrap(), b"ping");
            }
            other => panic!("unexpected reply: {:?}", other),
        }

        let stats = state.stats();
        assert_eq!((stats.opened, stats.sealed), (1, 1));
    }

    #[test]
    fn test_second_hello_is_refused() {
        let state = AppState::new(8);
        let server = ChannelSession::new_responder();

        expect_reply(handle_message(&server, &state, hello(&ChannelSession::new_initiator())));
        match expect_reply(handle_message(&server, &state, hello(&ChannelSession::new_initiator()))) {
            ChannelMessage::Error { message } => assert!(message.contains("Protocol violation")),
            other => panic!("unexpected reply: {:?}", other),
        }
        assert_eq!(server.state(), ChannelState::Ready);
    }

    #[test]
    fn test_sealed_before_hello() {
        let state = AppState::new(8);
        let server = ChannelSession::new_responder();
        let wire = SealedMessage {
            nonce: [0u8; 12],
            ciphertext: vec![0u8; 20],
        }
        .to_wire();

        match expect_reply(handle_message(&server, &state, ChannelMessage::Sealed(wire))) {
            ChannelMessage::Error { message } => assert!(message.contains("not ready")),
            other => panic!("unexpected reply: {:?}", other),
        }
    }

    #[test]
    fn test_version_mismatch_and_bad_curve() {
        let state = AppState::new(8);
        let server = ChannelSession::new_responder();
        let client = ChannelSession::new_initiator();
        let mut public_key = client.initiate().unwrap();

        let msg = ChannelMessage::Hello {
            protocol_version: PROTOCOL_VERSION + 1,
            public_key: public_key.clone(),
        };
        match expect_reply(handle_message(&server, &state, msg)) {
            ChannelMessage::Error { message } => assert!(message.contains("version mismatch")),
            other => panic!("unexpected reply: {:?}", other),
        }

        public_key.crv = "P-521".into();
        let msg = ChannelMessage::hello(public_key);
        assert!(matches!(
            expect_reply(handle_message(&server, &state, msg)),
            ChannelMessage::Error { .. }
        ));
        assert_eq!(server.state(), ChannelState::Uninitialized);
    }

    #[test]
    fn test_valid_hello_after_off_curve_hello() {
        let state = AppState::new(8);
        let server = ChannelSession::new_responder();

        let off_curve = exchange_protocol::encode_base64url(&[0x01; 32]);
        let bad = exchange_protocol::PublicKeyRecord::p256(off_curve.clone(), off_curve);
        match expect_reply(handle_message(&server, &state, ChannelMessage::hello(bad))) {
            ChannelMessage::Error { message } => assert!(message.contains("Invalid public key")),
            other => panic!("unexpected reply: {:?}", other),
        }
        assert_eq!(server.state(), ChannelState::Uninitialized);

        let client = ChannelSession::new_initiator();
        match expect_reply(handle_message(&server, &state, hello(&client))) {
            ChannelMessage::HelloAck { public_key } => client.complete_with(&public_key).unwrap(),
            other => panic!("unexpected reply: {:?}", other),
        }
        assert!(server.is_ready());
    }

    #[test]
    fn test_fatal_errors_end_channel() {
        match failure_step(CryptoError::NonceExhausted) {
            Step::Fail(ChannelMessage::Error { message }) => {
                assert!(message.contains("Nonce space exhausted"))
            }
            other => panic!("unexpected step: {:?}", other),
        }
        assert!(matches!(
            failure_step(CryptoError::KeyAgreement("identity".into())),
            Step::Fail(_)
        ));
        match failure_step(CryptoError::AuthenticationFailed) {
            Step::Reply(ChannelMessage::Error { message }) => assert_eq!(message, "Decryption failed"),
            other => panic!("unexpected step: {:?}", other),
        }
        assert!(matches!(
            failure_step(CryptoError::ProtocolViolation("twice".into())),
            Step::Reply(_)
        ));
    }

    #[test]
    fn test_close_ends_channel() {
        let state = AppState::new(8);
        let server = ChannelSession::new_responder();
        let step = handle_message(
            &server,
            &state,
            ChannelMessage::Close {
                reason: "done".into(),
            },
        );
        assert!(matches!(step, Step::Close));
    }
}
