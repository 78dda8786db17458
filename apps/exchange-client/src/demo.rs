//! In-process exchange between two sessions

use crypto_session::{ChannelSession, CryptoResult, SealedMessage};
use exchange_protocol::WireSealedMessage;
use tracing::info;

/// One delivered message as it travelled on the wire
#[derive(Debug)]
pub struct Delivery {
    pub wire: WireSealedMessage,
    pub recovered: Vec<u8>,
}

/// Run initiator and responder against each other and deliver `messages`
/// from the initiator to the responder
pub fn run(messages: &[String]) -> CryptoResult<Vec<Delivery>> {
    let initiator = ChannelSession::new_initiator();
    let responder = ChannelSession::new_responder();

    let initiator_public = initiator.initiate()?;
    info!("Initiator public key x={} y={}", initiator_public.x, initiator_public.y);

    let responder_public = responder.respond(&initiator_public)?;
    info!("Responder public key x={} y={}", responder_public.x, responder_public.y);

    initiator.complete_with(&responder_public)?;

    let mut deliveries = Vec::with_capacity(messages.len());
    for message in messages {
        let wire = initiator.seal(message.as_bytes())?.to_wire();
        let recovered = responder.open(&SealedMessage::from_wire(&wire)?)?;
        deliveries.push(Delivery { wire, recovered });
    }

    initiator.close();
    responder.close();
    Ok(deliveries)
}
