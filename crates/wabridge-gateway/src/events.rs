use tracing::{debug, warn};
use wabridge_common::{EventKind, InboundEvent, MediaPayload};
use wabridge_channels::jid;

use crate::state::AppState;

/// Caption used for voice notes, which carry no text of their own.
const VOICE_NOTE_CAPTION: &str = "Nota de voz";

/// Map one inbound chat-network event onto a relay call.
///
/// Every failure before the relay (unresolvable sender, undecodable payload,
/// staging error) drops the event with a log line and zero remote calls.
pub async fn dispatch(state: &AppState, event: InboundEvent) {
    let Some(user_jid) = jid::resolve_user_jid(&event.keys) else {
        debug!("inbound event has no resolvable sender jid, dropping");
        return;
    };
    let phone = jid::jid_to_phone(&user_jid);
    let name = event.push_name.as_str();

    match event.event {
        EventKind::Welcome { body } => {
            state.relay.relay_inbound(phone, &body, name, None).await;
        }
        EventKind::VoiceNote { media } => {
            stage_and_relay(state, phone, VOICE_NOTE_CAPTION, name, media).await;
        }
        EventKind::Media { media, caption } => {
            let caption = caption.unwrap_or_default();
            stage_and_relay(state, phone, &caption, name, media).await;
        }
        EventKind::Document { media, caption } => {
            // Documents reuse the image caption field upstream, so this is
            // empty in practice; relayed as-is for compatibility.
            let caption = caption.unwrap_or_default();
            stage_and_relay(state, phone, &caption, name, media).await;
        }
        EventKind::Location {
            latitude,
            longitude,
        } => {
            let (Some(lat), Some(long)) = (latitude, longitude) else {
                debug!("location event from {phone} missing a coordinate, dropping");
                return;
            };
            let text = format!("📍 Ubicación: https://www.google.com/maps?q={lat},{long}");
            state.relay.relay_inbound(phone, &text, name, None).await;
        }
    }
}

async fn stage_and_relay(
    state: &AppState,
    phone: &str,
    caption: &str,
    name: &str,
    media: MediaPayload,
) {
    let bytes = match media.decode() {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("dropping media event from {phone}: {e}");
            return;
        }
    };

    let staged = match state.stager.stage(&bytes, media.extension.as_deref()).await {
        Ok(staged) => staged,
        Err(e) => {
            warn!("failed to stage attachment from {phone}: {e}");
            return;
        }
    };

    state.relay.relay_inbound(phone, caption, name, Some(staged)).await;
}
