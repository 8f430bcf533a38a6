use wabridge_common::RawMessageKeys;

/// Canonical suffix of a personal WhatsApp JID.
pub const WA_SUFFIX: &str = "@s.whatsapp.net";

/// Pick the sender's canonical JID out of the raw key fields.
///
/// Candidates are tried in priority order: physical number, sender JID
/// variant, group participant, remote chat id. A candidate carrying a device
/// qualifier (`12345:7@s.whatsapp.net`) is rewritten to the bare form; one
/// that still lacks the canonical suffix is skipped, not repaired. `None`
/// means the event cannot be attributed and must be dropped.
pub fn resolve_user_jid(keys: &RawMessageKeys) -> Option<String> {
    let candidates = [
        keys.sender_pn.as_deref(),
        keys.sender_jid.as_deref(),
        keys.participant.as_deref(),
        keys.remote_jid.as_deref(),
    ];

    for candidate in candidates.into_iter().flatten() {
        let normalized = match candidate.split_once(':') {
            Some((prefix, _)) => format!("{prefix}{WA_SUFFIX}"),
            None => candidate.to_string(),
        };
        if normalized.ends_with(WA_SUFFIX) {
            return Some(normalized);
        }
    }
    None
}

/// Reduce a JID to the bare phone number used as the Chatwoot lookup key.
pub fn jid_to_phone(jid: &str) -> &str {
    let bare = jid.strip_suffix(WA_SUFFIX).unwrap_or(jid);
    bare.strip_prefix('+').unwrap_or(bare)
}
