use serde::Deserialize;

/// A Chatwoot contact. Owned by the platform; the bridge only reads and
/// creates these, it never renames or merges them.
#[derive(Debug, Clone, Deserialize)]
pub struct Contact {
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub contact_inboxes: Vec<ContactInbox>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContactInbox {
    #[serde(default)]
    pub source_id: Option<String>,
}

/// `GET contacts/search` envelope.
#[derive(Debug, Deserialize)]
pub(crate) struct ContactSearchResponse {
    #[serde(default)]
    pub payload: Vec<Contact>,
}

/// `POST contacts` envelope.
#[derive(Debug, Deserialize)]
pub(crate) struct ContactCreateResponse {
    pub payload: ContactCreatePayload,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ContactCreatePayload {
    pub contact: Contact,
}

/// `GET contacts/{id}/conversations` envelope.
#[derive(Debug, Deserialize)]
pub(crate) struct ConversationListResponse {
    #[serde(default)]
    pub payload: Vec<ConversationRef>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ConversationRef {
    pub id: u64,
}
