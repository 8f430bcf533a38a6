use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{info, warn};
use wabridge_media::{AttachmentStager, StagedAttachment};

use crate::client::ChatwootClient;

/// Drives one inbound event through contact and conversation reconciliation
/// and into a Chatwoot message.
///
/// Steps are strictly sequential and lookup always precedes creation. A
/// remote failure at any step degrades to "nothing further for this event";
/// nothing is retried and nothing propagates. The per-phone mutex narrows the
/// window in which two near-simultaneous messages from one participant race
/// each other into duplicate contacts. It is in-process only, so it is a
/// best-effort improvement, not a guarantee. Lock entries are evicted once
/// idle, so the map tracks in-flight participants rather than every phone
/// number ever seen.
pub struct Relay {
    client: ChatwootClient,
    stager: Arc<AttachmentStager>,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl Relay {
    pub fn new(client: ChatwootClient, stager: Arc<AttachmentStager>) -> Self {
        Self {
            client,
            stager,
            locks: DashMap::new(),
        }
    }

    /// Relay one inbound message. `text` may be empty (bare attachment),
    /// `attachment` is consumed here and its deletion is scheduled exactly
    /// once on every path out of this function.
    pub async fn relay_inbound(
        &self,
        phone: &str,
        text: &str,
        push_name: &str,
        attachment: Option<StagedAttachment>,
    ) {
        let phone = phone.strip_prefix('+').unwrap_or(phone);
        info!("relaying inbound message from {phone} ({push_name})");

        let lock = self
            .locks
            .entry(phone.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        {
            let _guard = lock.lock().await;
            self.reconcile_and_send(phone, text, attachment).await;
        }
        drop(lock);
        // Only the map itself holds the Arc now; a concurrent clone between
        // the drop and this check keeps the entry alive.
        self.locks
            .remove_if(phone, |_, entry| Arc::strong_count(entry) == 1);
    }

    async fn reconcile_and_send(
        &self,
        phone: &str,
        text: &str,
        attachment: Option<StagedAttachment>,
    ) {
        let mut conversation_id = None;
        let mut contact = self.client.find_contact(phone).await;

        match &contact {
            Some(existing) => {
                conversation_id = self.client.find_conversation(existing.id).await;
            }
            None => {
                info!("creating new contact for {phone}");
                contact = self.client.create_contact(phone).await;
            }
        }

        let Some(contact) = contact else {
            warn!("could not resolve a contact for {phone}, dropping event");
            self.cleanup(attachment);
            return;
        };

        if conversation_id.is_none() {
            let source_id = contact
                .contact_inboxes
                .first()
                .and_then(|inbox| inbox.source_id.clone())
                .unwrap_or_else(|| contact.id.to_string());
            info!("opening new conversation for contact {}", contact.id);
            conversation_id = self.client.create_conversation(&source_id).await;
        }

        match conversation_id {
            Some(conversation_id) => match &attachment {
                Some(staged) => {
                    let sent = self
                        .client
                        .send_attachment(conversation_id, text, &staged.path, &staged.mime_type)
                        .await;
                    if sent {
                        info!("attachment relayed to conversation {conversation_id}");
                    }
                }
                None => {
                    if self.client.send_text(conversation_id, text).await {
                        info!("text relayed to conversation {conversation_id}");
                    }
                }
            },
            None => {
                warn!("no conversation resolvable for {phone}, message dropped");
            }
        }

        self.cleanup(attachment);
    }

    fn cleanup(&self, attachment: Option<StagedAttachment>) {
        if let Some(staged) = attachment {
            // Detached delayed deletion; the handle is dropped on purpose.
            let _ = self.stager.schedule_delete(staged.path);
        }
    }
}
