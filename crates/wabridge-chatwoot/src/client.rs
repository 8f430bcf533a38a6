use std::path::Path;
use std::sync::Arc;

use reqwest::multipart::{Form, Part};
use reqwest::Client;
use tracing::warn;
use wabridge_config::{ChatwootConfig, ConfigStore};
use wabridge_media::MediaFormat;

use crate::types::{
    Contact, ContactCreateResponse, ContactSearchResponse, ConversationListResponse,
    ConversationRef,
};

const TOKEN_HEADER: &str = "api_access_token";

/// Thin typed client for the Chatwoot application API.
///
/// Credentials come from the injected [`ConfigStore`] and are re-read per
/// call, so a config saved through the UI applies to the next operation. The
/// public methods never fail: every transport, status or parse problem is
/// logged and degraded to `None`/`false`, which the relay treats as "not
/// found" or "send failed". The `try_*` layer underneath keeps the actual
/// outcome explicit.
pub struct ChatwootClient {
    http: Client,
    store: Arc<ConfigStore>,
}

impl ChatwootClient {
    pub fn new(store: Arc<ConfigStore>) -> Self {
        Self {
            http: Client::new(),
            store,
        }
    }

    fn config(&self) -> Option<ChatwootConfig> {
        let config = self.store.read();
        if config.is_none() {
            warn!("chatwoot is not configured, skipping remote call");
        }
        config
    }

    fn account_url(config: &ChatwootConfig, suffix: &str) -> String {
        format!(
            "{}/api/v1/accounts/{}/{suffix}",
            config.base_url.trim_end_matches('/'),
            config.account_id
        )
    }

    /// Search a contact by phone number. First match wins.
    pub async fn find_contact(&self, phone: &str) -> Option<Contact> {
        let config = self.config()?;
        match self.try_find_contact(&config, phone).await {
            Ok(contact) => contact,
            Err(e) => {
                warn!("contact search failed for {phone}: {e}");
                None
            }
        }
    }

    async fn try_find_contact(
        &self,
        config: &ChatwootConfig,
        phone: &str,
    ) -> Result<Option<Contact>, String> {
        let resp = self
            .http
            .get(Self::account_url(config, "contacts/search"))
            .query(&[("q", format!("+{phone}"))])
            .header(TOKEN_HEADER, &config.api_token)
            .send()
            .await
            .map_err(|e| format!("request failed: {e}"))?;

        let body: ContactSearchResponse = resp
            .json()
            .await
            .map_err(|e| format!("parse failed: {e}"))?;

        Ok(body.payload.into_iter().next())
    }

    /// Create a contact named after its own phone number.
    pub async fn create_contact(&self, phone: &str) -> Option<Contact> {
        let config = self.config()?;
        match self.try_create_contact(&config, phone).await {
            Ok(contact) => Some(contact),
            Err(e) => {
                warn!("contact creation failed for {phone}: {e}");
                None
            }
        }
    }

    async fn try_create_contact(
        &self,
        config: &ChatwootConfig,
        phone: &str,
    ) -> Result<Contact, String> {
        let resp = self
            .http
            .post(Self::account_url(config, "contacts"))
            .header(TOKEN_HEADER, &config.api_token)
            .json(&serde_json::json!({
                "inbox_id": config.inbox_id,
                "name": phone,
                "phone_number": format!("+{phone}"),
            }))
            .send()
            .await
            .map_err(|e| format!("request failed: {e}"))?;

        let body: ContactCreateResponse = resp
            .json()
            .await
            .map_err(|e| format!("parse failed: {e}"))?;

        Ok(body.payload.contact)
    }

    /// Most recent existing conversation for a contact, if any.
    pub async fn find_conversation(&self, contact_id: u64) -> Option<u64> {
        let config = self.config()?;
        match self.try_find_conversation(&config, contact_id).await {
            Ok(id) => id,
            Err(e) => {
                warn!("conversation lookup failed for contact {contact_id}: {e}");
                None
            }
        }
    }

    async fn try_find_conversation(
        &self,
        config: &ChatwootConfig,
        contact_id: u64,
    ) -> Result<Option<u64>, String> {
        let resp = self
            .http
            .get(Self::account_url(
                config,
                &format!("contacts/{contact_id}/conversations"),
            ))
            .header(TOKEN_HEADER, &config.api_token)
            .send()
            .await
            .map_err(|e| format!("request failed: {e}"))?;

        let body: ConversationListResponse = resp
            .json()
            .await
            .map_err(|e| format!("parse failed: {e}"))?;

        Ok(body.payload.first().map(|c| c.id))
    }

    /// Open a new conversation from a contact-inbox source id (or the raw
    /// contact id when the platform has not associated one yet).
    pub async fn create_conversation(&self, source_id: &str) -> Option<u64> {
        let config = self.config()?;
        match self.try_create_conversation(&config, source_id).await {
            Ok(id) => Some(id),
            Err(e) => {
                warn!("conversation creation failed for source {source_id}: {e}");
                None
            }
        }
    }

    async fn try_create_conversation(
        &self,
        config: &ChatwootConfig,
        source_id: &str,
    ) -> Result<u64, String> {
        let resp = self
            .http
            .post(Self::account_url(config, "conversations"))
            .header(TOKEN_HEADER, &config.api_token)
            .json(&serde_json::json!({
                "source_id": source_id,
                "inbox_id": config.inbox_id,
            }))
            .send()
            .await
            .map_err(|e| format!("request failed: {e}"))?;

        let body: ConversationRef = resp
            .json()
            .await
            .map_err(|e| format!("parse failed: {e}"))?;

        Ok(body.id)
    }

    /// Post an incoming-direction text message into a conversation.
    pub async fn send_text(&self, conversation_id: u64, text: &str) -> bool {
        let Some(config) = self.config() else {
            return false;
        };
        match self.try_send_text(&config, conversation_id, text).await {
            Ok(()) => true,
            Err(e) => {
                warn!("text send failed for conversation {conversation_id}: {e}");
                false
            }
        }
    }

    async fn try_send_text(
        &self,
        config: &ChatwootConfig,
        conversation_id: u64,
        text: &str,
    ) -> Result<(), String> {
        let resp = self
            .http
            .post(Self::account_url(
                config,
                &format!("conversations/{conversation_id}/messages"),
            ))
            .header(TOKEN_HEADER, &config.api_token)
            .json(&serde_json::json!({
                "content": text,
                "message_type": "incoming",
                "private": true,
            }))
            .send()
            .await
            .map_err(|e| format!("request failed: {e}"))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(format!("status {status}"));
        }
        Ok(())
    }

    /// Post a multipart message carrying a staged file plus optional caption.
    /// reqwest streams the body without a size cap, so large attachments are
    /// fine as-is.
    pub async fn send_attachment(
        &self,
        conversation_id: u64,
        caption: &str,
        path: &Path,
        mime_type: &str,
    ) -> bool {
        let Some(config) = self.config() else {
            return false;
        };
        match self
            .try_send_attachment(&config, conversation_id, caption, path, mime_type)
            .await
        {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    "attachment send failed for conversation {conversation_id} ({}): {e}",
                    path.display()
                );
                false
            }
        }
    }

    async fn try_send_attachment(
        &self,
        config: &ChatwootConfig,
        conversation_id: u64,
        caption: &str,
        path: &Path,
        mime_type: &str,
    ) -> Result<(), String> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| format!("cannot read staged file: {e}"))?;

        let file_name = format!(
            "upload_{}.{}",
            chrono::Utc::now().timestamp_millis(),
            MediaFormat::from_mime(mime_type).extension()
        );

        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(mime_type)
            .map_err(|e| format!("invalid mime type {mime_type}: {e}"))?;

        let mut form = Form::new()
            .text("message_type", "incoming")
            .text("private", "true");
        if !caption.is_empty() {
            form = form.text("content", caption.to_string());
        }
        form = form.part("attachments[]", part);

        let resp = self
            .http
            .post(Self::account_url(
                config,
                &format!("conversations/{conversation_id}/messages"),
            ))
            .header(TOKEN_HEADER, &config.api_token)
            .multipart(form)
            .send()
            .await
            .map_err(|e| format!("request failed: {e}"))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(format!("status {status}: {body}"));
        }
        Ok(())
    }
}
