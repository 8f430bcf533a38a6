use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::warn;
use wabridge_common::{Error, Result};

use crate::traits::ChatSender;

const GRAPH_API_BASE: &str = "https://graph.facebook.com/v21.0";

#[derive(Serialize)]
struct TextBody {
    body: String,
}

#[derive(Serialize)]
struct TextMessage {
    messaging_product: String,
    recipient_type: String,
    to: String,
    #[serde(rename = "type")]
    msg_type: String,
    text: TextBody,
}

#[derive(Serialize)]
struct ImageLink {
    link: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    caption: Option<String>,
}

#[derive(Serialize)]
struct ImageMessage {
    messaging_product: String,
    recipient_type: String,
    to: String,
    #[serde(rename = "type")]
    msg_type: String,
    image: ImageLink,
}

/// Sends agent replies through the WhatsApp Cloud API.
pub struct WhatsAppSender {
    client: Client,
    access_token: String,
    phone_number_id: String,
    api_base: String,
}

impl WhatsAppSender {
    pub fn new(access_token: String, phone_number_id: String) -> Self {
        Self {
            client: Client::new(),
            access_token,
            phone_number_id,
            api_base: GRAPH_API_BASE.to_string(),
        }
    }

    /// Override the API base URL (used by tests).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    async fn post_message(&self, payload: &impl Serialize) -> Result<()> {
        let resp = self
            .client
            .post(format!("{}/{}/messages", self.api_base, self.phone_number_id))
            .bearer_auth(&self.access_token)
            .json(payload)
            .send()
            .await
            .map_err(|e| Error::Channel(format!("whatsapp send failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!("whatsapp send error {status}: {body}");
            return Err(Error::Channel(format!("whatsapp API error {status}: {body}")));
        }

        Ok(())
    }
}

#[async_trait]
impl ChatSender for WhatsAppSender {
    async fn send_message(
        &self,
        phone: &str,
        content: &str,
        media_url: Option<&str>,
    ) -> Result<()> {
        match media_url {
            Some(url) => {
                let msg = ImageMessage {
                    messaging_product: "whatsapp".to_string(),
                    recipient_type: "individual".to_string(),
                    to: phone.to_string(),
                    msg_type: "image".to_string(),
                    image: ImageLink {
                        link: url.to_string(),
                        caption: (!content.is_empty()).then(|| content.to_string()),
                    },
                };
                self.post_message(&msg).await
            }
            None => {
                let msg = TextMessage {
                    messaging_product: "whatsapp".to_string(),
                    recipient_type: "individual".to_string(),
                    to: phone.to_string(),
                    msg_type: "text".to_string(),
                    text: TextBody {
                        body: content.to_string(),
                    },
                };
                self.post_message(&msg).await
            }
        }
    }
}
