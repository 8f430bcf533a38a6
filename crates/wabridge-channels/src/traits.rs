use async_trait::async_trait;
use wabridge_common::Result;

/// Outbound side of the chat network: delivers an agent reply to a
/// participant, optionally with a media attachment fetched from a URL.
#[async_trait]
pub trait ChatSender: Send + Sync {
    async fn send_message(
        &self,
        phone: &str,
        content: &str,
        media_url: Option<&str>,
    ) -> Result<()>;
}
