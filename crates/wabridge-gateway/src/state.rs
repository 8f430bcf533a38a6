use std::path::PathBuf;
use std::sync::Arc;

use wabridge_channels::ChatSender;
use wabridge_chatwoot::Relay;
use wabridge_config::{AppConfig, ConfigStore};
use wabridge_media::AttachmentStager;

/// Shared application state accessible from all request handlers.
pub struct AppState {
    pub config: AppConfig,
    /// Directory holding `chatwoot.json` and the `front/` UI assets.
    pub config_dir: PathBuf,
    pub store: Arc<ConfigStore>,
    pub relay: Relay,
    pub stager: Arc<AttachmentStager>,
    /// Outbound side of the chat network, used by the agent-reply webhook.
    pub sender: Arc<dyn ChatSender>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        config_dir: PathBuf,
        store: Arc<ConfigStore>,
        relay: Relay,
        stager: Arc<AttachmentStager>,
        sender: Arc<dyn ChatSender>,
    ) -> Self {
        Self {
            config,
            config_dir,
            store,
            relay,
            stager,
            sender,
        }
    }
}

pub type SharedState = Arc<AppState>;
