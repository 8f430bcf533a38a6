use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use tracing::warn;
use tracing_subscriber::EnvFilter;
use wabridge_channels::{ChatSender, WhatsAppSender};
use wabridge_chatwoot::{ChatwootClient, Relay};
use wabridge_config::{AppConfig, ConfigLoader, ConfigStore};
use wabridge_gateway::{AppState, GatewayServer};
use wabridge_media::AttachmentStager;

#[derive(Parser)]
#[command(
    name = "wabridge",
    version,
    about = "wabridge - WhatsApp to Chatwoot bridge"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the bridge gateway
    Start {
        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on
        #[arg(long)]
        port: Option<u16>,
    },

    /// Show resolved paths and configuration state
    Status,
}

/// Placeholder sender used until WhatsApp credentials are configured; every
/// relay attempt degrades to the webhook's error token.
struct UnconfiguredSender;

#[async_trait]
impl ChatSender for UnconfiguredSender {
    async fn send_message(
        &self,
        _phone: &str,
        _content: &str,
        _media_url: Option<&str>,
    ) -> wabridge_common::Result<()> {
        Err(wabridge_common::Error::Channel(
            "whatsapp credentials are not configured".into(),
        ))
    }
}

fn build_sender(config: &AppConfig) -> Arc<dyn ChatSender> {
    match (
        config.whatsapp.access_token.clone(),
        config.whatsapp.phone_number_id.clone(),
    ) {
        (Some(token), Some(phone_number_id)) => {
            Arc::new(WhatsAppSender::new(token, phone_number_id))
        }
        _ => {
            warn!("whatsapp credentials missing, agent replies will not be delivered");
            Arc::new(UnconfiguredSender)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)),
        )
        .init();

    let loader = ConfigLoader::new();
    let config = loader.load()?;
    loader.ensure_dirs(&config)?;

    match cli.command {
        Commands::Start { host, port } => {
            let mut config = config;
            if let Some(host) = host {
                config.gateway.host = host;
            }
            if let Some(port) = port {
                config.gateway.port = port;
            }

            let store = Arc::new(ConfigStore::new(loader.config_dir()));
            let stager = Arc::new(AttachmentStager::new(loader.data_dir(&config)));
            let relay = Relay::new(ChatwootClient::new(Arc::clone(&store)), Arc::clone(&stager));
            let sender = build_sender(&config);

            let state = Arc::new(AppState::new(
                config,
                loader.config_dir().to_path_buf(),
                store,
                relay,
                stager,
                sender,
            ));

            GatewayServer::new(state).run().await?;
        }
        Commands::Status => {
            let store = ConfigStore::new(loader.config_dir());
            println!("config dir:  {}", loader.config_dir().display());
            println!("data dir:    {}", loader.data_dir(&config).display());
            println!(
                "gateway:     {}:{}",
                config.gateway.host, config.gateway.port
            );
            println!(
                "chatwoot:    {}",
                match store.read() {
                    Some(cfg) => format!("configured ({})", cfg.base_url),
                    None => "not configured".to_string(),
                }
            );
            println!(
                "whatsapp:    {}",
                if config.whatsapp.access_token.is_some()
                    && config.whatsapp.phone_number_id.is_some()
                {
                    "configured"
                } else {
                    "not configured"
                }
            );
        }
    }

    Ok(())
}
