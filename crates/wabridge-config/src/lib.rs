pub mod loader;
pub mod model;
pub mod store;

pub use loader::ConfigLoader;
pub use model::{AppConfig, GatewayConfig, WhatsAppConfig};
pub use store::{ChatwootConfig, ConfigStore};
