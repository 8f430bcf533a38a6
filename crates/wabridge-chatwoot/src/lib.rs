pub mod client;
pub mod relay;
pub mod types;

pub use client::ChatwootClient;
pub use relay::Relay;
pub use types::{Contact, ContactInbox};
