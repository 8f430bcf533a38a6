pub mod jid;
pub mod traits;
pub mod whatsapp;

pub use jid::{jid_to_phone, resolve_user_jid};
pub use traits::ChatSender;
pub use whatsapp::WhatsAppSender;
