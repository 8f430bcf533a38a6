pub mod stager;
pub mod types;

pub use stager::{AttachmentStager, DeletionHandle, StagedAttachment};
pub use types::MediaFormat;
