use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MediaFormat {
    Png,
    Jpeg,
    Gif,
    Webp,
    Mp3,
    Ogg,
    Wav,
    Mp4,
    Webm,
    Pdf,
    Other(String),
}

impl MediaFormat {
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "png" => Self::Png,
            "jpg" | "jpeg" => Self::Jpeg,
            "gif" => Self::Gif,
            "webp" => Self::Webp,
            "mp3" => Self::Mp3,
            "ogg" | "oga" | "opus" => Self::Ogg,
            "wav" => Self::Wav,
            "mp4" => Self::Mp4,
            "webm" => Self::Webm,
            "pdf" => Self::Pdf,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn from_mime(mime: &str) -> Self {
        match mime {
            "image/png" => Self::Png,
            "image/jpeg" => Self::Jpeg,
            "image/gif" => Self::Gif,
            "image/webp" => Self::Webp,
            "audio/mpeg" => Self::Mp3,
            "audio/ogg" => Self::Ogg,
            "audio/wav" => Self::Wav,
            "video/mp4" => Self::Mp4,
            "video/webm" => Self::Webm,
            "application/pdf" => Self::Pdf,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn mime_type(&self) -> &str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Gif => "image/gif",
            Self::Webp => "image/webp",
            Self::Mp3 => "audio/mpeg",
            Self::Ogg => "audio/ogg",
            Self::Wav => "audio/wav",
            Self::Mp4 => "video/mp4",
            Self::Webm => "video/webm",
            Self::Pdf => "application/pdf",
            Self::Other(_) => "application/octet-stream",
        }
    }

    /// Extension used when synthesizing an upload filename from a mime type.
    pub fn extension(&self) -> &str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Gif => "gif",
            Self::Webp => "webp",
            Self::Mp3 => "mp3",
            Self::Ogg => "ogg",
            Self::Wav => "wav",
            Self::Mp4 => "mp4",
            Self::Webm => "webm",
            Self::Pdf => "pdf",
            Self::Other(_) => "bin",
        }
    }
}
