use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::FormError;

pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// A staged file. `content` is the base64 text of the original bytes.
///
/// The serialized shape is shared by the session mirror and the emitted
/// document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub mime_type: String,
    #[serde(rename = "size")]
    pub size_bytes: u64,
    #[serde(rename = "base64")]
    pub content: String,
}

impl Attachment {
    pub fn encode(id: Uuid, file: &SourceFile) -> Self {
        let mime_type = match file.mime_type.trim() {
            "" => DEFAULT_MIME_TYPE.to_string(),
            t => t.to_string(),
        };
        Self {
            id,
            name: file.name.clone(),
            mime_type,
            size_bytes: file.bytes.len() as u64,
            content: STANDARD.encode(&file.bytes),
        }
    }

    pub fn decode(&self) -> Result<Vec<u8>, FormError> {
        STANDARD
            .decode(&self.content)
            .map_err(|e| FormError::Encoding(format!("attachment {}: {}", self.id, e)))
    }

    pub fn summary(&self) -> AttachmentSummary {
        AttachmentSummary {
            id: self.id,
            name: self.name.clone(),
            mime_type: self.mime_type.clone(),
            size_bytes: self.size_bytes,
        }
    }
}

/// Attachment metadata without its content, for listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentSummary {
    pub id: Uuid,
    pub name: String,
    pub mime_type: String,
    pub size_bytes: u64,
}

/// A file picked by the user, already read into memory.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}
