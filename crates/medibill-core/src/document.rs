//! Document intake and encoding
//!
//! An uploaded bill is forwarded to the model untouched: the only work done
//! locally is base64-encoding the bytes and settling on a MIME type.

use base64::Engine;
use serde::Serialize;

/// Fallback when neither the declared type, the content, nor the name helps
pub const OCTET_STREAM: &str = "application/octet-stream";

/// A single file received from the upload form
#[derive(Debug, Clone)]
pub struct UploadedDocument {
    /// Original file name, if the client sent one
    pub file_name: Option<String>,
    /// MIME type declared by the client
    pub content_type: Option<String>,
    /// Raw file contents
    pub bytes: Vec<u8>,
}

/// Document ready for inline transmission to the model
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EncodedDocument {
    pub mime_type: String,
    /// Standard base64 (with padding)
    pub data: String,
}

impl UploadedDocument {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            file_name: None,
            content_type: None,
            bytes,
        }
    }

    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = Some(name.into());
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// MIME type to declare upstream
    ///
    /// Declared type first, then magic bytes, then file extension.
    pub fn mime_type(&self) -> String {
        if let Some(declared) = self
            .content_type
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty() && *t != OCTET_STREAM)
        {
            return declared.to_string();
        }

        if let Some(sniffed) = sniff_mime(&self.bytes) {
            return sniffed.to_string();
        }

        self.file_name
            .as_deref()
            .and_then(mime_from_extension)
            .unwrap_or(OCTET_STREAM)
            .to_string()
    }

    /// Base64-encode the document for an inline request part
    pub fn encode(&self) -> EncodedDocument {
        EncodedDocument {
            mime_type: self.mime_type(),
            data: base64::engine::general_purpose::STANDARD.encode(&self.bytes),
        }
    }
}

fn sniff_mime(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(b"%PDF") {
        Some("application/pdf")
    } else if bytes.starts_with(&[0x89, b'P', b'N', b'G']) {
        Some("image/png")
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("image/jpeg")
    } else if bytes.starts_with(b"GIF8") {
        Some("image/gif")
    } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        Some("image/webp")
    } else {
        None
    }
}

fn mime_from_extension(name: &str) -> Option<&'static str> {
    let ext = name.rsplit_once('.')?.1.to_ascii_lowercase();
    match ext.as_str() {
        "pdf" => Some("application/pdf"),
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "heic" => Some("image/heic"),
        _ => None,
    }
}
