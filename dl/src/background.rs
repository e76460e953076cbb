//! Background material loading
//!
//! Turns files and pasted text into opaque content parts that are sent ahead
//! of every writer and reviewer instruction. Images and PDFs travel as
//! base64 inline data; everything readable as UTF-8 travels as text.

use std::fs;
use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use thiserror::Error;
use tracing::{debug, warn};

use crate::llm::ContentPart;

/// Errors while loading background material
#[derive(Debug, Error)]
pub enum BackgroundError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Pasted text is empty")]
    EmptyPaste,
}

/// One piece of background material with a display name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackgroundItem {
    pub name: String,
    pub part: ContentPart,
}

impl BackgroundItem {
    /// Short description for status output
    pub fn describe(&self) -> String {
        match &self.part {
            ContentPart::Text { text } => format!("{} (text, {} chars)", self.name, text.chars().count()),
            ContentPart::InlineData { mime_type, data } => {
                format!("{} ({}, {} bytes base64)", self.name, mime_type, data.len())
            }
        }
    }
}

/// Mime type for file kinds sent as inline data
fn binary_mime(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let mime = match ext.as_str() {
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "heic" => "image/heic",
        _ => return None,
    };
    Some(mime)
}

/// Load a file as background material
pub fn load_file(path: &Path) -> Result<BackgroundItem, BackgroundError> {
    debug!(path = %path.display(), "load_file: called");
    let bytes = fs::read(path).map_err(|source| BackgroundError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let part = if let Some(mime) = binary_mime(path) {
        debug!(%name, mime, "load_file: inline data");
        ContentPart::inline_data(mime, STANDARD.encode(&bytes))
    } else {
        match String::from_utf8(bytes) {
            Ok(text) => {
                debug!(%name, "load_file: text");
                ContentPart::text(text)
            }
            Err(e) => {
                warn!(%name, "load_file: unrecognized binary file, sending as octet-stream");
                ContentPart::inline_data("application/octet-stream", STANDARD.encode(e.into_bytes()))
            }
        }
    };

    Ok(BackgroundItem { name, part })
}

/// Wrap pasted text as background material
///
/// `ordinal` numbers pastes for display ("Pasted Text 1", ...).
pub fn pasted_text(text: &str, ordinal: usize) -> Result<BackgroundItem, BackgroundError> {
    debug!(ordinal, len = text.len(), "pasted_text: called");
    if text.trim().is_empty() {
        return Err(BackgroundError::EmptyPaste);
    }
    Ok(BackgroundItem {
        name: format!("Pasted Text {}", ordinal),
        part: ContentPart::text(text),
    })
}

/// Content parts in the order the items were given
pub fn into_parts(items: Vec<BackgroundItem>) -> Vec<ContentPart> {
    items.into_iter().map(|item| item.part).collect()
}
