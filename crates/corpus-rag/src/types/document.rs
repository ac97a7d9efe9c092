//! Document and retrieval unit types with source tracking

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;

/// Supported file types
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    /// PDF document
    Pdf,
    /// Plain text file
    Txt,
    /// Audio recording (transcribed)
    Audio,
    /// Video recording (audio track transcribed)
    Video,
    /// Image (OCR)
    Image,
    /// PowerPoint presentation (.pptx)
    Pptx,
    /// CSV file
    Csv,
    /// Unknown file type
    Unknown,
}

impl FileType {
    /// Detect file type from extension
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "pdf" => Self::Pdf,
            "txt" => Self::Txt,
            "mp3" => Self::Audio,
            "mp4" => Self::Video,
            "jpg" | "jpeg" | "png" => Self::Image,
            "pptx" => Self::Pptx,
            "csv" => Self::Csv,
            _ => Self::Unknown,
        }
    }

    /// Detect file type from a path's extension
    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(Self::from_extension)
            .unwrap_or(Self::Unknown)
    }

    /// Check if this is a supported file type
    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Unknown)
    }

    /// Short name stored in document metadata
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Txt => "txt",
            Self::Audio => "audio",
            Self::Video => "video",
            Self::Image => "image",
            Self::Pptx => "pptx",
            Self::Csv => "csv",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for FileType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An ordered piece of text produced by an extractor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextUnit {
    /// Extracted text
    pub text: String,
    /// 1-based page/slide/row number, or 0 when the format has none
    pub position: u32,
}

impl TextUnit {
    /// Create a new text unit
    pub fn new(text: impl Into<String>, position: u32) -> Self {
        Self {
            text: text.into(),
            position,
        }
    }
}

/// Provenance of a document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentMeta {
    /// Source format
    pub file_type: FileType,
    /// Path of the source file
    pub file_path: String,
    /// Page, slide or row number (0 when the format has none)
    pub page: u32,
    /// Web address the file was downloaded from, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl DocumentMeta {
    /// URL if known, else the file path
    pub fn provenance(&self) -> &str {
        self.url.as_deref().unwrap_or(&self.file_path)
    }
}

/// One ordered text unit of a source file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Deterministic document ID
    pub id: String,
    /// Text content
    pub content: String,
    /// Provenance metadata
    pub meta: DocumentMeta,
}

impl Document {
    /// Create a document; `unit_index` is the unit's position in its file's extractor output
    pub fn new(content: impl Into<String>, meta: DocumentMeta, unit_index: usize) -> Self {
        let id = hash_parts(&[
            meta.file_path.as_bytes(),
            meta.page.to_string().as_bytes(),
            unit_index.to_string().as_bytes(),
        ]);
        Self {
            id,
            content: content.into(),
            meta,
        }
    }
}

/// A chunk of a document that is embedded, indexed and searched
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievalUnit {
    /// Deterministic index key
    pub key: String,
    /// Text content
    pub text: String,
    /// ID of the source [`Document`]
    pub document_id: String,
    /// Copy of the source document's metadata
    pub meta: DocumentMeta,
    /// Position among all units of the same source file
    pub order_index: u32,
    /// Embedding vector (empty until indexed)
    #[serde(default)]
    pub embedding: Vec<f32>,
}

impl RetrievalUnit {
    /// Create a unit derived from `document`
    pub fn new(document: &Document, text: impl Into<String>, order_index: u32) -> Self {
        let text = text.into();
        Self {
            key: index_key(&document.meta, order_index, &text),
            text,
            document_id: document.id.clone(),
            meta: document.meta.clone(),
            order_index,
            embedding: Vec::new(),
        }
    }
}

/// Deterministic key for the overwrite policy: same source and content, same key
pub fn index_key(meta: &DocumentMeta, order_index: u32, text: &str) -> String {
    hash_parts(&[
        meta.file_path.as_bytes(),
        meta.page.to_string().as_bytes(),
        order_index.to_string().as_bytes(),
        text.as_bytes(),
    ])
}

fn hash_parts(parts: &[&[u8]]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update((part.len() as u64).to_le_bytes());
        hasher.update(part);
    }
    hex::encode(hasher.finalize())
}
