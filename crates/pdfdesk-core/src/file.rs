//! File handles as seen by the selection store
//!
//! The store never reads file contents. It only needs a name, a size and a
//! MIME type, so every surface (browser `File`, local path, test fixture)
//! plugs in through [`FileLike`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

pub const PDF_MIME: &str = "application/pdf";

/// Identity used for de-duplication: two picks with the same name and size
/// are the same file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FileKey {
    pub name: String,
    pub size: u64,
}

impl FileKey {
    pub fn new(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            size,
        }
    }
}

impl fmt::Display for FileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} bytes)", self.name, self.size)
    }
}

/// Read-only view of a user-selected file
pub trait FileLike {
    fn name(&self) -> &str;
    fn size(&self) -> u64;
    fn mime_type(&self) -> &str;

    fn key(&self) -> FileKey {
        FileKey::new(self.name(), self.size())
    }

    /// Lower-cased extension without the dot, empty when there is none
    fn extension(&self) -> String {
        extension_of(self.name())
    }

    fn is_pdf(&self) -> bool {
        self.mime_type() == PDF_MIME || self.extension() == "pdf"
    }
}

/// Plain metadata handle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileHandle {
    pub name: String,
    pub size: u64,
    pub mime_type: String,
}

impl FileHandle {
    pub fn new(name: impl Into<String>, size: u64, mime_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            size,
            mime_type: mime_type.into(),
        }
    }

    /// Build a handle whose MIME type is inferred from the name
    pub fn guess(name: impl Into<String>, size: u64) -> Self {
        let name = name.into();
        let mime = mime_for_extension(&extension_of(&name));
        Self::new(name, size, mime)
    }
}

impl FileLike for FileHandle {
    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn mime_type(&self) -> &str {
        &self.mime_type
    }
}

pub fn extension_of(name: &str) -> String {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default()
}

pub fn mime_for_extension(ext: &str) -> &'static str {
    match ext {
        "pdf" => PDF_MIME,
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "txt" => "text/plain",
        "zip" => "application/zip",
        _ => "application/octet-stream",
    }
}
