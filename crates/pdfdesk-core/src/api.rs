//! Backend endpoints and their JSON bodies

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::DeskError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    Compress,
    Progress(String),
    Download(String),
    Merge,
    Split,
    Organize,
    UploadConversion,
    UploadConversionBatch,
    ExecuteConversion,
    ExecuteConversionBatch,
    ConvertAll,
}

impl Endpoint {
    pub fn path(&self) -> String {
        match self {
            Endpoint::Compress => "/compress".to_string(),
            Endpoint::Progress(id) => format!("/progress/{}", id),
            Endpoint::Download(id) => format!("/download/{}", id),
            Endpoint::Merge => "/merge".to_string(),
            Endpoint::Split => "/split".to_string(),
            Endpoint::Organize => "/organize".to_string(),
            Endpoint::UploadConversion => "/upload-conversion".to_string(),
            Endpoint::UploadConversionBatch => "/upload-conversion-batch".to_string(),
            Endpoint::ExecuteConversion => "/execute-conversion".to_string(),
            Endpoint::ExecuteConversionBatch => "/execute-conversion-batch".to_string(),
            Endpoint::ConvertAll => "/convert_all".to_string(),
        }
    }

    /// Absolute URL under `base`. An empty base yields a same-origin path.
    pub fn url(&self, base: &str) -> String {
        format!("{}{}", base.trim_end_matches('/'), self.path())
    }

    pub fn method(&self) -> &'static str {
        match self {
            Endpoint::Progress(_) | Endpoint::Download(_) => "GET",
            _ => "POST",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionLevel {
    /// Strongest compression, lowest image quality
    #[default]
    Screen,
    Ebook,
    Printer,
    Prepress,
}

impl CompressionLevel {
    pub const ALL: [CompressionLevel; 4] = [
        CompressionLevel::Screen,
        CompressionLevel::Ebook,
        CompressionLevel::Printer,
        CompressionLevel::Prepress,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CompressionLevel::Screen => "screen",
            CompressionLevel::Ebook => "ebook",
            CompressionLevel::Printer => "printer",
            CompressionLevel::Prepress => "prepress",
        }
    }
}

impl fmt::Display for CompressionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CompressionLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CompressionLevel::ALL
            .into_iter()
            .find(|l| l.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown compression level: {}", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum SplitMode {
    /// Cut into this many parts of roughly equal page count
    Parts { parts: u32 },
    /// Cut so that no part exceeds this many megabytes
    Size { max_size_mb: f64 },
}

impl SplitMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SplitMode::Parts { .. } => "parts",
            SplitMode::Size { .. } => "size",
        }
    }
}

/// Reply of `POST /compress`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SubmitReply {
    #[serde(default)]
    pub task_id: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl SubmitReply {
    pub fn into_task_id(self) -> Result<String, DeskError> {
        match (self.task_id, self.error) {
            (_, Some(error)) => Err(DeskError::Server {
                status: 400,
                message: error,
            }),
            (Some(id), None) if !id.is_empty() => Ok(id),
            _ => Err(DeskError::InvalidState(
                "Server reply carried no task id".to_string(),
            )),
        }
    }
}

/// Reply of `GET /progress/{task_id}`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProgressReport {
    /// 0-100 while running, -1 after an internal failure
    #[serde(default)]
    pub percent: i32,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub summary: Option<CompressionSummary>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ProgressReport {
    pub fn failure(&self) -> Option<String> {
        if let Some(e) = &self.error {
            return Some(e.clone());
        }
        if self.percent < 0 {
            return Some(if self.status.is_empty() {
                "Task failed".to_string()
            } else {
                self.status.clone()
            });
        }
        None
    }

    pub fn is_complete(&self) -> bool {
        self.failure().is_none() && self.percent >= 100
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CompressionSummary {
    pub files_count: u32,
    pub input_mb: f64,
    pub output_mb: f64,
    pub reduction_pct: f64,
    pub time_s: f64,
}

impl CompressionSummary {
    pub fn describe(&self) -> String {
        format!(
            "{} file(s): {:.2} MB -> {:.2} MB ({:.1}% smaller) in {:.1}s",
            self.files_count, self.input_mb, self.output_mb, self.reduction_pct, self.time_s
        )
    }
}

/// Reply of `POST /upload-conversion`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ConversionUpload {
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub extension: String,
    /// Absent when the file type is not supported
    #[serde(default)]
    pub task_id: Option<String>,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub is_scanned: bool,
    #[serde(default)]
    pub message: Option<String>,
}

/// Reply of `POST /upload-conversion-batch`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BatchUpload {
    pub batch_id: String,
    pub items: Vec<BatchItem>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BatchItem {
    pub filename: String,
    #[serde(default)]
    pub extension: String,
    #[serde(default)]
    pub supported: bool,
    #[serde(default)]
    pub task_id: Option<String>,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub is_scanned: bool,
}

/// Body of `POST /execute-conversion`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecuteConversion {
    pub task_id: String,
    pub target_format: String,
}

/// Body of `POST /execute-conversion-batch`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecuteBatch {
    pub batch_id: String,
    pub targets: Vec<BatchTarget>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchTarget {
    pub task_id: String,
    pub target_format: String,
}

/// One entry of the organize `order` field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageOrder {
    pub page: u32,
    pub rotation: u16,
}

/// Error body. Most endpoints use `error`, split uses `message`.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ErrorBody {
    /// Best message for a failed response, falling back to `fallback`
    pub fn message_or(body: &[u8], fallback: &str) -> String {
        serde_json::from_slice::<ErrorBody>(body)
            .ok()
            .and_then(|b| b.error.or(b.message))
            .unwrap_or_else(|| fallback.to_string())
    }
}

/// File name from a `Content-Disposition` header, if it names one
pub fn attachment_name(header: &str) -> Option<String> {
    header
        .split(';')
        .map(str::trim)
        .find_map(|part| part.strip_prefix("filename="))
        .map(|v| v.trim_matches('"').to_string())
        .filter(|v| !v.is_empty())
}
