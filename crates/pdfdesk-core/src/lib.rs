//! File selection and task submission for the PDF desk
//!
//! This crate holds everything the surfaces share and does no I/O:
//! - `selection`: the ordered, de-duplicated file store
//! - `module`: per-module constraints (compress, convert, merge, split, organize)
//! - `preview`: renderers that turn a selection into a view model
//! - `request`: validated multipart plans for each backend endpoint
//! - `task`: the submit/poll/download state machine
//!
//! The browser session (`pdfdesk-wasm`) and the native client
//! (`pdfdesk-client`) drive these types against the backend.

pub mod api;
pub mod config;
pub mod convert;
pub mod decode;
pub mod error;
pub mod file;
pub mod menu;
pub mod module;
pub mod organize;
pub mod preview;
pub mod progress;
pub mod request;
pub mod selection;
pub mod task;

pub use api::{CompressionLevel, Endpoint, ProgressReport, SplitMode, SubmitReply};
pub use config::{DeskConfig, MB};
pub use decode::count_pages;
pub use error::{DeskError, ValidationError};
pub use file::{FileHandle, FileKey, FileLike};
pub use menu::MenuCoordinator;
pub use module::{ModuleConstraint, ModuleKind};
pub use organize::PageLayout;
pub use preview::{renderer_for, DecodeCache, PreviewModel, PreviewRenderer};
pub use progress::{PollPolicy, ProgressMode};
pub use request::{FormPlan, ReplyKind};
pub use selection::{AddOutcome, SelectionState};
pub use task::{PollStep, TaskPhase, TaskTracker};

/// Format bytes as human-readable string
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;

    if bytes < KB {
        format!("{} B", bytes)
    } else if bytes < MB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    }
}

/// Size in megabytes with two decimals, as shown on file cards
pub fn format_mb(bytes: u64) -> String {
    format!("{:.2} MB", bytes as f64 / MB as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(500), "500 B");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(2621440), "2.5 MB");
    }

    #[test]
    fn test_format_mb() {
        assert_eq!(format_mb(2 * MB), "2.00 MB");
        assert_eq!(format_mb(MB / 4), "0.25 MB");
        assert_eq!(format_mb(0), "0.00 MB");
    }
}
