use thiserror::Error;

use crate::module::ModuleKind;

/// Problems caught on the client before any request is made.
///
/// These are shown inline next to the drop zone and never abort the page.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("No file selected. Please select a file to {0}.")]
    NoSelection(ModuleKind),

    #[error("Select at least {min} files to {module}.")]
    NotEnoughFiles { module: ModuleKind, min: usize },

    #[error("Only {max} file(s) can be used to {module} at a time; {dropped} ignored.")]
    TooManyFiles {
        module: ModuleKind,
        max: usize,
        dropped: usize,
    },

    #[error("Selected files total {total_mb:.2} MB, above the {limit_mb} MB limit.")]
    TotalSizeExceeded { total_mb: f64, limit_mb: u64 },

    #[error("\"{name}\" cannot be used to {module}. Only PDF files are allowed.")]
    UnsupportedFile { module: ModuleKind, name: String },

    #[error("Choose a compression level first.")]
    NoCompressionLevel,

    #[error("Choose a split mode first.")]
    NoSplitMode,

    #[error("Invalid number of parts. Enter a value greater than 0.")]
    InvalidParts,

    #[error("\"{name}\" has only {pages} page(s); it cannot be split into {parts} parts.")]
    PartsExceedPages {
        name: String,
        pages: u32,
        parts: u32,
    },

    #[error("Invalid size. Enter a value in MB greater than 0.")]
    InvalidMaxSize,

    #[error("Files of type \".{0}\" cannot be converted.")]
    UnsupportedConversion(String),

    #[error("Choose a target format for \"{0}\".")]
    NoTargetFormat(String),

    #[error("\"{target}\" is not an available format for \"{name}\".")]
    TargetNotOffered { name: String, target: String },

    #[error("Select at least one page first.")]
    NoPagesSelected,

    #[error("Invalid order: {0}")]
    InvalidOrder(String),

    #[error("A {requested} request cannot be built with the {rules} rules.")]
    RulesMismatch {
        requested: ModuleKind,
        rules: ModuleKind,
    },
}

/// Every failure the desk can surface.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DeskError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Network error: {0}")]
    Transport(String),

    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("Could not read \"{file}\": {message}")]
    Decode { file: String, message: String },

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A submitted task stopped: reported failure, deadline or cancel.
    /// Carries the tracker's message as is.
    #[error("{0}")]
    TaskFailed(String),
}

impl DeskError {
    /// Transport errors are the only kind the poll loop retries.
    pub fn is_transient(&self) -> bool {
        matches!(self, DeskError::Transport(_))
    }
}

impl From<serde_json::Error> for DeskError {
    fn from(e: serde_json::Error) -> Self {
        DeskError::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_minimum_message() {
        let err = ValidationError::NotEnoughFiles {
            module: ModuleKind::Merge,
            min: 2,
        };
        assert_eq!(err.to_string(), "Select at least 2 files to merge.");
    }

    #[test]
    fn test_size_message_rounds_to_two_places() {
        let err = ValidationError::TotalSizeExceeded {
            total_mb: 1030.456,
            limit_mb: 1024,
        };
        assert_eq!(
            err.to_string(),
            "Selected files total 1030.46 MB, above the 1024 MB limit."
        );
    }

    #[test]
    fn test_only_transport_is_transient() {
        assert!(DeskError::Transport("reset".into()).is_transient());
        assert!(!DeskError::Server {
            status: 500,
            message: "boom".into()
        }
        .is_transient());
        assert!(!DeskError::from(ValidationError::InvalidParts).is_transient());
    }

    #[test]
    fn test_task_failure_message_is_unwrapped() {
        assert_eq!(DeskError::TaskFailed("Cancelled".into()).to_string(), "Cancelled");
        assert!(!DeskError::TaskFailed("Cancelled".into()).is_transient());
    }
}
