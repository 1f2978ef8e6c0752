//! The five user-facing operations and their selection rules

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::config::{LimitsConfig, MB};
use crate::error::ValidationError;
use crate::file::FileLike;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleKind {
    Compress,
    Convert,
    Merge,
    Split,
    Organize,
}

impl ModuleKind {
    pub const ALL: [ModuleKind; 5] = [
        ModuleKind::Compress,
        ModuleKind::Convert,
        ModuleKind::Merge,
        ModuleKind::Split,
        ModuleKind::Organize,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModuleKind::Compress => "compress",
            ModuleKind::Convert => "convert",
            ModuleKind::Merge => "merge",
            ModuleKind::Split => "split",
            ModuleKind::Organize => "organize",
        }
    }

    /// DOM id of the module's side panel
    pub fn menu_id(&self) -> &'static str {
        match self {
            ModuleKind::Compress => "compressionMenu",
            ModuleKind::Convert => "convertMenu",
            ModuleKind::Merge => "mergeMenu",
            ModuleKind::Split => "splitMenu",
            ModuleKind::Organize => "organizeMenu",
        }
    }
}

impl fmt::Display for ModuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModuleKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ModuleKind::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown module: {}", s))
    }
}

/// Which files a module lets into the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accept {
    PdfOnly,
    Any,
}

/// Per-module validation policy, applied when the selection changes and
/// again right before submission.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleConstraint {
    pub module: ModuleKind,
    pub min_files: usize,
    pub max_files: Option<usize>,
    pub max_total_bytes: u64,
    pub accept: Accept,
}

impl ModuleConstraint {
    pub fn for_module(module: ModuleKind, limits: &LimitsConfig) -> Self {
        let request_cap = limits.request_max_total_mb * MB;
        match module {
            ModuleKind::Compress => Self {
                module,
                min_files: 1,
                max_files: Some(limits.compress_max_files),
                max_total_bytes: limits.compress_max_total_mb * MB,
                accept: Accept::PdfOnly,
            },
            ModuleKind::Convert => Self {
                module,
                min_files: 1,
                max_files: None,
                max_total_bytes: request_cap,
                accept: Accept::Any,
            },
            ModuleKind::Merge => Self {
                module,
                min_files: 2,
                max_files: None,
                max_total_bytes: request_cap,
                accept: Accept::PdfOnly,
            },
            ModuleKind::Split | ModuleKind::Organize => Self {
                module,
                min_files: 1,
                max_files: Some(1),
                max_total_bytes: request_cap,
                accept: Accept::PdfOnly,
            },
        }
    }

    pub fn is_single_file(&self) -> bool {
        self.max_files == Some(1)
    }

    pub fn accepts<F: FileLike>(&self, file: &F) -> bool {
        match self.accept {
            Accept::PdfOnly => file.is_pdf(),
            Accept::Any => true,
        }
    }

    pub fn limit_mb(&self) -> u64 {
        self.max_total_bytes / MB
    }

    /// Check that `files` is a submittable selection for this module
    pub fn check_ready<F: FileLike>(&self, files: &[&F]) -> Result<(), ValidationError> {
        if files.is_empty() {
            return Err(ValidationError::NoSelection(self.module));
        }
        if files.len() < self.min_files {
            return Err(ValidationError::NotEnoughFiles {
                module: self.module,
                min: self.min_files,
            });
        }
        if let Some(max) = self.max_files {
            if files.len() > max {
                return Err(ValidationError::TooManyFiles {
                    module: self.module,
                    max,
                    dropped: files.len() - max,
                });
            }
        }
        if let Some(bad) = files.iter().find(|f| !self.accepts(**f)) {
            return Err(ValidationError::UnsupportedFile {
                module: self.module,
                name: bad.name().to_string(),
            });
        }
        let total: u64 = files.iter().map(|f| f.size()).sum();
        if total > self.max_total_bytes {
            return Err(ValidationError::TotalSizeExceeded {
                total_mb: total as f64 / MB as f64,
                limit_mb: self.limit_mb(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::FileHandle;

    fn pdf(name: &str, mb: u64) -> FileHandle {
        FileHandle::guess(name, mb * MB)
    }

    #[test]
    fn test_module_round_trips_through_str() {
        for m in ModuleKind::ALL {
            assert_eq!(m.as_str().parse::<ModuleKind>().unwrap(), m);
        }
        assert_eq!(" MERGE ".parse::<ModuleKind>().unwrap(), ModuleKind::Merge);
        assert!("stamp".parse::<ModuleKind>().is_err());
    }

    #[test]
    fn test_compress_limits_follow_config() {
        let c = ModuleConstraint::for_module(ModuleKind::Compress, &LimitsConfig::default());
        assert_eq!(c.max_files, Some(10));
        assert_eq!(c.limit_mb(), 1024);
        assert!(!c.is_single_file());
    }

    #[test]
    fn test_split_and_organize_are_single_file() {
        let limits = LimitsConfig::default();
        assert!(ModuleConstraint::for_module(ModuleKind::Split, &limits).is_single_file());
        assert!(ModuleConstraint::for_module(ModuleKind::Organize, &limits).is_single_file());
    }

    #[test]
    fn test_merge_needs_two() {
        let c = ModuleConstraint::for_module(ModuleKind::Merge, &LimitsConfig::default());
        let a = pdf("a.pdf", 1);
        let err = c.check_ready(&[&a]).unwrap_err();
        assert_eq!(err.to_string(), "Select at least 2 files to merge.");
        let b = pdf("b.pdf", 1);
        assert!(c.check_ready(&[&a, &b]).is_ok());
    }

    #[test]
    fn test_convert_accepts_anything() {
        let c = ModuleConstraint::for_module(ModuleKind::Convert, &LimitsConfig::default());
        assert!(c.accepts(&FileHandle::guess("slides.pptx", 1)));
        assert!(c.accepts(&FileHandle::guess("notes.odt", 1)));
    }

    #[test]
    fn test_pdf_only_rejects_images() {
        let c = ModuleConstraint::for_module(ModuleKind::Merge, &LimitsConfig::default());
        let a = pdf("a.pdf", 1);
        let img = FileHandle::guess("b.png", 1);
        assert!(matches!(
            c.check_ready(&[&a, &img]),
            Err(ValidationError::UnsupportedFile { .. })
        ));
    }

    #[test]
    fn test_empty_selection_reports_module() {
        let c = ModuleConstraint::for_module(ModuleKind::Split, &LimitsConfig::default());
        let none: [&FileHandle; 0] = [];
        assert_eq!(
            c.check_ready(&none).unwrap_err(),
            ValidationError::NoSelection(ModuleKind::Split)
        );
    }
}
