//! Format conversion choices
//!
//! Two flows share this module. The single flow uploads one file, receives
//! the formats it may become, and executes one conversion. The batch flow
//! uploads many files and lets the user choose a target per file before
//! executing them together.

use serde::Serialize;
use std::collections::HashMap;

use crate::api::{BatchItem, BatchTarget, BatchUpload, ConversionUpload, ExecuteBatch, ExecuteConversion};
use crate::error::ValidationError;

/// Formats the backend can produce for each input extension
pub fn targets_for(extension: &str) -> Option<&'static [&'static str]> {
    match extension {
        "pdf" => Some(&["docx", "xlsx", "txt"]),
        "docx" => Some(&["pdf", "txt"]),
        "xlsx" | "pptx" | "jpg" | "jpeg" | "png" => Some(&["pdf"]),
        _ => None,
    }
}

pub fn is_convertible(extension: &str) -> bool {
    targets_for(extension).is_some()
}

/// Icon family used for the converter's file cards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IconKind {
    Pdf,
    Document,
    Spreadsheet,
    Slides,
    Image,
    Unsupported,
}

impl IconKind {
    pub fn for_extension(extension: &str) -> Self {
        match extension {
            "pdf" => IconKind::Pdf,
            "docx" | "doc" | "txt" => IconKind::Document,
            "xlsx" | "xls" => IconKind::Spreadsheet,
            "pptx" | "ppt" => IconKind::Slides,
            "jpg" | "jpeg" | "png" => IconKind::Image,
            _ => IconKind::Unsupported,
        }
    }
}

/// Which conversion flow the current selection uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConvertFlow {
    Single,
    Batch,
}

impl ConvertFlow {
    pub fn for_count(count: usize) -> Self {
        if count > 1 {
            ConvertFlow::Batch
        } else {
            ConvertFlow::Single
        }
    }
}

/// Body for the single flow, checked against the offered formats
pub fn execute_single(
    upload: &ConversionUpload,
    target: &str,
) -> Result<ExecuteConversion, ValidationError> {
    let task_id = upload
        .task_id
        .clone()
        .ok_or_else(|| ValidationError::UnsupportedConversion(upload.extension.clone()))?;
    let target = target.trim().to_ascii_lowercase();
    if target.is_empty() {
        return Err(ValidationError::NoTargetFormat(upload.filename.clone()));
    }
    if !upload.options.iter().any(|o| o == &target) {
        return Err(ValidationError::TargetNotOffered {
            name: upload.filename.clone(),
            target,
        });
    }
    Ok(ExecuteConversion {
        task_id,
        target_format: target,
    })
}

/// Per-file target choices for an uploaded batch
#[derive(Debug, Clone, PartialEq)]
pub struct BatchSelection {
    batch_id: String,
    items: Vec<BatchItem>,
    choices: HashMap<String, String>,
}

impl BatchSelection {
    /// Files with a single possible target start with it preselected
    pub fn new(upload: BatchUpload) -> Self {
        let choices = upload
            .items
            .iter()
            .filter(|i| i.supported && i.options.len() == 1)
            .filter_map(|i| Some((i.task_id.clone()?, i.options[0].clone())))
            .collect();
        Self {
            batch_id: upload.batch_id,
            items: upload.items,
            choices,
        }
    }

    pub fn batch_id(&self) -> &str {
        &self.batch_id
    }

    pub fn items(&self) -> &[BatchItem] {
        &self.items
    }

    pub fn supported(&self) -> impl Iterator<Item = &BatchItem> + '_ {
        self.items.iter().filter(|i| i.supported && i.task_id.is_some())
    }

    pub fn choice(&self, task_id: &str) -> Option<&str> {
        self.choices.get(task_id).map(String::as_str)
    }

    /// Choose the target for one file, by its task id or file name
    pub fn set_target(&mut self, file: &str, target: &str) -> Result<(), ValidationError> {
        let item = self
            .items
            .iter()
            .find(|i| i.task_id.as_deref() == Some(file) || i.filename == file)
            .ok_or_else(|| ValidationError::InvalidOrder(format!("unknown file {}", file)))?;
        let task_id = match (&item.task_id, item.supported) {
            (Some(id), true) => id.clone(),
            _ => return Err(ValidationError::UnsupportedConversion(item.extension.clone())),
        };
        let target = target.trim().to_ascii_lowercase();
        if !item.options.iter().any(|o| o == &target) {
            return Err(ValidationError::TargetNotOffered {
                name: item.filename.clone(),
                target,
            });
        }
        self.choices.insert(task_id, target);
        Ok(())
    }

    /// Apply one target to every file that offers it
    pub fn set_all(&mut self, target: &str) -> usize {
        let target = target.trim().to_ascii_lowercase();
        let mut applied = 0;
        for item in self.items.iter().filter(|i| i.supported) {
            if let Some(id) = &item.task_id {
                if item.options.iter().any(|o| o == &target) {
                    self.choices.insert(id.clone(), target.clone());
                    applied += 1;
                }
            }
        }
        applied
    }

    /// Build the execution body. Every supported file needs a target;
    /// unsupported files are left out.
    pub fn execute(&self) -> Result<ExecuteBatch, ValidationError> {
        let mut targets = Vec::new();
        for item in self.supported() {
            let Some(task_id) = item.task_id.as_ref() else {
                continue;
            };
            let target = self
                .choices
                .get(task_id)
                .ok_or_else(|| ValidationError::NoTargetFormat(item.filename.clone()))?;
            targets.push(BatchTarget {
                task_id: task_id.clone(),
                target_format: target.clone(),
            });
        }
        if targets.is_empty() {
            let ext = self
                .items
                .first()
                .map(|i| i.extension.clone())
                .unwrap_or_default();
            return Err(ValidationError::UnsupportedConversion(ext));
        }
        Ok(ExecuteBatch {
            batch_id: self.batch_id.clone(),
            targets,
        })
    }
}
