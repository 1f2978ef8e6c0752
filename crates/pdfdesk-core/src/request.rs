//! Transport-neutral request plans
//!
//! Builders validate the selection and options for one operation and
//! describe the multipart body to send. The browser session turns a plan
//! into `FormData`, the native client into a reqwest multipart form. Both
//! resolve file fields through the same [`SelectionState`].

use crate::api::{CompressionLevel, Endpoint, SplitMode};
use crate::convert::is_convertible;
use crate::error::{DeskError, ValidationError};
use crate::file::{FileKey, FileLike};
use crate::module::{ModuleConstraint, ModuleKind};
use crate::organize::PageLayout;
use crate::selection::SelectionState;

/// How the backend answers a plan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
    /// `{task_id}` to be polled
    Task,
    /// The artifact itself; `default_name` is used when the response names
    /// no file
    Blob { default_name: &'static str },
    /// A JSON document (conversion uploads)
    Json,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FormValue {
    File(FileKey),
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FormField {
    pub name: String,
    pub value: FormValue,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FormPlan {
    pub endpoint: Endpoint,
    pub reply: ReplyKind,
    pub fields: Vec<FormField>,
}

impl FormPlan {
    pub fn new(endpoint: Endpoint, reply: ReplyKind) -> Self {
        Self {
            endpoint,
            reply,
            fields: Vec::new(),
        }
    }

    pub fn file(mut self, name: impl Into<String>, key: FileKey) -> Self {
        self.fields.push(FormField {
            name: name.into(),
            value: FormValue::File(key),
        });
        self
    }

    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push(FormField {
            name: name.into(),
            value: FormValue::Text(value.into()),
        });
        self
    }

    pub fn text_value(&self, name: &str) -> Option<&str> {
        self.fields.iter().find_map(|f| match &f.value {
            FormValue::Text(v) if f.name == name => Some(v.as_str()),
            _ => None,
        })
    }

    pub fn file_keys(&self) -> Vec<&FileKey> {
        self.fields
            .iter()
            .filter_map(|f| match &f.value {
                FormValue::File(k) => Some(k),
                _ => None,
            })
            .collect()
    }

    /// Pair every field with the selected file it names
    pub fn resolve<'a, F: FileLike>(
        &'a self,
        state: &'a SelectionState<F>,
    ) -> Result<Vec<(&'a str, ResolvedValue<'a, F>)>, DeskError> {
        self.fields
            .iter()
            .map(|field| {
                let value = match &field.value {
                    FormValue::Text(t) => ResolvedValue::Text(t.as_str()),
                    FormValue::File(key) => ResolvedValue::File(state.get(key).ok_or_else(
                        || DeskError::InvalidState(format!("{} is no longer selected", key)),
                    )?),
                };
                Ok((field.name.as_str(), value))
            })
            .collect()
    }
}

#[derive(Debug)]
pub enum ResolvedValue<'a, F> {
    File(&'a F),
    Text(&'a str),
}

fn checked<F: FileLike>(
    state: &SelectionState<F>,
    constraint: &ModuleConstraint,
    module: ModuleKind,
) -> Result<(), ValidationError> {
    if constraint.module != module {
        return Err(ValidationError::RulesMismatch {
            requested: module,
            rules: constraint.module,
        });
    }
    constraint.check_ready(&state.files())
}

/// `POST /compress`: every selected file plus the level
pub fn compress<F: FileLike>(
    state: &SelectionState<F>,
    constraint: &ModuleConstraint,
    level: Option<CompressionLevel>,
) -> Result<FormPlan, ValidationError> {
    checked(state, constraint, ModuleKind::Compress)?;
    let level = level.ok_or(ValidationError::NoCompressionLevel)?;
    let plan = state
        .iter()
        .fold(FormPlan::new(Endpoint::Compress, ReplyKind::Task), |p, f| {
            p.file("files", f.key())
        });
    Ok(plan.text("compression", level.as_str()))
}

/// `POST /merge`: files in their current order
pub fn merge<F: FileLike>(
    state: &SelectionState<F>,
    constraint: &ModuleConstraint,
) -> Result<FormPlan, ValidationError> {
    checked(state, constraint, ModuleKind::Merge)?;
    Ok(state.iter().fold(
        FormPlan::new(
            Endpoint::Merge,
            ReplyKind::Blob {
                default_name: "merged.pdf",
            },
        ),
        |p, f| p.file("files", f.key()),
    ))
}

/// `POST /split`. `page_count`, when known, rejects impossible part counts
/// before upload.
pub fn split<F: FileLike>(
    state: &SelectionState<F>,
    constraint: &ModuleConstraint,
    mode: Option<SplitMode>,
    page_count: Option<u32>,
) -> Result<FormPlan, ValidationError> {
    checked(state, constraint, ModuleKind::Split)?;
    let mode = mode.ok_or(ValidationError::NoSplitMode)?;
    let file = state
        .first()
        .ok_or(ValidationError::NoSelection(ModuleKind::Split))?;

    let plan = FormPlan::new(
        Endpoint::Split,
        ReplyKind::Blob {
            default_name: "split.zip",
        },
    )
    .file("pdfs", file.key())
    .text("mode", mode.as_str());

    match mode {
        SplitMode::Parts { parts } => {
            if parts == 0 {
                return Err(ValidationError::InvalidParts);
            }
            if let Some(pages) = page_count {
                if parts > pages {
                    return Err(ValidationError::PartsExceedPages {
                        name: file.name().to_string(),
                        pages,
                        parts,
                    });
                }
            }
            Ok(plan.text("parts", parts.to_string()))
        }
        SplitMode::Size { max_size_mb } => {
            if !max_size_mb.is_finite() || max_size_mb <= 0.0 {
                return Err(ValidationError::InvalidMaxSize);
            }
            Ok(plan.text("max_size_mb", max_size_mb.to_string()))
        }
    }
}

/// `POST /organize` with the page order and rotations from `layout`
pub fn organize<F: FileLike>(
    state: &SelectionState<F>,
    constraint: &ModuleConstraint,
    layout: &PageLayout,
) -> Result<FormPlan, DeskError> {
    checked(state, constraint, ModuleKind::Organize)?;
    let file = state
        .first()
        .ok_or(ValidationError::NoSelection(ModuleKind::Organize))?;
    if layout.source() != &file.key() {
        return Err(DeskError::InvalidState(format!(
            "Page layout belongs to {}, not {}",
            layout.source(),
            file.key()
        )));
    }
    if layout.is_empty() {
        return Err(ValidationError::NoPagesSelected.into());
    }
    let order = serde_json::to_string(&layout.order())?;
    Ok(FormPlan::new(
        Endpoint::Organize,
        ReplyKind::Blob {
            default_name: "organized.pdf",
        },
    )
    .file("pdf", file.key())
    .text("order", order))
}

/// `POST /upload-conversion` for the single flow
pub fn upload_conversion<F: FileLike>(
    state: &SelectionState<F>,
    constraint: &ModuleConstraint,
) -> Result<FormPlan, ValidationError> {
    checked(state, constraint, ModuleKind::Convert)?;
    let file = state
        .focused()
        .or_else(|| state.first())
        .ok_or(ValidationError::NoSelection(ModuleKind::Convert))?;
    let ext = file.extension();
    if !is_convertible(&ext) {
        return Err(ValidationError::UnsupportedConversion(ext));
    }
    Ok(FormPlan::new(Endpoint::UploadConversion, ReplyKind::Json).file("file", file.key()))
}

/// `POST /upload-conversion-batch`; unsupported files are still sent and
/// come back flagged
pub fn upload_conversion_batch<F: FileLike>(
    state: &SelectionState<F>,
    constraint: &ModuleConstraint,
) -> Result<FormPlan, ValidationError> {
    checked(state, constraint, ModuleKind::Convert)?;
    Ok(state.iter().fold(
        FormPlan::new(Endpoint::UploadConversionBatch, ReplyKind::Json),
        |p, f| p.file("files", f.key()),
    ))
}

/// `POST /convert_all`: every file to PDF in one zip
pub fn convert_all<F: FileLike>(
    state: &SelectionState<F>,
    constraint: &ModuleConstraint,
) -> Result<FormPlan, ValidationError> {
    checked(state, constraint, ModuleKind::Convert)?;
    Ok(state.iter().enumerate().fold(
        FormPlan::new(
            Endpoint::ConvertAll,
            ReplyKind::Blob {
                default_name: "converted_files.zip",
            },
        ),
        |p, (i, f)| p.file(format!("file{}", i), f.key()),
    ))
}
