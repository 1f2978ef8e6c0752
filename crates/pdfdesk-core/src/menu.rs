//! Side panel coordination: at most one module panel is open at a time.

use crate::error::ValidationError;
use crate::file::FileLike;
use crate::module::{ModuleConstraint, ModuleKind};
use crate::selection::SelectionState;

/// CSS `right` offset of a closed panel. The compress panel is narrower.
pub fn closed_offset(module: ModuleKind) -> &'static str {
    match module {
        ModuleKind::Compress => "-500px",
        _ => "-600px",
    }
}

pub const OPEN_OFFSET: &str = "0";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MenuCoordinator {
    open: Option<ModuleKind>,
}

impl MenuCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open_panel(&self) -> Option<ModuleKind> {
        self.open
    }

    pub fn is_open(&self, module: ModuleKind) -> bool {
        self.open == Some(module)
    }

    /// Open `target`, closing whichever panel was open. Returns the panel
    /// that was closed, if any.
    pub fn open(&mut self, target: ModuleKind) -> Option<ModuleKind> {
        let previous = self.open.replace(target).filter(|p| *p != target);
        tracing::debug!(panel = %target, closed = ?previous, "Panel opened");
        previous
    }

    /// Open `target` only if the selection satisfies its module constraint
    pub fn open_checked<F: FileLike>(
        &mut self,
        target: ModuleKind,
        state: &SelectionState<F>,
        constraint: &ModuleConstraint,
    ) -> Result<Option<ModuleKind>, ValidationError> {
        constraint.check_ready(&state.files())?;
        if target == ModuleKind::Compress && state.focused().is_none() {
            return Err(ValidationError::NoSelection(target));
        }
        Ok(self.open(target))
    }

    /// Close one panel. Returns false if it was not open.
    pub fn close(&mut self, target: ModuleKind) -> bool {
        if self.open == Some(target) {
            self.open = None;
            true
        } else {
            false
        }
    }

    pub fn close_all(&mut self) {
        self.open = None;
    }

    /// `right` offset for every panel, for surfaces that restyle them all
    pub fn offsets(&self) -> Vec<(ModuleKind, &'static str)> {
        ModuleKind::ALL
            .into_iter()
            .map(|m| {
                let offset = if self.is_open(m) {
                    OPEN_OFFSET
                } else {
                    closed_offset(m)
                };
                (m, offset)
            })
            .collect()
    }
}
