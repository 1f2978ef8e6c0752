//! Session state behind `DeskSession`
//!
//! Generic over the file handle so it can be tested without a browser.
//! The wasm glue owns one of these and only adds I/O around it.

use std::collections::HashMap;

use pdfdesk_core::api::{BatchUpload, ConversionUpload};
use pdfdesk_core::convert::{BatchSelection, ConvertFlow};
use pdfdesk_core::preview::RenderContext;
use pdfdesk_core::selection::{RenderTicket, Removed};
use pdfdesk_core::{
    renderer_for, request, AddOutcome, CompressionLevel, DecodeCache, DeskConfig, DeskError,
    FileKey, FileLike, FormPlan, MenuCoordinator, ModuleConstraint, ModuleKind, PageLayout,
    PreviewModel, SelectionState, SplitMode, TaskTracker, ValidationError,
};

pub struct DeskState<F> {
    config: DeskConfig,
    module: ModuleKind,
    constraint: ModuleConstraint,
    pub(crate) selection: SelectionState<F>,
    pub(crate) menus: MenuCoordinator,
    pub(crate) tracker: TaskTracker,
    decoded: DecodeCache,
    /// Decodes handed out to the page, by token
    pending: HashMap<u32, RenderTicket>,
    next_token: u32,
    pub(crate) layout: Option<PageLayout>,
    level: Option<CompressionLevel>,
    split: Option<SplitMode>,
    pub(crate) upload: Option<ConversionUpload>,
    pub(crate) batch: Option<BatchSelection>,
    /// Bumped whenever a task starts or is abandoned; an async loop holding
    /// an older value must not touch the tracker again
    generation: u64,
}

impl<F: FileLike> DeskState<F> {
    pub fn new(module: ModuleKind, config: DeskConfig) -> Self {
        let constraint = ModuleConstraint::for_module(module, &config.limits);
        let tracker = TaskTracker::new(config.poll_policy());
        Self {
            config,
            module,
            constraint,
            selection: SelectionState::new(),
            menus: MenuCoordinator::new(),
            tracker,
            decoded: DecodeCache::new(),
            pending: HashMap::new(),
            next_token: 0,
            layout: None,
            level: None,
            split: None,
            upload: None,
            batch: None,
            generation: 0,
        }
    }

    pub fn config(&self) -> &DeskConfig {
        &self.config
    }

    pub fn module(&self) -> ModuleKind {
        self.module
    }

    pub fn constraint(&self) -> &ModuleConstraint {
        &self.constraint
    }

    /// Switch the active module. The selection is kept; readiness is
    /// re-evaluated against the new rules on the next render.
    pub fn set_module(&mut self, module: ModuleKind) {
        if module != self.module {
            self.module = module;
            self.constraint = ModuleConstraint::for_module(module, &self.config.limits);
            self.upload = None;
            self.batch = None;
        }
    }

    pub fn add_files<I>(&mut self, files: I) -> Result<AddOutcome, ValidationError>
    where
        I: IntoIterator<Item = F>,
    {
        let outcome = self.selection.add_files(files, &self.constraint)?;
        if !outcome.added.is_empty() {
            self.upload = None;
            self.batch = None;
        }
        Ok(outcome)
    }

    pub fn remove(&mut self, key: &FileKey) -> Option<Removed<F>> {
        let removed = self.selection.remove(key)?;
        self.after_change();
        if removed.emptied {
            self.menus.close_all();
        }
        Some(removed)
    }

    pub fn reorder_by_indices(&mut self, order: &[usize]) -> Result<(), ValidationError> {
        self.selection.reorder_by_indices(order)
    }

    pub fn sort_by_name(&mut self, ascending: bool) {
        self.selection.sort_by_name(ascending);
    }

    pub fn focus(&mut self, key: &FileKey) -> bool {
        self.selection.focus(key)
    }

    fn after_change(&mut self) {
        self.decoded.prune(&self.selection);
        let selection = &self.selection;
        self.pending.retain(|_, t| selection.is_current(t));
        if let Some(layout) = &self.layout {
            if !self.selection.contains(layout.source()) {
                self.layout = None;
            }
        }
        self.upload = None;
        self.batch = None;
    }

    /// Start decodes for every file without a page count. Returns the
    /// token the result must be reported with, and the file's key.
    pub fn start_decodes(&mut self) -> Vec<(u32, FileKey)> {
        let keys: Vec<FileKey> = self
            .selection
            .keys()
            .into_iter()
            .filter(|k| self.decoded.get(k).is_none())
            .collect();
        let mut started = Vec::with_capacity(keys.len());
        for key in keys {
            let Some(ticket) = self.selection.ticket(&key) else {
                continue;
            };
            self.decoded.begin(ticket.clone());
            self.next_token += 1;
            self.pending.insert(self.next_token, ticket);
            started.push((self.next_token, key));
        }
        started
    }

    /// Report a decode result. Returns false when the token is unknown or
    /// its file has since been removed.
    pub fn finish_decode(&mut self, token: u32, result: Result<u32, String>) -> bool {
        let Some(ticket) = self.pending.remove(&token) else {
            return false;
        };
        let key = ticket.key.clone();
        let pages = result.as_ref().ok().copied();
        if !self.decoded.apply(&self.selection, ticket, result) {
            return false;
        }
        if let Some(pages) = pages {
            let is_first = self.selection.first().map(|f| f.key()) == Some(key.clone());
            let stale = self.layout.as_ref().map_or(true, |l| l.source() != &key);
            if is_first && stale {
                self.layout = Some(PageLayout::new(key, pages));
            }
        }
        true
    }

    pub fn page_count(&self, key: &FileKey) -> Option<u32> {
        self.decoded.pages(key)
    }

    pub fn set_compression_level(&mut self, level: CompressionLevel) {
        self.level = Some(level);
    }

    pub fn set_split_mode(&mut self, mode: SplitMode) {
        self.split = Some(mode);
    }

    fn options_ready(&self) -> bool {
        match self.module {
            ModuleKind::Compress => self.level.is_some(),
            ModuleKind::Split => self.split.is_some(),
            ModuleKind::Organize => self.layout.is_some(),
            ModuleKind::Convert | ModuleKind::Merge => true,
        }
    }

    pub fn preview(&self) -> PreviewModel {
        let ctx = RenderContext {
            constraint: &self.constraint,
            decoded: &self.decoded,
            layout: self.layout.as_ref(),
            options_ready: self.options_ready() && self.tracker.can_submit(),
            page_warning_threshold: self.config.limits.page_warning_threshold,
        };
        renderer_for(self.module).render(&self.selection, &ctx)
    }

    /// Open `module`'s panel and make it the active module. Nothing changes
    /// if the selection does not satisfy its rules.
    pub fn open_panel(&mut self, module: ModuleKind) -> Result<Option<ModuleKind>, ValidationError> {
        let constraint = ModuleConstraint::for_module(module, &self.config.limits);
        let closed = self
            .menus
            .open_checked(module, &self.selection, &constraint)?;
        self.set_module(module);
        Ok(closed)
    }

    /// The request the active module's submit button sends
    pub fn plan(&self) -> Result<FormPlan, DeskError> {
        let state = &self.selection;
        let c = &self.constraint;
        let plan = match self.module {
            ModuleKind::Compress => request::compress(state, c, self.level)?,
            ModuleKind::Merge => request::merge(state, c)?,
            ModuleKind::Split => {
                let pages = state.first().and_then(|f| self.page_count(&f.key()));
                request::split(state, c, self.split, pages)?
            }
            ModuleKind::Organize => {
                let layout = self
                    .layout
                    .as_ref()
                    .ok_or(ValidationError::NoPagesSelected)?;
                request::organize(state, c, layout)?
            }
            ModuleKind::Convert => match ConvertFlow::for_count(state.len()) {
                ConvertFlow::Single => request::upload_conversion(state, c)?,
                ConvertFlow::Batch => request::upload_conversion_batch(state, c)?,
            },
        };
        Ok(plan)
    }

    pub fn convert_all_plan(&self) -> Result<FormPlan, ValidationError> {
        request::convert_all(&self.selection, &self.constraint)
    }

    pub fn accept_batch(&mut self, upload: BatchUpload) -> &BatchSelection {
        self.batch.insert(BatchSelection::new(upload))
    }

    /// Start a submission and hand out the ticket its async loop carries
    pub fn begin_task(&mut self) -> Result<u64, DeskError> {
        self.tracker.begin_submit()?;
        self.generation += 1;
        Ok(self.generation)
    }

    pub fn is_current(&self, ticket: u64) -> bool {
        self.generation == ticket
    }

    /// Fail a running task and orphan its loop
    pub fn cancel_task(&mut self) {
        self.tracker.cancel();
        self.generation += 1;
    }

    /// Back to an empty store after a finished task
    pub fn reset(&mut self) {
        self.selection.clear();
        self.decoded.clear();
        self.pending.clear();
        self.layout = None;
        self.level = None;
        self.split = None;
        self.upload = None;
        self.batch = None;
        self.generation += 1;
        self.menus.close_all();
        self.tracker.reset();
    }
}
