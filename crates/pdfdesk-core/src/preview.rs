//! Module preview strategies
//!
//! Each module turns the shared [`SelectionState`] into a [`PreviewModel`]
//! that the surface draws. The strategy is picked explicitly from the active
//! module with [`renderer_for`]; renderers only read the store.
//!
//! Page counts come from an asynchronous decode in the browser (or a local
//! parse on the command line). Results are parked in a [`DecodeCache`] and
//! accepted only while the ticket they were issued with is still current.

use serde::Serialize;
use std::collections::HashMap;

use crate::convert::{targets_for, ConvertFlow, IconKind};
use crate::file::{FileKey, FileLike};
use crate::format_mb;
use crate::module::{ModuleConstraint, ModuleKind};
use crate::organize::{PageLayout, PageSlot};
use crate::selection::{RenderTicket, SelectionState};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "value", rename_all = "lowercase")]
pub enum PageCount {
    Pending,
    Pages(u32),
    Failed(String),
}

/// Page counts decoded so far, keyed by file
#[derive(Debug, Clone, Default)]
pub struct DecodeCache {
    entries: HashMap<FileKey, (RenderTicket, PageCount)>,
}

impl DecodeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that a decode was started for `ticket`
    pub fn begin(&mut self, ticket: RenderTicket) {
        self.entries
            .insert(ticket.key.clone(), (ticket, PageCount::Pending));
    }

    /// Store a decode result. Returns false, storing nothing, when the file
    /// was removed (or replaced) while the decode ran.
    pub fn apply<F: FileLike>(
        &mut self,
        state: &SelectionState<F>,
        ticket: RenderTicket,
        result: Result<u32, String>,
    ) -> bool {
        if !state.is_current(&ticket) {
            tracing::debug!(file = %ticket.key, "Discarding stale decode result");
            return false;
        }
        let count = match result {
            Ok(pages) => PageCount::Pages(pages),
            Err(message) => PageCount::Failed(message),
        };
        self.entries.insert(ticket.key.clone(), (ticket, count));
        true
    }

    pub fn get(&self, key: &FileKey) -> Option<&PageCount> {
        self.entries.get(key).map(|(_, c)| c)
    }

    pub fn pages(&self, key: &FileKey) -> Option<u32> {
        match self.get(key) {
            Some(PageCount::Pages(n)) => Some(*n),
            _ => None,
        }
    }

    /// Drop results whose files are no longer selected
    pub fn prune<F: FileLike>(&mut self, state: &SelectionState<F>) {
        self.entries
            .retain(|_, (ticket, _)| state.is_current(ticket));
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreviewItem {
    pub key: FileKey,
    pub name: String,
    pub size_label: String,
    pub icon: IconKind,
    pub position: usize,
    pub focused: bool,
    pub page_count: Option<PageCount>,
    /// Formats the file can be converted to (converter only)
    pub targets: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreviewModel {
    pub module: ModuleKind,
    pub items: Vec<PreviewItem>,
    /// Preview container is visible
    pub show_container: bool,
    /// The module button may open its panel
    pub open_enabled: bool,
    /// The panel's start button is enabled
    pub submit_enabled: bool,
    /// Items can be dragged into a new order
    pub reorderable: bool,
    /// Readout under the preview
    pub info: Option<String>,
    /// Warning shown above the preview
    pub notice: Option<String>,
    /// Organize only: the page grid
    pub pages: Vec<PageSlot>,
    pub convert_flow: Option<ConvertFlow>,
}

impl PreviewModel {
    fn empty(module: ModuleKind) -> Self {
        Self {
            module,
            items: Vec::new(),
            show_container: false,
            open_enabled: false,
            submit_enabled: false,
            reorderable: false,
            info: None,
            notice: None,
            pages: Vec::new(),
            convert_flow: None,
        }
    }
}

/// Inputs a renderer needs besides the store
pub struct RenderContext<'a> {
    pub constraint: &'a ModuleConstraint,
    pub decoded: &'a DecodeCache,
    pub layout: Option<&'a PageLayout>,
    /// Operation-specific options (level, mode, targets) are filled in
    pub options_ready: bool,
    pub page_warning_threshold: u32,
}

pub trait PreviewRenderer<F: FileLike> {
    fn module(&self) -> ModuleKind;

    fn render(&self, state: &SelectionState<F>, ctx: &RenderContext<'_>) -> PreviewModel;
}

/// Pick the strategy for the active module
pub fn renderer_for<F: FileLike>(module: ModuleKind) -> Box<dyn PreviewRenderer<F>> {
    match module {
        ModuleKind::Compress => Box::new(CompressPreview),
        ModuleKind::Convert => Box::new(ConvertPreview),
        ModuleKind::Merge | ModuleKind::Split => Box::new(ThumbnailPreview { module }),
        ModuleKind::Organize => Box::new(OrganizePreview),
    }
}

fn item<F: FileLike>(
    file: &F,
    position: usize,
    state: &SelectionState<F>,
    decoded: Option<&DecodeCache>,
) -> PreviewItem {
    let key = file.key();
    let ext = file.extension();
    PreviewItem {
        focused: state.focused_key() == Some(&key),
        page_count: decoded.map(|d| d.get(&key).cloned().unwrap_or(PageCount::Pending)),
        name: file.name().to_string(),
        size_label: format_mb(file.size()),
        icon: IconKind::for_extension(&ext),
        targets: Vec::new(),
        position,
        key,
    }
}

fn ready<F: FileLike>(state: &SelectionState<F>, constraint: &ModuleConstraint) -> bool {
    constraint.check_ready(&state.files()).is_ok()
}

/// Single focused file with a size and page-count readout, plus the list of
/// selected files for click-to-focus.
pub struct CompressPreview;

impl<F: FileLike> PreviewRenderer<F> for CompressPreview {
    fn module(&self) -> ModuleKind {
        ModuleKind::Compress
    }

    fn render(&self, state: &SelectionState<F>, ctx: &RenderContext<'_>) -> PreviewModel {
        let mut model = PreviewModel::empty(ModuleKind::Compress);
        let Some(focused) = state.focused() else {
            return model;
        };

        model.items = state
            .iter()
            .enumerate()
            .map(|(i, f)| item(f, i, state, Some(ctx.decoded)))
            .collect();
        model.show_container = true;
        model.open_enabled = focused.is_pdf() && ready(state, ctx.constraint);
        model.submit_enabled = model.open_enabled && ctx.options_ready;

        let size = format_mb(focused.size());
        let info = match ctx.decoded.get(&focused.key()) {
            Some(PageCount::Pages(n)) => {
                if *n > ctx.page_warning_threshold {
                    model.notice = Some(format!(
                        "This file has {} pages; compression may take a while.",
                        n
                    ));
                }
                format!("Size: {} • Pages: {}", size, n)
            }
            Some(PageCount::Failed(_)) => {
                format!("Size: {} • Could not read the page count.", size)
            }
            Some(PageCount::Pending) | None => {
                format!("Size: {} • Reading page count...", size)
            }
        };
        model.info = Some(info);
        model
    }
}

/// Icon cards keyed by extension; single or batch flow by file count
pub struct ConvertPreview;

impl<F: FileLike> PreviewRenderer<F> for ConvertPreview {
    fn module(&self) -> ModuleKind {
        ModuleKind::Convert
    }

    fn render(&self, state: &SelectionState<F>, ctx: &RenderContext<'_>) -> PreviewModel {
        let mut model = PreviewModel::empty(ModuleKind::Convert);
        if state.is_empty() {
            return model;
        }

        model.items = state
            .iter()
            .enumerate()
            .map(|(i, f)| {
                let mut it = item(f, i, state, None);
                it.targets = targets_for(&f.extension())
                    .map(|t| t.iter().map(|s| s.to_string()).collect())
                    .unwrap_or_default();
                it
            })
            .collect();

        let unsupported = model.items.iter().filter(|i| i.targets.is_empty()).count();
        if unsupported > 0 {
            model.notice = Some(format!(
                "{} file(s) cannot be converted and will be skipped.",
                unsupported
            ));
        }

        model.show_container = true;
        model.convert_flow = Some(ConvertFlow::for_count(state.len()));
        model.open_enabled =
            ready(state, ctx.constraint) && unsupported < model.items.len();
        model.submit_enabled = model.open_enabled && ctx.options_ready;
        model
    }
}

/// Thumbnail cards for merge (reorderable list) and split (one file)
pub struct ThumbnailPreview {
    module: ModuleKind,
}

impl<F: FileLike> PreviewRenderer<F> for ThumbnailPreview {
    fn module(&self) -> ModuleKind {
        self.module
    }

    fn render(&self, state: &SelectionState<F>, ctx: &RenderContext<'_>) -> PreviewModel {
        let mut model = PreviewModel::empty(self.module);
        if state.is_empty() {
            return model;
        }
        model.items = state
            .iter()
            .enumerate()
            .map(|(i, f)| item(f, i, state, Some(ctx.decoded)))
            .collect();
        model.show_container = true;
        model.reorderable = self.module == ModuleKind::Merge;
        model.open_enabled = ready(state, ctx.constraint);
        model.submit_enabled = model.open_enabled && ctx.options_ready;

        if self.module == ModuleKind::Merge {
            let total_pages: Option<u32> = state
                .iter()
                .map(|f| ctx.decoded.pages(&f.key()))
                .sum();
            model.info = Some(match total_pages {
                Some(p) => format!("{} files • {} pages", state.len(), p),
                None => format!("{} files", state.len()),
            });
            if !model.open_enabled {
                model.notice = ctx
                    .constraint
                    .check_ready(&state.files())
                    .err()
                    .map(|e| e.to_string());
            }
        }
        model
    }
}

/// One file card, and once a layout exists, the grid of its pages
pub struct OrganizePreview;

impl<F: FileLike> PreviewRenderer<F> for OrganizePreview {
    fn module(&self) -> ModuleKind {
        ModuleKind::Organize
    }

    fn render(&self, state: &SelectionState<F>, ctx: &RenderContext<'_>) -> PreviewModel {
        let mut model = PreviewModel::empty(ModuleKind::Organize);
        let Some(file) = state.first() else {
            return model;
        };
        model.items = vec![item(file, 0, state, Some(ctx.decoded))];
        model.show_container = true;
        model.open_enabled = ready(state, ctx.constraint);

        let layout = ctx.layout.filter(|l| l.source() == &file.key());
        if let Some(layout) = layout {
            model.pages = layout.slots().to_vec();
            model.reorderable = true;
            model.info = Some(format!("{} pages", layout.len()));
        }
        model.submit_enabled =
            model.open_enabled && layout.is_some_and(|l| !l.is_empty());
        model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LimitsConfig, MB};
    use crate::file::FileHandle;
    use pretty_assertions::assert_eq;

    struct Fixture {
        state: SelectionState<FileHandle>,
        decoded: DecodeCache,
        constraint: ModuleConstraint,
    }

    impl Fixture {
        fn new(module: ModuleKind, files: &[(&str, u64)]) -> Self {
            let constraint = ModuleConstraint::for_module(module, &LimitsConfig::default());
            let mut state = SelectionState::new();
            state
                .add_files(
                    files.iter().map(|(n, s)| FileHandle::guess(*n, *s)),
                    &constraint,
                )
                .unwrap();
            Self {
                state,
                decoded: DecodeCache::new(),
                constraint,
            }
        }

        fn render(&self, options_ready: bool, layout: Option<&PageLayout>) -> PreviewModel {
            let ctx = RenderContext {
                constraint: &self.constraint,
                decoded: &self.decoded,
                layout,
                options_ready,
                page_warning_threshold: 500,
            };
            renderer_for(self.constraint.module).render(&self.state, &ctx)
        }
    }

    #[test]
    fn test_empty_store_hides_everything() {
        for module in ModuleKind::ALL {
            let f = Fixture::new(module, &[]);
            let model = f.render(true, None);
            assert!(!model.show_container, "{module}");
            assert!(!model.submit_enabled, "{module}");
            assert!(model.items.is_empty());
        }
    }

    #[test]
    fn test_compress_submit_waits_for_level() {
        let f = Fixture::new(
            ModuleKind::Compress,
            &[("a.pdf", 2 * MB), ("b.pdf", 2 * MB), ("c.pdf", 2 * MB)],
        );
        let before = f.render(false, None);
        assert_eq!(before.items.len(), 3);
        assert!(before.open_enabled);
        assert!(!before.submit_enabled);
        assert!(f.render(true, None).submit_enabled);
    }

    #[test]
    fn test_compress_readout_follows_decode() {
        let mut f = Fixture::new(ModuleKind::Compress, &[("a.pdf", 2 * MB)]);
        let key = FileKey::new("a.pdf", 2 * MB);
        assert_eq!(
            f.render(true, None).info.as_deref(),
            Some("Size: 2.00 MB • Reading page count...")
        );

        let ticket = f.state.ticket(&key).unwrap();
        f.decoded.begin(ticket.clone());
        assert!(f.decoded.apply(&f.state, ticket, Ok(12)));
        assert_eq!(
            f.render(true, None).info.as_deref(),
            Some("Size: 2.00 MB • Pages: 12")
        );
    }

    #[test]
    fn test_compress_warns_on_large_documents() {
        let mut f = Fixture::new(ModuleKind::Compress, &[("a.pdf", MB)]);
        let ticket = f.state.ticket(&FileKey::new("a.pdf", MB)).unwrap();
        f.decoded.apply(&f.state, ticket, Ok(900));
        assert!(f.render(true, None).notice.unwrap().contains("900 pages"));
    }

    #[test]
    fn test_decode_failure_is_isolated() {
        let mut f = Fixture::new(ModuleKind::Merge, &[("a.pdf", 1), ("b.pdf", 2)]);
        let ta = f.state.ticket(&FileKey::new("a.pdf", 1)).unwrap();
        let tb = f.state.ticket(&FileKey::new("b.pdf", 2)).unwrap();
        f.decoded.apply(&f.state, ta, Err("corrupt".into()));
        f.decoded.apply(&f.state, tb, Ok(3));
        let model = f.render(true, None);
        assert_eq!(
            model.items[0].page_count,
            Some(PageCount::Failed("corrupt".into()))
        );
        assert_eq!(model.items[1].page_count, Some(PageCount::Pages(3)));
        assert!(model.submit_enabled);
    }

    #[test]
    fn test_stale_decode_is_dropped() {
        let mut f = Fixture::new(ModuleKind::Merge, &[("a.pdf", 1), ("b.pdf", 2)]);
        let key = FileKey::new("a.pdf", 1);
        let ticket = f.state.ticket(&key).unwrap();
        f.state.remove(&key);
        assert!(!f.decoded.apply(&f.state, ticket, Ok(5)));
        assert!(f.decoded.get(&key).is_none());
    }

    #[test]
    fn test_prune_forgets_removed_files() {
        let mut f = Fixture::new(ModuleKind::Merge, &[("a.pdf", 1), ("b.pdf", 2)]);
        let key = FileKey::new("a.pdf", 1);
        let ticket = f.state.ticket(&key).unwrap();
        f.decoded.apply(&f.state, ticket, Ok(5));
        f.state.remove(&key);
        f.decoded.prune(&f.state);
        assert!(f.decoded.get(&key).is_none());
    }

    #[test]
    fn test_merge_with_one_file_explains_why() {
        let f = Fixture::new(ModuleKind::Merge, &[("a.pdf", 1)]);
        let model = f.render(true, None);
        assert!(model.show_container);
        assert!(model.reorderable);
        assert!(!model.submit_enabled);
        assert_eq!(
            model.notice.as_deref(),
            Some("Select at least 2 files to merge.")
        );
    }

    #[test]
    fn test_split_is_not_reorderable() {
        let f = Fixture::new(ModuleKind::Split, &[("a.pdf", 1)]);
        let model = f.render(true, None);
        assert!(!model.reorderable);
        assert!(model.submit_enabled);
    }

    #[test]
    fn test_convert_flow_and_targets() {
        let f = Fixture::new(
            ModuleKind::Convert,
            &[("a.pdf", 1), ("b.png", 1), ("c.odt", 1)],
        );
        let model = f.render(false, None);
        assert_eq!(model.convert_flow, Some(ConvertFlow::Batch));
        assert_eq!(model.items[0].icon, IconKind::Pdf);
        assert_eq!(model.items[1].targets, vec!["pdf"]);
        assert!(model.items[2].targets.is_empty());
        assert!(model.notice.is_some());
        assert!(model.open_enabled);
    }

    #[test]
    fn test_convert_only_unsupported_cannot_open() {
        let f = Fixture::new(ModuleKind::Convert, &[("c.odt", 1)]);
        let model = f.render(true, None);
        assert_eq!(model.convert_flow, Some(ConvertFlow::Single));
        assert!(!model.open_enabled);
    }

    #[test]
    fn test_organize_needs_matching_layout() {
        let f = Fixture::new(ModuleKind::Organize, &[("a.pdf", 1)]);
        assert!(!f.render(true, None).submit_enabled);

        let wrong = PageLayout::new(FileKey::new("other.pdf", 1), 3);
        assert!(!f.render(true, Some(&wrong)).submit_enabled);

        let layout = PageLayout::new(FileKey::new("a.pdf", 1), 3);
        let model = f.render(true, Some(&layout));
        assert!(model.submit_enabled);
        assert_eq!(model.pages.len(), 3);
    }
}
