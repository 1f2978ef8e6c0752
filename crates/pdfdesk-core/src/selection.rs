//! Shared selection store
//!
//! A single `SelectionState` is owned by the active surface and passed
//! explicitly to the preview renderers and request builders. Nothing else
//! keeps its own list of selected files.
//!
//! Every mutation bumps a generation counter. Each entry remembers the
//! generation at which it was inserted, which is what [`RenderTicket`]s are
//! checked against: a thumbnail decode that finishes after its file was
//! removed (or removed and picked again) is recognised as stale.

use std::cmp::Ordering;

use crate::config::MB;
use crate::error::ValidationError;
use crate::file::{FileKey, FileLike};
use crate::module::ModuleConstraint;

#[derive(Debug, Clone)]
struct Entry<F> {
    file: F,
    added_at: u64,
}

/// Proof that an async render was started for a specific insertion of a file
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RenderTicket {
    pub key: FileKey,
    added_at: u64,
}

/// What happened to a batch passed to [`SelectionState::add_files`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AddOutcome {
    pub added: Vec<FileKey>,
    /// Already selected, or repeated within the batch
    pub duplicates: Vec<FileKey>,
    /// Names of files the module does not accept
    pub unsupported: Vec<String>,
    /// Accepted files dropped because the module's count limit was reached
    pub truncated: Vec<FileKey>,
    /// Single warning describing the truncation, if any
    pub warning: Option<ValidationError>,
}

impl AddOutcome {
    /// User-facing messages, at most one per kind of problem
    pub fn notices(&self) -> Vec<String> {
        let mut out = Vec::new();
        if let Some(w) = &self.warning {
            out.push(w.to_string());
        }
        if let Some(name) = self.unsupported.first() {
            out.push(if self.unsupported.len() == 1 {
                format!("\"{}\" was ignored: only PDF files are allowed.", name)
            } else {
                format!(
                    "{} files were ignored: only PDF files are allowed.",
                    self.unsupported.len()
                )
            });
        }
        out
    }
}

#[derive(Debug, Clone)]
pub struct Removed<F> {
    pub file: F,
    /// The store is empty after this removal
    pub emptied: bool,
}

#[derive(Debug, Clone)]
pub struct SelectionState<F> {
    entries: Vec<Entry<F>>,
    focused: Option<FileKey>,
    generation: u64,
}

impl<F> Default for SelectionState<F> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            focused: None,
            generation: 0,
        }
    }
}

impl<F: FileLike> SelectionState<F> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn iter(&self) -> impl Iterator<Item = &F> + '_ {
        self.entries.iter().map(|e| &e.file)
    }

    pub fn files(&self) -> Vec<&F> {
        self.iter().collect()
    }

    pub fn keys(&self) -> Vec<FileKey> {
        self.iter().map(|f| f.key()).collect()
    }

    pub fn first(&self) -> Option<&F> {
        self.entries.first().map(|e| &e.file)
    }

    pub fn get(&self, key: &FileKey) -> Option<&F> {
        self.position(key).map(|i| &self.entries[i].file)
    }

    pub fn position(&self, key: &FileKey) -> Option<usize> {
        self.entries.iter().position(|e| &e.file.key() == key)
    }

    pub fn contains(&self, key: &FileKey) -> bool {
        self.position(key).is_some()
    }

    pub fn total_size(&self) -> u64 {
        self.iter().map(|f| f.size()).sum()
    }

    pub fn focused_key(&self) -> Option<&FileKey> {
        self.focused.as_ref()
    }

    pub fn focused(&self) -> Option<&F> {
        self.focused.as_ref().and_then(|k| self.get(k))
    }

    /// Add a batch of picked or dropped files under `constraint`.
    ///
    /// Duplicates (same name and size) are skipped. Files past the module's
    /// count limit are dropped with one warning. If the accepted files would
    /// push the total past the size ceiling the whole batch is rejected and
    /// the store is left untouched.
    pub fn add_files<I>(
        &mut self,
        incoming: I,
        constraint: &ModuleConstraint,
    ) -> Result<AddOutcome, ValidationError>
    where
        I: IntoIterator<Item = F>,
    {
        let mut outcome = AddOutcome::default();
        let mut accepted: Vec<F> = Vec::new();

        for file in incoming {
            if !constraint.accepts(&file) {
                outcome.unsupported.push(file.name().to_string());
                continue;
            }
            let key = file.key();
            if self.contains(&key) || accepted.iter().any(|f| f.key() == key) {
                outcome.duplicates.push(key);
                continue;
            }
            accepted.push(file);
        }

        if let Some(max) = constraint.max_files {
            let room = max.saturating_sub(self.len());
            if accepted.len() > room {
                let dropped = accepted.split_off(room);
                outcome.warning = Some(ValidationError::TooManyFiles {
                    module: constraint.module,
                    max,
                    dropped: dropped.len(),
                });
                outcome.truncated = dropped.iter().map(|f| f.key()).collect();
            }
        }

        let incoming_bytes: u64 = accepted.iter().map(|f| f.size()).sum();
        let total = self.total_size() + incoming_bytes;
        if total > constraint.max_total_bytes {
            tracing::debug!(
                module = %constraint.module,
                total,
                limit = constraint.max_total_bytes,
                "Rejecting batch over size ceiling"
            );
            return Err(ValidationError::TotalSizeExceeded {
                total_mb: total as f64 / MB as f64,
                limit_mb: constraint.limit_mb(),
            });
        }

        if accepted.is_empty() {
            return Ok(outcome);
        }

        self.generation += 1;
        for file in accepted {
            outcome.added.push(file.key());
            self.entries.push(Entry {
                file,
                added_at: self.generation,
            });
        }
        if self.focused.is_none() {
            self.focused = outcome.added.first().cloned();
        }

        tracing::debug!(
            module = %constraint.module,
            added = outcome.added.len(),
            duplicates = outcome.duplicates.len(),
            truncated = outcome.truncated.len(),
            "Selection updated"
        );
        Ok(outcome)
    }

    /// Remove one file. Focus moves to the file that took its place, or the
    /// new last file.
    pub fn remove(&mut self, key: &FileKey) -> Option<Removed<F>> {
        let index = self.position(key)?;
        let entry = self.entries.remove(index);
        self.generation += 1;

        if self.focused.as_ref() == Some(key) {
            self.focused = self
                .entries
                .get(index)
                .or_else(|| self.entries.last())
                .map(|e| e.file.key());
        }

        tracing::debug!(file = %key, remaining = self.len(), "File removed");
        Some(Removed {
            file: entry.file,
            emptied: self.entries.is_empty(),
        })
    }

    /// Replace the sequence with `new_order`, which must be a permutation of
    /// the current keys.
    pub fn reorder(&mut self, new_order: &[FileKey]) -> Result<(), ValidationError> {
        let indices = new_order
            .iter()
            .map(|k| {
                self.position(k)
                    .ok_or_else(|| ValidationError::InvalidOrder(format!("unknown file {}", k)))
            })
            .collect::<Result<Vec<_>, _>>()?;
        self.reorder_by_indices(&indices)
    }

    /// Reorder by current indices, e.g. `[1, 0]` swaps two files
    pub fn reorder_by_indices(&mut self, new_order: &[usize]) -> Result<(), ValidationError> {
        if new_order.len() != self.entries.len() {
            return Err(ValidationError::InvalidOrder(
                "wrong number of indices".to_string(),
            ));
        }

        let mut seen = vec![false; self.entries.len()];
        for &idx in new_order {
            if idx >= self.entries.len() {
                return Err(ValidationError::InvalidOrder(
                    "index out of bounds".to_string(),
                ));
            }
            if seen[idx] {
                return Err(ValidationError::InvalidOrder("duplicate index".to_string()));
            }
            seen[idx] = true;
        }

        let mut slots: Vec<Option<Entry<F>>> = std::mem::take(&mut self.entries)
            .into_iter()
            .map(Some)
            .collect();
        self.entries = new_order.iter().filter_map(|&i| slots[i].take()).collect();
        self.generation += 1;
        Ok(())
    }

    /// Sort by file name, used by the merge panel's A-Z / Z-A buttons.
    /// See [`compare_names`].
    pub fn sort_by_name(&mut self, ascending: bool) {
        self.entries.sort_by(|a, b| {
            let ord = compare_names(a.file.name(), b.file.name());
            if ascending {
                ord
            } else {
                ord.reverse()
            }
        });
        self.generation += 1;
    }

    /// Focus a selected file. Returns false when the key is not selected.
    pub fn focus(&mut self, key: &FileKey) -> bool {
        if !self.contains(key) {
            return false;
        }
        if self.focused.as_ref() != Some(key) {
            self.focused = Some(key.clone());
            self.generation += 1;
        }
        true
    }

    pub fn clear(&mut self) {
        if !self.entries.is_empty() || self.focused.is_some() {
            self.entries.clear();
            self.focused = None;
            self.generation += 1;
        }
    }

    /// Start an async render for `key`
    pub fn ticket(&self, key: &FileKey) -> Option<RenderTicket> {
        self.entries
            .iter()
            .find(|e| &e.file.key() == key)
            .map(|e| RenderTicket {
                key: key.clone(),
                added_at: e.added_at,
            })
    }

    /// True while the file the ticket was issued for is still selected
    pub fn is_current(&self, ticket: &RenderTicket) -> bool {
        self.entries
            .iter()
            .any(|e| e.added_at == ticket.added_at && e.file.key() == ticket.key)
    }
}

/// Order two file names by their stem, the part before the first dot.
/// All-digit stems compare as numbers, so scanned pages `2.pdf` and
/// `10.pdf` stay in page order; other stems compare case-insensitively.
pub fn compare_names(a: &str, b: &str) -> Ordering {
    let stem_a = a.split('.').next().unwrap_or(a);
    let stem_b = b.split('.').next().unwrap_or(b);
    let numeric = |s: &str| !s.is_empty() && s.bytes().all(|c| c.is_ascii_digit());

    if numeric(stem_a) && numeric(stem_b) {
        let a = stem_a.trim_start_matches('0');
        let b = stem_b.trim_start_matches('0');
        a.len().cmp(&b.len()).then_with(|| a.cmp(b))
    } else {
        stem_a.to_lowercase().cmp(&stem_b.to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LimitsConfig;
    use crate::file::FileHandle;
    use crate::module::ModuleKind;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn constraint(module: ModuleKind) -> ModuleConstraint {
        ModuleConstraint::for_module(module, &LimitsConfig::default())
    }

    fn pdf(name: &str, size: u64) -> FileHandle {
        FileHandle::guess(name, size)
    }

    fn names(state: &SelectionState<FileHandle>) -> Vec<String> {
        state.iter().map(|f| f.name.clone()).collect()
    }

    #[test]
    fn test_three_small_files_are_kept() {
        let mut state = SelectionState::new();
        let files = (1..=3).map(|i| pdf(&format!("doc{}.pdf", i), 2 * MB));
        let outcome = state
            .add_files(files, &constraint(ModuleKind::Compress))
            .unwrap();

        assert_eq!(outcome.added.len(), 3);
        assert!(outcome.warning.is_none());
        assert_eq!(state.len(), 3);
        assert_eq!(state.focused().unwrap().name, "doc1.pdf");
    }

    #[test]
    fn test_eleven_files_truncate_to_ten_with_one_warning() {
        let mut state = SelectionState::new();
        let files = (1..=11).map(|i| pdf(&format!("doc{:02}.pdf", i), MB));
        let outcome = state
            .add_files(files, &constraint(ModuleKind::Compress))
            .unwrap();

        assert_eq!(state.len(), 10);
        assert_eq!(outcome.truncated, vec![FileKey::new("doc11.pdf", MB)]);
        assert_eq!(outcome.notices().len(), 1);
        assert_eq!(
            outcome.warning,
            Some(ValidationError::TooManyFiles {
                module: ModuleKind::Compress,
                max: 10,
                dropped: 1
            })
        );
    }

    #[test]
    fn test_over_ceiling_leaves_store_untouched() {
        let mut state = SelectionState::new();
        let c = constraint(ModuleKind::Compress);
        state.add_files([pdf("keep.pdf", 100 * MB)], &c).unwrap();
        let before = state.keys();
        let generation = state.generation();

        let err = state
            .add_files([pdf("big1.pdf", 600 * MB), pdf("big2.pdf", 400 * MB)], &c)
            .unwrap_err();

        assert!(matches!(err, ValidationError::TotalSizeExceeded { .. }));
        assert_eq!(state.keys(), before);
        assert_eq!(state.generation(), generation);
    }

    #[test]
    fn test_duplicates_are_skipped_within_and_across_batches() {
        let mut state = SelectionState::new();
        let c = constraint(ModuleKind::Merge);
        state.add_files([pdf("a.pdf", 10)], &c).unwrap();
        let outcome = state
            .add_files([pdf("a.pdf", 10), pdf("b.pdf", 5), pdf("b.pdf", 5)], &c)
            .unwrap();

        assert_eq!(names(&state), vec!["a.pdf", "b.pdf"]);
        assert_eq!(outcome.duplicates.len(), 2);
    }

    #[test]
    fn test_same_name_different_size_is_distinct() {
        let mut state = SelectionState::new();
        let c = constraint(ModuleKind::Merge);
        state
            .add_files([pdf("a.pdf", 10), pdf("a.pdf", 11)], &c)
            .unwrap();
        assert_eq!(state.len(), 2);
    }

    #[test]
    fn test_non_pdf_is_reported_not_added() {
        let mut state = SelectionState::new();
        let outcome = state
            .add_files(
                [pdf("a.pdf", 1), FileHandle::guess("b.png", 1)],
                &constraint(ModuleKind::Merge),
            )
            .unwrap();
        assert_eq!(state.len(), 1);
        assert_eq!(outcome.unsupported, vec!["b.png"]);
        assert_eq!(outcome.notices().len(), 1);
    }

    #[test]
    fn test_split_keeps_only_first_file() {
        let mut state = SelectionState::new();
        let outcome = state
            .add_files(
                [pdf("one.pdf", 1), pdf("two.pdf", 1)],
                &constraint(ModuleKind::Split),
            )
            .unwrap();
        assert_eq!(names(&state), vec!["one.pdf"]);
        assert!(outcome.warning.is_some());

        let outcome = state
            .add_files([pdf("three.pdf", 1)], &constraint(ModuleKind::Split))
            .unwrap();
        assert_eq!(names(&state), vec!["one.pdf"]);
        assert_eq!(outcome.truncated.len(), 1);
    }

    #[test]
    fn test_remove_last_file_reports_emptied() {
        let mut state = SelectionState::new();
        let c = constraint(ModuleKind::Compress);
        state.add_files([pdf("a.pdf", 1)], &c).unwrap();
        let removed = state.remove(&FileKey::new("a.pdf", 1)).unwrap();
        assert!(removed.emptied);
        assert!(state.is_empty());
        assert!(state.focused().is_none());
    }

    #[test]
    fn test_remove_moves_focus_to_neighbour() {
        let mut state = SelectionState::new();
        let c = constraint(ModuleKind::Compress);
        state
            .add_files([pdf("a.pdf", 1), pdf("b.pdf", 1), pdf("c.pdf", 1)], &c)
            .unwrap();
        assert!(state.focus(&FileKey::new("b.pdf", 1)));
        state.remove(&FileKey::new("b.pdf", 1)).unwrap();
        assert_eq!(state.focused().unwrap().name, "c.pdf");
        state.remove(&FileKey::new("c.pdf", 1)).unwrap();
        assert_eq!(state.focused().unwrap().name, "a.pdf");
    }

    #[test]
    fn test_remove_unknown_is_none() {
        let mut state: SelectionState<FileHandle> = SelectionState::new();
        assert!(state.remove(&FileKey::new("x.pdf", 1)).is_none());
    }

    #[test]
    fn test_reorder_rejects_non_permutations() {
        let mut state = SelectionState::new();
        let c = constraint(ModuleKind::Merge);
        state
            .add_files([pdf("a.pdf", 1), pdf("b.pdf", 1)], &c)
            .unwrap();
        assert!(state.reorder_by_indices(&[0]).is_err());
        assert!(state.reorder_by_indices(&[0, 0]).is_err());
        assert!(state.reorder_by_indices(&[0, 2]).is_err());
        assert!(state
            .reorder(&[FileKey::new("a.pdf", 1), FileKey::new("z.pdf", 1)])
            .is_err());
        assert_eq!(names(&state), vec!["a.pdf", "b.pdf"]);
    }

    #[test]
    fn test_sort_by_name_both_directions() {
        let mut state = SelectionState::new();
        let c = constraint(ModuleKind::Merge);
        state
            .add_files([pdf("b.pdf", 1), pdf("C.pdf", 1), pdf("a.pdf", 1)], &c)
            .unwrap();
        state.sort_by_name(true);
        assert_eq!(names(&state), vec!["a.pdf", "b.pdf", "C.pdf"]);
        state.sort_by_name(false);
        assert_eq!(names(&state), vec!["C.pdf", "b.pdf", "a.pdf"]);
    }

    #[test]
    fn test_sort_by_name_orders_numbered_pages_numerically() {
        let mut state = SelectionState::new();
        let c = constraint(ModuleKind::Merge);
        state
            .add_files([pdf("10.pdf", 1), pdf("2.pdf", 1), pdf("1.pdf", 1)], &c)
            .unwrap();
        state.sort_by_name(true);
        assert_eq!(names(&state), vec!["1.pdf", "2.pdf", "10.pdf"]);
        state.sort_by_name(false);
        assert_eq!(names(&state), vec!["10.pdf", "2.pdf", "1.pdf"]);
    }

    #[test]
    fn test_compare_names_uses_stem() {
        assert_eq!(compare_names("007.pdf", "7.pdf"), Ordering::Equal);
        assert_eq!(compare_names("9.pdf", "10.scan.pdf"), Ordering::Less);
        assert_eq!(compare_names("Report.pdf", "appendix.pdf"), Ordering::Greater);
        assert_eq!(compare_names("10.pdf", "a.pdf"), Ordering::Less);
    }

    #[test]
    fn test_ticket_goes_stale_after_remove_and_readd() {
        let mut state = SelectionState::new();
        let c = constraint(ModuleKind::Compress);
        let key = FileKey::new("a.pdf", 1);
        state.add_files([pdf("a.pdf", 1)], &c).unwrap();
        let ticket = state.ticket(&key).unwrap();
        assert!(state.is_current(&ticket));

        state.remove(&key).unwrap();
        assert!(!state.is_current(&ticket));

        state.add_files([pdf("a.pdf", 1)], &c).unwrap();
        assert!(!state.is_current(&ticket));
        assert!(state.is_current(&state.ticket(&key).unwrap()));
    }

    #[test]
    fn test_ticket_survives_reorder() {
        let mut state = SelectionState::new();
        let c = constraint(ModuleKind::Merge);
        state
            .add_files([pdf("a.pdf", 1), pdf("b.pdf", 1)], &c)
            .unwrap();
        let ticket = state.ticket(&FileKey::new("a.pdf", 1)).unwrap();
        state.reorder_by_indices(&[1, 0]).unwrap();
        assert!(state.is_current(&ticket));
    }

    #[derive(Debug, Clone)]
    enum Op {
        Add(Vec<(u8, u8)>),
        Remove(u8, u8),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            prop::collection::vec((0u8..6, 1u8..4), 0..6).prop_map(Op::Add),
            (0u8..6, 1u8..4).prop_map(|(n, s)| Op::Remove(n, s)),
        ]
    }

    fn handle(n: u8, s: u8) -> FileHandle {
        pdf(&format!("f{}.pdf", n), s as u64)
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn store_never_holds_duplicate_keys(ops in prop::collection::vec(op(), 0..30)) {
            let mut state = SelectionState::new();
            let c = constraint(ModuleKind::Merge);
            for op in ops {
                match op {
                    Op::Add(files) => {
                        let _ = state.add_files(files.into_iter().map(|(n, s)| handle(n, s)), &c);
                    }
                    Op::Remove(n, s) => {
                        state.remove(&FileKey::new(format!("f{}.pdf", n), s as u64));
                    }
                }
                let mut keys = state.keys();
                let len = keys.len();
                keys.sort();
                keys.dedup();
                prop_assert_eq!(keys.len(), len);
                if let Some(focused) = state.focused_key() {
                    prop_assert!(state.contains(focused));
                }
            }
        }

        #[test]
        fn reorder_matches_requested_order(
            order in (1usize..8).prop_flat_map(|n| Just((0..n).collect::<Vec<_>>()).prop_shuffle())
        ) {
            let mut state = SelectionState::new();
            let c = constraint(ModuleKind::Merge);
            let files: Vec<_> = (0..order.len()).map(|i| pdf(&format!("p{}.pdf", i), 1)).collect();
            state.add_files(files.clone(), &c).unwrap();

            let wanted: Vec<FileKey> = order.iter().map(|&i| files[i].key()).collect();
            state.reorder(&wanted).unwrap();
            prop_assert_eq!(state.keys(), wanted);
        }

        #[test]
        fn rejected_batches_change_nothing(
            existing in prop::collection::vec(1u64..400, 0..3),
            batch in prop::collection::vec(1u64..700, 1..4),
        ) {
            let mut state = SelectionState::new();
            let c = constraint(ModuleKind::Compress);
            let seeded: Vec<_> = existing.iter().enumerate()
                .map(|(i, mb)| pdf(&format!("e{}.pdf", i), mb * MB)).collect();
            let _ = state.add_files(seeded, &c);
            let before = state.keys();

            let incoming: Vec<_> = batch.iter().enumerate()
                .map(|(i, mb)| pdf(&format!("n{}.pdf", i), mb * MB)).collect();
            if state.add_files(incoming, &c).is_err() {
                prop_assert_eq!(state.keys(), before);
            } else {
                prop_assert!(state.total_size() <= c.max_total_bytes);
            }
        }
    }
}
