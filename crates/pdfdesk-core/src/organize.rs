//! Page layout for the organize module
//!
//! Organize works on the pages of one PDF: the user drags pages into a new
//! order, rotates them, and the resulting `[{page, rotation}]` list is sent
//! to the backend. Thumbnails are rendered lazily as pages scroll into view.

use serde::Serialize;

use crate::api::PageOrder;
use crate::error::ValidationError;
use crate::file::FileKey;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageSlot {
    /// Page number in the source document (1-indexed)
    pub page: u32,
    /// Clockwise rotation in degrees: 0, 90, 180 or 270
    pub rotation: u16,
    pub selected: bool,
    /// Thumbnail has been requested
    pub loaded: bool,
}

pub fn next_rotation(rotation: u16) -> u16 {
    (rotation + 90) % 360
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageLayout {
    source: FileKey,
    slots: Vec<PageSlot>,
}

impl PageLayout {
    pub fn new(source: FileKey, page_count: u32) -> Self {
        let slots = (1..=page_count)
            .map(|page| PageSlot {
                page,
                rotation: 0,
                selected: false,
                loaded: false,
            })
            .collect();
        Self { source, slots }
    }

    pub fn source(&self) -> &FileKey {
        &self.source
    }

    pub fn slots(&self) -> &[PageSlot] {
        &self.slots
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn slot_mut(&mut self, page: u32) -> Option<&mut PageSlot> {
        self.slots.iter_mut().find(|s| s.page == page)
    }

    /// Replace the order with `pages`, a permutation of the source pages
    pub fn reorder(&mut self, pages: &[u32]) -> Result<(), ValidationError> {
        if pages.len() != self.slots.len() {
            return Err(ValidationError::InvalidOrder(format!(
                "expected {} pages, got {}",
                self.slots.len(),
                pages.len()
            )));
        }
        let mut seen = vec![false; self.slots.len() + 1];
        for &page in pages {
            if page == 0 || page as usize > self.slots.len() {
                return Err(ValidationError::InvalidOrder(format!(
                    "page {} is out of range (1-{})",
                    page,
                    self.slots.len()
                )));
            }
            if seen[page as usize] {
                return Err(ValidationError::InvalidOrder(format!(
                    "page {} appears twice",
                    page
                )));
            }
            seen[page as usize] = true;
        }

        let mut old: Vec<Option<PageSlot>> =
            std::mem::take(&mut self.slots).into_iter().map(Some).collect();
        self.slots = pages
            .iter()
            .filter_map(|&p| {
                old.iter_mut()
                    .find(|s| s.as_ref().is_some_and(|s| s.page == p))
                    .and_then(Option::take)
            })
            .collect();
        Ok(())
    }

    /// Move the page at position `from` to position `to`
    pub fn move_slot(&mut self, from: usize, to: usize) -> Result<(), ValidationError> {
        if from >= self.slots.len() || to >= self.slots.len() {
            return Err(ValidationError::InvalidOrder(
                "position out of bounds".to_string(),
            ));
        }
        let slot = self.slots.remove(from);
        self.slots.insert(to, slot);
        Ok(())
    }

    /// Rotate one page by 90 degrees; returns its new rotation
    pub fn rotate(&mut self, page: u32) -> Option<u16> {
        let slot = self.slot_mut(page)?;
        slot.rotation = next_rotation(slot.rotation);
        Some(slot.rotation)
    }

    /// Rotate every selected page by 90 degrees
    pub fn rotate_selected(&mut self) -> Result<Vec<u32>, ValidationError> {
        let mut rotated = Vec::new();
        for slot in self.slots.iter_mut().filter(|s| s.selected) {
            slot.rotation = next_rotation(slot.rotation);
            rotated.push(slot.page);
        }
        if rotated.is_empty() {
            return Err(ValidationError::NoPagesSelected);
        }
        Ok(rotated)
    }

    /// Flip selection of one page; returns the new state
    pub fn toggle_selected(&mut self, page: u32) -> Option<bool> {
        let slot = self.slot_mut(page)?;
        slot.selected = !slot.selected;
        Some(slot.selected)
    }

    pub fn select_all(&mut self) {
        self.slots.iter_mut().for_each(|s| s.selected = true);
    }

    /// Clear every selection. Errors when nothing was selected.
    pub fn clear_selection(&mut self) -> Result<usize, ValidationError> {
        let mut cleared = 0;
        for slot in self.slots.iter_mut().filter(|s| s.selected) {
            slot.selected = false;
            cleared += 1;
        }
        if cleared == 0 {
            return Err(ValidationError::NoPagesSelected);
        }
        Ok(cleared)
    }

    pub fn selected_pages(&self) -> Vec<u32> {
        self.slots
            .iter()
            .filter(|s| s.selected)
            .map(|s| s.page)
            .collect()
    }

    /// A page scrolled into view. Returns true the first time only, which is
    /// when its thumbnail should be rendered.
    pub fn mark_visible(&mut self, page: u32) -> bool {
        match self.slot_mut(page) {
            Some(slot) if !slot.loaded => {
                slot.loaded = true;
                true
            }
            _ => false,
        }
    }

    pub fn order(&self) -> Vec<PageOrder> {
        self.slots
            .iter()
            .map(|s| PageOrder {
                page: s.page,
                rotation: s.rotation,
            })
            .collect()
    }
}
