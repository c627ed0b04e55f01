//! Repaint flags for widgets

use slotmap::SecondaryMap;

use crate::widget::WidgetKey;

/// Why a widget is visited during patch generation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Repaint {
    /// Some descendant must be re-rendered, but not this widget
    Below,
    /// This widget must be re-rendered
    Dirty,
}

/// Tracks which widgets need repainting during the current request
#[derive(Debug, Default)]
pub struct DirtyTracker {
    flags: SecondaryMap<WidgetKey, Repaint>,
}

impl DirtyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flag a widget dirty; returns false if it already was
    pub fn mark_dirty(&mut self, key: WidgetKey) -> bool {
        match self.flags.insert(key, Repaint::Dirty) {
            Some(Repaint::Dirty) => false,
            _ => true,
        }
    }

    /// Flag a widget dirty-below unless it is already flagged
    pub fn mark_below(&mut self, key: WidgetKey) {
        if !self.flags.contains_key(key) {
            self.flags.insert(key, Repaint::Below);
        }
    }

    pub fn flag(&self, key: WidgetKey) -> Option<Repaint> {
        self.flags.get(key).copied()
    }

    pub fn is_dirty(&self, key: WidgetKey) -> bool {
        self.flag(key) == Some(Repaint::Dirty)
    }

    pub fn has_dirty(&self) -> bool {
        self.flags.values().any(|f| *f == Repaint::Dirty)
    }

    /// Keys of all widgets flagged dirty
    pub fn dirty_keys(&self) -> Vec<WidgetKey> {
        self.flags
            .iter()
            .filter(|(_, f)| **f == Repaint::Dirty)
            .map(|(k, _)| k)
            .collect()
    }

    pub fn forget(&mut self, key: WidgetKey) {
        self.flags.remove(key);
    }

    /// Clear all flags
    pub fn clear_all(&mut self) {
        self.flags.clear();
    }
}
