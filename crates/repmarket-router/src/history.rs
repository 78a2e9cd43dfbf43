//! Session history: the back/forward stack of a tab.

use serde_json::Value;

/// One history entry.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    /// Path including any query.
    pub path: String,
    /// State attached by the navigation that created the entry.
    pub state: Value,
}

/// Ordered entries with a cursor. Pushing discards entries after the cursor.
#[derive(Debug, Clone, Default)]
pub struct History {
    entries: Vec<HistoryEntry>,
    index: usize,
}

impl History {
    /// Empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry after the cursor and move to it.
    pub fn push(&mut self, path: impl Into<String>, state: Value) {
        if !self.entries.is_empty() {
            self.entries.truncate(self.index + 1);
        }
        self.entries.push(HistoryEntry {
            path: path.into(),
            state,
        });
        self.index = self.entries.len() - 1;
    }

    /// Replace the entry at the cursor (push if empty).
    pub fn replace(&mut self, path: impl Into<String>, state: Value) {
        match self.entries.get_mut(self.index) {
            Some(entry) => {
                entry.path = path.into();
                entry.state = state;
            }
            None => self.push(path, state),
        }
    }

    /// Entry at the cursor.
    pub fn current(&self) -> Option<&HistoryEntry> {
        self.entries.get(self.index)
    }

    /// Move back one entry.
    pub fn back(&mut self) -> Option<&HistoryEntry> {
        if self.index == 0 || self.entries.is_empty() {
            return None;
        }
        self.index -= 1;
        self.entries.get(self.index)
    }

    /// Move forward one entry.
    pub fn forward(&mut self) -> Option<&HistoryEntry> {
        if self.index + 1 >= self.entries.len() {
            return None;
        }
        self.index += 1;
        self.entries.get(self.index)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nothing was ever navigated to.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Paths of all entries, oldest first.
    pub fn paths(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.path.as_str()).collect()
    }
}
