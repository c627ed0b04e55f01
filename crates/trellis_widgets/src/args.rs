//! Colon-separated widget arguments
//!
//! Events from widgets rendered inside a list carry ids such as
//! `animals:17:name` or `animals:page:3`. [`WidgetArgs`] is a cursor over the
//! colon-separated parts of such an id.

use std::fmt;

use crate::tree::WidgetTree;
use crate::widget::WidgetKey;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WidgetArgs {
    parts: Vec<String>,
    cursor: usize,
}

impl WidgetArgs {
    pub fn new(text: &str) -> Self {
        let parts = if text.is_empty() {
            Vec::new()
        } else {
            text.split(':').map(str::to_string).collect()
        };
        Self { parts, cursor: 0 }
    }

    pub fn count(&self) -> usize {
        self.parts.len()
    }

    pub fn done(&self) -> bool {
        self.cursor == self.parts.len()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn set_cursor(&mut self, position: usize) {
        assert!(position <= self.parts.len(), "cursor {position} out of range in {self}");
        self.cursor = position;
    }

    pub fn arg(&self, index: usize) -> &str {
        &self.parts[index]
    }

    /// Parts `i..j` joined back with colons
    pub fn range(&self, i: usize, j: usize) -> String {
        assert!(i < j && j <= self.parts.len(), "bad range {i}..{j} in {self}");
        self.parts[i..j].join(":")
    }

    /// Everything from the cursor onward
    pub fn remainder(&self) -> String {
        self.parts[self.cursor..].join(":")
    }

    pub fn peek(&self) -> Option<&str> {
        self.parts.get(self.cursor).map(String::as_str)
    }

    pub fn read(&mut self) -> Option<String> {
        let value = self.parts.get(self.cursor).cloned();
        if value.is_some() {
            self.cursor += 1;
        }
        value
    }

    /// Consume the next part if it equals `expected`
    pub fn read_if(&mut self, expected: &str) -> bool {
        if self.peek() == Some(expected) {
            self.cursor += 1;
            true
        } else {
            false
        }
    }

    pub fn peek_int(&self) -> Option<i64> {
        self.peek().and_then(|s| s.parse().ok())
    }

    pub fn read_int(&mut self) -> Option<i64> {
        let value = self.peek_int();
        if value.is_some() {
            self.cursor += 1;
        }
        value
    }

    /// Consume the next part if it is an integer in `min..max`
    pub fn read_int_within_range(&mut self, min: i64, max: i64) -> Option<i64> {
        match self.peek_int() {
            Some(v) if v >= min && v < max => {
                self.cursor += 1;
                Some(v)
            }
            _ => None,
        }
    }

    /// Find the longest run of parts starting at the cursor that names a
    /// registered widget, and move the cursor past it
    pub fn find_widget_id_as_prefix(&mut self, tree: &WidgetTree) -> Option<WidgetKey> {
        for end in (self.cursor + 1..=self.parts.len()).rev() {
            let candidate = self.range(self.cursor, end);
            if let Some(key) = tree.find(&candidate) {
                self.cursor = end;
                return Some(key);
            }
        }
        None
    }
}

impl fmt::Display for WidgetArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, part) in self.parts.iter().enumerate() {
            write!(f, ":")?;
            if i == self.cursor {
                write!(f, ">")?;
            }
            write!(f, "{part}")?;
        }
        if self.done() {
            write!(f, ":>")?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_control_args() {
        let mut args = WidgetArgs::new("page:3");
        assert!(!args.read_if("item"));
        assert!(args.read_if("page"));
        assert_eq!(args.read_int_within_range(0, 3), None);
        assert_eq!(args.read_int_within_range(0, 4), Some(3));
        assert!(args.done());
    }

    #[test]
    fn test_range_and_remainder() {
        let mut args = WidgetArgs::new("animals:17:name:x");
        assert_eq!(args.count(), 4);
        assert_eq!(args.range(1, 3), "17:name");
        args.set_cursor(1);
        assert_eq!(args.remainder(), "17:name:x");
        assert_eq!(args.read_int(), Some(17));
        assert_eq!(args.read().as_deref(), Some("name"));
        assert_eq!(args.to_string(), "[:animals:17:name:>x]");
    }

    #[test]
    fn test_empty_args() {
        let mut args = WidgetArgs::new("");
        assert!(args.done());
        assert_eq!(args.read(), None);
        assert_eq!(args.to_string(), "[:>]");
    }
}
