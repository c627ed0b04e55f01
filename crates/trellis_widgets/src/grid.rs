//! Grid layout cells
//!
//! Each child of a container occupies a cell in a 12-column grid. Cells are
//! placed left to right; a child that would overflow the current row starts
//! a new one.

use crate::widget::MAX_COLUMNS;

/// Layout metadata for one child of a container
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridCell {
    /// Column of the cell's left edge
    pub x: usize,
    /// Row index
    pub y: usize,
    /// Columns occupied, 1..=12
    pub width: usize,
}

impl GridCell {
    /// The cell following `prev` with the given width
    pub fn after(prev: Option<&GridCell>, width: usize) -> GridCell {
        assert!(
            (1..=MAX_COLUMNS).contains(&width),
            "column width {width} outside 1..={MAX_COLUMNS}"
        );
        let (x, y) = match prev {
            Some(p) => (p.x + p.width, p.y),
            None => (0, 0),
        };
        if x + width > MAX_COLUMNS {
            GridCell { x: 0, y: y + 1, width }
        } else {
            GridCell { x, y, width }
        }
    }
}
