//! Cursor state

use sh1107_protocol::{COLS, ROWS};

/// Text cursor, 1-based
///
/// Rows and columns stay in `1..=16`; LOCATE clamps its operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Cursor {
    pub row: u8,
    pub col: u8,
    pub visible: bool,
}

impl Default for Cursor {
    fn default() -> Self {
        Self {
            row: 1,
            col: 1,
            visible: false,
        }
    }
}

impl Cursor {
    /// Back to (1,1), visibility unchanged
    pub fn home(&mut self) {
        self.row = 1;
        self.col = 1;
    }

    pub fn at_bottom(&self) -> bool {
        self.row >= ROWS
    }

    pub fn at_right_edge(&self) -> bool {
        self.col >= COLS
    }
}
