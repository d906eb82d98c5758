//! Character renderer
//!
//! Handles one character code at a time:
//!
//! - CR (13): column 1, re-locate on the current row
//! - LF (10): next row, column 1; at the bottom row scroll instead
//! - anything else: write the glyph, then advance the cursor, wrapping
//!   at column 16 and scrolling when the wrap leaves the bottom row
//!
//! The cursor only moves after the glyph is on the wire, and every move
//! is followed by the locator (or scroller) so the display's RAM pointer
//! tracks the cursor.

use crate::cursor::Cursor;
use crate::engine::{BusEngine, Engines};
use crate::rom::GLYPH_BASE;

pub const CR: u8 = 13;
pub const LF: u8 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
enum State {
    Idle,
    /// Glyph on the way; advance when the writer finishes
    Glyph,
    /// Scroll in progress; `then_locate` re-syncs the column afterwards
    Scrolling { then_locate: bool },
    Locating,
}

/// Renders single characters through the engines
#[derive(Debug)]
pub struct Renderer {
    state: State,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer {
    pub const fn new() -> Self {
        Self { state: State::Idle }
    }

    /// Begin rendering `code`
    ///
    /// Callers wait for [`Renderer::busy`] to drop before the next code.
    pub fn start(&mut self, code: u8, cursor: &mut Cursor, engines: &mut Engines) {
        self.state = match code {
            CR => {
                cursor.col = 1;
                engines.locator.start(cursor.row, cursor.col);
                State::Locating
            }
            LF => {
                cursor.col = 1;
                if cursor.at_bottom() {
                    engines.scroller.start();
                    State::Scrolling { then_locate: false }
                } else {
                    cursor.row += 1;
                    engines.locator.start(cursor.row, cursor.col);
                    State::Locating
                }
            }
            _ => {
                engines.rom_writer.start(GLYPH_BASE + u16::from(code));
                State::Glyph
            }
        };
    }

    /// Advance; engines must be stepped separately
    pub fn step(&mut self, cursor: &mut Cursor, engines: &mut Engines) {
        match self.state {
            State::Idle => {}
            State::Glyph => {
                if engines.rom_writer.busy() {
                    return;
                }
                if cursor.at_right_edge() {
                    cursor.col = 1;
                    if cursor.at_bottom() {
                        engines.scroller.start();
                        self.state = State::Scrolling { then_locate: true };
                        return;
                    }
                    cursor.row += 1;
                } else {
                    cursor.col += 1;
                }
                engines.locator.start(cursor.row, cursor.col);
                self.state = State::Locating;
            }
            State::Scrolling { then_locate } => {
                if engines.scroller.busy() {
                    return;
                }
                if then_locate {
                    engines.locator.start(cursor.row, cursor.col);
                    self.state = State::Locating;
                } else {
                    self.state = State::Idle;
                }
            }
            State::Locating => {
                if !engines.locator.busy() {
                    self.state = State::Idle;
                }
            }
        }
    }

    pub fn busy(&self) -> bool {
        self.state != State::Idle
    }
}
