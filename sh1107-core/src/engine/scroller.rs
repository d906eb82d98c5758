//! Scroll engine
//!
//! Keeps the display's top row offset in pages. A scroll blanks the page
//! that is about to wrap around to the bottom, then moves the display
//! start line down one character row. The locator reads the offset
//! through [`Scroller::adjusted`].

use sh1107_hal::{BusChannel, Word};

use super::{BusEngine, Transfer};
use crate::rom::Rom;

const PAGES: u8 = 16;
const PAGE_WIDTH: usize = 128;
const CONTROL_COMMAND: u8 = 0x00;
const CONTROL_DATA: u8 = 0x40;
const SET_PAGE: u8 = 0xB0;
const SET_START_LINE: u8 = 0xDC;

/// Clear preamble: page select, column 0, then data mode
const CLEAR_PREAMBLE: usize = 7;

/// Scrolls the display up one character row per request
#[derive(Debug)]
pub struct Scroller {
    address: u8,
    offset: u8,
    index: usize,
    transfer: Transfer,
}

impl Scroller {
    pub fn new(address: u8) -> Self {
        Self {
            address,
            offset: 0,
            index: 0,
            transfer: Transfer::default(),
        }
    }

    pub fn start(&mut self) {
        self.index = 0;
        self.transfer.begin();
    }

    /// Back to an unscrolled display
    pub fn reset(&mut self) {
        self.offset = 0;
    }

    /// Current row adjustment in pages
    pub fn adjusted(&self) -> u8 {
        self.offset
    }

    fn next_word(&mut self) -> Option<Word> {
        let start = Word::start_write(self.address);
        let index = self.index;
        let start_line = CLEAR_PREAMBLE + PAGE_WIDTH;

        let word = match index {
            0 | 5 => start,
            1 => Word::data(CONTROL_COMMAND),
            2 => Word::data(SET_PAGE | self.offset),
            3 => Word::data(0x00),
            4 => Word::data(0x10),
            6 => Word::data(CONTROL_DATA),
            i if i < start_line => Word::data(0),
            i if i == start_line => start,
            i if i == start_line + 1 => Word::data(CONTROL_COMMAND),
            i if i == start_line + 2 => Word::data(SET_START_LINE),
            i if i == start_line + 3 => {
                self.offset = (self.offset + 1) % PAGES;
                #[cfg(feature = "defmt")]
                defmt::debug!("scroll: offset {}", self.offset);
                Word::data(self.offset * 8)
            }
            _ => return None,
        };
        self.index += 1;
        Some(word)
    }
}

impl BusEngine for Scroller {
    fn busy(&self) -> bool {
        self.transfer.busy()
    }

    fn step<B: BusChannel>(&mut self, bus: &mut B, _rom: &Rom) {
        let mut transfer = core::mem::take(&mut self.transfer);
        transfer.drive(bus, || self.next_word());
        self.transfer = transfer;
    }
}
