//! Cursor locator
//!
//! Points the display's RAM pointer at a character cell. Row and column
//! are 1-based; 0 leaves that axis alone on the wire. The scroll
//! adjustment rotates rows onto physical pages.

use heapless::Vec;
use sh1107_hal::{BusChannel, Word};

use super::{BusEngine, Transfer};
use crate::rom::Rom;

const CONTROL_COMMAND: u8 = 0x00;
const SET_PAGE: u8 = 0xB0;
const SET_HIGH_COLUMN: u8 = 0x10;
const PAGES: u16 = 16;
const CELL_WIDTH: u16 = 8;

/// Issues page and column addressing for a character cell
#[derive(Debug)]
pub struct Locator {
    address: u8,
    row: u8,
    col: u8,
    adjust: u8,
    /// Addressing bytes after the control byte, built on the first word
    bytes: Vec<u8, 4>,
    sent: usize,
    transfer: Transfer,
}

impl Locator {
    pub fn new(address: u8) -> Self {
        Self {
            address,
            row: 0,
            col: 0,
            adjust: 0,
            bytes: Vec::new(),
            sent: 0,
            transfer: Transfer::default(),
        }
    }

    /// Move to (row, col); 0 on either axis sends nothing for it
    pub fn start(&mut self, row: u8, col: u8) {
        self.row = row;
        self.col = col;
        self.sent = 0;
        self.transfer.begin();
    }

    /// Scroll adjustment in pages
    pub fn set_adjust(&mut self, adjust: u8) {
        self.adjust = adjust;
    }

    /// Physical page for `row` under `adjust`
    pub fn page(row: u8, adjust: u8) -> u8 {
        ((u16::from(row) + PAGES - 1 + u16::from(adjust)) % PAGES) as u8
    }

    /// Low and high column nibble commands for `col`
    pub fn column_bytes(col: u8) -> [u8; 2] {
        let x = u16::from(col).wrapping_sub(1).wrapping_mul(CELL_WIDTH) & 0xFF;
        [(x & 0x0F) as u8, SET_HIGH_COLUMN | ((x >> 4) & 0x0F) as u8]
    }

    fn addressing(&self) -> Vec<u8, 4> {
        let mut bytes = Vec::new();
        // Capacity covers CONTROL + page + two column bytes
        let _ = bytes.push(CONTROL_COMMAND);
        if self.row != 0 {
            let _ = bytes.push(SET_PAGE | Self::page(self.row, self.adjust));
        }
        if self.col != 0 {
            let _ = bytes.extend_from_slice(&Self::column_bytes(self.col));
        }
        bytes
    }

    fn next_word(&mut self) -> Option<Word> {
        let word = if self.sent == 0 {
            self.bytes = self.addressing();
            Some(Word::start_write(self.address))
        } else {
            self.bytes.get(self.sent - 1).copied().map(Word::data)
        };
        if word.is_some() {
            self.sent += 1;
        }
        word
    }
}

impl BusEngine for Locator {
    fn busy(&self) -> bool {
        self.transfer.busy()
    }

    fn step<B: BusChannel>(&mut self, bus: &mut B, _rom: &Rom) {
        let mut transfer = core::mem::take(&mut self.transfer);
        transfer.drive(bus, || self.next_word());
        self.transfer = transfer;
    }
}
