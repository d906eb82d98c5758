//! Screen clearer
//!
//! Zeroes all 16 pages in ascending order in one transfer. The first page
//! also resets the column pointer; later pages rely on the column wrapping
//! back to 0 after 128 bytes.

use sh1107_hal::{BusChannel, Word};

use super::{BusEngine, Transfer};
use crate::rom::Rom;

const PAGES: u8 = 16;
const PAGE_WIDTH: usize = 128;
const CONTROL_COMMAND: u8 = 0x00;
const CONTROL_DATA: u8 = 0x40;
const SET_PAGE: u8 = 0xB0;

/// Blanks display RAM
#[derive(Debug)]
pub struct Clser {
    address: u8,
    page: u8,
    index: usize,
    transfer: Transfer,
}

impl Clser {
    pub fn new(address: u8) -> Self {
        Self {
            address,
            page: 0,
            index: 0,
            transfer: Transfer::default(),
        }
    }

    pub fn start(&mut self) {
        self.page = 0;
        self.index = 0;
        self.transfer.begin();
    }

    /// Word `index` of the run that clears `page`
    fn page_word(&self, page: u8, index: usize) -> Option<Word> {
        let start = Word::start_write(self.address);
        let first = [
            start,
            Word::data(CONTROL_COMMAND),
            Word::data(0x00),
            Word::data(0x10),
            Word::data(SET_PAGE),
            start,
            Word::data(CONTROL_DATA),
        ];
        let rest = [
            start,
            Word::data(CONTROL_COMMAND),
            Word::data(SET_PAGE | page),
            start,
            Word::data(CONTROL_DATA),
        ];
        let words: &[Word] = if page == 0 { &first } else { &rest };
        match words.get(index) {
            Some(word) => Some(*word),
            None if index < words.len() + PAGE_WIDTH => Some(Word::data(0)),
            None => None,
        }
    }

    fn next_word(&mut self) -> Option<Word> {
        while self.page < PAGES {
            if let Some(word) = self.page_word(self.page, self.index) {
                self.index += 1;
                return Some(word);
            }
            self.page += 1;
            self.index = 0;
        }
        None
    }
}

impl BusEngine for Clser {
    fn busy(&self) -> bool {
        self.transfer.busy()
    }

    fn step<B: BusChannel>(&mut self, bus: &mut B, _rom: &Rom) {
        let mut transfer = core::mem::take(&mut self.transfer);
        transfer.drive(bus, || self.next_word());
        self.transfer = transfer;
    }
}
