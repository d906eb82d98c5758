//! ROM sequence writer
//!
//! Replays a command sequence or a glyph from the ROM image. Sequences are
//! self-terminating (`[len, bytes..]* 0`) and share one transfer; a glyph is
//! a single data-mode write of its eight columns.

use sh1107_hal::{BusChannel, Word};

use super::{BusEngine, Transfer};
use crate::rom::{Rom, GLYPH_BASE, GLYPH_STRIDE};

const CONTROL_DATA: u8 = 0x40;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Position {
    /// Fetch the sequence or glyph offset on the first word
    Start,
    /// Length byte of the next segment
    Segment { at: usize },
    /// Inside a segment
    Bytes { at: usize, remaining: u8 },
    GlyphControl { at: usize },
    GlyphColumns { at: usize, remaining: u8 },
    Done,
}

/// Writes ROM sequences and glyphs to the display
#[derive(Debug)]
pub struct RomWriter {
    address: u8,
    index: u16,
    position: Position,
    transfer: Transfer,
}

impl RomWriter {
    pub fn new(address: u8) -> Self {
        Self {
            address,
            index: 0,
            position: Position::Done,
            transfer: Transfer::default(),
        }
    }

    /// Replay sequence `index`; `GLYPH_BASE + code` writes a glyph
    pub fn start(&mut self, index: u16) {
        self.index = index;
        self.position = Position::Start;
        self.transfer.begin();
    }

    fn next_word(&mut self, rom: &Rom) -> Option<Word> {
        loop {
            match self.position {
                Position::Start => {
                    if self.index < GLYPH_BASE {
                        self.position = Position::Segment {
                            at: rom.sequence_offset(self.index),
                        };
                    } else {
                        let code = (self.index - GLYPH_BASE) as u8;
                        self.position = Position::GlyphControl {
                            at: rom.glyph_offset(code),
                        };
                        return Some(Word::start_write(self.address));
                    }
                }
                Position::Segment { at } => {
                    let len = rom.byte(at);
                    if len == 0 {
                        self.position = Position::Done;
                    } else {
                        self.position = Position::Bytes {
                            at: at + 1,
                            remaining: len,
                        };
                        return Some(Word::start_write(self.address));
                    }
                }
                Position::Bytes { at, remaining } => {
                    if remaining == 0 {
                        self.position = Position::Segment { at };
                    } else {
                        self.position = Position::Bytes {
                            at: at + 1,
                            remaining: remaining - 1,
                        };
                        return Some(Word::data(rom.byte(at)));
                    }
                }
                Position::GlyphControl { at } => {
                    self.position = Position::GlyphColumns {
                        at,
                        remaining: GLYPH_STRIDE as u8,
                    };
                    return Some(Word::data(CONTROL_DATA));
                }
                Position::GlyphColumns { at, remaining } => {
                    if remaining == 0 {
                        self.position = Position::Done;
                    } else {
                        self.position = Position::GlyphColumns {
                            at: at + 1,
                            remaining: remaining - 1,
                        };
                        return Some(Word::data(rom.byte(at)));
                    }
                }
                Position::Done => return None,
            }
        }
    }
}

impl BusEngine for RomWriter {
    fn busy(&self) -> bool {
        self.transfer.busy()
    }

    fn step<B: BusChannel>(&mut self, bus: &mut B, rom: &Rom) {
        let mut transfer = core::mem::take(&mut self.transfer);
        transfer.drive(bus, || self.next_word(rom));
        self.transfer = transfer;
    }
}
