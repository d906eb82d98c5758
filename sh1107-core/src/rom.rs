//! ROM image layout
//!
//! The image loaded at boot holds the display's command sequences and the
//! glyph table:
//!
//! ```text
//! 0x0000  u16 BE  offset of INIT sequence
//! 0x0002  u16 BE  offset of DISPLAY_ON sequence
//! 0x0004  u16 BE  offset of DISPLAY_OFF sequence
//! 0x0006  u16 BE  offset of glyph table
//! ...     sequences: [len, bytes..]* 0
//! ...     glyphs: 8 bytes per code, one byte per column
//! ```
//!
//! Each `[len, bytes..]` segment goes out as its own START; the first byte
//! of a segment is the SH1107 control byte.

use heapless::Vec;

/// Local ROM memory size
pub const ROM_CAPACITY: usize = 4096;

/// Header size (four u16 offsets)
pub const HEADER_LEN: usize = 8;

/// Bytes per glyph
pub const GLYPH_STRIDE: usize = 8;

/// Number of glyph slots
pub const GLYPH_COUNT: usize = 256;

/// Writer index of glyph 0; glyph `c` is `GLYPH_BASE + c`
pub const GLYPH_BASE: u16 = 3;

/// Largest command sequence the builder accepts (segments plus terminator)
pub const SEQUENCE_CAPACITY: usize = 128;

const GLYPH_TABLE_SLOT: usize = 3;

/// Named command sequences
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Sequence {
    Init,
    DisplayOn,
    DisplayOff,
}

impl Sequence {
    /// Writer index of this sequence
    pub const fn index(self) -> u16 {
        match self {
            Sequence::Init => 0,
            Sequence::DisplayOn => 1,
            Sequence::DisplayOff => 2,
        }
    }
}

/// ROM errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RomError {
    /// Image does not fit in local memory
    TooLarge,
    /// A sequence segment is empty or longer than 255 bytes
    InvalidSegment,
    /// A sequence does not fit in the builder
    SequenceTooLong,
}

/// ROM image held in local memory
#[derive(Debug, Clone, Default)]
pub struct Rom {
    bytes: Vec<u8, ROM_CAPACITY>,
}

impl Rom {
    /// An empty image; every read returns 0
    pub const fn new() -> Self {
        Self { bytes: Vec::new() }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, RomError> {
        let mut rom = Self::new();
        rom.bytes
            .extend_from_slice(bytes)
            .map_err(|_| RomError::TooLarge)?;
        Ok(rom)
    }

    /// Append one byte (boot loading)
    pub(crate) fn push(&mut self, byte: u8) -> Result<(), RomError> {
        self.bytes.push(byte).map_err(|_| RomError::TooLarge)
    }

    /// Byte at `address`, 0 past the end of the image
    pub fn byte(&self, address: usize) -> u8 {
        self.bytes.get(address).copied().unwrap_or(0)
    }

    fn header(&self, slot: usize) -> usize {
        let at = slot * 2;
        usize::from(u16::from_be_bytes([self.byte(at), self.byte(at + 1)]))
    }

    /// Start of the command sequence with writer `index`
    pub fn sequence_offset(&self, index: u16) -> usize {
        self.header(usize::from(index))
    }

    /// Start of the glyph for `code`
    pub fn glyph_offset(&self, code: u8) -> usize {
        self.header(GLYPH_TABLE_SLOT) + usize::from(code) * GLYPH_STRIDE
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// SH1107 power-up: display off, start line 0, contrast, page addressing,
/// segment remap, COM direction, resume from RAM, normal video, multiplex
/// 128, display offset, clock, precharge, VCOM, DC-DC on, display on
pub const DEFAULT_INIT: &[u8] = &[
    0x00, 0xAE, 0xDC, 0x00, 0x81, 0x2F, 0x20, 0xA0, 0xC0, 0xA4, 0xA6, 0xA8, 0x7F, 0xD3, 0x60,
    0xD5, 0x51, 0xD9, 0x22, 0xDB, 0x35, 0xAD, 0x8A, 0xAF,
];

pub const DEFAULT_DISPLAY_ON: &[u8] = &[0x00, 0xAF];

pub const DEFAULT_DISPLAY_OFF: &[u8] = &[0x00, 0xAE];

/// Assembles a ROM image
///
/// Starts out with the default sequences and an empty glyph table. The
/// table is only as long as the highest glyph defined.
#[derive(Debug, Clone)]
pub struct RomBuilder {
    sequences: [Vec<u8, SEQUENCE_CAPACITY>; 3],
    glyphs: [[u8; GLYPH_STRIDE]; GLYPH_COUNT],
    glyph_count: usize,
}

impl Default for RomBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RomBuilder {
    pub fn new() -> Self {
        let mut builder = Self {
            sequences: [Vec::new(), Vec::new(), Vec::new()],
            glyphs: [[0; GLYPH_STRIDE]; GLYPH_COUNT],
            glyph_count: 0,
        };
        // Defaults are well within SEQUENCE_CAPACITY
        let _ = builder.sequence(Sequence::Init, &[DEFAULT_INIT]);
        let _ = builder.sequence(Sequence::DisplayOn, &[DEFAULT_DISPLAY_ON]);
        let _ = builder.sequence(Sequence::DisplayOff, &[DEFAULT_DISPLAY_OFF]);
        builder
    }

    /// Replace a command sequence
    ///
    /// Every segment is sent behind its own START.
    pub fn sequence(
        &mut self,
        sequence: Sequence,
        segments: &[&[u8]],
    ) -> Result<&mut Self, RomError> {
        let mut encoded: Vec<u8, SEQUENCE_CAPACITY> = Vec::new();
        for segment in segments {
            let len = u8::try_from(segment.len()).map_err(|_| RomError::InvalidSegment)?;
            if len == 0 {
                return Err(RomError::InvalidSegment);
            }
            encoded.push(len).map_err(|_| RomError::SequenceTooLong)?;
            encoded
                .extend_from_slice(segment)
                .map_err(|_| RomError::SequenceTooLong)?;
        }
        encoded.push(0).map_err(|_| RomError::SequenceTooLong)?;

        self.sequences[usize::from(sequence.index())] = encoded;
        Ok(self)
    }

    /// Define the bitmap of one character code
    pub fn glyph(&mut self, code: u8, columns: [u8; GLYPH_STRIDE]) -> &mut Self {
        self.glyphs[usize::from(code)] = columns;
        self.glyph_count = self.glyph_count.max(usize::from(code) + 1);
        self
    }

    pub fn build(&self) -> Result<Rom, RomError> {
        let mut rom = Rom::new();
        let mut offset = HEADER_LEN;
        let mut header = [0u8; HEADER_LEN];

        for (slot, sequence) in self.sequences.iter().enumerate() {
            let at = u16::try_from(offset).map_err(|_| RomError::TooLarge)?;
            header[slot * 2..slot * 2 + 2].copy_from_slice(&at.to_be_bytes());
            offset += sequence.len();
        }
        let glyphs = u16::try_from(offset).map_err(|_| RomError::TooLarge)?;
        header[GLYPH_TABLE_SLOT * 2..].copy_from_slice(&glyphs.to_be_bytes());

        let mut append = |bytes: &[u8]| {
            rom.bytes
                .extend_from_slice(bytes)
                .map_err(|_| RomError::TooLarge)
        };
        append(&header[..])?;
        for sequence in &self.sequences {
            append(sequence.as_slice())?;
        }
        for glyph in &self.glyphs[..self.glyph_count] {
            append(&glyph[..])?;
        }
        Ok(rom)
    }
}
