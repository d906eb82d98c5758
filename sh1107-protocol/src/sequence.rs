//! Host-side command stream encoding
//!
//! Builds the byte stream a producer feeds into the processor's inbound
//! queue, e.g.
//!
//! ```
//! use sh1107_protocol::CommandSequence;
//!
//! let mut seq = CommandSequence::<32>::new();
//! seq.display_off()?.cls()?.init()?.locate(1, 1)?.print(b"Hello")?;
//! assert_eq!(&seq.as_bytes()[..4], &[0x03, 0x04, 0x01, 0x05]);
//! # Ok::<(), sh1107_protocol::SequenceError>(())
//! ```

use heapless::Vec;

use crate::command::{Command, COLS, ROWS};

/// Errors that can occur while encoding a command stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SequenceError {
    /// The sequence buffer is full
    BufferFull,
    /// PRINT carries at most 255 characters
    TextTooLong,
    /// LOCATE row or column outside 0..=16
    InvalidPosition,
}

/// An encoded run of commands
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandSequence<const N: usize> {
    bytes: Vec<u8, N>,
}

impl<const N: usize> CommandSequence<N> {
    /// Create an empty sequence
    pub fn new() -> Self {
        Self { bytes: Vec::new() }
    }

    fn push(&mut self, bytes: &[u8]) -> Result<&mut Self, SequenceError> {
        self.bytes
            .extend_from_slice(bytes)
            .map_err(|_| SequenceError::BufferFull)?;
        Ok(self)
    }

    fn op(&mut self, command: Command) -> Result<&mut Self, SequenceError> {
        self.push(&[command.as_u8()])
    }

    pub fn nop(&mut self) -> Result<&mut Self, SequenceError> {
        self.op(Command::Nop)
    }

    pub fn init(&mut self) -> Result<&mut Self, SequenceError> {
        self.op(Command::Init)
    }

    pub fn display_on(&mut self) -> Result<&mut Self, SequenceError> {
        self.op(Command::DisplayOn)
    }

    pub fn display_off(&mut self) -> Result<&mut Self, SequenceError> {
        self.op(Command::DisplayOff)
    }

    pub fn cls(&mut self) -> Result<&mut Self, SequenceError> {
        self.op(Command::Cls)
    }

    /// Move the cursor
    ///
    /// Rows and columns are 1-based; 0 leaves that axis unchanged.
    pub fn locate(&mut self, row: u8, col: u8) -> Result<&mut Self, SequenceError> {
        if row > ROWS || col > COLS {
            return Err(SequenceError::InvalidPosition);
        }
        self.push(&[Command::Locate.as_u8(), row, col])
    }

    /// Print raw character codes
    ///
    /// 13 is carriage return and 10 is line feed; every other code is drawn
    /// from the glyph table.
    pub fn print(&mut self, text: &[u8]) -> Result<&mut Self, SequenceError> {
        let len = u8::try_from(text.len()).map_err(|_| SequenceError::TextTooLong)?;
        if self.bytes.len() + 2 + text.len() > N {
            return Err(SequenceError::BufferFull);
        }
        self.push(&[Command::Print.as_u8(), len])?;
        self.push(text)
    }

    /// Print a string, translating `\n` to CR LF
    pub fn print_str(&mut self, text: &str) -> Result<&mut Self, SequenceError> {
        let mut codes: Vec<u8, 255> = Vec::new();
        for byte in text.bytes() {
            if byte == b'\n' {
                codes.push(b'\r').map_err(|_| SequenceError::TextTooLong)?;
            }
            codes.push(byte).map_err(|_| SequenceError::TextTooLong)?;
        }
        self.print(&codes)
    }

    pub fn cursor(&mut self, visible: bool) -> Result<&mut Self, SequenceError> {
        if visible {
            self.op(Command::CursorOn)
        } else {
            self.op(Command::CursorOff)
        }
    }

    pub fn id(&mut self) -> Result<&mut Self, SequenceError> {
        self.op(Command::Id)
    }

    pub fn print_byte(&mut self, byte: u8) -> Result<&mut Self, SequenceError> {
        self.push(&[Command::PrintByte.as_u8(), byte])
    }

    pub fn diagnostic(&mut self) -> Result<&mut Self, SequenceError> {
        self.op(Command::Diagnostic)
    }

    /// Encoded bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn clear(&mut self) {
        self.bytes.clear();
    }
}
