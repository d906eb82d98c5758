//! Command opcodes

/// Character rows on the display
pub const ROWS: u8 = 16;

/// Character columns on the display
pub const COLS: u8 = 16;

// Wire format values
const OP_NOP: u8 = 0x00;
const OP_INIT: u8 = 0x01;
const OP_DISPLAY_ON: u8 = 0x02;
const OP_DISPLAY_OFF: u8 = 0x03;
const OP_CLS: u8 = 0x04;
const OP_LOCATE: u8 = 0x05;
const OP_PRINT: u8 = 0x06;
const OP_CURSOR_ON: u8 = 0x07;
const OP_CURSOR_OFF: u8 = 0x08;
const OP_ID: u8 = 0x09;
const OP_PRINT_BYTE: u8 = 0x0A;
const OP_DIAGNOSTIC: u8 = 0x0B;

/// Commands accepted by the processor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    /// Do nothing, report success
    Nop,
    /// Replay the controller init sequence, home the cursor, reset scrolling
    Init,
    /// Turn the panel on
    DisplayOn,
    /// Turn the panel off (display RAM is kept)
    DisplayOff,
    /// Blank all display RAM and home the cursor
    Cls,
    /// Move the cursor; operands are row then column
    Locate,
    /// Print characters; operands are a count then that many codes
    Print,
    /// Show the cursor
    CursorOn,
    /// Hide the cursor
    CursorOff,
    /// Read the controller status register and print it in hex
    Id,
    /// Print one operand byte in hex
    PrintByte,
    /// Dump the start of the flash ROM image in hex
    Diagnostic,
}

/// Shape of a command's operand list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Operands {
    /// Exactly this many operand bytes
    Fixed(u8),
    /// A count byte followed by that many bytes
    Counted,
}

impl Command {
    /// Parse a command from its opcode byte
    pub fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            OP_NOP => Some(Command::Nop),
            OP_INIT => Some(Command::Init),
            OP_DISPLAY_ON => Some(Command::DisplayOn),
            OP_DISPLAY_OFF => Some(Command::DisplayOff),
            OP_CLS => Some(Command::Cls),
            OP_LOCATE => Some(Command::Locate),
            OP_PRINT => Some(Command::Print),
            OP_CURSOR_ON => Some(Command::CursorOn),
            OP_CURSOR_OFF => Some(Command::CursorOff),
            OP_ID => Some(Command::Id),
            OP_PRINT_BYTE => Some(Command::PrintByte),
            OP_DIAGNOSTIC => Some(Command::Diagnostic),
            _ => None,
        }
    }

    /// Convert to opcode byte
    pub fn as_u8(self) -> u8 {
        match self {
            Command::Nop => OP_NOP,
            Command::Init => OP_INIT,
            Command::DisplayOn => OP_DISPLAY_ON,
            Command::DisplayOff => OP_DISPLAY_OFF,
            Command::Cls => OP_CLS,
            Command::Locate => OP_LOCATE,
            Command::Print => OP_PRINT,
            Command::CursorOn => OP_CURSOR_ON,
            Command::CursorOff => OP_CURSOR_OFF,
            Command::Id => OP_ID,
            Command::PrintByte => OP_PRINT_BYTE,
            Command::Diagnostic => OP_DIAGNOSTIC,
        }
    }

    /// Operands that follow the opcode
    pub fn operands(self) -> Operands {
        match self {
            Command::Locate => Operands::Fixed(2),
            Command::PrintByte => Operands::Fixed(1),
            Command::Print => Operands::Counted,
            _ => Operands::Fixed(0),
        }
    }
}
