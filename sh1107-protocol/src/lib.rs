//! SH1107 Command Stream Protocol
//!
//! This crate defines the byte protocol spoken to the display command
//! processor: one opcode byte followed by zero or more operand bytes, and
//! the 2-bit result code the processor reports back.
//!
//! # Protocol Overview
//!
//! ```text
//! ┌────────┬──────────────────────────────┐
//! │ OPCODE │ OPERANDS                     │
//! │ 1B     │ 0B, 1B, 2B or 1B + N bytes   │
//! └────────┴──────────────────────────────┘
//! ```
//!
//! | Opcode | Command      | Operands                 |
//! |--------|--------------|--------------------------|
//! | 0x00   | NOP          | -                        |
//! | 0x01   | INIT         | -                        |
//! | 0x02   | DISPLAY_ON   | -                        |
//! | 0x03   | DISPLAY_OFF  | -                        |
//! | 0x04   | CLS          | -                        |
//! | 0x05   | LOCATE       | row, col (0 = unchanged) |
//! | 0x06   | PRINT        | length N, N characters   |
//! | 0x07   | CURSOR_ON    | -                        |
//! | 0x08   | CURSOR_OFF   | -                        |
//! | 0x09   | ID           | -                        |
//! | 0x0A   | PRINT_BYTE   | byte                     |
//! | 0x0B   | DIAGNOSTIC   | -                        |
//!
//! There is no framing or checksum: the processor pulls bytes only when it
//! is ready for them and the producer is rate-matched by back-pressure.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod command;
pub mod result;
pub mod sequence;

pub use command::{Command, Operands, COLS, ROWS};
pub use result::ResultCode;
pub use sequence::{CommandSequence, SequenceError};
