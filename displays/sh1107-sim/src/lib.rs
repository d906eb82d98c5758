//! Virtual collaborators for the SH1107 command processor
//!
//! This crate provides:
//! - `VirtualSh1107`: a `BusChannel` that decodes bus traffic the way the
//!   controller does, keeping a 16-page x 128-column display RAM, the page
//!   and column pointers, display on/off and the start line
//! - `MemoryFlash`: a `FlashReader` streaming from an in-memory image
//!
//! Both can be told to misbehave (NACK, vanish, hang) so the processor's
//! failure paths can be driven deterministically.

#![no_std]

pub mod display;
pub mod flash;

// Re-export key types
pub use display::{TranscriptEntry, VirtualSh1107, PAGES, WIDTH};
pub use flash::MemoryFlash;
