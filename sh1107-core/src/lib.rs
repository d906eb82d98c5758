//! SH1107 display command processor
//!
//! Turns a stream of opcode bytes into SH1107 bus traffic, treating the
//! 128x128 panel as a 16x16 grid of 8x8 character cells.
//!
//! ```text
//!  inbound bytes ──► Processor (dispatcher)
//!                      │        │
//!                      │        └──► Renderer (one character at a time)
//!                      ▼                 │
//!                  Engines ◄─────────────┘
//!    ┌───────────┬─────────┬───────┬──────────┐
//!    │ RomWriter │ Locator │ Clser │ Scroller │   (+ direct path for ID)
//!    └───────────┴─────────┴───────┴──────────┘
//!                      │  one owner at a time, fixed priority
//!                      ▼
//!                 BusChannel
//! ```
//!
//! Everything is driven by [`Processor::step`]: one call per time step,
//! no blocking, no allocation. Before the first command is accepted the
//! [`BootLoader`] copies the ROM image (init sequences and glyph table) from
//! serial flash into local memory.

#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![deny(unsafe_code)]

pub mod boot;
pub mod config;
pub mod cursor;
pub mod engine;
pub mod processor;
pub mod renderer;
pub mod rom;

pub use boot::BootLoader;
pub use config::{ConfigError, ProcessorConfig};
pub use cursor::Cursor;
pub use engine::{BusEngine, Clser, Engines, Locator, Owner, RomWriter, Scroller};
pub use processor::Processor;
pub use renderer::Renderer;
pub use rom::{Rom, RomBuilder, RomError, Sequence};
