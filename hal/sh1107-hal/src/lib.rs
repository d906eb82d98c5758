//! SH1107 Processor Hardware Abstraction Layer
//!
//! This crate defines the collaborators the command processor talks to
//! without owning: the shared two-wire bus transaction channel, the serial
//! flash reader used at boot, and the inbound command byte queue. The
//! processor core is written against these traits so the same logic runs
//! against real hardware, a chip HAL, or the virtual display model.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  sh1107-core (dispatcher + bus engines) │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  sh1107-hal (this crate - traits)       │
//! └─────────────────────────────────────────┘
//!                     │
//!         ┌───────────┴───────────┐
//!         ▼                       ▼
//! ┌───────────────┐       ┌───────────────┐
//! │ i2c::I2cChan- │       │  sh1107-sim   │
//! │ nel (e-h 1.0) │       │ (host model)  │
//! └───────────────┘       └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`channel::BusChannel`] - Queued bus transactions with ack/busy signalling
//! - [`flash::FlashReader`] - Streaming reads from serial flash
//! - [`input::CommandSource`] - Inbound command/operand bytes

#![no_std]
#![deny(unsafe_code)]

pub mod channel;
pub mod flash;
pub mod i2c;
pub mod input;

// Re-export key traits at crate root for convenience
pub use channel::{BusChannel, BusSpeed, Word};
pub use flash::FlashReader;
pub use input::CommandSource;
