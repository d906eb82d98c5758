//! Bus engines and channel arbitration
//!
//! Four engines generate display traffic. Only one drives the channel in
//! any step: the highest-priority engine that is busy. Lower-priority
//! engines hold their state until the channel is theirs.
//!
//! | Priority | Owner      | Used by                        |
//! |----------|------------|--------------------------------|
//! | 1        | RomWriter  | INIT, DISPLAY_ON/OFF, glyphs   |
//! | 2        | Locator    | LOCATE, CLS, renderer          |
//! | 3        | Clser      | CLS                            |
//! | 4        | Scroller   | renderer at the bottom row     |
//! | 5        | Direct     | dispatcher's raw ID read       |

mod clser;
mod locator;
mod rom_writer;
mod scroller;

pub use clser::Clser;
pub use locator::Locator;
pub use rom_writer::RomWriter;
pub use scroller::Scroller;

use sh1107_hal::{BusChannel, Word};

use crate::rom::Rom;

/// An engine that drives the bus channel while it owns it
pub trait BusEngine {
    /// A request is in progress
    fn busy(&self) -> bool;

    /// Advance by one step with the channel
    fn step<B: BusChannel>(&mut self, bus: &mut B, rom: &Rom);
}

/// Current channel owner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Owner {
    RomWriter,
    Locator,
    Clser,
    Scroller,
    /// No engine is busy; the dispatcher may use the channel itself
    Direct,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
enum Phase {
    #[default]
    Idle,
    Sending,
    Draining,
}

/// One write transfer: words while the channel takes them, then STOP,
/// then wait for `busy` to drop
#[derive(Debug, Default)]
pub(crate) struct Transfer {
    phase: Phase,
}

impl Transfer {
    pub(crate) fn begin(&mut self) {
        self.phase = Phase::Sending;
    }

    pub(crate) fn busy(&self) -> bool {
        self.phase != Phase::Idle
    }

    /// `next` yields the following word, or `None` once the transfer is
    /// complete
    pub(crate) fn drive<B, F>(&mut self, bus: &mut B, next: F)
    where
        B: BusChannel,
        F: FnOnce() -> Option<Word>,
    {
        match self.phase {
            Phase::Idle => {}
            Phase::Sending => {
                if !bus.ready() {
                    return;
                }
                match next() {
                    Some(word) => bus.submit(word),
                    None => {
                        bus.stop();
                        self.phase = Phase::Draining;
                    }
                }
            }
            Phase::Draining => {
                if !bus.busy() {
                    self.phase = Phase::Idle;
                }
            }
        }
    }
}

/// The four engines plus the arbiter
#[derive(Debug)]
pub struct Engines {
    pub rom_writer: RomWriter,
    pub locator: Locator,
    pub clser: Clser,
    pub scroller: Scroller,
}

impl Engines {
    /// Engines addressing the display at `address`
    pub fn new(address: u8) -> Self {
        Self {
            rom_writer: RomWriter::new(address),
            locator: Locator::new(address),
            clser: Clser::new(address),
            scroller: Scroller::new(address),
        }
    }

    /// Highest-priority busy engine
    pub fn owner(&self) -> Owner {
        if self.rom_writer.busy() {
            Owner::RomWriter
        } else if self.locator.busy() {
            Owner::Locator
        } else if self.clser.busy() {
            Owner::Clser
        } else if self.scroller.busy() {
            Owner::Scroller
        } else {
            Owner::Direct
        }
    }

    /// True while any engine is busy
    pub fn busy(&self) -> bool {
        self.owner() != Owner::Direct
    }

    /// Step the owner with the channel; everyone else waits
    ///
    /// The locator always sees the scroller's current adjustment.
    pub fn step<B: BusChannel>(&mut self, bus: &mut B, rom: &Rom) {
        self.locator.set_adjust(self.scroller.adjusted());

        match self.owner() {
            Owner::RomWriter => self.rom_writer.step(bus, rom),
            Owner::Locator => self.locator.step(bus, rom),
            Owner::Clser => self.clser.step(bus, rom),
            Owner::Scroller => self.scroller.step(bus, rom),
            Owner::Direct => {}
        }
    }
}
