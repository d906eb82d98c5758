//! Boot ROM loader
//!
//! Streams the ROM image out of serial flash into local memory. The
//! processor accepts no commands until this finishes. There is no timeout:
//! a flash reader that never deasserts `busy` keeps the loader here.

use sh1107_hal::FlashReader;

use crate::rom::Rom;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
enum State {
    Request,
    Streaming,
    Done,
}

/// Copies `length` bytes at `base` from flash into a [`Rom`]
#[derive(Debug)]
pub struct BootLoader {
    base: u32,
    length: u16,
    loaded: usize,
    state: State,
}

impl BootLoader {
    pub fn new(base: u32, length: u16) -> Self {
        Self {
            base,
            length,
            loaded: 0,
            state: State::Request,
        }
    }

    /// Advance by one byte
    pub fn step<F: FlashReader>(&mut self, flash: &mut F, rom: &mut Rom) {
        match self.state {
            State::Request => {
                flash.request(self.base, self.length);
                self.state = State::Streaming;
            }
            State::Streaming => {
                if let Some(byte) = flash.poll() {
                    if rom.push(byte).is_err() {
                        #[cfg(feature = "defmt")]
                        defmt::warn!("boot: image overruns ROM at {}", self.loaded);
                    }
                    self.loaded += 1;
                } else if !flash.busy() {
                    #[cfg(feature = "defmt")]
                    defmt::info!("boot: loaded {} ROM bytes", self.loaded);
                    self.state = State::Done;
                }
            }
            State::Done => {}
        }
    }

    pub fn is_done(&self) -> bool {
        self.state == State::Done
    }

    /// Bytes copied so far
    pub fn loaded(&self) -> usize {
        self.loaded
    }
}
