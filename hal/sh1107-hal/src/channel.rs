//! Bus transaction channel abstractions
//!
//! The channel is a queue of 9-bit words: eight data bits plus a START
//! flag. The transaction engine behind it generates START, repeated START
//! and STOP framing, samples ACK/NACK and collects read data. Callers only
//! see the queue and a handful of status signals.

/// One queued bus word
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Word {
    /// Generate a START (or repeated START) before this byte
    pub start: bool,
    /// Address byte when `start` is set, data byte otherwise
    pub byte: u8,
}

impl Word {
    /// START followed by the write address of `address`
    pub const fn start_write(address: u8) -> Self {
        Self {
            start: true,
            byte: address << 1,
        }
    }

    /// START followed by the read address of `address`
    pub const fn start_read(address: u8) -> Self {
        Self {
            start: true,
            byte: (address << 1) | 1,
        }
    }

    /// A plain data byte
    pub const fn data(byte: u8) -> Self {
        Self { start: false, byte }
    }

    /// True if this START word addresses the device for reading
    pub const fn is_read(&self) -> bool {
        self.start && self.byte & 1 == 1
    }

    /// 7-bit device address carried by a START word
    pub const fn address(&self) -> u8 {
        self.byte >> 1
    }
}

/// Bus transaction channel
///
/// A transfer opens with a START word. Further START words inside an open
/// transfer produce repeated STARTs. After [`BusChannel::stop`] the channel
/// drains its queue, issues STOP and deasserts `busy`.
///
/// In read mode (after a START with the read bit set) every plain word
/// submitted requests one byte from the device; received bytes are taken
/// with [`BusChannel::read`].
///
/// If the device NACKs, the channel issues STOP immediately, discards
/// queued words up to the next START and deasserts `busy`.
pub trait BusChannel {
    /// The queue can take another word
    fn ready(&self) -> bool;

    /// Queue a word
    ///
    /// Callers must check [`BusChannel::ready`] first; words submitted to a
    /// full queue are dropped.
    fn submit(&mut self, word: Word);

    /// Request STOP once the queued words have gone out
    fn stop(&mut self);

    /// A transfer is in progress (START seen, STOP not yet complete)
    fn busy(&self) -> bool;

    /// The most recent byte on the wire was acknowledged
    fn ack(&self) -> bool;

    /// Take a received byte, if any
    fn read(&mut self) -> Option<u8>;
}

impl<T: BusChannel + ?Sized> BusChannel for &mut T {
    fn ready(&self) -> bool {
        (**self).ready()
    }

    fn submit(&mut self, word: Word) {
        (**self).submit(word)
    }

    fn stop(&mut self) {
        (**self).stop()
    }

    fn busy(&self) -> bool {
        (**self).busy()
    }

    fn ack(&self) -> bool {
        (**self).ack()
    }

    fn read(&mut self) -> Option<u8> {
        (**self).read()
    }
}

/// Bus clock selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BusSpeed {
    /// Clock frequency in Hz
    pub frequency: u32,
}

impl Default for BusSpeed {
    fn default() -> Self {
        Self::FAST
    }
}

impl BusSpeed {
    /// Standard mode (100 kHz)
    pub const STANDARD: Self = Self { frequency: 100_000 };

    /// Fast mode (400 kHz)
    ///
    /// The SH1107 datasheet tops out here. Faster clocks violate the
    /// START/STOP hold times and reads after a command/data switch return
    /// display RAM instead of status.
    pub const FAST: Self = Self { frequency: 400_000 };

    /// Speeds the display is known to work at
    pub const SUPPORTED: [Self; 2] = [Self::STANDARD, Self::FAST];

    /// Check whether this speed is one the display supports
    pub fn is_supported(&self) -> bool {
        Self::SUPPORTED.contains(self)
    }
}
