//! `BusChannel` over an `embedded-hal` I2C master
//!
//! Chip HALs expose whole transactions rather than a word queue, so this
//! adapter buffers each START-delimited segment and hands it to the
//! underlying bus when the next START or the STOP request arrives. A write
//! segment followed by a read segment is issued as one `write_read` so the
//! repeated START survives.
//!
//! `embedded-hal` merges adjacent operations of the same direction, which
//! would turn `[0x00, cmd]` + `[0x40, data..]` into a single write and make
//! the controller treat pixel data as commands. Write segments are therefore
//! issued as separate `write` calls. Acknowledgement is only known once a
//! segment has gone out, so `ack` reads optimistic until then.

use embedded_hal::i2c::{Error as _, ErrorKind, I2c, NoAcknowledgeSource};
use heapless::{Deque, Vec};

use crate::channel::{BusChannel, Word};

/// Largest write segment buffered before it is flushed on its own
///
/// A page of pixel data plus its control byte fits.
pub const SEGMENT_CAPACITY: usize = 160;

/// Most bytes a single read segment may request
pub const READ_CAPACITY: usize = 8;

/// Failure reported by the underlying bus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum I2cChannelError {
    /// Device did not acknowledge its address
    AddressNack,
    /// Device did not acknowledge a data byte
    DataNack,
    /// Arbitration lost to another master
    ArbitrationLost,
    /// Bus error (misplaced START/STOP)
    Bus,
    /// Receive overrun
    Overrun,
    /// Other error
    Other,
}

impl From<ErrorKind> for I2cChannelError {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address) => {
                I2cChannelError::AddressNack
            }
            ErrorKind::NoAcknowledge(_) => I2cChannelError::DataNack,
            ErrorKind::ArbitrationLoss => I2cChannelError::ArbitrationLost,
            ErrorKind::Bus => I2cChannelError::Bus,
            ErrorKind::Overrun => I2cChannelError::Overrun,
            _ => I2cChannelError::Other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Segment {
    Idle,
    Write,
    Read,
}

/// Word-queue channel backed by a blocking `embedded-hal` I2C bus
pub struct I2cChannel<I2C> {
    i2c: I2C,
    address: u8,
    segment: Segment,
    pending: Vec<u8, SEGMENT_CAPACITY>,
    read_count: usize,
    received: Deque<u8, READ_CAPACITY>,
    busy: bool,
    acked: bool,
    /// After a NACK, discard words until the next START
    discarding: bool,
    last_error: Option<I2cChannelError>,
}

impl<I2C: I2c> I2cChannel<I2C> {
    /// Wrap an I2C master
    pub fn new(i2c: I2C) -> Self {
        Self {
            i2c,
            address: 0,
            segment: Segment::Idle,
            pending: Vec::new(),
            read_count: 0,
            received: Deque::new(),
            busy: false,
            acked: false,
            discarding: false,
            last_error: None,
        }
    }

    /// Release the underlying bus
    pub fn release(self) -> I2C {
        self.i2c
    }

    /// The most recent bus failure, if any
    pub fn last_error(&self) -> Option<I2cChannelError> {
        self.last_error
    }

    /// Issue the buffered segment
    fn flush(&mut self) {
        let result = match self.segment {
            Segment::Idle => Ok(()),
            Segment::Write if self.pending.is_empty() => Ok(()),
            Segment::Write => self.i2c.write(self.address, &self.pending),
            Segment::Read => {
                let mut buf = [0u8; READ_CAPACITY];
                let len = self.read_count.min(READ_CAPACITY);
                let result = if self.pending.is_empty() {
                    self.i2c.read(self.address, &mut buf[..len])
                } else {
                    self.i2c.write_read(self.address, &self.pending, &mut buf[..len])
                };
                if result.is_ok() {
                    for &byte in &buf[..len] {
                        // Capacity matches READ_CAPACITY; a full deque means
                        // the caller never drained earlier reads
                        let _ = self.received.push_back(byte);
                    }
                }
                result
            }
        };

        self.pending.clear();
        self.read_count = 0;

        match result {
            Ok(()) => self.acked = true,
            Err(e) => {
                let error = I2cChannelError::from(e.kind());
                #[cfg(feature = "defmt")]
                defmt::warn!("i2c segment to {=u8:#x} failed: {}", self.address, error);
                self.last_error = Some(error);
                self.acked = false;
                self.busy = false;
                self.segment = Segment::Idle;
                self.discarding = true;
            }
        }
    }
}

impl<I2C: I2c> BusChannel for I2cChannel<I2C> {
    fn ready(&self) -> bool {
        true
    }

    fn submit(&mut self, word: Word) {
        if word.start {
            // A register write followed by a read START becomes one write_read
            if !(word.is_read() && self.segment == Segment::Write) {
                self.flush();
            }
            self.discarding = false;
            self.segment = if word.is_read() {
                Segment::Read
            } else {
                Segment::Write
            };
            self.address = word.address();
            if !self.busy {
                self.busy = true;
                self.acked = true;
            }
            return;
        }

        if self.discarding {
            return;
        }

        match self.segment {
            Segment::Idle => {
                #[cfg(feature = "defmt")]
                defmt::warn!("data word {=u8:#x} outside a transfer", word.byte);
            }
            Segment::Write => {
                if self.pending.is_full() {
                    self.flush();
                    if self.discarding {
                        return;
                    }
                    self.segment = Segment::Write;
                }
                let _ = self.pending.push(word.byte);
            }
            Segment::Read => {
                self.read_count = (self.read_count + 1).min(READ_CAPACITY);
            }
        }
    }

    fn stop(&mut self) {
        if self.discarding {
            return;
        }
        self.flush();
        self.segment = Segment::Idle;
        self.busy = false;
    }

    fn busy(&self) -> bool {
        self.busy
    }

    fn ack(&self) -> bool {
        self.acked
    }

    fn read(&mut self) -> Option<u8> {
        self.received.pop_front()
    }
}
