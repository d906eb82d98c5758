//! Virtual SH1107 controller
//!
//! Decodes the word stream the way the controller does: a control byte
//! after every address (Co bit for single-byte runs, D/C bit for command vs
//! RAM data), page addressing, and a status register on reads that follow a
//! command-mode control byte.

use heapless::{Deque, Vec};
use sh1107_hal::channel::{BusChannel, Word};

/// Display RAM pages (8 pixel rows each)
pub const PAGES: usize = 16;

/// Display RAM columns
pub const WIDTH: usize = 128;

/// Bus events kept for inspection
pub const TRANSCRIPT_CAPACITY: usize = 4096;

/// SH1107 commands understood by the model
mod cmd {
    pub const DISPLAY_OFF: u8 = 0xAE;
    pub const DISPLAY_ON: u8 = 0xAF;
    pub const SET_CONTRAST: u8 = 0x81;
    pub const SET_MUX_RATIO: u8 = 0xA8;
    pub const SET_DISPLAY_OFFSET: u8 = 0xD3;
    pub const SET_CLOCK_DIV: u8 = 0xD5;
    pub const SET_PRECHARGE: u8 = 0xD9;
    pub const SET_VCOM_DETECT: u8 = 0xDB;
    pub const SET_DC_DC: u8 = 0xAD;
    pub const SET_START_LINE: u8 = 0xDC;
}

/// One observed bus event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TranscriptEntry {
    Word(Word),
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Control,
    Stream { data: bool, single: bool },
    Read,
}

/// In-memory SH1107 on the end of a bus channel
pub struct VirtualSh1107 {
    address: u8,
    ram: [[u8; WIDTH]; PAGES],
    page: u8,
    column: u8,
    display_on: bool,
    start_line: u8,
    contrast: u8,
    id_bits: u8,
    phase: Phase,
    /// D/C bit of the most recent control byte
    data_mode: bool,
    /// Two-byte command waiting for its argument
    argument_for: Option<u8>,
    busy: bool,
    acked: bool,
    discarding: bool,
    present: bool,
    stalled: bool,
    nack_in: Option<usize>,
    received: Deque<u8, 8>,
    transcript: Vec<TranscriptEntry, TRANSCRIPT_CAPACITY>,
    transcript_overflow: bool,
    transfers: usize,
}

impl Default for VirtualSh1107 {
    fn default() -> Self {
        Self::new(0x3C)
    }
}

impl VirtualSh1107 {
    /// Create a powered-up controller answering at `address`
    pub fn new(address: u8) -> Self {
        Self {
            address,
            ram: [[0; WIDTH]; PAGES],
            page: 0,
            column: 0,
            display_on: false,
            start_line: 0,
            contrast: 0x80,
            id_bits: 0x07,
            phase: Phase::Idle,
            data_mode: false,
            argument_for: None,
            busy: false,
            acked: false,
            discarding: false,
            present: true,
            stalled: false,
            nack_in: None,
            received: Deque::new(),
            transcript: Vec::new(),
            transcript_overflow: false,
            transfers: 0,
        }
    }

    // --- fault injection ---

    /// Acknowledge the next `words` words, then NACK the one after
    pub fn nack_after(&mut self, words: usize) {
        self.nack_in = Some(words);
    }

    /// Detach or reattach the device; a missing device NACKs its address
    pub fn set_present(&mut self, present: bool) {
        self.present = present;
    }

    /// Hang the channel: it stays busy and never accepts another word
    pub fn stall(&mut self) {
        self.stalled = true;
    }

    /// Set the low six bits returned by status reads
    pub fn set_id_bits(&mut self, bits: u8) {
        self.id_bits = bits & 0x3F;
    }

    // --- inspection ---

    pub fn ram(&self) -> &[[u8; WIDTH]; PAGES] {
        &self.ram
    }

    /// Fill display RAM with a pattern
    pub fn fill(&mut self, byte: u8) {
        for page in self.ram.iter_mut() {
            page.fill(byte);
        }
    }

    pub fn page(&self) -> u8 {
        self.page
    }

    pub fn column(&self) -> u8 {
        self.column
    }

    pub fn is_display_on(&self) -> bool {
        self.display_on
    }

    pub fn start_line(&self) -> u8 {
        self.start_line
    }

    pub fn contrast(&self) -> u8 {
        self.contrast
    }

    /// Status register: bit 6 set while the panel is off, ID in bits 0-5
    pub fn status(&self) -> u8 {
        let off = if self.display_on { 0 } else { 0x40 };
        off | self.id_bits
    }

    /// The 8 columns of the character cell shown at (row, col), 1-based
    ///
    /// Accounts for the start line, so this is what the viewer sees.
    pub fn cell(&self, row: u8, col: u8) -> [u8; 8] {
        let page = (usize::from(row.saturating_sub(1)) + usize::from(self.start_line / 8)) % PAGES;
        let first = usize::from(col.saturating_sub(1)) * 8;
        let mut cell = [0u8; 8];
        if first + 8 <= WIDTH {
            cell.copy_from_slice(&self.ram[page][first..first + 8]);
        }
        cell
    }

    /// Every event since the last clear
    pub fn transcript(&self) -> &[TranscriptEntry] {
        &self.transcript
    }

    /// The words since the last clear, without STOP markers
    pub fn words(&self) -> impl Iterator<Item = Word> + '_ {
        self.transcript.iter().filter_map(|entry| match entry {
            TranscriptEntry::Word(word) => Some(*word),
            TranscriptEntry::Stop => None,
        })
    }

    /// True if events were dropped because the transcript filled up
    pub fn transcript_overflowed(&self) -> bool {
        self.transcript_overflow
    }

    pub fn clear_transcript(&mut self) {
        self.transcript.clear();
        self.transcript_overflow = false;
    }

    /// Completed transfers (STOP after a START)
    pub fn transfers(&self) -> usize {
        self.transfers
    }

    fn record(&mut self, entry: TranscriptEntry) {
        if self.transcript.push(entry).is_err() {
            self.transcript_overflow = true;
        }
    }

    fn take_nack(&mut self) -> bool {
        match self.nack_in {
            Some(0) => {
                self.nack_in = None;
                true
            }
            Some(n) => {
                self.nack_in = Some(n - 1);
                false
            }
            None => false,
        }
    }

    fn nack(&mut self) {
        #[cfg(feature = "defmt")]
        defmt::debug!("vsh: NACK, dropping transfer");
        self.acked = false;
        self.busy = false;
        self.discarding = true;
        self.phase = Phase::Idle;
        self.argument_for = None;
    }

    fn command(&mut self, byte: u8) {
        if let Some(op) = self.argument_for.take() {
            match op {
                cmd::SET_START_LINE => self.start_line = byte & 0x7F,
                cmd::SET_CONTRAST => self.contrast = byte,
                _ => {}
            }
            return;
        }

        match byte {
            0x00..=0x0F => self.column = (self.column & 0xF0) | byte,
            0x10..=0x17 => self.column = (self.column & 0x0F) | ((byte & 0x07) << 4),
            0xB0..=0xBF => self.page = byte & 0x0F,
            cmd::DISPLAY_OFF => self.display_on = false,
            cmd::DISPLAY_ON => self.display_on = true,
            cmd::SET_START_LINE
            | cmd::SET_CONTRAST
            | cmd::SET_MUX_RATIO
            | cmd::SET_DISPLAY_OFFSET
            | cmd::SET_CLOCK_DIV
            | cmd::SET_PRECHARGE
            | cmd::SET_VCOM_DETECT
            | cmd::SET_DC_DC => self.argument_for = Some(byte),
            _ => {}
        }
    }

    fn write_ram(&mut self, byte: u8) {
        self.ram[usize::from(self.page)][usize::from(self.column)] = byte;
        self.column = (self.column + 1) % WIDTH as u8;
    }
}

impl BusChannel for VirtualSh1107 {
    fn ready(&self) -> bool {
        !self.stalled
    }

    fn submit(&mut self, word: Word) {
        if self.stalled {
            return;
        }
        self.record(TranscriptEntry::Word(word));

        if word.start {
            self.discarding = false;
            self.busy = true;
            self.argument_for = None;
            if !self.present || word.address() != self.address || self.take_nack() {
                self.nack();
                return;
            }
            self.acked = true;
            self.phase = if word.is_read() {
                Phase::Read
            } else {
                Phase::Control
            };
            return;
        }

        if self.discarding || !self.busy {
            return;
        }
        if self.take_nack() {
            self.nack();
            return;
        }
        self.acked = true;

        match self.phase {
            Phase::Idle => {}
            Phase::Control => {
                self.data_mode = word.byte & 0x40 != 0;
                self.phase = Phase::Stream {
                    data: self.data_mode,
                    single: word.byte & 0x80 != 0,
                };
            }
            Phase::Stream { data, single } => {
                if data {
                    self.write_ram(word.byte);
                } else {
                    self.command(word.byte);
                }
                if single {
                    self.phase = Phase::Control;
                }
            }
            Phase::Read => {
                let byte = if self.data_mode {
                    self.ram[usize::from(self.page)][usize::from(self.column)]
                } else {
                    self.status()
                };
                let _ = self.received.push_back(byte);
            }
        }
    }

    fn stop(&mut self) {
        if self.stalled {
            return;
        }
        self.record(TranscriptEntry::Stop);
        if self.busy {
            self.transfers += 1;
        }
        self.busy = false;
        self.phase = Phase::Idle;
        self.argument_for = None;
    }

    fn busy(&self) -> bool {
        self.busy || self.stalled
    }

    fn ack(&self) -> bool {
        self.acked
    }

    fn read(&mut self) -> Option<u8> {
        self.received.pop_front()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn send(vsh: &mut VirtualSh1107, words: &[Word]) {
        for &word in words {
            vsh.submit(word);
        }
        vsh.stop();
    }

    #[test]
    fn test_commands_move_pointers() {
        let mut vsh = VirtualSh1107::default();
        send(
            &mut vsh,
            &[
                Word::start_write(0x3C),
                Word::data(0x00),
                Word::data(0xB5),
                Word::data(0x08),
                Word::data(0x11),
                Word::data(0xAF),
                Word::data(0xDC),
                Word::data(0x18),
            ],
        );

        assert_eq!(vsh.page(), 5);
        assert_eq!(vsh.column(), 0x18);
        assert!(vsh.is_display_on());
        assert_eq!(vsh.start_line(), 0x18);
        assert_eq!(vsh.transfers(), 1);
    }

    #[test]
    fn test_data_after_repeated_start() {
        let mut vsh = VirtualSh1107::default();
        send(
            &mut vsh,
            &[
                Word::start_write(0x3C),
                Word::data(0x00),
                Word::data(0xB2),
                Word::start_write(0x3C),
                Word::data(0x40),
                Word::data(0xAA),
                Word::data(0x55),
            ],
        );

        assert_eq!(vsh.ram()[2][0], 0xAA);
        assert_eq!(vsh.ram()[2][1], 0x55);
        assert_eq!(vsh.column(), 2);
        assert_eq!(vsh.cell(3, 1), [0xAA, 0x55, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_single_byte_control_runs() {
        let mut vsh = VirtualSh1107::default();
        // Co=1: one command, then another control byte selecting data
        send(
            &mut vsh,
            &[
                Word::start_write(0x3C),
                Word::data(0x80),
                Word::data(0xB1),
                Word::data(0x40),
                Word::data(0x7E),
            ],
        );

        assert_eq!(vsh.ram()[1][0], 0x7E);
    }

    #[test]
    fn test_status_read() {
        let mut vsh = VirtualSh1107::default();
        vsh.set_id_bits(0x0B);

        vsh.submit(Word::start_write(0x3C));
        vsh.submit(Word::data(0x00));
        vsh.submit(Word::start_read(0x3C));
        vsh.submit(Word::data(0x00));
        vsh.stop();

        // Panel is off after power-up
        assert_eq!(vsh.read(), Some(0x4B));
        assert_eq!(vsh.read(), None);
    }

    #[test]
    fn test_wrong_address_nacks() {
        let mut vsh = VirtualSh1107::new(0x3D);
        vsh.submit(Word::start_write(0x3C));
        assert!(!vsh.busy());
        assert!(!vsh.ack());

        // Discarded until the next START
        vsh.submit(Word::data(0xAF));
        vsh.stop();
        assert!(!vsh.is_display_on());
    }

    #[test]
    fn test_nack_after() {
        let mut vsh = VirtualSh1107::default();
        vsh.nack_after(2);

        vsh.submit(Word::start_write(0x3C));
        vsh.submit(Word::data(0x00));
        assert!(vsh.busy());
        vsh.submit(Word::data(0xAF));
        assert!(!vsh.busy());
        assert!(!vsh.is_display_on());
    }

    #[test]
    fn test_contrast_command() {
        let mut vsh = VirtualSh1107::default();
        send(
            &mut vsh,
            &[
                Word::start_write(0x3C),
                Word::data(0x00),
                Word::data(0x81),
                Word::data(0x2F),
            ],
        );
        assert_eq!(vsh.contrast(), 0x2F);
    }

    #[test]
    fn test_transcript_overflow_is_flagged() {
        let mut vsh = VirtualSh1107::default();
        vsh.submit(Word::start_write(0x3C));
        vsh.submit(Word::data(0x40));
        for _ in 0..TRANSCRIPT_CAPACITY {
            vsh.submit(Word::data(0x00));
        }
        vsh.stop();

        assert!(vsh.transcript_overflowed());
        assert_eq!(vsh.transcript().len(), TRANSCRIPT_CAPACITY);

        vsh.clear_transcript();
        assert!(!vsh.transcript_overflowed());
        assert!(vsh.transcript().is_empty());
    }

    #[test]
    fn test_stalled_channel_never_drains() {
        let mut vsh = VirtualSh1107::default();
        vsh.stall();
        assert!(!vsh.ready());
        vsh.stop();
        assert!(vsh.busy());
    }
}
