//! Command dispatcher
//!
//! Top-level state machine. Pulls an opcode from the inbound queue when
//! nothing is in flight, then sequences engines and the renderer until
//! the command completes and the result is posted.
//!
//! One [`Processor::step`] call is one time step:
//!
//! 1. until boot completes, only the boot loader runs
//! 2. the engine that owns the bus gets one step with it
//! 3. the renderer advances
//! 4. the dispatcher advances (and, for ID, drives the bus directly when
//!    no engine owns it)

use heapless::Deque;
use sh1107_hal::{BusChannel, CommandSource, FlashReader, Word};
use sh1107_protocol::{Command, Operands, ResultCode, COLS, ROWS};

use crate::boot::BootLoader;
use crate::config::{ConfigError, ProcessorConfig};
use crate::cursor::Cursor;
use crate::engine::{BusEngine, Engines, Owner};
use crate::renderer::Renderer;
use crate::rom::{Rom, Sequence};

/// Bytes streamed from flash by DIAGNOSTIC
pub const DIAGNOSTIC_LENGTH: usize = 32;

/// Longest fixed operand list (LOCATE)
const MAX_OPERANDS: usize = 2;

/// What to do once both hex digits are rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
enum AfterHex {
    Succeed,
    NextDiagnostic,
}

/// Steps of the raw status read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
enum IdStep {
    Address,
    Control,
    Restart,
    Request,
    Receive,
    /// Status byte in hand; wait for the STOP to go out
    Drain { byte: u8 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
enum State {
    Idle,
    /// Engine work outstanding; succeed when all engines are idle
    AwaitEngines,
    /// CLS: clearing, then locate to (1,1)
    Clearing,
    /// Gathering a fixed operand list for `command`
    Collect {
        command: Command,
        operands: [u8; MAX_OPERANDS],
        have: u8,
        needed: u8,
    },
    PrintLength,
    PrintNext { remaining: u8 },
    PrintWait { remaining: u8 },
    HexHigh { byte: u8, after: AfterHex },
    HexLow { byte: u8, after: AfterHex },
    HexDone { after: AfterHex },
    Id(IdStep),
    DiagnosticLoad,
    DiagnosticNext,
}

/// The display command processor
///
/// Owns the bus channel and the flash reader; reads commands from any
/// [`CommandSource`] handed to [`Processor::step`].
pub struct Processor<B, F> {
    config: ProcessorConfig,
    bus: B,
    flash: F,
    rom: Rom,
    boot: BootLoader,
    engines: Engines,
    renderer: Renderer,
    cursor: Cursor,
    result: ResultCode,
    state: State,
    diagnostic: Deque<u8, DIAGNOSTIC_LENGTH>,
}

impl<B: BusChannel, F: FlashReader> Processor<B, F> {
    /// Create a processor; boot starts on the first step
    pub fn new(config: ProcessorConfig, bus: B, flash: F) -> Result<Self, ConfigError> {
        config.validate()?;

        Ok(Self {
            config,
            bus,
            flash,
            rom: Rom::new(),
            boot: BootLoader::new(config.flash_rom_base, config.rom_length),
            engines: Engines::new(config.address),
            renderer: Renderer::new(),
            cursor: Cursor::default(),
            result: ResultCode::Busy,
            state: State::Idle,
            diagnostic: Deque::new(),
        })
    }

    /// Advance by one time step
    pub fn step<S: CommandSource>(&mut self, input: &mut S) {
        if !self.boot.is_done() {
            self.boot.step(&mut self.flash, &mut self.rom);
            if self.boot.is_done() {
                #[cfg(feature = "defmt")]
                defmt::info!("processor: ready");
                self.result = ResultCode::Success;
            }
            return;
        }

        self.engines.step(&mut self.bus, &self.rom);
        self.renderer.step(&mut self.cursor, &mut self.engines);
        self.dispatch(input);
    }

    fn finish(&mut self, result: ResultCode) {
        #[cfg(feature = "defmt")]
        defmt::debug!("processor: result {}", result);
        self.result = result;
        self.state = State::Idle;
    }

    fn dispatch<S: CommandSource>(&mut self, input: &mut S) {
        match self.state {
            State::Idle => self.accept(input),

            State::AwaitEngines => {
                if !self.engines.busy() {
                    self.finish(ResultCode::Success);
                }
            }

            State::Clearing => {
                if !self.engines.clser.busy() {
                    self.engines.locator.start(self.cursor.row, self.cursor.col);
                    self.state = State::AwaitEngines;
                }
            }

            State::Collect {
                command,
                mut operands,
                have,
                needed,
            } => {
                if let Some(byte) = input.pop() {
                    operands[usize::from(have)] = byte;
                    let have = have + 1;
                    if have >= needed {
                        self.execute(command, operands);
                    } else {
                        self.state = State::Collect {
                            command,
                            operands,
                            have,
                            needed,
                        };
                    }
                }
            }

            State::PrintLength => {
                if let Some(length) = input.pop() {
                    if length == 0 {
                        self.finish(ResultCode::Success);
                    } else {
                        self.state = State::PrintNext { remaining: length };
                    }
                }
            }
            State::PrintNext { remaining } => {
                if let Some(code) = input.pop() {
                    self.renderer
                        .start(code, &mut self.cursor, &mut self.engines);
                    self.state = State::PrintWait {
                        remaining: remaining - 1,
                    };
                }
            }
            State::PrintWait { remaining } => {
                if self.renderer.busy() {
                    return;
                }
                if remaining == 0 {
                    self.finish(ResultCode::Success);
                } else {
                    self.state = State::PrintNext { remaining };
                }
            }

            State::HexHigh { byte, after } => {
                if !self.renderer.busy() {
                    self.renderer
                        .start(hex_digit(byte >> 4), &mut self.cursor, &mut self.engines);
                    self.state = State::HexLow { byte, after };
                }
            }
            State::HexLow { byte, after } => {
                if !self.renderer.busy() {
                    self.renderer
                        .start(hex_digit(byte), &mut self.cursor, &mut self.engines);
                    self.state = State::HexDone { after };
                }
            }
            State::HexDone { after } => {
                if self.renderer.busy() {
                    return;
                }
                match after {
                    AfterHex::Succeed => self.finish(ResultCode::Success),
                    AfterHex::NextDiagnostic => self.state = State::DiagnosticNext,
                }
            }

            State::Id(step) => self.id(step),

            State::DiagnosticLoad => {
                if let Some(byte) = self.flash.poll() {
                    if self.diagnostic.push_back(byte).is_err() {
                        #[cfg(feature = "defmt")]
                        defmt::warn!("diagnostic: dropped byte {=u8:#x}", byte);
                    }
                } else if !self.flash.busy() {
                    self.state = State::DiagnosticNext;
                }
            }
            State::DiagnosticNext => match self.diagnostic.pop_front() {
                Some(byte) => {
                    self.state = State::HexHigh {
                        byte,
                        after: AfterHex::NextDiagnostic,
                    }
                }
                // Diagnostic output leaves the result at BUSY
                None => self.state = State::Idle,
            },
        }
    }

    /// Take the next opcode if nothing is in flight
    fn accept<S: CommandSource>(&mut self, input: &mut S) {
        if !input.has_data() || self.engines.owner() != Owner::Direct || self.bus.busy() {
            return;
        }
        let Some(opcode) = input.pop() else {
            return;
        };
        self.result = ResultCode::Busy;

        let Some(command) = Command::from_u8(opcode) else {
            #[cfg(feature = "defmt")]
            defmt::warn!("processor: unknown opcode {=u8:#x}", opcode);
            self.finish(ResultCode::Failure);
            return;
        };

        #[cfg(feature = "defmt")]
        defmt::debug!("processor: {}", command);

        match command {
            Command::Nop => self.finish(ResultCode::Success),
            Command::Init => {
                self.cursor.home();
                self.engines.scroller.reset();
                self.engines.rom_writer.start(Sequence::Init.index());
                self.state = State::AwaitEngines;
            }
            Command::DisplayOn => {
                self.engines.rom_writer.start(Sequence::DisplayOn.index());
                self.state = State::AwaitEngines;
            }
            Command::DisplayOff => {
                self.engines.rom_writer.start(Sequence::DisplayOff.index());
                self.state = State::AwaitEngines;
            }
            Command::Cls => {
                self.cursor.home();
                self.engines.clser.start();
                self.state = State::Clearing;
            }
            Command::Locate | Command::Print | Command::PrintByte => {
                self.state = match command.operands() {
                    Operands::Counted => State::PrintLength,
                    Operands::Fixed(needed) => State::Collect {
                        command,
                        operands: [0; MAX_OPERANDS],
                        have: 0,
                        needed: needed.clamp(1, MAX_OPERANDS as u8),
                    },
                };
            }
            Command::CursorOn => {
                self.cursor.visible = true;
                self.finish(ResultCode::Success);
            }
            Command::CursorOff => {
                self.cursor.visible = false;
                self.finish(ResultCode::Success);
            }
            Command::Id => self.state = State::Id(IdStep::Address),
            Command::Diagnostic => {
                self.diagnostic.clear();
                self.flash
                    .request(self.config.flash_rom_base, DIAGNOSTIC_LENGTH as u16);
                self.state = State::DiagnosticLoad;
            }
        }
    }

    /// Run a command whose fixed operands have all arrived
    ///
    /// LOCATE clamps its operands to the screen; 0 still leaves that axis
    /// alone.
    fn execute(&mut self, command: Command, operands: [u8; MAX_OPERANDS]) {
        match command {
            Command::Locate => {
                let row = operands[0].min(ROWS);
                let col = operands[1].min(COLS);
                if row != 0 {
                    self.cursor.row = row;
                }
                if col != 0 {
                    self.cursor.col = col;
                }
                self.engines.locator.start(row, col);
                self.state = State::AwaitEngines;
            }
            Command::PrintByte => {
                self.state = State::HexHigh {
                    byte: operands[0],
                    after: AfterHex::Succeed,
                };
            }
            _ => self.finish(ResultCode::Success),
        }
    }

    /// Raw status read: write the command-mode control byte, then read
    /// one byte behind a repeated START
    ///
    /// `busy` dropping before the byte arrives means the display went
    /// away; that is the only command that reports FAILURE.
    fn id(&mut self, step: IdStep) {
        let address = self.config.address;
        let bus = &mut self.bus;

        let next = match step {
            IdStep::Address => {
                if !bus.ready() {
                    return;
                }
                bus.submit(Word::start_write(address));
                IdStep::Control
            }
            IdStep::Control | IdStep::Restart | IdStep::Request => {
                match waypoint(&*bus) {
                    None => return self.id_failed(step),
                    Some(false) => return,
                    Some(true) => {}
                }
                match step {
                    IdStep::Control => {
                        bus.submit(Word::data(0x00));
                        IdStep::Restart
                    }
                    IdStep::Restart => {
                        bus.submit(Word::start_read(address));
                        IdStep::Request
                    }
                    _ => {
                        bus.submit(Word::data(0xFF));
                        bus.stop();
                        IdStep::Receive
                    }
                }
            }
            IdStep::Receive => {
                if let Some(byte) = bus.read() {
                    IdStep::Drain { byte }
                } else {
                    if !bus.busy() {
                        self.id_failed(step);
                    }
                    return;
                }
            }
            IdStep::Drain { byte } => {
                if !bus.busy() {
                    self.state = State::HexHigh {
                        byte,
                        after: AfterHex::Succeed,
                    };
                }
                return;
            }
        };
        self.state = State::Id(next);
    }

    fn id_failed(&mut self, _at: IdStep) {
        #[cfg(feature = "defmt")]
        defmt::warn!("processor: ID dropped at {}", _at);
        self.finish(ResultCode::Failure);
    }

    // --- observation ---

    /// Result of the last command
    pub fn result(&self) -> ResultCode {
        self.result
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn is_booted(&self) -> bool {
        self.boot.is_done()
    }

    /// Booted with no command, engine or render in flight
    pub fn is_idle(&self) -> bool {
        self.is_booted()
            && self.state == State::Idle
            && !self.engines.busy()
            && !self.renderer.busy()
    }

    /// Current bus owner
    pub fn owner(&self) -> Owner {
        self.engines.owner()
    }

    /// Scroll adjustment in pages
    pub fn scroll(&self) -> u8 {
        self.engines.scroller.adjusted()
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    pub fn rom(&self) -> &Rom {
        &self.rom
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    pub fn flash(&self) -> &F {
        &self.flash
    }

    /// Give back the bus channel and flash reader
    pub fn release(self) -> (B, F) {
        (self.bus, self.flash)
    }
}

/// `None` once the channel has dropped the transfer, otherwise whether
/// the last word was acknowledged and the queue can take the next one
fn waypoint<B: BusChannel>(bus: &B) -> Option<bool> {
    if !bus.busy() {
        None
    } else {
        Some(bus.ack() && bus.ready())
    }
}

/// Uppercase ASCII hex digit of the low nibble
fn hex_digit(nibble: u8) -> u8 {
    match nibble & 0x0F {
        n @ 0..=9 => b'0' + n,
        n => b'A' + n - 10,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::{CR, LF};
    use crate::rom::{RomBuilder, DEFAULT_INIT};
    use heapless::spsc::Queue;
    use core::cell::Cell;
    use proptest::prelude::*;
    use sh1107_protocol::CommandSequence;
    use sh1107_sim::{MemoryFlash, TranscriptEntry, VirtualSh1107};

    const STEP_LIMIT: usize = 100_000;

    type TestProcessor = Processor<VirtualSh1107, MemoryFlash<'static>>;

    fn font_rom() -> Rom {
        let mut builder = RomBuilder::new();
        for code in 0x20..0x80u8 {
            builder.glyph(code, [code; 8]);
        }
        builder.build().unwrap()
    }

    fn flash_for(rom: &Rom) -> (ProcessorConfig, MemoryFlash<'static>) {
        let image: &'static [u8] = Box::leak(rom.as_bytes().to_vec().into_boxed_slice());
        let config = ProcessorConfig::with_rom_length(image.len() as u16);
        (config, MemoryFlash::new(image, config.flash_rom_base))
    }

    fn processor(rom: &Rom) -> TestProcessor {
        let (config, flash) = flash_for(rom);
        Processor::new(config, VirtualSh1107::default(), flash).unwrap()
    }

    /// Display whose STOP takes a few polls to complete; counts STARTs
    /// issued before the previous transfer finished
    struct LateStop {
        display: VirtualSh1107,
        lag: Cell<u8>,
        overlapping_starts: usize,
    }

    impl LateStop {
        fn new() -> Self {
            Self {
                display: VirtualSh1107::default(),
                lag: Cell::new(0),
                overlapping_starts: 0,
            }
        }
    }

    impl BusChannel for LateStop {
        fn ready(&self) -> bool {
            self.display.ready()
        }

        fn submit(&mut self, word: Word) {
            if word.start && self.lag.get() > 0 {
                self.overlapping_starts += 1;
            }
            self.display.submit(word);
        }

        fn stop(&mut self) {
            self.display.stop();
            self.lag.set(3);
        }

        fn busy(&self) -> bool {
            let lag = self.lag.get();
            if lag > 0 {
                self.lag.set(lag - 1);
                return true;
            }
            self.display.busy()
        }

        fn ack(&self) -> bool {
            self.display.ack()
        }

        fn read(&mut self) -> Option<u8> {
            self.display.read()
        }
    }

    struct Harness {
        processor: TestProcessor,
        input: Deque<u8, 512>,
    }

    impl Harness {
        fn booted(rom: &Rom) -> Self {
            let mut harness = Self {
                processor: processor(rom),
                input: Deque::new(),
            };
            while !harness.processor.is_booted() {
                harness.processor.step(&mut harness.input);
            }
            harness
        }

        fn new() -> Self {
            Self::booted(&font_rom())
        }

        fn send(&mut self, bytes: &[u8]) {
            for &byte in bytes {
                self.input.push_back(byte).unwrap();
            }
        }

        /// Step until the input is drained and nothing is in flight;
        /// returns every result value observed along the way
        fn run(&mut self) -> std::vec::Vec<ResultCode> {
            let mut seen = std::vec::Vec::new();
            for _ in 0..STEP_LIMIT {
                self.processor.step(&mut self.input);
                seen.push(self.processor.result());
                if self.input.is_empty() && self.processor.is_idle() {
                    return seen;
                }
            }
            panic!("processor never went idle");
        }

        fn command(&mut self, bytes: &[u8]) -> ResultCode {
            self.send(bytes);
            self.run();
            self.processor.result()
        }

        fn bus(&mut self) -> &mut VirtualSh1107 {
            self.processor.bus_mut()
        }

        fn scrolls(&self) -> usize {
            self.processor
                .bus()
                .words()
                .filter(|w| !w.start && w.byte == 0xDC)
                .count()
        }

        fn position(&self) -> (u8, u8) {
            let cursor = self.processor.cursor();
            (cursor.row, cursor.col)
        }
    }

    #[test]
    fn test_boot_loads_rom_before_commands() {
        let rom = font_rom();
        let mut processor = processor(&rom);
        let mut input: Deque<u8, 4> = Deque::new();
        input.push_back(Command::Nop.as_u8()).unwrap();

        assert_eq!(processor.result(), ResultCode::Busy);
        processor.step(&mut input);
        assert!(!processor.is_booted());
        assert_eq!(input.len(), 1);

        while !processor.is_booted() {
            processor.step(&mut input);
        }
        assert_eq!(processor.result(), ResultCode::Success);
        assert_eq!(processor.rom().as_bytes(), rom.as_bytes());
        assert!(processor.bus().transcript().is_empty());
        assert_eq!(input.len(), 1);

        processor.step(&mut input);
        assert!(input.is_empty());
        assert_eq!(processor.result(), ResultCode::Success);
    }

    #[test]
    fn test_hung_flash_never_boots() {
        let mut flash = MemoryFlash::new(&[], 0);
        flash.hang();
        let config = ProcessorConfig::with_rom_length(64);
        let mut processor = Processor::new(config, VirtualSh1107::default(), flash).unwrap();
        let mut input: Deque<u8, 4> = Deque::new();
        input.push_back(Command::Nop.as_u8()).unwrap();

        for _ in 0..10_000 {
            processor.step(&mut input);
        }
        assert!(!processor.is_booted());
        assert!(!processor.is_idle());
        assert_eq!(processor.result(), ResultCode::Busy);
        assert_eq!(input.len(), 1);
    }

    #[test]
    fn test_init_then_print() {
        let mut h = Harness::new();

        assert_eq!(h.command(&[Command::Init.as_u8()]), ResultCode::Success);
        assert_eq!(h.position(), (1, 1));
        assert!(h.processor.bus().is_display_on());

        let init: std::vec::Vec<u8> = h.processor.bus().words().skip(1).map(|w| w.byte).collect();
        assert_eq!(init, DEFAULT_INIT);
        assert_eq!(h.processor.bus().contrast(), 0x2F);
        assert_eq!(h.processor.bus().transfers(), 1);

        h.bus().clear_transcript();
        let mut seq = CommandSequence::<8>::new();
        seq.print(&[0x41, LF]).unwrap();
        assert_eq!(h.command(seq.as_bytes()), ResultCode::Success);

        // One glyph at (1,1)
        assert_eq!(h.processor.bus().cell(1, 1), [b'A'; 8]);
        let glyph_writes = h
            .processor
            .bus()
            .words()
            .filter(|w| *w == Word::data(0x40))
            .count();
        assert_eq!(glyph_writes, 1);

        // glyph, locate (1,2), locate (2,1)
        assert_eq!(h.processor.bus().transfers(), 4);
        assert_eq!(h.position(), (2, 1));
        assert_eq!(
            (h.processor.bus().page(), h.processor.bus().column()),
            (1, 0)
        );
    }

    #[test]
    fn test_display_on_off() {
        let mut h = Harness::new();
        assert_eq!(h.command(&[Command::DisplayOn.as_u8()]), ResultCode::Success);
        assert!(h.processor.bus().is_display_on());
        assert_eq!(h.command(&[Command::DisplayOff.as_u8()]), ResultCode::Success);
        assert!(!h.processor.bus().is_display_on());
        assert_eq!(h.position(), (1, 1));
    }

    #[test]
    fn test_cls() {
        let mut h = Harness::new();
        h.command(&[Command::Locate.as_u8(), 9, 4]);
        h.bus().fill(0xA5);
        h.bus().clear_transcript();

        assert_eq!(h.command(&[Command::Cls.as_u8()]), ResultCode::Success);

        assert_eq!(h.position(), (1, 1));
        let bus = h.processor.bus();
        assert!(bus.ram().iter().all(|page| page.iter().all(|&b| b == 0)));
        assert!(!bus.transcript_overflowed());

        // Clear transfer, then locate (1,1)
        assert_eq!(bus.transfers(), 3);
        let words: std::vec::Vec<Word> = bus.words().collect();
        let tail = &words[words.len() - 5..];
        assert_eq!(
            tail,
            &[
                Word::start_write(0x3C),
                Word::data(0x00),
                Word::data(0xB0),
                Word::data(0x00),
                Word::data(0x10),
            ]
        );
        assert_eq!((bus.page(), bus.column()), (0, 0));
    }

    #[test]
    fn test_print_empty_is_silent() {
        let mut h = Harness::new();
        h.command(&[Command::Locate.as_u8(), 3, 3]);
        h.bus().clear_transcript();

        let results = {
            h.send(&[Command::Print.as_u8(), 0]);
            h.run()
        };
        assert_eq!(results.last(), Some(&ResultCode::Success));
        assert!(h.processor.bus().transcript().is_empty());
        assert_eq!(h.position(), (3, 3));
    }

    #[test]
    fn test_locate_zero_row_keeps_row() {
        let mut h = Harness::new();
        h.command(&[Command::Locate.as_u8(), 7, 2]);
        h.bus().clear_transcript();

        assert_eq!(h.command(&[Command::Locate.as_u8(), 0, 5]), ResultCode::Success);

        assert_eq!(h.position(), (7, 5));
        let words: std::vec::Vec<Word> = h.processor.bus().words().collect();
        assert_eq!(
            words,
            [
                Word::start_write(0x3C),
                Word::data(0x00),
                Word::data(0x00),
                Word::data(0x12),
            ]
        );
        assert_eq!(h.processor.bus().page(), 6);
    }

    #[test]
    fn test_locate_clamps_to_screen() {
        let mut h = Harness::new();
        assert_eq!(h.command(&[Command::Locate.as_u8(), 20, 40]), ResultCode::Success);
        assert_eq!(h.position(), (16, 16));
        assert_eq!(
            (h.processor.bus().page(), h.processor.bus().column()),
            (15, 120)
        );

        let mut seq = CommandSequence::<8>::new();
        seq.print(&[LF, LF, b'A']).unwrap();
        h.command(&[Command::Locate.as_u8(), 20, 1]);
        assert_eq!(h.command(seq.as_bytes()), ResultCode::Success);

        assert_eq!(h.position(), (16, 2));
        assert_eq!(h.processor.scroll(), 2);
        assert_eq!(h.processor.bus().cell(16, 1), [b'A'; 8]);
    }

    #[test]
    fn test_sixteen_line_feeds_scroll_once() {
        let mut h = Harness::new();
        let feeds = [LF; 16];
        let mut seq = CommandSequence::<32>::new();
        seq.print(&feeds).unwrap();

        assert_eq!(h.command(seq.as_bytes()), ResultCode::Success);
        assert_eq!(h.position(), (16, 1));
        assert_eq!(h.scrolls(), 1);
        assert_eq!(h.processor.scroll(), 1);
        // 15 locates and one scroll
        assert_eq!(h.processor.bus().transfers(), 16);
    }

    #[test]
    fn test_init_resets_scroll() {
        let mut h = Harness::new();
        let mut seq = CommandSequence::<32>::new();
        seq.print(&[LF; 17]).unwrap();
        h.command(seq.as_bytes());
        assert_eq!(h.processor.scroll(), 2);
        assert_eq!(h.processor.bus().start_line(), 16);

        h.command(&[Command::Init.as_u8()]);
        assert_eq!(h.processor.scroll(), 0);
        assert_eq!(h.processor.bus().start_line(), 0);
        assert_eq!(h.position(), (1, 1));
    }

    #[test]
    fn test_text_wraps_and_carriage_returns() {
        let mut h = Harness::new();
        let mut seq = CommandSequence::<64>::new();
        seq.print(b"0123456789abcdefX\rY").unwrap();

        assert_eq!(h.command(seq.as_bytes()), ResultCode::Success);
        let bus = h.processor.bus();
        assert_eq!(bus.cell(1, 16), [b'f'; 8]);
        assert_eq!(bus.cell(2, 1), [b'Y'; 8]);
        assert_eq!(h.position(), (2, 2));
    }

    #[test]
    fn test_cursor_on_off() {
        let mut h = Harness::new();
        h.bus().clear_transcript();

        assert_eq!(h.command(&[Command::CursorOn.as_u8()]), ResultCode::Success);
        assert!(h.processor.cursor().visible);
        assert_eq!(h.command(&[Command::CursorOff.as_u8()]), ResultCode::Success);
        assert!(!h.processor.cursor().visible);
        assert!(h.processor.bus().transcript().is_empty());
    }

    #[test]
    fn test_id_renders_status() {
        let mut h = Harness::new();
        h.bus().set_id_bits(0x0B);

        assert_eq!(h.command(&[Command::Id.as_u8()]), ResultCode::Success);

        let bus = h.processor.bus();
        assert_eq!(
            &bus.transcript()[..5],
            &[
                TranscriptEntry::Word(Word::start_write(0x3C)),
                TranscriptEntry::Word(Word::data(0x00)),
                TranscriptEntry::Word(Word::start_read(0x3C)),
                TranscriptEntry::Word(Word::data(0xFF)),
                TranscriptEntry::Stop,
            ]
        );
        // Panel is still off, so the status byte is 0x4B
        assert_eq!(bus.cell(1, 1), [b'4'; 8]);
        assert_eq!(bus.cell(1, 2), [b'B'; 8]);
        assert_eq!(h.position(), (1, 3));
    }

    #[test]
    fn test_id_fails_when_display_drops_out() {
        // NACK on the address, the control byte, the read address and
        // the read itself
        for words in 0..4 {
            let mut h = Harness::new();
            h.bus().nack_after(words);

            assert_eq!(h.command(&[Command::Id.as_u8()]), ResultCode::Failure);
            assert_eq!(h.position(), (1, 1));
            let bus = h.processor.bus();
            assert!(bus.ram().iter().all(|page| page.iter().all(|&b| b == 0)));
            assert_eq!(bus.words().filter(|w| *w == Word::data(0x40)).count(), 0);
        }

        let mut h = Harness::new();
        h.bus().set_present(false);
        assert_eq!(h.command(&[Command::Id.as_u8()]), ResultCode::Failure);
        assert_eq!(h.processor.bus().words().count(), 1);

        // The processor carries on afterwards
        h.bus().set_present(true);
        assert_eq!(h.command(&[Command::Nop.as_u8()]), ResultCode::Success);
    }

    #[test]
    fn test_id_waits_for_its_stop() {
        let (config, flash) = flash_for(&font_rom());
        let mut processor = Processor::new(config, LateStop::new(), flash).unwrap();
        let mut input: Deque<u8, 4> = Deque::new();
        while !processor.is_booted() {
            processor.step(&mut input);
        }

        input.push_back(Command::Id.as_u8()).unwrap();
        for _ in 0..STEP_LIMIT {
            processor.step(&mut input);
            if input.is_empty() && processor.is_idle() {
                break;
            }
        }

        assert!(processor.is_idle());
        assert_eq!(processor.result(), ResultCode::Success);
        assert_eq!(processor.bus().overlapping_starts, 0);
        assert_eq!(processor.cursor().col, 3);
        assert_eq!(processor.bus().display.cell(1, 1), [b'4'; 8]);
    }

    #[test]
    fn test_print_byte() {
        let mut h = Harness::new();
        assert_eq!(
            h.command(&[Command::PrintByte.as_u8(), 0x3C]),
            ResultCode::Success
        );
        assert_eq!(h.processor.bus().cell(1, 1), [b'3'; 8]);
        assert_eq!(h.processor.bus().cell(1, 2), [b'C'; 8]);
    }

    #[test]
    fn test_diagnostic_dumps_rom_head() {
        let rom = font_rom();
        let mut h = Harness::booted(&rom);
        h.command(&[Command::Nop.as_u8()]);

        h.send(&[Command::Diagnostic.as_u8()]);
        let results = h.run();

        assert!(results.iter().all(|r| *r == ResultCode::Busy));
        assert_eq!(h.processor.flash().requests(), 2);
        // 32 bytes, two digits each: four full rows
        assert_eq!(h.position(), (5, 1));

        let bus = h.processor.bus();
        for (i, byte) in rom.as_bytes()[..DIAGNOSTIC_LENGTH].iter().enumerate() {
            let cell = i as u8 * 2;
            let (row, col) = (cell / 16 + 1, cell % 16 + 1);
            assert_eq!(bus.cell(row, col), [hex_digit(byte >> 4); 8]);
            assert_eq!(bus.cell(row, col + 1), [hex_digit(*byte); 8]);
        }
    }

    #[test]
    fn test_unknown_opcode_fails() {
        let mut h = Harness::new();
        assert_eq!(h.command(&[0x42]), ResultCode::Failure);
        assert_eq!(h.command(&[Command::Nop.as_u8()]), ResultCode::Success);
    }

    #[test]
    fn test_stalled_bus_stalls_command() {
        let mut h = Harness::new();
        h.send(&[Command::Cls.as_u8(), Command::Nop.as_u8()]);
        for _ in 0..100 {
            h.processor.step(&mut h.input);
        }
        h.bus().stall();
        for _ in 0..10_000 {
            h.processor.step(&mut h.input);
        }

        assert_eq!(h.processor.result(), ResultCode::Busy);
        assert_eq!(h.processor.owner(), Owner::Clser);
        assert!(!h.processor.is_idle());
        assert_eq!(h.input.len(), 1);
    }

    #[test]
    fn test_rate_matched_queue() {
        let rom = font_rom();
        let mut processor = processor(&rom);
        let mut queue: Queue<u8, 2> = Queue::new();
        let (mut producer, mut consumer) = queue.split();

        let mut seq = CommandSequence::<32>::new();
        seq.cls()
            .unwrap()
            .locate(4, 4)
            .unwrap()
            .print(b"hi")
            .unwrap()
            .print_byte(0xE7)
            .unwrap();
        let bytes = seq.as_bytes();

        let mut sent = 0;
        for _ in 0..STEP_LIMIT {
            if sent < bytes.len() && producer.enqueue(bytes[sent]).is_ok() {
                sent += 1;
            }
            processor.step(&mut consumer);
            if sent == bytes.len() && !consumer.has_data() && processor.is_idle() {
                break;
            }
        }

        assert!(processor.is_idle());
        assert_eq!(processor.result(), ResultCode::Success);
        let bus = processor.bus();
        assert_eq!(bus.cell(4, 4), [b'h'; 8]);
        assert_eq!(bus.cell(4, 5), [b'i'; 8]);
        assert_eq!(bus.cell(4, 6), [b'E'; 8]);
        assert_eq!(bus.cell(4, 7), [b'7'; 8]);
    }

    #[test]
    fn test_hex_digit() {
        assert_eq!(hex_digit(0x0), b'0');
        assert_eq!(hex_digit(0x9), b'9');
        assert_eq!(hex_digit(0xA), b'A');
        assert_eq!(hex_digit(0xF), b'F');
        assert_eq!(hex_digit(0x4B), b'B');
    }

    fn command_bytes() -> impl Strategy<Value = std::vec::Vec<u8>> {
        let text = proptest::collection::vec(prop_oneof![Just(CR), Just(LF), 0x20u8..0x80], 0..24);
        let simple = [
            Command::Nop,
            Command::Init,
            Command::DisplayOn,
            Command::DisplayOff,
            Command::Cls,
            Command::CursorOn,
            Command::CursorOff,
            Command::Id,
        ];
        prop_oneof![
            proptest::sample::select(simple.to_vec()).prop_map(|command| vec![command.as_u8()]),
            (0u8..=40, 0u8..=40).prop_map(|(row, col)| vec![Command::Locate.as_u8(), row, col]),
            any::<u8>().prop_map(|byte| vec![Command::PrintByte.as_u8(), byte]),
            text.prop_map(|text| {
                let mut bytes = vec![Command::Print.as_u8(), text.len() as u8];
                bytes.extend(text);
                bytes
            }),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_one_result_per_command(commands in proptest::collection::vec(command_bytes(), 1..8)) {
            let mut h = Harness::new();
            for bytes in commands {
                h.send(&bytes);
                let seen = h.run();

                // Once terminal, the result holds until the next command
                let first = seen.iter().position(|r| r.is_terminal());
                prop_assert!(first.is_some());
                if let Some(first) = first {
                    prop_assert!(seen[first..].iter().all(|r| *r == seen[first]));
                }
                prop_assert_eq!(h.processor.result(), ResultCode::Success);

                for _ in 0..10 {
                    h.processor.step(&mut h.input);
                }
                prop_assert_eq!(h.processor.result(), ResultCode::Success);

                let cursor = h.processor.cursor();
                prop_assert!((1..=16).contains(&cursor.row));
                prop_assert!((1..=16).contains(&cursor.col));
            }
        }
    }
}
