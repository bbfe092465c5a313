//! Mock implementations for testing
//!
//! Host simulations of every hardware collaborator, for unit tests,
//! integration tests and the simulator binary. Each mock hands out a cheap
//! clonable handle so a test can keep inspecting state after the mock has
//! been moved into the code under test.
//!
//! All mocks can share one [`BusLog`] so tests can assert on the ordering of
//! SPI, GPIO, DMA and delay events across collaborators.

#![cfg(any(test, feature = "std"))]
#![allow(clippy::arithmetic_side_effects, clippy::indexing_slicing)]

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::spi::{ErrorKind, ErrorType, Operation, SpiDevice};

use crate::dma::{DmaChannel, Rejected, StreamBuffer};
use crate::error::HalError;
use crate::gpio::{Direction, GpioController, GpioLine, PinState};
use crate::iio::{IioAppInitParam, IioDevice, IioServer};
use crate::peripheral::UartConfig;

// ── Shared event timeline ───────────────────────────────────────────────────

/// One observable hardware interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusEvent {
    /// Register write; `data` is stored at `addr`, `addr + 1`, ...
    SpiWrite {
        /// First register address
        addr: u8,
        /// Bytes written
        data: Vec<u8>,
    },
    /// Register read of `len` bytes starting at `addr`
    SpiRead {
        /// First register address
        addr: u8,
        /// Bytes read
        len: usize,
    },
    /// Line configured as output or driven to a level
    GpioOutput {
        /// Platform offset
        offset: u32,
        /// Level driven
        level: PinState,
    },
    /// Line configured as input
    GpioInput {
        /// Platform offset
        offset: u32,
    },
    /// DMA transfer started
    DmaStart {
        /// Words in the transfer window
        words: usize,
        /// Cyclic transfer
        cyclic: bool,
    },
    /// DMA transfer halted
    DmaStop,
    /// Delay elapsed
    Delay {
        /// Duration in nanoseconds
        ns: u64,
    },
}

/// Shared, clonable event log.
#[derive(Debug, Clone, Default)]
pub struct BusLog(Rc<RefCell<Vec<BusEvent>>>);

impl BusLog {
    /// Create an empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event
    pub fn push(&self, event: BusEvent) {
        self.0.borrow_mut().push(event);
    }

    /// Snapshot of all events so far
    pub fn events(&self) -> Vec<BusEvent> {
        self.0.borrow().clone()
    }

    /// Forget all events
    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }

    /// Events with delays filtered out
    pub fn without_delays(&self) -> Vec<BusEvent> {
        self.0
            .borrow()
            .iter()
            .filter(|e| !matches!(e, BusEvent::Delay { .. }))
            .cloned()
            .collect()
    }
}

// ── GPIO ────────────────────────────────────────────────────────────────────

/// Configured state of one simulated line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineState {
    /// Direction
    pub direction: Direction,
    /// Driven (output) or sensed (input) level
    pub level: PinState,
}

#[derive(Debug, Default)]
struct GpioBank {
    lines: BTreeMap<u32, LineState>,
    held: BTreeSet<u32>,
    fail_acquire: BTreeSet<u32>,
    fail_acquire_at: BTreeMap<u32, (usize, HalError)>,
    attempts: BTreeMap<u32, usize>,
    fail_configure: BTreeSet<u32>,
    acquisitions: usize,
    releases: usize,
}

/// Simulated GPIO controller
///
/// Lines keep their configuration after release, like the real controller.
#[derive(Debug, Clone)]
pub struct MockGpioController {
    bank: Rc<RefCell<GpioBank>>,
    log: BusLog,
    line_count: u32,
}

/// Lines on a Zynq-7000 PS GPIO block (54 MIO + 64 EMIO)
pub const ZYNQ_GPIO_LINES: u32 = 118;

impl MockGpioController {
    /// Create a controller with [`ZYNQ_GPIO_LINES`] lines
    pub fn new(log: BusLog) -> Self {
        Self::with_lines(log, ZYNQ_GPIO_LINES)
    }

    /// Create a controller with `line_count` lines
    pub fn with_lines(log: BusLog, line_count: u32) -> Self {
        Self {
            bank: Rc::new(RefCell::new(GpioBank::default())),
            log,
            line_count,
        }
    }

    /// Current configuration of a line, `None` if never configured
    pub fn line_state(&self, offset: u32) -> Option<LineState> {
        self.bank.borrow().lines.get(&offset).copied()
    }

    /// `true` while the line is acquired
    pub fn is_held(&self, offset: u32) -> bool {
        self.bank.borrow().held.contains(&offset)
    }

    /// Number of lines currently acquired
    pub fn held_count(&self) -> usize {
        self.bank.borrow().held.len()
    }

    /// Make acquisition of `offset` fail with [`HalError::Io`]
    pub fn fail_acquire(&self, offset: u32) {
        self.bank.borrow_mut().fail_acquire.insert(offset);
    }

    /// Make the `nth` (zero-based) acquisition attempt of `offset` fail
    /// with `error`; earlier and later attempts behave normally
    pub fn fail_acquire_at(&self, offset: u32, nth: usize, error: HalError) {
        self.bank
            .borrow_mut()
            .fail_acquire_at
            .insert(offset, (nth, error));
    }

    /// Make direction/level changes on `offset` fail with [`HalError::Io`]
    pub fn fail_configure(&self, offset: u32) {
        self.bank.borrow_mut().fail_configure.insert(offset);
    }

    /// Total successful acquisitions
    pub fn acquisitions(&self) -> usize {
        self.bank.borrow().acquisitions
    }

    /// Total releases
    pub fn releases(&self) -> usize {
        self.bank.borrow().releases
    }
}

impl GpioController for MockGpioController {
    type Error = HalError;
    type Line = MockGpioLine;

    fn acquire(&mut self, offset: u32) -> Result<Self::Line, Self::Error> {
        if offset >= self.line_count {
            return Err(HalError::InvalidArgument);
        }
        let mut bank = self.bank.borrow_mut();
        let attempt = bank.attempts.entry(offset).or_insert(0);
        let nth = *attempt;
        *attempt += 1;
        if let Some(&(_, error)) = bank
            .fail_acquire_at
            .get(&offset)
            .filter(|(at, _)| *at == nth)
        {
            return Err(error);
        }
        if bank.fail_acquire.contains(&offset) {
            return Err(HalError::Io);
        }
        if !bank.held.insert(offset) {
            return Err(HalError::Busy);
        }
        bank.acquisitions += 1;
        Ok(MockGpioLine {
            offset,
            bank: Rc::clone(&self.bank),
            log: self.log.clone(),
        })
    }
}

/// Line handed out by [`MockGpioController`]
#[derive(Debug)]
pub struct MockGpioLine {
    offset: u32,
    bank: Rc<RefCell<GpioBank>>,
    log: BusLog,
}

impl MockGpioLine {
    fn configure(&mut self, state: LineState) -> Result<(), HalError> {
        let mut bank = self.bank.borrow_mut();
        if bank.fail_configure.contains(&self.offset) {
            return Err(HalError::Io);
        }
        bank.lines.insert(self.offset, state);
        Ok(())
    }
}

impl GpioLine for MockGpioLine {
    type Error = HalError;

    fn offset(&self) -> u32 {
        self.offset
    }

    fn set_direction_input(&mut self) -> Result<(), Self::Error> {
        let level = self.level()?;
        self.configure(LineState {
            direction: Direction::Input,
            level,
        })?;
        self.log.push(BusEvent::GpioInput {
            offset: self.offset,
        });
        Ok(())
    }

    fn set_direction_output(&mut self, level: PinState) -> Result<(), Self::Error> {
        self.configure(LineState {
            direction: Direction::Output,
            level,
        })?;
        self.log.push(BusEvent::GpioOutput {
            offset: self.offset,
            level,
        });
        Ok(())
    }

    fn set_level(&mut self, level: PinState) -> Result<(), Self::Error> {
        let is_output = self
            .bank
            .borrow()
            .lines
            .get(&self.offset)
            .is_some_and(|s| s.direction == Direction::Output);
        if !is_output {
            return Err(HalError::InvalidArgument);
        }
        self.set_direction_output(level)
    }

    fn level(&self) -> Result<PinState, Self::Error> {
        Ok(self
            .bank
            .borrow()
            .lines
            .get(&self.offset)
            .map_or(PinState::Low, |s| s.level))
    }

    fn release(self) {
        let mut bank = self.bank.borrow_mut();
        bank.held.remove(&self.offset);
        bank.releases += 1;
    }
}

// ── SPI ─────────────────────────────────────────────────────────────────────

/// Size of the simulated register file
pub const SIM_REGISTER_COUNT: usize = 128;

/// Read flag in the instruction byte
const SIM_READ_FLAG: u8 = 0x80;

/// Error returned by [`SimSpi`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimSpiError;

impl embedded_hal_async::spi::Error for SimSpiError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

#[derive(Debug)]
struct SimSpiState {
    regs: [u8; SIM_REGISTER_COUNT],
    transactions: usize,
    fail_from: Option<usize>,
    absent: bool,
}

/// Register-file simulation of an ADI-style SPI device
///
/// The first byte of a transaction is the instruction: bit 7 set for a read,
/// bits 6..0 the start address. Following bytes stream in or out at
/// ascending addresses.
#[derive(Debug, Clone)]
pub struct SimSpi {
    state: Rc<RefCell<SimSpiState>>,
    log: BusLog,
}

impl SimSpi {
    /// Create a responsive device with all registers zero
    pub fn new(log: BusLog) -> Self {
        Self {
            state: Rc::new(RefCell::new(SimSpiState {
                regs: [0; SIM_REGISTER_COUNT],
                transactions: 0,
                fail_from: None,
                absent: false,
            })),
            log,
        }
    }

    /// Create a bus with nothing on it: writes vanish, reads return zero
    pub fn absent(log: BusLog) -> Self {
        let spi = Self::new(log);
        spi.state.borrow_mut().absent = true;
        spi
    }

    /// Register contents at `addr`
    pub fn register(&self, addr: u8) -> u8 {
        self.state.borrow().regs[usize::from(addr) % SIM_REGISTER_COUNT]
    }

    /// Big-endian 16-bit value at `addr`, `addr + 1`
    pub fn register_u16(&self, addr: u8) -> u16 {
        u16::from_be_bytes([self.register(addr), self.register(addr.wrapping_add(1))])
    }

    /// Completed transactions
    pub fn transactions(&self) -> usize {
        self.state.borrow().transactions
    }

    /// Fail every transaction from the `n`th (zero-based) onwards
    pub fn fail_from(&self, n: usize) {
        self.state.borrow_mut().fail_from = Some(n);
    }
}

struct Cursor {
    instr: Option<u8>,
    addr: u8,
}

impl Cursor {
    fn is_read(&self) -> bool {
        self.instr.is_some_and(|i| i & SIM_READ_FLAG != 0)
    }
}

impl SimSpiState {
    fn write(&mut self, cursor: &mut Cursor, bytes: &[u8], log: &BusLog) {
        let bytes = match cursor.instr {
            Some(_) => bytes,
            None => match bytes.split_first() {
                Some((&instr, rest)) => {
                    cursor.instr = Some(instr);
                    cursor.addr = instr & !SIM_READ_FLAG;
                    rest
                }
                None => return,
            },
        };
        if bytes.is_empty() || cursor.is_read() {
            return;
        }
        let start = cursor.addr;
        for &b in bytes {
            if !self.absent {
                self.regs[usize::from(cursor.addr) % SIM_REGISTER_COUNT] = b;
            }
            cursor.addr = cursor.addr.wrapping_add(1);
        }
        log.push(BusEvent::SpiWrite {
            addr: start,
            data: bytes.to_vec(),
        });
    }

    fn read(&mut self, cursor: &mut Cursor, buf: &mut [u8], log: &BusLog) {
        if buf.is_empty() {
            return;
        }
        let start = cursor.addr;
        for b in buf.iter_mut() {
            *b = if self.absent {
                0
            } else {
                self.regs[usize::from(cursor.addr) % SIM_REGISTER_COUNT]
            };
            cursor.addr = cursor.addr.wrapping_add(1);
        }
        log.push(BusEvent::SpiRead {
            addr: start,
            len: buf.len(),
        });
    }
}

impl ErrorType for SimSpi {
    type Error = SimSpiError;
}

impl SpiDevice for SimSpi {
    async fn transaction(&mut self, operations: &mut [Operation<'_, u8>]) -> Result<(), Self::Error> {
        let mut state = self.state.borrow_mut();
        let n = state.transactions;
        if state.fail_from.is_some_and(|from| n >= from) {
            return Err(SimSpiError);
        }
        state.transactions += 1;

        let mut cursor = Cursor {
            instr: None,
            addr: 0,
        };
        for op in operations.iter_mut() {
            match op {
                Operation::Write(bytes) => state.write(&mut cursor, bytes, &self.log),
                Operation::Read(buf) => state.read(&mut cursor, buf, &self.log),
                Operation::TransferInPlace(buf) => {
                    if cursor.instr.is_none() {
                        let Some((first, rest)) = buf.split_first_mut() else {
                            continue;
                        };
                        state.write(&mut cursor, core::slice::from_ref(first), &self.log);
                        if cursor.is_read() {
                            state.read(&mut cursor, rest, &self.log);
                        } else {
                            state.write(&mut cursor, rest, &self.log);
                        }
                    } else if cursor.is_read() {
                        state.read(&mut cursor, buf, &self.log);
                    } else {
                        let bytes = buf.to_vec();
                        state.write(&mut cursor, &bytes, &self.log);
                    }
                }
                Operation::Transfer(read, write) => {
                    state.write(&mut cursor, write, &self.log);
                    if cursor.is_read() {
                        state.read(&mut cursor, read, &self.log);
                    }
                }
                Operation::DelayNs(_) => {}
            }
        }
        Ok(())
    }
}

// ── DMA ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct DmaState {
    busy: bool,
    cyclic: bool,
    words: usize,
    transferred: usize,
    starts: usize,
    stops: usize,
    samples: Vec<u32>,
    buffer: Option<StreamBuffer>,
    clock_hz: Option<u32>,
    fail_start: bool,
    fail_clock: bool,
    complete_after_polls: Option<usize>,
    polls: usize,
}

/// Simulated AXI-DMAC plus clock generator
///
/// Cyclic transfers run until stopped. One-shot transfers stay busy until
/// [`complete_after_polls`](Self::complete_after_polls) busy checks have been
/// made, or forever if that was never set.
#[derive(Debug, Clone, Default)]
pub struct MockDmaChannel {
    state: Rc<RefCell<DmaState>>,
    log: BusLog,
}

impl MockDmaChannel {
    /// Create an idle channel
    pub fn new(log: BusLog) -> Self {
        Self {
            state: Rc::default(),
            log,
        }
    }

    /// One-shot transfers finish after `polls` calls to `is_busy`
    pub fn complete_after_polls(&self, polls: usize) {
        self.state.borrow_mut().complete_after_polls = Some(polls);
    }

    /// Make `start` fail with [`HalError::Io`]
    pub fn fail_start(&self) {
        self.state.borrow_mut().fail_start = true;
    }

    /// Make `set_clock_rate` fail with [`HalError::NoDevice`]
    pub fn fail_clock(&self) {
        self.state.borrow_mut().fail_clock = true;
    }

    /// `true` while a transfer runs (does not count as a poll)
    pub fn running(&self) -> bool {
        self.state.borrow().busy
    }

    /// `true` if the last started transfer was cyclic
    pub fn last_cyclic(&self) -> bool {
        self.state.borrow().cyclic
    }

    /// Length in words of the last started transfer
    pub fn last_words(&self) -> usize {
        self.state.borrow().words
    }

    /// Contents of the last started transfer window, as read at start
    pub fn last_samples(&self) -> Vec<u32> {
        self.state.borrow().samples.clone()
    }

    /// `true` while the engine holds a buffer that has not been handed back
    pub fn holds_buffer(&self) -> bool {
        self.state.borrow().buffer.is_some()
    }

    /// Number of successful starts
    pub fn starts(&self) -> usize {
        self.state.borrow().starts
    }

    /// Number of stops of a running transfer
    pub fn stops(&self) -> usize {
        self.state.borrow().stops
    }

    /// Last programmed clock rate
    pub fn clock_hz(&self) -> Option<u32> {
        self.state.borrow().clock_hz
    }
}

impl DmaChannel for MockDmaChannel {
    type Error = HalError;

    fn set_clock_rate(&mut self, hz: u32) -> Result<(), Self::Error> {
        let mut state = self.state.borrow_mut();
        if state.fail_clock {
            return Err(HalError::NoDevice);
        }
        state.clock_hz = Some(hz);
        Ok(())
    }

    fn start(
        &mut self,
        buffer: StreamBuffer,
        count: usize,
        cyclic: bool,
    ) -> Result<(), Rejected<Self::Error>> {
        let mut state = self.state.borrow_mut();
        if state.fail_start {
            return Err(Rejected::new(HalError::Io, buffer));
        }
        if state.busy {
            return Err(Rejected::new(HalError::Busy, buffer));
        }
        if buffer.window(count).is_none() {
            return Err(Rejected::new(HalError::InvalidArgument, buffer));
        }
        state.samples = buffer.words()[..count].to_vec();
        state.busy = true;
        state.cyclic = cyclic;
        state.words = count;
        state.transferred = 0;
        state.polls = 0;
        state.starts += 1;
        state.buffer = Some(buffer);
        self.log.push(BusEvent::DmaStart {
            words: count,
            cyclic,
        });
        Ok(())
    }

    fn stop(&mut self) -> Result<Option<StreamBuffer>, Self::Error> {
        let mut state = self.state.borrow_mut();
        if state.busy {
            state.busy = false;
            state.transferred = state.words;
            state.stops += 1;
            self.log.push(BusEvent::DmaStop);
        }
        Ok(state.buffer.take())
    }

    fn is_busy(&self) -> bool {
        let mut state = self.state.borrow_mut();
        if state.busy && !state.cyclic {
            state.polls += 1;
            if state.complete_after_polls.is_some_and(|n| state.polls >= n) {
                state.busy = false;
                state.transferred = state.words;
            }
        }
        state.busy
    }

    fn transfer_count(&self) -> usize {
        self.state.borrow().transferred
    }
}

// ── Delay ───────────────────────────────────────────────────────────────────

/// Delay that returns immediately and records how long it was asked to wait
#[derive(Debug, Clone, Default)]
pub struct MockDelay {
    total_ns: Rc<Cell<u64>>,
    log: BusLog,
}

impl MockDelay {
    /// Create a delay recording into `log`
    pub fn new(log: BusLog) -> Self {
        Self {
            total_ns: Rc::default(),
            log,
        }
    }

    /// Sum of all requested delays in nanoseconds
    pub fn total_ns(&self) -> u64 {
        self.total_ns.get()
    }

    /// Sum of all requested delays in whole milliseconds
    pub fn total_ms(&self) -> u64 {
        self.total_ns.get() / 1_000_000
    }

    fn record(&self, ns: u64) {
        self.total_ns.set(self.total_ns.get() + ns);
        self.log.push(BusEvent::Delay { ns });
    }
}

impl DelayNs for MockDelay {
    async fn delay_ns(&mut self, ns: u32) {
        self.record(u64::from(ns));
    }

    async fn delay_us(&mut self, us: u32) {
        self.record(u64::from(us) * 1_000);
    }

    async fn delay_ms(&mut self, ms: u32) {
        self.record(u64::from(ms) * 1_000_000);
    }
}

// ── IIO server ──────────────────────────────────────────────────────────────

/// A client request replayed by [`MockIioServer`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IioRequest {
    /// Raw write to one channel
    WriteRaw {
        /// Channel index
        channel: usize,
        /// Raw code
        value: u16,
    },
    /// Copy samples into the start of the device's write buffer
    WriteBuffer {
        /// Samples
        words: &'static [u32],
    },
    /// Stream the first `count` words of the write buffer
    SubmitBuffer {
        /// Words to stream
        count: usize,
        /// Cyclic transfer
        cyclic: bool,
    },
    /// Stop the running buffer and take the write buffer back
    StopBuffer,
}

/// What [`MockIioServer`] observed
#[derive(Debug, Default)]
pub struct IioServerState {
    /// Names of registered devices
    pub device_names: Vec<&'static str>,
    /// Write buffer length of each registered device, in words
    pub write_buffer_words: Vec<Option<usize>>,
    /// UART the server was given
    pub uart: Option<UartConfig>,
    /// Number of `run` calls
    pub runs: usize,
    /// Requests served successfully
    pub served: usize,
    /// `true` while the write buffer is lent to the device
    pub buffer_lent: bool,
    /// Fail `init` with [`HalError::Io`]
    pub fail_init: bool,
}

/// IIO server that replays a fixed request script against device 0 and
/// returns once the script is exhausted
///
/// Device errors end the run with [`HalError::Io`]. Touching the write
/// buffer while it is lent, or when none was registered, fails with
/// [`HalError::Busy`].
#[derive(Debug)]
pub struct MockIioServer<D> {
    param: Option<IioAppInitParam<D>>,
    script: Vec<IioRequest>,
    state: Rc<RefCell<IioServerState>>,
}

impl<D> MockIioServer<D> {
    /// Create a server that will replay `script`
    pub fn new(script: Vec<IioRequest>) -> Self {
        Self {
            param: None,
            script,
            state: Rc::default(),
        }
    }

    /// Shared observation handle
    pub fn state(&self) -> Rc<RefCell<IioServerState>> {
        Rc::clone(&self.state)
    }
}

impl<D: IioDevice> IioServer<D> for MockIioServer<D> {
    type Error = HalError;

    fn init(&mut self, param: IioAppInitParam<D>) -> Result<(), Self::Error> {
        let mut state = self.state.borrow_mut();
        if state.fail_init {
            return Err(HalError::Io);
        }
        if param.devices.is_empty() {
            return Err(HalError::InvalidArgument);
        }
        state.device_names = param.devices.iter().map(|d| d.name).collect();
        state.write_buffer_words = param
            .devices
            .iter()
            .map(|d| d.write_buffer.as_ref().map(|b| b.len()))
            .collect();
        state.uart = Some(param.uart);
        self.param = Some(param);
        Ok(())
    }

    async fn run(&mut self) -> Result<(), Self::Error> {
        self.state.borrow_mut().runs += 1;
        let entry = self
            .param
            .as_mut()
            .and_then(|p| p.devices.first_mut())
            .ok_or(HalError::NoDevice)?;
        for request in &self.script {
            match *request {
                IioRequest::WriteRaw { channel, value } => entry
                    .device
                    .write_raw(channel, value)
                    .await
                    .map_err(|_| HalError::Io)?,
                IioRequest::WriteBuffer { words } => {
                    let region = entry.write_buffer.as_deref_mut().ok_or(HalError::Busy)?;
                    region
                        .get_mut(..words.len())
                        .ok_or(HalError::InvalidArgument)?
                        .copy_from_slice(words);
                }
                IioRequest::SubmitBuffer { count, cyclic } => {
                    let region = entry.write_buffer.take().ok_or(HalError::Busy)?;
                    let submitted = entry
                        .device
                        .submit_buffer(StreamBuffer::Lent(region), count, cyclic)
                        .await;
                    if let Err(rejected) = submitted {
                        entry.write_buffer = rejected.buffer.into_lent();
                        return Err(HalError::Io);
                    }
                    self.state.borrow_mut().buffer_lent = true;
                }
                IioRequest::StopBuffer => {
                    let returned = entry.device.stop_buffer().await.map_err(|_| HalError::Io)?;
                    if let Some(region) = returned.and_then(StreamBuffer::into_lent) {
                        entry.write_buffer = Some(region);
                        self.state.borrow_mut().buffer_lent = false;
                    }
                }
            }
            self.state.borrow_mut().served += 1;
        }
        Ok(())
    }
}
