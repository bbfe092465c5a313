//! Integration test: the complete application startup against mock peripherals.
//!
//! Tests that:
//!   1. The standalone run reaches the end, leaves the expected register
//!      contents and gives every GPIO line back
//!   2. Bus activity happens in startup order (GPIO bank, DAC init, LED,
//!      example writes, stream)
//!   3. GPIO and DAC init failures short-circuit with their error codes
//!   4. A failing example still releases the DAC
//!   5. Server mode registers the DAC with the IIO server and serves requests
//!   6. Samples written into the IIO write buffer are what the DMA streams
//!
//! Does NOT require physical hardware.
//!
//! Run with: cargo test -p firmware --test integration_boot_sequence

// Integration test file -- intentional test patterns permitted.
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing,
    clippy::assertions_on_constants,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::cast_lossless,
    clippy::arithmetic_side_effects,
)]

use firmware::app::{self, AppMode, Board, ServerMode, StartupError, StartupStage};
use firmware::board::{default_dac_config, iio_uart_config, GpioLineId};
use firmware::dac::ad3552r::registers::{
    REG_CH0_CH1_OUTPUT_RANGE, REG_CH0_DAC_16B, REG_CH0_INPUT_16B, REG_CH1_DAC_16B,
    REG_CH1_INPUT_16B, REG_INTERFACE_CONFIG_D, REG_SCRATCH_PAD,
};
use firmware::dac::Ad3552r;
use firmware::iio::IioDac;
use firmware::waveform::SINE_LUT_WORDS;
use platform::mocks::{
    BusEvent, BusLog, IioRequest, MockDelay, MockDmaChannel, MockGpioController, MockGpioLine,
    MockIioServer, SimSpi,
};
use platform::{HalError, NoServer, PinState};

// -- Fixture --------------------------------------------------------------

struct Rig {
    log: BusLog,
    gpio: MockGpioController,
    spi: SimSpi,
    dma: MockDmaChannel,
    delay: MockDelay,
}

impl Rig {
    fn new() -> Self {
        let log = BusLog::new();
        Self {
            gpio: MockGpioController::new(log.clone()),
            spi: SimSpi::new(log.clone()),
            dma: MockDmaChannel::new(log.clone()),
            delay: MockDelay::new(log.clone()),
            log,
        }
    }

    fn with_spi(spi: SimSpi) -> Self {
        let mut rig = Self::new();
        rig.spi = spi;
        rig
    }

    fn board(&self) -> Board<MockGpioController, SimSpi, MockDmaChannel, MockDelay> {
        Board {
            gpio: self.gpio.clone(),
            spi: self.spi.clone(),
            stream: Some(self.dma.clone()),
            delay: self.delay.clone(),
        }
    }

    async fn run_standalone(&self) -> Result<(), StartupError> {
        app::run(
            self.board(),
            &default_dac_config(),
            AppMode::<NoServer>::Standalone,
        )
        .await
    }

    async fn run_server(
        &self,
        server: MockIioServer<ServerDac>,
        write_buffer: Option<&'static mut [u32]>,
    ) -> Result<(), StartupError> {
        let mode = AppMode::Server(ServerMode {
            server,
            uart: iio_uart_config(),
            write_buffer,
        });
        app::run(self.board(), &default_dac_config(), mode).await
    }

    fn green_level(&self) -> Option<PinState> {
        self.gpio
            .line_state(GpioLineId::Green.offset())
            .map(|s| s.level)
    }
}

type ServerDac = IioDac<Ad3552r<SimSpi, MockGpioLine, MockDmaChannel, MockDelay>>;

/// Zeroed write buffer that outlives the test.
fn region(words: usize) -> &'static mut [u32] {
    Box::leak(vec![0u32; words].into_boxed_slice())
}

static RAMP: [u32; 32] = {
    let mut words = [0u32; 32];
    let mut i = 0;
    while i < words.len() {
        words[i] = (i as u32) << 16 | (0xFFFF - i as u32);
        i += 1;
    }
    words
};

fn out(line: GpioLineId, level: PinState) -> BusEvent {
    BusEvent::GpioOutput {
        offset: line.offset(),
        level,
    }
}

fn spi_write(addr: u8, data: &[u8]) -> BusEvent {
    BusEvent::SpiWrite {
        addr,
        data: data.to_vec(),
    }
}

// -- Standalone -----------------------------------------------------------

#[tokio::test]
async fn standalone_run_completes() {
    let rig = Rig::new();

    rig.run_standalone().await.unwrap();

    // LDAC-synchronised write, then the direct write on top of it.
    assert_eq!(rig.spi.register_u16(REG_CH0_INPUT_16B), 65534);
    assert_eq!(rig.spi.register_u16(REG_CH1_INPUT_16B), 0);
    assert_eq!(rig.spi.register_u16(REG_CH0_DAC_16B), 0);
    assert_eq!(rig.spi.register_u16(REG_CH1_DAC_16B), 65534);
    assert_eq!(rig.spi.register(REG_CH0_CH1_OUTPUT_RANGE), 0x44);

    assert_eq!(rig.dma.starts(), 1);
    assert_eq!(rig.dma.last_words(), 256);
    assert!(rig.dma.last_cyclic());
    assert_eq!(rig.dma.stops(), 1);
    assert!(!rig.dma.running());
    assert_eq!(rig.dma.clock_hz(), Some(133_000_000));

    assert_eq!(rig.gpio.held_count(), 0, "DAC removed, lines released");
    assert_eq!(rig.green_level(), Some(PinState::Low), "power-up LED lit");

    // reset pulse + settle + two 1 s pauses + 20 s stream
    assert_eq!(rig.delay.total_ms(), 1 + 10 + 1000 + 1000 + 20_000);
}

#[tokio::test]
async fn standalone_bus_activity_in_startup_order() {
    let rig = Rig::new();

    rig.run_standalone().await.unwrap();

    use GpioLineId::*;
    use PinState::{High, Low};
    let expected = vec![
        // GPIO bank defaults
        out(ResetN, High),
        out(LdacN, High),
        out(SpiQpi, Low),
        BusEvent::GpioInput {
            offset: AlertN.offset(),
        },
        out(Spare9, High),
        out(Red, High),
        out(Green, High),
        out(Blue, High),
        // DAC takes LDAC_N then RESET_N, and pulses reset
        out(LdacN, High),
        out(ResetN, High),
        out(ResetN, Low),
        out(ResetN, High),
        // scratch-pad check, drive strength, ranges
        spi_write(REG_SCRATCH_PAD, &[0x5A]),
        BusEvent::SpiRead {
            addr: REG_SCRATCH_PAD,
            len: 1,
        },
        spi_write(REG_INTERFACE_CONFIG_D, &[0x04]),
        spi_write(REG_CH0_CH1_OUTPUT_RANGE, &[0x44]),
        // power-up LED
        out(Green, Low),
        // input registers and one LDAC strobe
        spi_write(REG_CH0_INPUT_16B, &[0xFF, 0xFE]),
        spi_write(REG_CH1_INPUT_16B, &[0x00, 0x00]),
        out(LdacN, Low),
        out(LdacN, High),
        // direct DAC register write
        spi_write(REG_CH0_DAC_16B, &[0x00, 0x00]),
        spi_write(REG_CH1_DAC_16B, &[0xFF, 0xFE]),
        // sine stream
        BusEvent::DmaStart {
            words: 256,
            cyclic: true,
        },
        BusEvent::DmaStop,
    ];
    assert_eq!(rig.log.without_delays(), expected);
}

#[tokio::test]
async fn gpio_failure_stops_before_dac() {
    let rig = Rig::new();
    rig.gpio.fail_acquire(GpioLineId::SpiQpi.offset());

    let err = rig.run_standalone().await.unwrap_err();

    assert_eq!(
        err,
        StartupError {
            stage: StartupStage::Start,
            code: -5,
        }
    );
    assert_eq!(err.exit_status(), 5);
    assert_eq!(rig.spi.transactions(), 0, "DAC never touched");
    assert_eq!(rig.gpio.held_count(), 0);
}

#[tokio::test]
async fn busy_dac_control_line_reports_its_own_code() {
    let rig = Rig::new();
    // The bank init takes LDAC_N once and gives it back; the DAC's own
    // acquisition is the second attempt.
    rig.gpio
        .fail_acquire_at(GpioLineId::LdacN.offset(), 1, HalError::Busy);

    let err = rig.run_standalone().await.unwrap_err();

    assert_eq!(
        err,
        StartupError {
            stage: StartupStage::GpiosInitialized,
            code: -16,
        }
    );
    assert_eq!(err.exit_status(), 16);
    assert_eq!(rig.spi.transactions(), 0, "DAC never touched");
    assert_eq!(rig.gpio.held_count(), 0);
}

#[tokio::test]
async fn dac_reset_line_invalid_argument_keeps_code() {
    let rig = Rig::new();
    rig.gpio
        .fail_acquire_at(GpioLineId::ResetN.offset(), 1, HalError::InvalidArgument);

    let err = rig.run_standalone().await.unwrap_err();

    assert_eq!(err.stage, StartupStage::GpiosInitialized);
    assert_eq!(err.code, -22);
    assert!(!rig.gpio.is_held(GpioLineId::LdacN.offset()), "LDAC_N given back");
}

#[tokio::test]
async fn missing_dac_reports_no_device() {
    let rig = Rig::with_spi(SimSpi::absent(BusLog::new()));

    let err = rig.run_standalone().await.unwrap_err();

    assert_eq!(
        err,
        StartupError {
            stage: StartupStage::GpiosInitialized,
            code: -19,
        }
    );
    assert_eq!(rig.gpio.held_count(), 0, "LDAC_N and RESET_N given back");
    assert_eq!(rig.green_level(), Some(PinState::High), "LED stays off");
    assert_eq!(rig.dma.starts(), 0);
}

#[tokio::test]
async fn unsupported_config_rejected_before_bus_access() {
    let rig = Rig::new();
    let mut config = default_dac_config();
    config.crc_enabled = true;

    let err = app::run(rig.board(), &config, AppMode::<NoServer>::Standalone)
        .await
        .unwrap_err();

    assert_eq!(err.stage, StartupStage::GpiosInitialized);
    assert_eq!(err.code, -95);
    assert_eq!(rig.spi.transactions(), 0);
}

#[tokio::test]
async fn example_failure_still_releases_dac() {
    let rig = Rig::new();
    // Four init transactions succeed, the first example write fails.
    rig.spi.fail_from(4);

    let err = rig.run_standalone().await.unwrap_err();

    assert_eq!(
        err,
        StartupError {
            stage: StartupStage::DacInitialized,
            code: -5,
        }
    );
    assert_eq!(rig.gpio.held_count(), 0);
    assert_eq!(rig.dma.starts(), 0);
    assert_eq!(rig.green_level(), Some(PinState::Low));
}

#[tokio::test]
async fn clock_generator_failure_is_dma_unavailable() {
    let rig = Rig::new();
    rig.dma.fail_clock();

    let err = rig.run_standalone().await.unwrap_err();

    assert_eq!(err.stage, StartupStage::GpiosInitialized);
    assert_eq!(err.code, -19);
    assert_eq!(rig.gpio.held_count(), 0);
}

// -- IIO server -----------------------------------------------------------

#[tokio::test]
async fn server_mode_serves_requests() {
    let rig = Rig::new();
    let server = MockIioServer::new(vec![
        IioRequest::WriteRaw {
            channel: 0,
            value: 0x1234,
        },
        IioRequest::WriteBuffer {
            words: &SINE_LUT_WORDS,
        },
        IioRequest::SubmitBuffer {
            count: SINE_LUT_WORDS.len(),
            cyclic: true,
        },
        IioRequest::StopBuffer,
    ]);
    let state = server.state();

    rig.run_server(server, Some(region(SINE_LUT_WORDS.len())))
        .await
        .unwrap();

    let state = state.borrow();
    assert_eq!(state.device_names, vec!["ad3552r-hs"]);
    assert_eq!(state.write_buffer_words, vec![Some(256)]);
    assert_eq!(state.uart, Some(iio_uart_config()));
    assert_eq!(state.runs, 1);
    assert_eq!(state.served, 4);
    assert!(!state.buffer_lent, "write buffer back with the server");

    assert_eq!(rig.spi.register_u16(REG_CH0_DAC_16B), 0x1234);
    assert_eq!(rig.dma.starts(), 1);
    assert_eq!(rig.dma.last_samples(), SINE_LUT_WORDS.to_vec());
    assert_eq!(rig.dma.stops(), 1);
    assert!(!rig.dma.holds_buffer());
    assert_eq!(rig.green_level(), Some(PinState::Low));
    // The server owns the DAC for good.
    assert!(rig.gpio.is_held(GpioLineId::LdacN.offset()));
    assert!(rig.gpio.is_held(GpioLineId::ResetN.offset()));
}

#[tokio::test]
async fn written_samples_are_what_the_dma_streams() {
    let rig = Rig::new();
    let server = MockIioServer::new(vec![
        IioRequest::WriteBuffer { words: &RAMP },
        IioRequest::SubmitBuffer {
            count: 20,
            cyclic: false,
        },
        IioRequest::StopBuffer,
        // Refill after the region came back, then stream it again.
        IioRequest::WriteBuffer { words: &RAMP[..4] },
        IioRequest::SubmitBuffer {
            count: 4,
            cyclic: true,
        },
    ]);
    let state = server.state();

    rig.run_server(server, Some(region(64))).await.unwrap();

    assert_eq!(rig.dma.starts(), 2);
    assert_eq!(rig.dma.last_words(), 4);
    assert_eq!(rig.dma.last_samples(), RAMP[..4].to_vec());
    assert!(rig.dma.running());
    assert!(state.borrow().buffer_lent);
    assert!(
        rig.log.events().contains(&BusEvent::DmaStart {
            words: 20,
            cyclic: false
        }),
        "first submit streamed the 20-word prefix"
    );
}

#[tokio::test]
async fn writing_a_lent_buffer_is_refused() {
    let rig = Rig::new();
    let server = MockIioServer::new(vec![
        IioRequest::WriteBuffer { words: &RAMP },
        IioRequest::SubmitBuffer {
            count: 32,
            cyclic: true,
        },
        IioRequest::WriteBuffer { words: &RAMP },
    ]);
    let state = server.state();

    let err = rig.run_server(server, Some(region(32))).await.unwrap_err();

    assert_eq!(
        err,
        StartupError {
            stage: StartupStage::IioServerRunning,
            code: -16,
        }
    );
    assert_eq!(state.borrow().served, 2);
    assert_eq!(rig.dma.last_samples(), RAMP.to_vec(), "stream untouched");
}

#[tokio::test]
async fn submit_without_write_buffer_is_refused() {
    let rig = Rig::new();
    let server = MockIioServer::new(vec![IioRequest::SubmitBuffer {
        count: 8,
        cyclic: true,
    }]);

    let err = rig.run_server(server, None).await.unwrap_err();

    assert_eq!(err.stage, StartupStage::IioServerRunning);
    assert_eq!(err.code, -16);
    assert_eq!(rig.dma.starts(), 0);
}

#[tokio::test]
async fn refused_submit_returns_region_to_server() {
    let rig = Rig::new();
    let server = MockIioServer::new(vec![
        // Longer than the region: the driver refuses it.
        IioRequest::SubmitBuffer {
            count: 65,
            cyclic: true,
        },
    ]);
    let state = server.state();

    let err = rig.run_server(server, Some(region(64))).await.unwrap_err();

    assert_eq!(err.code, -5);
    assert!(!state.borrow().buffer_lent);
    assert_eq!(rig.dma.starts(), 0);
}

#[tokio::test]
async fn server_init_failure_is_reported() {
    let rig = Rig::new();
    let server = MockIioServer::new(vec![]);
    server.state().borrow_mut().fail_init = true;
    let state = server.state();

    let mode = AppMode::Server(ServerMode {
        server,
        uart: iio_uart_config(),
        write_buffer: None,
    });
    let err = app::run(rig.board(), &default_dac_config(), mode)
        .await
        .unwrap_err();

    assert_eq!(
        err,
        StartupError {
            stage: StartupStage::DacInitialized,
            code: -5,
        }
    );
    assert_eq!(state.borrow().runs, 0);
}

#[tokio::test]
async fn server_request_failure_ends_run() {
    let rig = Rig::new();
    let server = MockIioServer::new(vec![
        IioRequest::WriteRaw {
            channel: 1,
            value: 7,
        },
        IioRequest::WriteRaw {
            channel: 5,
            value: 7,
        },
    ]);
    let state = server.state();

    let mode = AppMode::Server(ServerMode {
        server,
        uart: iio_uart_config(),
        write_buffer: None,
    });
    let err = app::run(rig.board(), &default_dac_config(), mode)
        .await
        .unwrap_err();

    assert_eq!(err.stage, StartupStage::IioServerRunning);
    assert_eq!(err.code, -5);
    assert_eq!(state.borrow().served, 1);
    assert_eq!(rig.spi.register_u16(REG_CH1_DAC_16B), 7);
}
