//! AD3552R demonstrator - desktop simulator
//!
//! Runs the application against the platform mocks: a register-file SPI
//! device, a simulated GPIO bank and a simulated AXI-DMAC. Delays are real,
//! so the standalone example takes a little over 22 seconds.
//!
//! ```bash
//! RUST_LOG=debug cargo run -p firmware --features simulator
//! RUST_LOG=info cargo run -p firmware --features simulator,iio
//! ```

use std::process::ExitCode;

use embassy_time::Timer;
use embedded_hal_async::delay::DelayNs;
use firmware::app::{self, AppMode, Board, StartupError};
use firmware::board::default_dac_config;
use platform::mocks::{BusLog, MockDmaChannel, MockGpioController, SimSpi};
use platform::DacConfig;
use tracing_subscriber::EnvFilter;

/// Host delay backed by the embassy-time std driver.
#[derive(Debug, Clone, Copy, Default)]
struct HostDelay;

impl DelayNs for HostDelay {
    async fn delay_ns(&mut self, ns: u32) {
        Timer::after_nanos(u64::from(ns)).await;
    }

    async fn delay_us(&mut self, us: u32) {
        Timer::after_micros(u64::from(us)).await;
    }

    async fn delay_ms(&mut self, ms: u32) {
        Timer::after_millis(u64::from(ms)).await;
    }
}

type SimBoard = Board<MockGpioController, SimSpi, MockDmaChannel, HostDelay>;

#[cfg(not(feature = "iio"))]
async fn run_selected(board: SimBoard, config: &DacConfig) -> Result<(), StartupError> {
    app::run(board, config, AppMode::<platform::NoServer>::Standalone).await
}

#[cfg(feature = "iio")]
async fn run_selected(board: SimBoard, config: &DacConfig) -> Result<(), StartupError> {
    use firmware::board::{iio_uart_config, IIO_WRITE_BUFFER_WORDS};
    use firmware::waveform::SINE_LUT_WORDS;
    use platform::mocks::{IioRequest, MockIioServer};
    use static_cell::StaticCell;

    static WRITE_BUFFER: StaticCell<[u32; IIO_WRITE_BUFFER_WORDS]> = StaticCell::new();
    let write_buffer = WRITE_BUFFER.init([0; IIO_WRITE_BUFFER_WORDS]);

    // What a client session typically does: poke both channels, fill the
    // write buffer with the sine table, play it and stop it again.
    let server = MockIioServer::new(vec![
        IioRequest::WriteRaw {
            channel: 0,
            value: 0x8000,
        },
        IioRequest::WriteRaw {
            channel: 1,
            value: 0x4000,
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

    let mode = AppMode::Server(app::ServerMode {
        server,
        uart: iio_uart_config(),
        write_buffer: Some(write_buffer.as_mut_slice()),
    });
    let result = app::run(board, config, mode).await;
    tracing::info!(served = state.borrow().served, "IIO session finished");
    result
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let log = BusLog::new();
    let spi = SimSpi::new(log.clone());
    let board = Board {
        gpio: MockGpioController::new(log.clone()),
        spi: spi.clone(),
        stream: Some(MockDmaChannel::new(log.clone())),
        delay: HostDelay,
    };
    let config = default_dac_config();

    let result = run_selected(board, &config).await;
    tracing::debug!(
        bus_events = log.without_delays().len(),
        spi_transactions = spi.transactions(),
        "simulated bus activity"
    );

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(stage = e.stage.name(), code = e.code, "startup failed");
            ExitCode::from(e.exit_status())
        }
    }
}
