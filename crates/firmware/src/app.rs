//! Application entry for the AD3552R FMC demonstrator.
//!
//! Startup order (each step short-circuits on failure):
//!
//! ```text
//! Start → GpiosInitialized → DacInitialized ─┬→ StandaloneRunComplete → DacReleased → End
//!                                            └→ IioServerRunning
//! ```
//!
//! The mode is picked once, before startup, through [`AppMode`]. The DAC is
//! moved into exactly one of the two branches: consumed by `remove()` after
//! the standalone example, or handed to the IIO server for good.

use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::spi::SpiDevice;
use platform::{
    DacConfig, DmaChannel, ErrorCode, GpioController, IioAppDevice, IioAppInitParam, IioServer,
    UartConfig,
};

use crate::dac::{Ad3552r, ChannelMask, DacDriver, DacError};
use crate::gpio_bank::{initialize_gpio_defaults, signal_power_up_success};
use crate::iio::{IioDac, IIO_DEVICE_NAME};
use crate::sequencer::{start_cyclic_stream, write_and_trigger, write_direct};
use crate::waveform::{SINE_LUT_WORDS, SINE_LUT_WORD_COUNT};

/// `true` when built with the `iio` feature.
pub const IIO_SUPPORT: bool = cfg!(feature = "iio");

/// Near full-scale code written by the example (0xFFFE).
pub const EXAMPLE_SAMPLE: u16 = 65534;

/// Pause between the example's register writes.
pub const SETTLE_MS: u32 = 1000;

/// How long the example streams the sine table.
pub const EXAMPLE_STREAM_SECS: u32 = 20;

/// The hardware collaborators the application is started with.
pub struct Board<G, SPI, S, DL> {
    /// GPIO controller owning the FMC control bank
    pub gpio: G,
    /// SPI device with the DAC's chip select
    pub spi: SPI,
    /// DMA path into the AXI DAC core, if present
    pub stream: Option<S>,
    /// Delay provider
    pub delay: DL,
}

/// IIO server hand-off parameters.
pub struct ServerMode<Srv> {
    /// The server
    pub server: Srv,
    /// UART it listens on
    pub uart: UartConfig,
    /// Region clients fill with outgoing samples; streamed from on submit
    pub write_buffer: Option<&'static mut [u32]>,
}

/// What happens after the DAC is up.
pub enum AppMode<Srv> {
    /// Run the built-in example, release the DAC and return
    Standalone,
    /// Hand the DAC to an IIO server and serve until it fails
    Server(ServerMode<Srv>),
}

/// Startup progress, as last reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StartupStage {
    /// Nothing done yet
    Start,
    /// Control bank in its power-on state
    GpiosInitialized,
    /// DAC driver up
    DacInitialized,
    /// Example sequence finished
    StandaloneRunComplete,
    /// DAC handed to the IIO server
    IioServerRunning,
    /// DAC driver removed
    DacReleased,
    /// Done
    End,
}

impl StartupStage {
    /// Stage name for logs
    pub const fn name(self) -> &'static str {
        match self {
            Self::Start => "Start",
            Self::GpiosInitialized => "GpiosInitialized",
            Self::DacInitialized => "DacInitialized",
            Self::StandaloneRunComplete => "StandaloneRunComplete",
            Self::IioServerRunning => "IioServerRunning",
            Self::DacReleased => "DacReleased",
            Self::End => "End",
        }
    }
}

/// Startup failed after reaching `stage`, with the collaborator's error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StartupError {
    /// Last stage reached before the failure
    pub stage: StartupStage,
    /// Negative errno-style code of the failure
    pub code: i32,
}

impl StartupError {
    fn at<E: ErrorCode>(stage: StartupStage, e: &E) -> Self {
        Self {
            stage,
            code: e.code(),
        }
    }

    /// Process exit status: `|code|`, clamped to 255.
    pub fn exit_status(&self) -> u8 {
        u8::try_from(self.code.unsigned_abs()).unwrap_or(u8::MAX)
    }
}

impl ErrorCode for StartupError {
    fn code(&self) -> i32 {
        self.code
    }
}

impl core::fmt::Display for StartupError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "startup failed after {} with code {}", self.stage.name(), self.code)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for StartupError {}

fn reach(stage: StartupStage) -> StartupStage {
    info!("startup stage: {}", stage.name());
    stage
}

/// The standalone example: LDAC-synchronised write, direct write, then the
/// sine table streamed for [`EXAMPLE_STREAM_SECS`].
pub async fn run_example<D: DacDriver, T: DelayNs>(
    dac: &mut D,
    delay: &mut T,
) -> Result<(), DacError> {
    write_and_trigger(dac, [EXAMPLE_SAMPLE, 0], ChannelMask::ALL)
        .await
        .map_err(|e| {
            info!("error writing samples");
            e
        })?;
    delay.delay_ms(SETTLE_MS).await;

    write_direct(dac, [0, EXAMPLE_SAMPLE], ChannelMask::ALL)
        .await
        .map_err(|e| {
            info!("error writing samples");
            e
        })?;
    delay.delay_ms(SETTLE_MS).await;

    info!(
        "Fast cyclic dma transfer starts now, for {} seconds ...",
        EXAMPLE_STREAM_SECS
    );
    start_cyclic_stream(
        dac,
        delay,
        &SINE_LUT_WORDS,
        SINE_LUT_WORD_COUNT,
        true,
        EXAMPLE_STREAM_SECS,
    )
    .await
}

/// Bring the board up and run `mode`.
///
/// GPIO and DAC init failures return straight away with their code. If the
/// standalone example fails, the DAC is removed before the error is
/// returned. In server mode the server's result is the application result.
pub async fn run<G, SPI, S, DL, Srv>(
    board: Board<G, SPI, S, DL>,
    config: &DacConfig,
    mode: AppMode<Srv>,
) -> Result<(), StartupError>
where
    G: GpioController,
    SPI: SpiDevice,
    S: DmaChannel,
    DL: DelayNs + Clone,
    Srv: IioServer<IioDac<Ad3552r<SPI, G::Line, S, DL>>>,
{
    info!("Hey, welcome to ad3552r_fmcz AXI example");

    let Board {
        mut gpio,
        spi,
        stream,
        mut delay,
    } = board;
    let mut stage = reach(StartupStage::Start);

    if let Err(e) = initialize_gpio_defaults(&mut gpio) {
        error!("init_gpios_to_defaults failed: {}", e.code());
        return Err(StartupError::at(stage, &e));
    }
    stage = reach(StartupStage::GpiosInitialized);

    let mut dac = match Ad3552r::init(spi, &mut gpio, stream, delay.clone(), config).await {
        Ok(dac) => dac,
        Err(e) => {
            error!("ad3552r_init failed with code: {}", e.code());
            return Err(StartupError::at(stage, &e));
        }
    };
    stage = reach(StartupStage::DacInitialized);

    match mode {
        AppMode::Standalone => {
            signal_power_up_success(&mut gpio);

            if let Err(e) = run_example(&mut dac, &mut delay).await {
                debug!("Example failed with code: {}", e.code());
                if let Err(re) = dac.remove().await {
                    warn!("DAC release after failure: {}", re.code());
                }
                return Err(StartupError::at(stage, &e));
            }
            stage = reach(StartupStage::StandaloneRunComplete);

            dac.remove()
                .await
                .map_err(|e| StartupError::at(stage, &e))?;
            reach(StartupStage::DacReleased);

            info!("Example completed, bye !");
            reach(StartupStage::End);
            Ok(())
        }
        AppMode::Server(ServerMode {
            mut server,
            uart,
            write_buffer,
        }) => {
            let device = IioDac::new(dac);
            signal_power_up_success(&mut gpio);

            let param = IioAppInitParam::single(
                IioAppDevice {
                    name: IIO_DEVICE_NAME,
                    device,
                    write_buffer,
                },
                uart,
            );
            if let Err(e) = server.init(param) {
                error!("iio_app_init failed: {}", e.code());
                return Err(StartupError::at(stage, &e));
            }
            stage = reach(StartupStage::IioServerRunning);

            server.run().await.map_err(|e| {
                error!("IIO server stopped: {}", e.code());
                StartupError::at(stage, &e)
            })
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::dac::mock::DacCall;
    use crate::dac::{MockDac, WriteMode};
    use platform::mocks::{BusLog, MockDelay};

    #[test]
    fn exit_status_is_clamped_magnitude() {
        let err = |code| StartupError {
            stage: StartupStage::Start,
            code,
        };
        assert_eq!(err(-5).exit_status(), 5);
        assert_eq!(err(-110).exit_status(), 110);
        assert_eq!(err(-1000).exit_status(), 255);
        assert_eq!(err(i32::MIN).exit_status(), 255);
    }

    #[tokio::test]
    async fn example_sequence_order_and_timing() {
        let mut dac = MockDac::new();
        let mut delay = MockDelay::new(BusLog::new());

        run_example(&mut dac, &mut delay).await.unwrap();

        assert_eq!(
            dac.calls.as_slice(),
            &[
                DacCall::Write {
                    frame: [65534, 0],
                    mask: ChannelMask::ALL,
                    mode: WriteMode::InputRegsAndTriggerLdac,
                },
                DacCall::Ldac(ChannelMask::ALL),
                DacCall::Write {
                    frame: [0, 65534],
                    mask: ChannelMask::ALL,
                    mode: WriteMode::DacRegs,
                },
                DacCall::StartStream {
                    count: 256,
                    cyclic: true
                },
                DacCall::StopStream,
            ]
        );
        assert_eq!(delay.total_ms(), 1000 + 1000 + 20_000);
    }

    #[tokio::test]
    async fn example_stops_at_first_failure() {
        let mut dac = MockDac::new();
        dac.fail_next = Some(DacError::Transport);
        let mut delay = MockDelay::new(BusLog::new());

        assert_eq!(
            run_example(&mut dac, &mut delay).await,
            Err(DacError::Transport)
        );
        assert!(dac.calls.is_empty());
        assert_eq!(delay.total_ns(), 0);
    }
}
