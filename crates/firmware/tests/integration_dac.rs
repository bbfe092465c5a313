//! Integration test: AD3552R driver end-to-end over the simulated register file.
//!
//! Tests that:
//!   1. Split instruction/data framing reaches the same register contents as
//!      single-transfer framing
//!   2. Without a RESET_N line the chip is soft-reset over SPI
//!   3. Without an LDAC_N line outputs are latched through the software LDAC
//!      register
//!   4. Channel masks are checked against the enabled channels
//!   5. Streaming blocks register writes, and one-shot streams drain
//!
//! Does NOT require physical hardware.
//!
//! Run with: cargo test -p firmware --test integration_dac

// Integration test file -- intentional test patterns permitted.
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects,
)]

use firmware::board::default_dac_config;
use firmware::dac::ad3552r::registers::{
    REG_CH0_CH1_OUTPUT_RANGE, REG_CH0_DAC_16B, REG_CH0_INPUT_16B, REG_CH1_DAC_16B,
    REG_CH1_INPUT_16B, REG_INTERFACE_CONFIG_A, REG_SW_LDAC_16B, SOFT_RESET,
};
use firmware::dac::{Ad3552r, ChannelMask, DacDriver, DacError, WriteMode};
use firmware::sequencer::{begin_stream, start_cyclic_stream};
use firmware::waveform::SINE_LUT_WORDS;
use platform::mocks::{
    BusEvent, BusLog, MockDelay, MockDmaChannel, MockGpioController, MockGpioLine, SimSpi,
};
use platform::{ChannelConfig, DacConfig, OutputRange, StreamBuffer};

type SimDac = Ad3552r<SimSpi, MockGpioLine, MockDmaChannel, MockDelay>;

struct Bench {
    log: BusLog,
    gpio: MockGpioController,
    spi: SimSpi,
    dma: MockDmaChannel,
    delay: MockDelay,
}

impl Bench {
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

    async fn init(&mut self, config: &DacConfig) -> Result<SimDac, DacError> {
        let stream = config.axi.map(|_| self.dma.clone());
        Ad3552r::init(
            self.spi.clone(),
            &mut self.gpio,
            stream,
            self.delay.clone(),
            config,
        )
        .await
    }

    fn spi_writes_to(&self, addr: u8) -> Vec<Vec<u8>> {
        self.log
            .events()
            .into_iter()
            .filter_map(|e| match e {
                BusEvent::SpiWrite { addr: a, data } if a == addr => Some(data),
                _ => None,
            })
            .collect()
    }
}

#[tokio::test]
async fn split_framing_matches_single_transfer() {
    let mut config = default_dac_config();
    config.single_transfer = false;
    config.channels[1].range = OutputRange::Zero5V;
    let mut bench = Bench::new();

    let mut dac = bench.init(&config).await.unwrap();
    dac.write_samples(&[[0x1234, 0xABCD]], ChannelMask::ALL, WriteMode::DacRegs)
        .await
        .unwrap();

    assert_eq!(bench.spi.register(REG_CH0_CH1_OUTPUT_RANGE), 0x14);
    assert_eq!(bench.spi.register_u16(REG_CH0_DAC_16B), 0x1234);
    assert_eq!(bench.spi.register_u16(REG_CH1_DAC_16B), 0xABCD);
    dac.remove().await.unwrap();
}

#[tokio::test]
async fn soft_reset_without_reset_line() {
    let mut config = default_dac_config();
    config.reset_gpio = None;
    let mut bench = Bench::new();

    let dac = bench.init(&config).await.unwrap();

    assert_eq!(
        bench.spi_writes_to(REG_INTERFACE_CONFIG_A),
        vec![vec![SOFT_RESET]]
    );
    assert_eq!(bench.gpio.held_count(), 1, "only LDAC_N taken");
    // settle only, no reset pulse
    assert_eq!(bench.delay.total_ms(), 10);
    dac.remove().await.unwrap();
    assert_eq!(bench.gpio.held_count(), 0);
}

#[tokio::test]
async fn software_ldac_without_ldac_line() {
    let mut config = default_dac_config();
    config.ldac_gpio = None;
    let mut bench = Bench::new();

    let mut dac = bench.init(&config).await.unwrap();
    dac.write_samples(
        &[[100, 200], [300, 400]],
        ChannelMask::ALL,
        WriteMode::InputRegsAndTriggerLdac,
    )
    .await
    .unwrap();

    assert_eq!(
        bench.spi_writes_to(REG_SW_LDAC_16B),
        vec![vec![0x03], vec![0x03]],
        "one software LDAC per frame"
    );
    assert_eq!(bench.spi.register_u16(REG_CH0_INPUT_16B), 300);
    assert_eq!(bench.spi.register_u16(REG_CH1_INPUT_16B), 400);
    dac.remove().await.unwrap();
}

#[tokio::test]
async fn mask_checked_against_enabled_channels() {
    let mut config = default_dac_config();
    config.channels[1] = ChannelConfig::DISABLED;
    let mut bench = Bench::new();

    let mut dac = bench.init(&config).await.unwrap();
    let before = bench.spi.transactions();

    assert_eq!(
        dac.write_samples(&[[1, 2]], ChannelMask::ALL, WriteMode::DacRegs)
            .await,
        Err(DacError::InvalidChannelMask)
    );
    assert_eq!(bench.spi.transactions(), before, "nothing written");

    dac.write_samples(&[[1, 2]], ChannelMask::CH0, WriteMode::DacRegs)
        .await
        .unwrap();
    assert_eq!(bench.spi.register_u16(REG_CH0_DAC_16B), 1);
    assert_eq!(bench.spi.register_u16(REG_CH1_DAC_16B), 0);
    dac.remove().await.unwrap();
}

#[tokio::test]
async fn writes_blocked_while_streaming() {
    let mut bench = Bench::new();
    let mut dac = bench.init(&default_dac_config()).await.unwrap();

    begin_stream(&mut dac, &SINE_LUT_WORDS, 128, true)
        .await
        .unwrap()
        .detach();

    assert_eq!(bench.dma.last_words(), 128);
    assert_eq!(
        dac.write_samples(&[[0, 0]], ChannelMask::ALL, WriteMode::DacRegs)
            .await,
        Err(DacError::DmaBusy)
    );
    assert_eq!(
        dac.start_stream(StreamBuffer::from(&SINE_LUT_WORDS), 256, true)
            .await
            .map_err(DacError::from),
        Err(DacError::DmaBusy)
    );

    dac.remove().await.unwrap();
    assert!(!bench.dma.running(), "remove halts the stream");
}

#[tokio::test]
async fn one_shot_stream_drains() {
    let mut bench = Bench::new();
    let mut dac = bench.init(&default_dac_config()).await.unwrap();
    bench.dma.complete_after_polls(5);
    let settle_ms = bench.delay.total_ms();

    start_cyclic_stream(&mut dac, &mut bench.delay, &SINE_LUT_WORDS, 64, false, 0)
        .await
        .unwrap();

    assert!(!bench.dma.running());
    assert_eq!(dac.stream_transfer_count(), 64);
    assert!(bench.delay.total_ms() - settle_ms < 10);
    dac.remove().await.unwrap();
}

#[tokio::test]
async fn stream_without_dma_is_unavailable() {
    let mut config = default_dac_config();
    config.axi = None;
    let mut bench = Bench::new();

    let mut dac = bench.init(&config).await.unwrap();

    assert_eq!(
        dac.start_stream(StreamBuffer::from(&SINE_LUT_WORDS), 256, true)
            .await
            .map_err(DacError::from),
        Err(DacError::DmaUnavailable)
    );
    assert_eq!(bench.dma.clock_hz(), None);
    dac.remove().await.unwrap();
}
