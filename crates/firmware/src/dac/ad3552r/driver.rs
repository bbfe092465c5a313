//! AD3552R driver
//!
//! Register access goes over [`embedded_hal_async::spi::SpiDevice`]. The
//! optional LDAC_N and RESET_N lines are acquired from a
//! [`platform::GpioController`] during [`Ad3552r::init`] and held until
//! [`DacDriver::remove`]. Sample streaming is delegated to a
//! [`platform::DmaChannel`] feeding the AXI DAC core.
//!
//! Only 16-bit fast mode is supported. CRC framing is not.

use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::spi::{Operation, SpiDevice};
use platform::error::{EBUSY, ENODEV};
use platform::{
    DacConfig, DmaChannel, ErrorCode, GpioController, GpioLine, PinState, Rejected, StreamBuffer,
};

use super::registers::*;
use crate::dac::{Channel, ChannelMask, DacDriver, DacError, SampleFrame, WriteMode};

/// AD3552R DAC driver
///
/// - `SPI`: async SPI device with the chip select of the DAC
/// - `L`: GPIO line type handed out by the board's controller
/// - `S`: DMA path into the AXI DAC core
/// - `D`: delay provider
pub struct Ad3552r<SPI, L, S, D> {
    spi: SPI,
    ldac: Option<L>,
    reset: Option<L>,
    stream: Option<S>,
    delay: D,
    enabled: u8,
    single_transfer: bool,
}

/// Reject configurations this driver cannot honour.
fn validate(config: &DacConfig, has_stream: bool) -> Result<(), DacError> {
    if config.crc_enabled {
        return Err(DacError::Unsupported);
    }
    if config.sdo_drive_strength > SDO_DRIVE_STRENGTH_MAX {
        return Err(DacError::InvalidArgument);
    }
    let chip_channels = config.chip_id.num_channels();
    let mut any_enabled = false;
    for (index, ch) in config.channels.iter().enumerate() {
        if !ch.enabled {
            continue;
        }
        if index >= chip_channels {
            return Err(DacError::InvalidArgument);
        }
        if !ch.fast_mode {
            return Err(DacError::Unsupported);
        }
        any_enabled = true;
    }
    if !any_enabled {
        return Err(DacError::InvalidArgument);
    }
    if config.axi.is_some() && !has_stream {
        return Err(DacError::InvalidArgument);
    }
    Ok(())
}

/// Acquire a line and drive it high (inactive).
fn acquire_inactive<G: GpioController>(gpio: &mut G, offset: u32) -> Result<G::Line, DacError> {
    let mut line = gpio.acquire(offset).map_err(|e| {
        error!("GPIO {} acquire failed: {}", offset, e.code());
        gpio_error(&e)
    })?;
    if let Err(e) = line.set_direction_output(PinState::High) {
        error!("GPIO {} configure failed: {}", offset, e.code());
        line.release();
        return Err(gpio_error(&e));
    }
    Ok(line)
}

fn gpio_error<E: ErrorCode>(e: &E) -> DacError {
    DacError::Gpio(e.code())
}

fn dma_error<E: ErrorCode>(e: &E) -> DacError {
    match e.code() {
        EBUSY => DacError::DmaBusy,
        ENODEV => DacError::DmaUnavailable,
        _ => DacError::Transport,
    }
}

const fn input_register(ch: Channel) -> u8 {
    match ch {
        Channel::Ch0 => REG_CH0_INPUT_16B,
        Channel::Ch1 => REG_CH1_INPUT_16B,
    }
}

const fn dac_register(ch: Channel) -> u8 {
    match ch {
        Channel::Ch0 => REG_CH0_DAC_16B,
        Channel::Ch1 => REG_CH1_DAC_16B,
    }
}

impl<SPI, L, S, D> Ad3552r<SPI, L, S, D>
where
    SPI: SpiDevice,
    L: GpioLine,
    S: DmaChannel,
    D: DelayNs,
{
    /// Bring the chip up.
    ///
    /// Validates `config`, takes the LDAC_N and RESET_N lines if configured,
    /// resets the chip, checks it answers on the bus, programs the output
    /// ranges and, with an AXI core present, its clock. Lines taken here are
    /// given back if any later step fails.
    pub async fn init<G>(
        spi: SPI,
        gpio: &mut G,
        stream: Option<S>,
        delay: D,
        config: &DacConfig,
    ) -> Result<Self, DacError>
    where
        G: GpioController<Line = L>,
    {
        validate(config, stream.is_some())?;

        let ldac = config
            .ldac_gpio
            .map(|offset| acquire_inactive(gpio, offset))
            .transpose()?;
        let reset = match config.reset_gpio.map(|offset| acquire_inactive(gpio, offset)) {
            Some(Err(e)) => {
                if let Some(line) = ldac {
                    line.release();
                }
                return Err(e);
            }
            other => other.transpose()?,
        };

        let mut enabled = 0u8;
        for ch in Channel::ALL {
            if config.channel_enabled(ch.index()) {
                enabled |= ch.mask().bits();
            }
        }

        let mut dac = Self {
            spi,
            ldac,
            reset,
            stream,
            delay,
            enabled,
            single_transfer: config.single_transfer,
        };

        match dac.bring_up(config).await {
            Ok(()) => {
                info!("AD3552R ready, channel mask {}", enabled);
                Ok(dac)
            }
            Err(e) => {
                error!("AD3552R init failed: {}", e.code());
                dac.release_lines();
                Err(e)
            }
        }
    }

    #[allow(clippy::arithmetic_side_effects)] // shifts of 4-bit codes within u8
    async fn bring_up(&mut self, config: &DacConfig) -> Result<(), DacError> {
        self.reset_chip().await?;

        self.write_reg(REG_SCRATCH_PAD, &[SCRATCH_PAD_TEST_VALUE])
            .await?;
        let readback = self.read_reg(REG_SCRATCH_PAD).await?;
        if readback != SCRATCH_PAD_TEST_VALUE {
            error!("AD3552R scratch pad read back {}", readback);
            return Err(DacError::NoDevice);
        }

        self.write_reg(
            REG_INTERFACE_CONFIG_D,
            &[config.sdo_drive_strength << SDO_DRIVE_STRENGTH_SHIFT],
        )
        .await?;

        let [ch0, ch1] = config.channels;
        let ranges = ch0.range.code() | (ch1.range.code() << 4);
        self.write_reg(REG_CH0_CH1_OUTPUT_RANGE, &[ranges]).await?;

        if let (Some(axi), Some(stream)) = (config.axi, self.stream.as_mut()) {
            stream
                .set_clock_rate(axi.clkgen_rate_hz)
                .map_err(|e| dma_error(&e))?;
            debug!("AXI clock generator at {} Hz", axi.clkgen_rate_hz);
        }
        Ok(())
    }

    async fn reset_chip(&mut self) -> Result<(), DacError> {
        if let Some(line) = self.reset.as_mut() {
            line.set_level(PinState::Low).map_err(|e| gpio_error(&e))?;
            self.delay.delay_ms(RESET_PULSE_MS).await;
            line.set_level(PinState::High).map_err(|e| gpio_error(&e))?;
        } else {
            self.write_reg(REG_INTERFACE_CONFIG_A, &[SOFT_RESET]).await?;
        }
        self.delay.delay_ms(RESET_SETTLE_MS).await;
        Ok(())
    }

    /// Write `data` starting at register `addr`.
    async fn write_reg(&mut self, addr: u8, data: &[u8]) -> Result<(), DacError> {
        let instr = addr & ADDR_MASK;
        let result = if self.single_transfer {
            let mut frame: heapless::Vec<u8, 3> = heapless::Vec::new();
            frame.push(instr).map_err(|_| DacError::InvalidArgument)?;
            frame
                .extend_from_slice(data)
                .map_err(|_| DacError::InvalidArgument)?;
            self.spi.write(&frame).await
        } else {
            self.spi
                .transaction(&mut [Operation::Write(&[instr]), Operation::Write(data)])
                .await
        };
        result.map_err(|_| DacError::Transport)
    }

    /// Read one byte from register `addr`.
    async fn read_reg(&mut self, addr: u8) -> Result<u8, DacError> {
        let instr = READ | (addr & ADDR_MASK);
        if self.single_transfer {
            let mut frame = [instr, 0];
            self.spi
                .transfer_in_place(&mut frame)
                .await
                .map_err(|_| DacError::Transport)?;
            let [_, value] = frame;
            Ok(value)
        } else {
            let mut value = [0u8];
            self.spi
                .transaction(&mut [Operation::Write(&[instr]), Operation::Read(&mut value)])
                .await
                .map_err(|_| DacError::Transport)?;
            let [value] = value;
            Ok(value)
        }
    }

    fn check_mask(&self, mask: ChannelMask) -> Result<(), DacError> {
        if mask.bits() & !self.enabled != 0 {
            return Err(DacError::InvalidChannelMask);
        }
        Ok(())
    }

    async fn pulse_ldac(&mut self, mask: ChannelMask) -> Result<(), DacError> {
        if let Some(line) = self.ldac.as_mut() {
            line.set_level(PinState::Low).map_err(|e| gpio_error(&e))?;
            self.delay.delay_ns(LDAC_PULSE_NS).await;
            line.set_level(PinState::High).map_err(|e| gpio_error(&e))
        } else {
            self.write_reg(REG_SW_LDAC_16B, &[mask.bits()]).await
        }
    }

    fn release_lines(self) {
        if let Some(line) = self.ldac {
            line.release();
        }
        if let Some(line) = self.reset {
            line.release();
        }
    }

    /// Words the DMA engine has moved since the last stream start.
    pub fn stream_transfer_count(&self) -> usize {
        self.stream.as_ref().map_or(0, DmaChannel::transfer_count)
    }
}

impl<SPI, L, S, D> DacDriver for Ad3552r<SPI, L, S, D>
where
    SPI: SpiDevice,
    L: GpioLine,
    S: DmaChannel,
    D: DelayNs,
{
    async fn write_samples(
        &mut self,
        frames: &[SampleFrame],
        mask: ChannelMask,
        mode: WriteMode,
    ) -> Result<(), DacError> {
        if frames.is_empty() {
            return Err(DacError::InvalidArgument);
        }
        self.check_mask(mask)?;
        if self.stream_busy() {
            return Err(DacError::DmaBusy);
        }

        for &[v0, v1] in frames {
            for ch in mask.channels() {
                let (addr, value) = match (mode, ch) {
                    (WriteMode::DacRegs, Channel::Ch0) => (dac_register(ch), v0),
                    (WriteMode::DacRegs, Channel::Ch1) => (dac_register(ch), v1),
                    (_, Channel::Ch0) => (input_register(ch), v0),
                    (_, Channel::Ch1) => (input_register(ch), v1),
                };
                self.write_reg(addr, &value.to_be_bytes()).await?;
            }
            if mode == WriteMode::InputRegsAndTriggerLdac {
                self.pulse_ldac(mask).await?;
            }
        }
        Ok(())
    }

    async fn trigger_ldac(&mut self, mask: ChannelMask) -> Result<(), DacError> {
        self.check_mask(mask)?;
        self.pulse_ldac(mask).await
    }

    async fn start_stream(
        &mut self,
        buffer: StreamBuffer,
        count: usize,
        cyclic: bool,
    ) -> Result<(), Rejected<DacError>> {
        let Some(stream) = self.stream.as_mut() else {
            return Err(Rejected::new(DacError::DmaUnavailable, buffer));
        };
        if buffer.window(count).is_none() {
            return Err(Rejected::new(DacError::InvalidArgument, buffer));
        }
        if stream.is_busy() {
            return Err(Rejected::new(DacError::DmaBusy, buffer));
        }
        stream
            .start(buffer, count, cyclic)
            .map_err(|rejected| rejected.map(|e| dma_error(&e)))?;
        debug!("stream started: {} words, cyclic {}", count, cyclic);
        Ok(())
    }

    async fn stop_stream(&mut self) -> Result<Option<StreamBuffer>, DacError> {
        match self.stream.as_mut() {
            Some(stream) => stream.stop().map_err(|e| dma_error(&e)),
            None => Ok(None),
        }
    }

    fn stream_busy(&self) -> bool {
        self.stream.as_ref().is_some_and(DmaChannel::is_busy)
    }

    async fn remove(mut self) -> Result<(), DacError> {
        let result = self.stop_stream().await.map(|_| ());
        self.release_lines();
        debug!("AD3552R removed");
        result
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects
)]
mod tests {
    use super::*;
    use crate::board::default_dac_config;
    use embedded_hal_mock::eh1::delay::NoopDelay;
    use embedded_hal_mock::eh1::spi::{Mock as SpiMock, Transaction as SpiTransaction};
    use platform::mocks::{BusLog, MockDmaChannel, MockGpioController, MockGpioLine, SimSpi};
    use platform::{ChannelConfig, ChipId};

    type TestDriver = Ad3552r<SpiMock<u8>, MockGpioLine, MockDmaChannel, NoopDelay>;

    const LDAC: u32 = 55;
    const RESET: u32 = 54;

    /// `SpiDevice::write(data)`: TransactionStart + Write(data) + TransactionEnd
    fn spi_device_write(data: &[u8]) -> [SpiTransaction<u8>; 3] {
        [
            SpiTransaction::transaction_start(),
            SpiTransaction::write_vec(data.to_vec()),
            SpiTransaction::transaction_end(),
        ]
    }

    /// Single-transfer register read answered with `value`.
    fn spi_device_read(addr: u8, value: u8) -> [SpiTransaction<u8>; 3] {
        [
            SpiTransaction::transaction_start(),
            SpiTransaction::transfer_in_place(vec![READ | addr, 0], vec![0, value]),
            SpiTransaction::transaction_end(),
        ]
    }

    /// SPI traffic of a successful init with the board config.
    fn init_expectations() -> Vec<SpiTransaction<u8>> {
        let mut t = Vec::new();
        t.extend(spi_device_write(&[REG_SCRATCH_PAD, SCRATCH_PAD_TEST_VALUE]));
        t.extend(spi_device_read(REG_SCRATCH_PAD, SCRATCH_PAD_TEST_VALUE));
        t.extend(spi_device_write(&[REG_INTERFACE_CONFIG_D, 1 << 2]));
        t.extend(spi_device_write(&[REG_CH0_CH1_OUTPUT_RANGE, 0x44]));
        t
    }

    async fn init_board(
        spi: &SpiMock<u8>,
        gpio: &mut MockGpioController,
        dma: &MockDmaChannel,
    ) -> TestDriver {
        Ad3552r::init(
            spi.clone(),
            gpio,
            Some(dma.clone()),
            NoopDelay,
            &default_dac_config(),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn init_resets_checks_scratch_pad_and_programs_ranges() {
        let log = BusLog::new();
        let mut gpio = MockGpioController::new(log.clone());
        let dma = MockDmaChannel::new(log.clone());
        let mut spi = SpiMock::new(&init_expectations());

        let dac = init_board(&spi, &mut gpio, &dma).await;

        assert!(gpio.is_held(LDAC));
        assert!(gpio.is_held(RESET));
        assert_eq!(dma.clock_hz(), Some(133_000_000));
        // RESET_N: driven high on acquire, then pulsed low and back high
        let reset_levels: Vec<_> = log
            .events()
            .into_iter()
            .filter_map(|e| match e {
                platform::mocks::BusEvent::GpioOutput { offset, level } if offset == RESET => {
                    Some(level)
                }
                _ => None,
            })
            .collect();
        assert_eq!(
            reset_levels,
            vec![PinState::High, PinState::Low, PinState::High]
        );

        dac.remove().await.unwrap();
        assert_eq!(gpio.held_count(), 0);
        spi.done();
    }

    #[tokio::test]
    async fn init_without_reset_line_uses_soft_reset() {
        let mut config = default_dac_config();
        config.reset_gpio = None;
        let mut expectations = Vec::new();
        expectations.extend(spi_device_write(&[REG_INTERFACE_CONFIG_A, SOFT_RESET]));
        expectations.extend(init_expectations());
        let mut spi = SpiMock::new(&expectations);
        let mut gpio = MockGpioController::new(BusLog::new());

        let dac: TestDriver = Ad3552r::init(
            spi.clone(),
            &mut gpio,
            Some(MockDmaChannel::default()),
            NoopDelay,
            &config,
        )
        .await
        .unwrap();

        dac.remove().await.unwrap();
        spi.done();
    }

    #[tokio::test]
    async fn scratch_pad_mismatch_is_no_device_and_releases_lines() {
        let mut expectations = Vec::new();
        expectations.extend(spi_device_write(&[REG_SCRATCH_PAD, SCRATCH_PAD_TEST_VALUE]));
        expectations.extend(spi_device_read(REG_SCRATCH_PAD, 0x00));
        let mut spi = SpiMock::new(&expectations);
        let mut gpio = MockGpioController::new(BusLog::new());

        let result: Result<TestDriver, _> = Ad3552r::init(
            spi.clone(),
            &mut gpio,
            Some(MockDmaChannel::default()),
            NoopDelay,
            &default_dac_config(),
        )
        .await;

        assert_eq!(result.err(), Some(DacError::NoDevice));
        assert_eq!(gpio.held_count(), 0);
        spi.done();
    }

    #[tokio::test]
    async fn spi_error_during_init_is_transport() {
        let spi = SimSpi::new(BusLog::new());
        spi.fail_from(0);
        let mut gpio = MockGpioController::new(BusLog::new());

        let result: Result<Ad3552r<SimSpi, MockGpioLine, MockDmaChannel, NoopDelay>, _> =
            Ad3552r::init(
                spi,
                &mut gpio,
                Some(MockDmaChannel::default()),
                NoopDelay,
                &default_dac_config(),
            )
            .await;

        assert_eq!(result.err(), Some(DacError::Transport));
        assert_eq!(gpio.held_count(), 0);
    }

    #[tokio::test]
    async fn reset_line_unavailable_releases_ldac() {
        let mut spi = SpiMock::new(&[]);
        let mut gpio = MockGpioController::new(BusLog::new());
        gpio.fail_acquire(RESET);

        let result: Result<TestDriver, _> = Ad3552r::init(
            spi.clone(),
            &mut gpio,
            Some(MockDmaChannel::default()),
            NoopDelay,
            &default_dac_config(),
        )
        .await;

        assert_eq!(result.err(), Some(DacError::Gpio(-5)));
        assert!(!gpio.is_held(LDAC));
        spi.done();
    }

    #[tokio::test]
    async fn busy_ldac_line_keeps_its_error_code() {
        let mut spi = SpiMock::new(&[]);
        let mut gpio = MockGpioController::new(BusLog::new());
        let taken = gpio.acquire(LDAC).unwrap();

        let result: Result<TestDriver, _> = Ad3552r::init(
            spi.clone(),
            &mut gpio,
            Some(MockDmaChannel::default()),
            NoopDelay,
            &default_dac_config(),
        )
        .await;

        let err = result.err().unwrap();
        assert_eq!(err, DacError::Gpio(-16));
        assert_eq!(err.code(), -16);
        assert!(!gpio.is_held(RESET), "RESET_N never taken");
        taken.release();
        spi.done();
    }

    #[tokio::test]
    async fn config_validation() {
        async fn try_init(config: &DacConfig, stream: Option<MockDmaChannel>) -> DacError {
            let mut spi = SpiMock::new(&[]);
            let mut gpio = MockGpioController::new(BusLog::new());
            let result: Result<TestDriver, _> =
                Ad3552r::init(spi.clone(), &mut gpio, stream, NoopDelay, config).await;
            spi.done();
            assert_eq!(gpio.acquisitions(), 0, "validation runs before any GPIO");
            result.err().unwrap()
        }

        let mut crc = default_dac_config();
        crc.crc_enabled = true;
        assert_eq!(try_init(&crc, Some(MockDmaChannel::default())).await, DacError::Unsupported);

        let mut precision = default_dac_config();
        precision.channels[0].fast_mode = false;
        assert_eq!(
            try_init(&precision, Some(MockDmaChannel::default())).await,
            DacError::Unsupported
        );

        let mut single = default_dac_config();
        single.chip_id = ChipId::Ad3551r;
        assert_eq!(
            try_init(&single, Some(MockDmaChannel::default())).await,
            DacError::InvalidArgument
        );

        let mut none = default_dac_config();
        none.channels = [ChannelConfig::DISABLED; 2];
        assert_eq!(
            try_init(&none, Some(MockDmaChannel::default())).await,
            DacError::InvalidArgument
        );

        assert_eq!(
            try_init(&default_dac_config(), None).await,
            DacError::InvalidArgument,
            "AXI config needs a stream engine"
        );
    }

    #[tokio::test]
    async fn input_write_with_ldac_pulses_line_once() {
        let log = BusLog::new();
        let mut gpio = MockGpioController::new(log.clone());
        let dma = MockDmaChannel::new(log.clone());
        let mut expectations = init_expectations();
        expectations.extend(spi_device_write(&[REG_CH0_INPUT_16B, 0xFF, 0xFE]));
        expectations.extend(spi_device_write(&[REG_CH1_INPUT_16B, 0x00, 0x00]));
        let mut spi = SpiMock::new(&expectations);

        let mut dac = init_board(&spi, &mut gpio, &dma).await;
        log.clear();

        dac.write_samples(
            &[[65534, 0]],
            ChannelMask::ALL,
            WriteMode::InputRegsAndTriggerLdac,
        )
        .await
        .unwrap();

        use platform::mocks::BusEvent;
        assert_eq!(
            log.without_delays(),
            vec![
                BusEvent::GpioOutput {
                    offset: LDAC,
                    level: PinState::Low
                },
                BusEvent::GpioOutput {
                    offset: LDAC,
                    level: PinState::High
                },
            ]
        );
        spi.done();
    }

    #[tokio::test]
    async fn software_ldac_without_line() {
        let mut config = default_dac_config();
        config.ldac_gpio = None;
        let mut expectations = init_expectations();
        expectations.extend(spi_device_write(&[REG_CH1_INPUT_16B, 0x12, 0x34]));
        expectations.extend(spi_device_write(&[REG_SW_LDAC_16B, 0b10]));
        let mut spi = SpiMock::new(&expectations);
        let mut gpio = MockGpioController::new(BusLog::new());

        let mut dac: TestDriver = Ad3552r::init(
            spi.clone(),
            &mut gpio,
            Some(MockDmaChannel::default()),
            NoopDelay,
            &config,
        )
        .await
        .unwrap();
        dac.write_samples(
            &[[0, 0x1234]],
            ChannelMask::CH1,
            WriteMode::InputRegsAndTriggerLdac,
        )
        .await
        .unwrap();
        spi.done();
    }

    #[tokio::test]
    async fn direct_write_hits_dac_registers() {
        let mut gpio = MockGpioController::new(BusLog::new());
        let dma = MockDmaChannel::default();
        let mut expectations = init_expectations();
        expectations.extend(spi_device_write(&[REG_CH0_DAC_16B, 0x00, 0x00]));
        expectations.extend(spi_device_write(&[REG_CH1_DAC_16B, 0xFF, 0xFE]));
        let mut spi = SpiMock::new(&expectations);

        let mut dac = init_board(&spi, &mut gpio, &dma).await;
        dac.write_samples(&[[0, 65534]], ChannelMask::ALL, WriteMode::DacRegs)
            .await
            .unwrap();
        spi.done();
    }

    #[tokio::test]
    async fn split_transfer_sends_instruction_then_data() {
        let mut config = default_dac_config();
        config.single_transfer = false;
        config.reset_gpio = None;
        config.ldac_gpio = None;
        config.axi = None;

        let expectations = [
            // soft reset
            SpiTransaction::transaction_start(),
            SpiTransaction::write_vec(vec![REG_INTERFACE_CONFIG_A]),
            SpiTransaction::write_vec(vec![SOFT_RESET]),
            SpiTransaction::transaction_end(),
            // scratch pad write
            SpiTransaction::transaction_start(),
            SpiTransaction::write_vec(vec![REG_SCRATCH_PAD]),
            SpiTransaction::write_vec(vec![SCRATCH_PAD_TEST_VALUE]),
            SpiTransaction::transaction_end(),
            // scratch pad read
            SpiTransaction::transaction_start(),
            SpiTransaction::write_vec(vec![READ | REG_SCRATCH_PAD]),
            SpiTransaction::read_vec(vec![SCRATCH_PAD_TEST_VALUE]),
            SpiTransaction::transaction_end(),
            // drive strength
            SpiTransaction::transaction_start(),
            SpiTransaction::write_vec(vec![REG_INTERFACE_CONFIG_D]),
            SpiTransaction::write_vec(vec![1 << 2]),
            SpiTransaction::transaction_end(),
            // ranges
            SpiTransaction::transaction_start(),
            SpiTransaction::write_vec(vec![REG_CH0_CH1_OUTPUT_RANGE]),
            SpiTransaction::write_vec(vec![0x44]),
            SpiTransaction::transaction_end(),
        ];
        let mut spi = SpiMock::new(&expectations);
        let mut gpio = MockGpioController::new(BusLog::new());

        let dac: TestDriver =
            Ad3552r::init(spi.clone(), &mut gpio, None, NoopDelay, &config)
                .await
                .unwrap();
        dac.remove().await.unwrap();
        spi.done();
    }

    #[tokio::test]
    async fn write_rejects_bad_arguments_without_bus_traffic() {
        let mut gpio = MockGpioController::new(BusLog::new());
        let dma = MockDmaChannel::default();
        let mut spi = SpiMock::new(&init_expectations());
        let mut dac = init_board(&spi, &mut gpio, &dma).await;

        assert_eq!(
            dac.write_samples(&[], ChannelMask::ALL, WriteMode::DacRegs).await,
            Err(DacError::InvalidArgument)
        );
        spi.done();
    }

    #[tokio::test]
    async fn disabled_channel_in_mask_rejected() {
        let mut config = default_dac_config();
        config.channels[1] = ChannelConfig::DISABLED;
        let mut expectations = init_expectations();
        // channel 1 range code 0 when disabled
        expectations.truncate(expectations.len() - 3);
        expectations.extend(spi_device_write(&[REG_CH0_CH1_OUTPUT_RANGE, 0x04]));
        let mut spi = SpiMock::new(&expectations);
        let mut gpio = MockGpioController::new(BusLog::new());

        let mut dac: TestDriver = Ad3552r::init(
            spi.clone(),
            &mut gpio,
            Some(MockDmaChannel::default()),
            NoopDelay,
            &config,
        )
        .await
        .unwrap();
        assert_eq!(
            dac.write_samples(&[[1, 1]], ChannelMask::ALL, WriteMode::DacRegs)
                .await,
            Err(DacError::InvalidChannelMask)
        );
        assert_eq!(dac.trigger_ldac(ChannelMask::CH1).await, Err(DacError::InvalidChannelMask));
        spi.done();
    }

    static WORDS: [u32; 8] = [0; 8];

    async fn start(dac: &mut TestDriver, count: usize, cyclic: bool) -> Result<(), DacError> {
        dac.start_stream(StreamBuffer::from(&WORDS), count, cyclic)
            .await
            .map_err(DacError::from)
    }

    #[tokio::test]
    async fn stream_lifecycle() {
        let mut gpio = MockGpioController::new(BusLog::new());
        let dma = MockDmaChannel::default();
        let mut spi = SpiMock::new(&init_expectations());
        let mut dac = init_board(&spi, &mut gpio, &dma).await;

        assert_eq!(
            start(&mut dac, 0, true).await,
            Err(DacError::InvalidArgument)
        );
        assert_eq!(
            start(&mut dac, 9, true).await,
            Err(DacError::InvalidArgument)
        );

        start(&mut dac, 4, true).await.unwrap();
        assert!(dac.stream_busy());
        assert_eq!(dma.last_words(), 4);
        assert!(dma.last_cyclic());
        assert_eq!(start(&mut dac, 4, true).await, Err(DacError::DmaBusy));
        assert_eq!(
            dac.write_samples(&[[0, 0]], ChannelMask::ALL, WriteMode::DacRegs)
                .await,
            Err(DacError::DmaBusy)
        );

        dac.stop_stream().await.unwrap();
        assert!(!dac.stream_busy());
        assert_eq!(dac.stream_transfer_count(), 4);

        start(&mut dac, 8, true).await.unwrap();
        dac.remove().await.unwrap();
        assert!(!dma.running(), "remove halts the stream");
        assert_eq!(gpio.held_count(), 0);
        spi.done();
    }

    #[tokio::test]
    async fn stream_start_failure_maps_to_transport() {
        let mut gpio = MockGpioController::new(BusLog::new());
        let dma = MockDmaChannel::default();
        dma.fail_start();
        let mut spi = SpiMock::new(&init_expectations());
        let mut dac = init_board(&spi, &mut gpio, &dma).await;

        assert_eq!(start(&mut dac, 8, false).await, Err(DacError::Transport));
        spi.done();
    }

    #[tokio::test]
    async fn lent_region_handed_back_on_stop_and_on_refusal() {
        let mut gpio = MockGpioController::new(BusLog::new());
        let dma = MockDmaChannel::default();
        let mut spi = SpiMock::new(&init_expectations());
        let mut dac = init_board(&spi, &mut gpio, &dma).await;
        let region: &'static mut [u32] = Box::leak(vec![0u32; 16].into_boxed_slice());
        region[..3].copy_from_slice(&[0x0001_0002, 0x0003_0004, 0x0005_0006]);

        dac.start_stream(StreamBuffer::Lent(region), 3, true)
            .await
            .unwrap();
        assert_eq!(dma.last_samples(), vec![0x0001_0002, 0x0003_0004, 0x0005_0006]);

        let refused = dac
            .start_stream(StreamBuffer::from(&WORDS), 4, true)
            .await
            .unwrap_err();
        assert_eq!(refused.error, DacError::DmaBusy);
        assert_eq!(refused.buffer, StreamBuffer::from(&WORDS));

        let region = dac
            .stop_stream()
            .await
            .unwrap()
            .and_then(StreamBuffer::into_lent)
            .unwrap();
        assert_eq!(region.len(), 16);
        assert!(!dma.holds_buffer());

        let refused = dac
            .start_stream(StreamBuffer::Lent(region), 17, false)
            .await
            .unwrap_err();
        assert_eq!(refused.error, DacError::InvalidArgument);
        assert_eq!(refused.buffer.len(), 16);
        spi.done();
    }

    #[tokio::test]
    async fn stream_without_engine_is_unavailable() {
        let mut config = default_dac_config();
        config.axi = None;
        let mut spi = SpiMock::new(&init_expectations());
        let mut gpio = MockGpioController::new(BusLog::new());
        let mut dac: TestDriver =
            Ad3552r::init(spi.clone(), &mut gpio, None, NoopDelay, &config)
                .await
                .unwrap();

        assert_eq!(start(&mut dac, 8, true).await, Err(DacError::DmaUnavailable));
        assert!(!dac.stream_busy());
        assert_eq!(dac.stop_stream().await, Ok(None));
        spi.done();
    }
}
