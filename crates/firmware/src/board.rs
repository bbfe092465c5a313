//! Board description for the AD3552R FMC card on a Zynq-7000 carrier.
//!
//! Everything here is pure data: the GPIO line map and its power-on defaults,
//! the DAC configuration, and the UART the IIO server listens on.
//!
//! # GPIO map
//!
//! The FMC card's control lines sit on consecutive EMIO lines starting at
//! [`GPIO_OFFSET`]:
//!
//! | Index | Line     | Default      |
//! |-------|----------|--------------|
//! | 0     | RESET_N  | output, high |
//! | 1     | LDAC_N   | output, high |
//! | 2     | SPI_QPI  | output, low  |
//! | 3     | ALERT_N  | input        |
//! | 4     | GPIO_9   | output, high |
//! | 5     | RED      | output, high |
//! | 6     | GREEN    | output, high |
//! | 7     | BLUE     | output, high |
//!
//! The LEDs are active low, so "high" means off.

use platform::{
    AxiConfig, BitOrder, ChannelConfig, ChipId, DacConfig, OutputRange, PinState, SpiConfig,
    SpiMode, TransportExtra, UartConfig, XilinxSpiKind,
};

/// First EMIO line of the FMC control bank (after the 54 MIO lines).
pub const GPIO_OFFSET: u32 = 54;

/// Number of lines in the FMC control bank.
pub const TOTAL_GPIOS: usize = 8;

/// AXI-QSPI controller instance.
pub const SPI_DEVICE_ID: u32 = 0;

/// PS UART instance used by the IIO server.
pub const UART_DEVICE_ID: u32 = 0;

/// Clock generator rate for the AXI AD3552R core: 133 MHz.
pub const AXI_CLKGEN_RATE_HZ: u32 = 133_000_000;

/// SPI clock: 66 MHz.
pub const SPI_MAX_SPEED_HZ: u32 = 66_000_000;

/// AXI AD3552R DAC core
pub const DAC_CORE_BASEADDR: usize = 0x44A7_0000;
/// AXI-DMAC feeding the DAC core
pub const DMAC_BASEADDR: usize = 0x7C42_0000;
/// AXI clock generator
pub const CLKGEN_BASEADDR: usize = 0x44B0_0000;

/// Words in the IIO server's write buffer (two 16-bit samples each).
pub const IIO_WRITE_BUFFER_WORDS: usize = 4096;

/// Lines of the FMC control bank, in bank order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GpioLineId {
    /// DAC hardware reset, active low
    ResetN,
    /// DAC load strobe, active low
    LdacN,
    /// SPI (low) or QSPI (high) interface select
    SpiQpi,
    /// DAC alert output, active low
    AlertN,
    /// Spare line on the FMC connector
    Spare9,
    /// Red status LED, active low
    Red,
    /// Green status LED, active low
    Green,
    /// Blue status LED, active low
    Blue,
}

/// Power-on setting of a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LineDefault {
    /// High-impedance input
    Input,
    /// Output driving the given level
    Output(PinState),
}

impl GpioLineId {
    /// Every line, in bank order.
    pub const ALL: [Self; TOTAL_GPIOS] = [
        Self::ResetN,
        Self::LdacN,
        Self::SpiQpi,
        Self::AlertN,
        Self::Spare9,
        Self::Red,
        Self::Green,
        Self::Blue,
    ];

    /// Position within the bank.
    pub const fn index(self) -> u32 {
        match self {
            Self::ResetN => 0,
            Self::LdacN => 1,
            Self::SpiQpi => 2,
            Self::AlertN => 3,
            Self::Spare9 => 4,
            Self::Red => 5,
            Self::Green => 6,
            Self::Blue => 7,
        }
    }

    /// Platform GPIO offset.
    #[allow(clippy::arithmetic_side_effects)] // index() < 8, far from u32::MAX
    pub const fn offset(self) -> u32 {
        GPIO_OFFSET + self.index()
    }

    /// Power-on default.
    pub const fn default_state(self) -> LineDefault {
        match self {
            Self::SpiQpi => LineDefault::Output(PinState::Low),
            Self::AlertN => LineDefault::Input,
            Self::ResetN
            | Self::LdacN
            | Self::Spare9
            | Self::Red
            | Self::Green
            | Self::Blue => LineDefault::Output(PinState::High),
        }
    }

    /// Short name as printed on the schematic.
    pub const fn name(self) -> &'static str {
        match self {
            Self::ResetN => "RESET_N",
            Self::LdacN => "LDAC_N",
            Self::SpiQpi => "SPI_QPI",
            Self::AlertN => "ALERT_N",
            Self::Spare9 => "GPIO_9",
            Self::Red => "RED",
            Self::Green => "GREEN",
            Self::Blue => "BLUE",
        }
    }
}

/// DAC configuration for the FMC card: both channels at ±10 V in fast mode,
/// driven through the AXI-QSPI core with DMA streaming.
pub const fn default_dac_config() -> DacConfig {
    let channel = ChannelConfig {
        enabled: true,
        range: OutputRange::Neg10To10V,
        fast_mode: true,
    };
    DacConfig {
        chip_id: ChipId::Ad3552r,
        spi: SpiConfig {
            device_id: SPI_DEVICE_ID,
            chip_select: 0,
            max_speed_hz: SPI_MAX_SPEED_HZ,
            mode: SpiMode::Mode0,
            bit_order: BitOrder::MsbFirst,
            extra: TransportExtra::XilinxSpi {
                kind: XilinxSpiKind::Pl,
                flags: 0,
            },
        },
        ldac_gpio: Some(GpioLineId::LdacN.offset()),
        reset_gpio: Some(GpioLineId::ResetN.offset()),
        sdo_drive_strength: 1,
        channels: [channel, channel],
        crc_enabled: false,
        // The Zed carrier needs instruction and data in one transfer.
        single_transfer: true,
        axi: Some(AxiConfig {
            clkgen_rate_hz: AXI_CLKGEN_RATE_HZ,
            dac_core_base: DAC_CORE_BASEADDR,
            dmac_base: DMAC_BASEADDR,
            clkgen_base: CLKGEN_BASEADDR,
        }),
    }
}

/// UART the IIO server listens on.
pub const fn iio_uart_config() -> UartConfig {
    UartConfig::console(UART_DEVICE_ID)
}

#[cfg(test)]
#[allow(clippy::arithmetic_side_effects)]
mod tests {
    use super::*;

    #[test]
    fn offsets_are_contiguous_from_gpio_offset() {
        for (i, line) in GpioLineId::ALL.iter().enumerate() {
            assert_eq!(line.index() as usize, i);
            assert_eq!(line.offset(), GPIO_OFFSET + i as u32);
        }
    }

    #[test]
    fn only_spi_qpi_low_and_alert_input() {
        for line in GpioLineId::ALL {
            let expected = match line {
                GpioLineId::SpiQpi => LineDefault::Output(PinState::Low),
                GpioLineId::AlertN => LineDefault::Input,
                _ => LineDefault::Output(PinState::High),
            };
            assert_eq!(line.default_state(), expected, "{}", line.name());
        }
    }

    #[test]
    fn default_config_matches_board() {
        let cfg = default_dac_config();
        assert_eq!(cfg.chip_id, ChipId::Ad3552r);
        assert_eq!(cfg.spi.max_speed_hz, 66_000_000);
        assert_eq!(cfg.spi.mode, SpiMode::Mode0);
        assert!(cfg.single_transfer);
        assert!(!cfg.crc_enabled);
        assert_eq!(cfg.ldac_gpio, Some(55));
        assert_eq!(cfg.reset_gpio, Some(54));
        assert_eq!(cfg.axi.map(|a| a.clkgen_rate_hz), Some(133_000_000));
        for ch in cfg.channels {
            assert!(ch.enabled && ch.fast_mode);
            assert_eq!(ch.range, OutputRange::Neg10To10V);
        }
    }

    #[test]
    fn iio_uart_is_115200_8n1() {
        assert_eq!(iio_uart_config().baud_rate, 115_200);
    }
}
