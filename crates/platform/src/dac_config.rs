//! AD35xxR DAC configuration record.
//!
//! Pure data: built once at startup, passed by reference into driver
//! initialisation, never mutated. No hardware is touched here, so every field
//! is host-testable.
//!
//! # Output ranges
//!
//! | Range        | Register code |
//! |--------------|---------------|
//! | 0 V … 2.5 V  | 0             |
//! | 0 V … 5 V    | 1             |
//! | 0 V … 10 V   | 2             |
//! | −5 V … +5 V  | 3             |
//! | −10 V … +10 V| 4             |

use crate::peripheral::SpiConfig;

/// Members of the AD354xR / AD355xR family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChipId {
    /// Single channel, 16-bit
    Ad3541r,
    /// Dual channel, 16-bit
    Ad3542r,
    /// Single channel, 16-bit, 33 MUPS
    Ad3551r,
    /// Dual channel, 16-bit, 33 MUPS
    Ad3552r,
}

impl ChipId {
    /// Number of DAC channels on the chip.
    pub const fn num_channels(self) -> usize {
        match self {
            Self::Ad3541r | Self::Ad3551r => 1,
            Self::Ad3542r | Self::Ad3552r => 2,
        }
    }
}

/// Channel output voltage span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OutputRange {
    /// 0 V to 2.5 V
    Zero2V5,
    /// 0 V to 5 V
    Zero5V,
    /// 0 V to 10 V
    Zero10V,
    /// −5 V to +5 V
    Neg5To5V,
    /// −10 V to +10 V
    Neg10To10V,
}

impl OutputRange {
    /// 4-bit code written to the output-range register.
    pub const fn code(self) -> u8 {
        match self {
            Self::Zero2V5 => 0,
            Self::Zero5V => 1,
            Self::Zero10V => 2,
            Self::Neg5To5V => 3,
            Self::Neg10To10V => 4,
        }
    }
}

/// Per-channel settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChannelConfig {
    /// Channel powered and accepting samples
    pub enabled: bool,
    /// Output span
    pub range: OutputRange,
    /// 16-bit fast mode (as opposed to 24-bit precision mode)
    pub fast_mode: bool,
}

impl ChannelConfig {
    /// A disabled channel.
    pub const DISABLED: Self = Self {
        enabled: false,
        range: OutputRange::Zero2V5,
        fast_mode: false,
    };
}

/// AXI controller settings, present when the DAC sits behind the AXI
/// AD3552R core instead of a plain SPI master.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AxiConfig {
    /// Clock generator output rate in Hz
    pub clkgen_rate_hz: u32,
    /// Base address of the AXI AD3552R DAC core
    pub dac_core_base: usize,
    /// Base address of the AXI-DMAC
    pub dmac_base: usize,
    /// Base address of the AXI clock generator
    pub clkgen_base: usize,
}

/// Complete DAC configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DacConfig {
    /// Chip variant
    pub chip_id: ChipId,
    /// SPI transport parameters
    pub spi: SpiConfig,
    /// GPIO offset of the LDAC_N line, if wired
    pub ldac_gpio: Option<u32>,
    /// GPIO offset of the RESET_N line, if wired
    pub reset_gpio: Option<u32>,
    /// SDO pad drive strength (0..=3)
    pub sdo_drive_strength: u8,
    /// Channel 0 and channel 1 settings
    pub channels: [ChannelConfig; 2],
    /// Append CRC-8 to every SPI frame
    pub crc_enabled: bool,
    /// Instruction and data must travel in one SPI transfer
    pub single_transfer: bool,
    /// AXI controller parameters (`None` = plain SPI master)
    pub axi: Option<AxiConfig>,
}

impl DacConfig {
    /// Settings of `channel`, or `None` past the end of the table.
    pub fn channel(&self, channel: usize) -> Option<&ChannelConfig> {
        self.channels.get(channel)
    }

    /// `true` if `channel` exists on the chip and is enabled.
    pub fn channel_enabled(&self, channel: usize) -> bool {
        channel < self.chip_id.num_channels()
            && self.channel(channel).is_some_and(|ch| ch.enabled)
    }
}

#[cfg(test)]
#[allow(clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::peripheral::{BitOrder, SpiMode, TransportExtra};

    fn config(chip_id: ChipId) -> DacConfig {
        let ch = ChannelConfig {
            enabled: true,
            range: OutputRange::Neg10To10V,
            fast_mode: true,
        };
        DacConfig {
            chip_id,
            spi: SpiConfig {
                device_id: 0,
                chip_select: 0,
                max_speed_hz: 66_000_000,
                mode: SpiMode::Mode0,
                bit_order: BitOrder::MsbFirst,
                extra: TransportExtra::None,
            },
            ldac_gpio: None,
            reset_gpio: None,
            sdo_drive_strength: 1,
            channels: [ch, ch],
            crc_enabled: false,
            single_transfer: true,
            axi: None,
        }
    }

    #[test]
    fn single_channel_chip_hides_channel_one() {
        let cfg = config(ChipId::Ad3551r);
        assert!(cfg.channel_enabled(0));
        assert!(!cfg.channel_enabled(1), "AD3551R has no channel 1");
    }

    #[test]
    fn dual_channel_chip_respects_enable_flag() {
        let mut cfg = config(ChipId::Ad3552r);
        assert!(cfg.channel_enabled(1));
        cfg.channels[1] = ChannelConfig::DISABLED;
        assert!(!cfg.channel_enabled(1));
        assert!(!cfg.channel_enabled(2));
    }

    #[test]
    fn range_codes_match_register_encoding() {
        assert_eq!(OutputRange::Zero2V5.code(), 0);
        assert_eq!(OutputRange::Neg10To10V.code(), 4);
    }
}
