//! AD3552R register map (the subset this driver touches)
//!
//! Source: Analog Devices AD3552R datasheet, Rev. B.
//!
//! # Instruction byte
//!
//! Every SPI access starts with one instruction byte: bit 7 is the R/W flag
//! (1 = read), bits 6..0 the register address. Data follows MSB first.
//! 16-bit registers are written high byte first, at the register address and
//! the one after it.

// ---------------------------------------------------------------------------
// Instruction encoding
// ---------------------------------------------------------------------------

/// R/W flag in the instruction byte
pub const READ: u8 = 0x80;

/// Address bits of the instruction byte
pub const ADDR_MASK: u8 = 0x7F;

// ---------------------------------------------------------------------------
// Register addresses
// ---------------------------------------------------------------------------

/// Interface configuration A: soft reset lives here
pub const REG_INTERFACE_CONFIG_A: u8 = 0x00;

/// Interface configuration D: SDO drive strength bits [3:2]
pub const REG_INTERFACE_CONFIG_D: u8 = 0x14;

/// Scratch pad, free read/write
pub const REG_SCRATCH_PAD: u8 = 0x0A;

/// Output range, channel 0 in bits [3:0], channel 1 in bits [7:4]
pub const REG_CH0_CH1_OUTPUT_RANGE: u8 = 0x19;

/// Hardware-LDAC 16-bit DAC register block
pub const REG_HW_LDAC_16B: u8 = 0x28;

/// Software LDAC trigger (fast mode): one bit per channel
pub const REG_SW_LDAC_16B: u8 = 0x32;

// ---------------------------------------------------------------------------
// Per-channel 16-bit (fast mode) data registers
// ---------------------------------------------------------------------------

/// DAC register of channel 0
pub const REG_CH0_DAC_16B: u8 = 0x2A;
/// DAC register of channel 1
pub const REG_CH1_DAC_16B: u8 = 0x2C;
/// Input register of channel 0
pub const REG_CH0_INPUT_16B: u8 = 0x34;
/// Input register of channel 1
pub const REG_CH1_INPUT_16B: u8 = 0x36;

// ---------------------------------------------------------------------------
// Field values
// ---------------------------------------------------------------------------

/// INTERFACE_CONFIG_A: both soft-reset bits (7 and 0), self-clearing
pub const SOFT_RESET: u8 = 0x81;

/// Written to the scratch pad and expected back
pub const SCRATCH_PAD_TEST_VALUE: u8 = 0x5A;

/// SDO drive strength field shift in INTERFACE_CONFIG_D
pub const SDO_DRIVE_STRENGTH_SHIFT: u8 = 2;

/// Largest SDO drive strength code
pub const SDO_DRIVE_STRENGTH_MAX: u8 = 3;

// ---------------------------------------------------------------------------
// Timing
// ---------------------------------------------------------------------------

/// RESET_N low time
pub const RESET_PULSE_MS: u32 = 1;

/// Wait after reset before the interface is usable
pub const RESET_SETTLE_MS: u32 = 10;

/// LDAC_N low time (datasheet minimum is 10 ns)
pub const LDAC_PULSE_NS: u32 = 100;
