//! GPIO line abstraction layer
//!
//! Lines are addressed by their platform offset (Zynq PS GPIO numbering) and
//! owned exclusively between [`GpioController::acquire`] and
//! [`GpioLine::release`]. This mirrors the vendor HAL's get/configure/remove
//! lifecycle while letting the type system carry the ownership.

use crate::error::ErrorCode;

/// Line state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PinState {
    /// High (logic 1)
    High,
    /// Low (logic 0)
    Low,
}

impl From<bool> for PinState {
    fn from(value: bool) -> Self {
        if value {
            Self::High
        } else {
            Self::Low
        }
    }
}

impl From<PinState> for bool {
    fn from(value: PinState) -> Self {
        matches!(value, PinState::High)
    }
}

/// Line direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    /// Input (high impedance)
    Input,
    /// Push-pull output
    Output,
}

/// A GPIO controller that hands out lines by offset.
pub trait GpioController {
    /// Error type
    type Error: core::fmt::Debug + ErrorCode;

    /// Line handle type
    type Line: GpioLine<Error = Self::Error>;

    /// Take exclusive ownership of the line at `offset`.
    ///
    /// Fails if the offset does not exist or the line is already held.
    fn acquire(&mut self, offset: u32) -> Result<Self::Line, Self::Error>;
}

/// An acquired GPIO line.
pub trait GpioLine {
    /// Error type
    type Error: core::fmt::Debug + ErrorCode;

    /// Platform offset of this line.
    fn offset(&self) -> u32;

    /// Configure as input.
    fn set_direction_input(&mut self) -> Result<(), Self::Error>;

    /// Configure as output, driving `level` immediately.
    fn set_direction_output(&mut self, level: PinState) -> Result<(), Self::Error>;

    /// Drive the level of a line already configured as output.
    fn set_level(&mut self, level: PinState) -> Result<(), Self::Error>;

    /// Read the current level.
    fn level(&self) -> Result<PinState, Self::Error>;

    /// Give the line back to its controller.
    ///
    /// The line keeps its last direction and level.
    fn release(self);
}
