//! Analog Devices AD3552R dual-channel 16-bit DAC

pub mod registers;

mod driver;

pub use driver::Ad3552r;
