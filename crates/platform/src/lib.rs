//! Hardware collaborator interfaces for the AD3552R FMC demonstrator
//!
//! This crate provides trait-based abstractions for every piece of hardware
//! the demonstrator talks to, so that the application and the DAC driver can
//! be developed and tested without the FPGA board.
//!
//! # Architecture Layers
//!
//! ```text
//! Application Layer (firmware crate: app, sequencer, IIO adapter)
//!         ↓
//! Device Driver (firmware crate: AD3552R)
//!         ↓
//! Platform interfaces (this crate - traits + pure-data config)
//!         ↓
//! Vendor HAL (AXI-QSPI, PS GPIO, AXI-DMAC, clock generator, IIO server)
//! ```
//!
//! # Interfaces
//!
//! - [`gpio`] - Line acquisition by platform offset, direction and level control
//! - [`peripheral`] - SPI and UART transport configuration
//! - [`dma`] - DMA channel feeding the AXI DAC core, plus its clock generator
//! - [`iio`] - IIO server and device contracts for the remote-control build
//! - [`dac_config`] - Immutable DAC configuration record
//! - [`error`] - Numeric error codes shared by all collaborators
//!
//! SPI transfers and delays use the `embedded-hal-async` traits directly.
//!
//! # Features
//!
//! - `std`: Enable standard library support and the [`mocks`] module
//! - `defmt`: Enable `defmt::Format` derives
//!
//! # Example
//!
//! ```no_run
//! use platform::gpio::{GpioController, GpioLine, PinState};
//!
//! fn led_off<G: GpioController>(gpio: &mut G, offset: u32) -> Result<(), G::Error> {
//!     let mut line = gpio.acquire(offset)?;
//!     line.set_direction_output(PinState::High)?;
//!     line.release();
//!     Ok(())
//! }
//! ```

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)] // no .unwrap() in production code
#![deny(clippy::expect_used)] // no .expect() in production code
#![deny(clippy::panic)] // no panic!() in production code
#![deny(clippy::unreachable)] // no unreachable!() that isn't documented
#![deny(unused_must_use)]
// all Results must be handled
// ────────────────────────────────────────────────────────────────────────────
#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(unsafe_op_in_unsafe_fn)] // unsafe fn body is not implicitly unsafe block
#![warn(clippy::print_stdout)] // prefer tracing/defmt over println! in lib code
// Pedantic lints suppressed for this hardware HAL crate:
#![allow(clippy::doc_markdown)] // hex addresses and register names in doc comments
#![allow(clippy::must_use_candidate)] // hardware accessors, callers decide
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(async_fn_in_trait)] // single-threaded executors, Send bounds not needed

pub mod dac_config;
pub mod dma;
pub mod error;
pub mod gpio;
pub mod iio;
pub mod peripheral;

#[cfg(any(test, feature = "std"))]
pub mod mocks;

// Re-export configuration types
pub use dac_config::{AxiConfig, ChannelConfig, ChipId, DacConfig, OutputRange};

// Re-export GPIO types
pub use gpio::{Direction, GpioController, GpioLine, PinState};

// Re-export peripheral types
pub use peripheral::{
    BitOrder, DataBits, Parity, SpiConfig, SpiMode, StopBits, TransportExtra, UartConfig,
    XilinxSpiKind,
};

// Re-export DMA types
pub use dma::{DmaChannel, Rejected, StreamBuffer};

// Re-export error types
pub use error::{ErrorCode, HalError};

// Re-export IIO types
pub use iio::{IioAppDevice, IioAppInitParam, IioChannel, IioDevice, IioServer, NoServer};
