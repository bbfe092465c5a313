//! AD3552R FMC demonstrator firmware
//!
//! Brings up an AD3552R dual-channel 16-bit DAC sitting behind an AXI-QSPI
//! controller on a Xilinx FPGA board, then either runs a short standalone
//! example or hands the DAC to an IIO remote-control server.
//!
//! # Architecture
//!
//! ```text
//! Application Layer (app, sequencer, iio)
//!         ↓
//! Device Driver (dac::ad3552r)
//!         ↓
//! Board tables (board, gpio_bank)
//!         ↓
//! Platform traits (platform crate: GPIO, SPI, DMA, IIO server)
//! ```
//!
//! # Features
//!
//! - `iio` - Hand the DAC to the IIO server instead of running the example
//! - `defmt` - Log through defmt (embedded target)
//! - `tracing` - Log through tracing (host builds)
//! - `simulator` - Desktop binary running against `platform::mocks`
//! - `std` - Enable standard library (simulator and testing)
//!
//! # Examples
//!
//! ```bash
//! RUST_LOG=info cargo run -p firmware --features simulator
//! RUST_LOG=info cargo run -p firmware --features simulator,iio
//! ```

#![cfg_attr(all(not(test), not(feature = "std")), no_std)]
// Upgrade relevant warns to deny; keep pedantic as warn (too noisy for firmware)
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Critical correctness: deny these
#![deny(clippy::await_holding_lock)] // holding a blocking Mutex across .await is a bug
#![deny(unsafe_op_in_unsafe_fn)]
// unsafe fn body is not implicitly unsafe block
// Logging discipline (allow println in tests via clippy.toml)
#![warn(clippy::print_stdout)] // prefer tracing/defmt over println! in lib code
#![warn(clippy::dbg_macro)] // dbg! should not be left in committed code
// Intentional allows for this codebase:
#![allow(clippy::module_name_repetitions)] // common in Rust crates; not a real issue
#![allow(clippy::missing_errors_doc)] // most errors are self-explanatory
#![allow(async_fn_in_trait)] // single-threaded executors, Send bounds not needed
// Pedantic lints too noisy for firmware application code:
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::unused_async)]

#[macro_use]
mod fmt;

pub mod app;
pub mod board;
pub mod dac;
pub mod gpio_bank;
pub mod iio;
pub mod sequencer;
pub mod waveform;

// Re-export key types
pub use app::{AppMode, Board, ServerMode, StartupError, StartupStage};
pub use board::{default_dac_config, GpioLineId, LineDefault, GPIO_OFFSET};
pub use dac::{Ad3552r, Channel, ChannelMask, DacDriver, DacError, MockDac, WriteMode};
pub use iio::IioDac;
pub use sequencer::CyclicStream;
pub use waveform::{SINE_LUT_16, SINE_LUT_WORDS};
