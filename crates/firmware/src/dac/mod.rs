//! DAC driver abstractions
//!
//! - `ad3552r` - AD3552R driver over async SPI, GPIO and the DMA path
//! - `mock` - In-process mock for host tests (always available)

pub mod ad3552r;
pub mod mock;

pub use ad3552r::Ad3552r;
pub use mock::MockDac;

use platform::error::{EBUSY, EINVAL, EIO, ENODEV, ENOTSUP, ETIMEDOUT};
use platform::{ErrorCode, Rejected, StreamBuffer};

/// One value per channel: `[channel 0, channel 1]`.
pub type SampleFrame = [u16; 2];

/// DAC channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Channel {
    /// Channel 0
    Ch0,
    /// Channel 1
    Ch1,
}

impl Channel {
    /// Both channels, in order.
    pub const ALL: [Self; 2] = [Self::Ch0, Self::Ch1];

    /// Zero-based channel number.
    pub const fn index(self) -> usize {
        match self {
            Self::Ch0 => 0,
            Self::Ch1 => 1,
        }
    }

    /// Channel for a zero-based number.
    pub const fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Self::Ch0),
            1 => Some(Self::Ch1),
            _ => None,
        }
    }

    /// Single-channel mask.
    pub const fn mask(self) -> ChannelMask {
        match self {
            Self::Ch0 => ChannelMask::CH0,
            Self::Ch1 => ChannelMask::CH1,
        }
    }
}

/// Set of channels an operation applies to. Bit 0 is channel 0, bit 1 is
/// channel 1. Never empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChannelMask(u8);

impl ChannelMask {
    /// Channel 0 only
    pub const CH0: Self = Self(0b01);
    /// Channel 1 only
    pub const CH1: Self = Self(0b10);
    /// Both channels
    pub const ALL: Self = Self(0b11);

    /// Validate a raw mask: empty masks and bits above channel 1 are rejected.
    pub const fn from_bits(bits: u8) -> Result<Self, DacError> {
        if bits == 0 || bits & !Self::ALL.0 != 0 {
            Err(DacError::InvalidChannelMask)
        } else {
            Ok(Self(bits))
        }
    }

    /// Raw bits
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// `true` if `channel` is in the set.
    pub const fn contains(self, channel: Channel) -> bool {
        self.0 & channel.mask().0 != 0
    }

    /// Channels in the set, lowest first.
    pub fn channels(self) -> impl Iterator<Item = Channel> {
        Channel::ALL.into_iter().filter(move |&ch| self.contains(ch))
    }
}

/// Where [`DacDriver::write_samples`] puts each value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WriteMode {
    /// DAC registers: the output updates immediately.
    DacRegs,
    /// Input registers only: the output holds until the next LDAC.
    InputRegs,
    /// Input registers, then one LDAC assertion per frame.
    InputRegsAndTriggerLdac,
}

/// DAC driver errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DacError {
    /// SPI transfer failed
    Transport,
    /// Control line could not be acquired or driven; carries the GPIO
    /// controller's error code
    Gpio(i32),
    /// Mask empty, out of range or naming a disabled channel
    InvalidChannelMask,
    /// Other argument out of range
    InvalidArgument,
    /// A stream is already running
    DmaBusy,
    /// No DMA path configured
    DmaUnavailable,
    /// Chip did not echo the scratch-pad test value
    NoDevice,
    /// Hardware did not finish in time
    Timeout,
    /// Configuration asks for something this driver does not do
    Unsupported,
}

impl ErrorCode for DacError {
    fn code(&self) -> i32 {
        match self {
            Self::Transport => EIO,
            Self::Gpio(code) => *code,
            Self::InvalidChannelMask | Self::InvalidArgument => EINVAL,
            Self::DmaBusy => EBUSY,
            Self::DmaUnavailable | Self::NoDevice => ENODEV,
            Self::Timeout => ETIMEDOUT,
            Self::Unsupported => ENOTSUP,
        }
    }
}

impl core::fmt::Display for DacError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Transport => write!(f, "SPI transport error"),
            Self::Gpio(code) => write!(f, "GPIO control line error {}", code),
            Self::InvalidChannelMask => write!(f, "invalid channel mask"),
            Self::InvalidArgument => write!(f, "invalid argument"),
            Self::DmaBusy => write!(f, "stream already running"),
            Self::DmaUnavailable => write!(f, "no DMA stream engine"),
            Self::NoDevice => write!(f, "DAC not responding"),
            Self::Timeout => write!(f, "timed out waiting for hardware"),
            Self::Unsupported => write!(f, "unsupported configuration"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for DacError {}

impl From<Rejected<DacError>> for DacError {
    fn from(rejected: Rejected<DacError>) -> Self {
        rejected.error
    }
}

/// Operations the sequencer and the IIO adapter need from a DAC.
pub trait DacDriver {
    /// Write `frames` to the masked channels.
    ///
    /// Fails with [`DacError::DmaBusy`] while a stream is running.
    async fn write_samples(
        &mut self,
        frames: &[SampleFrame],
        mask: ChannelMask,
        mode: WriteMode,
    ) -> Result<(), DacError>;

    /// Copy the masked channels' input registers to their outputs.
    async fn trigger_ldac(&mut self, mask: ChannelMask) -> Result<(), DacError>;

    /// Stream the first `count` words of `buffer` through DMA.
    ///
    /// The buffer stays with the driver until [`stop_stream`](Self::stop_stream).
    /// On failure it is handed back inside the error.
    async fn start_stream(
        &mut self,
        buffer: StreamBuffer,
        count: usize,
        cyclic: bool,
    ) -> Result<(), Rejected<DacError>>;

    /// Halt a running stream and hand back its buffer. Only returns a
    /// finished stream's buffer when idle.
    async fn stop_stream(&mut self) -> Result<Option<StreamBuffer>, DacError>;

    /// `true` while a stream is in flight.
    fn stream_busy(&self) -> bool;

    /// Stop any stream and give back every hardware resource.
    async fn remove(self) -> Result<(), DacError>
    where
        Self: Sized;
}
