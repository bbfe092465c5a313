//! Numeric error codes
//!
//! The vendor HAL reports every failure as a negative errno-style integer and
//! the demonstrator propagates that integer all the way to its exit status.
//! [`ErrorCode`] is the bridge: each collaborator error type can say which
//! integer it stands for.

/// `-EIO`: bus or transport failure.
pub const EIO: i32 = -5;
/// `-EBUSY`: resource already in use.
pub const EBUSY: i32 = -16;
/// `-ENODEV`: device missing or not responding.
pub const ENODEV: i32 = -19;
/// `-EINVAL`: invalid argument.
pub const EINVAL: i32 = -22;
/// `-ENOTSUP`: operation not supported by this configuration.
pub const ENOTSUP: i32 = -95;
/// `-ETIMEDOUT`: hardware did not respond in time.
pub const ETIMEDOUT: i32 = -110;

/// An error that maps onto a single numeric (negative errno-style) code.
pub trait ErrorCode {
    /// Negative error code. Never zero.
    fn code(&self) -> i32;
}

impl ErrorCode for core::convert::Infallible {
    fn code(&self) -> i32 {
        match *self {}
    }
}

/// Generic HAL-level error used by GPIO controllers and simulated collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HalError {
    /// Bus or register access failed.
    Io,
    /// Line or channel is already owned by someone else.
    Busy,
    /// Offset or parameter out of range for this controller.
    InvalidArgument,
    /// Hardware block not present.
    NoDevice,
}

impl ErrorCode for HalError {
    fn code(&self) -> i32 {
        match self {
            Self::Io => EIO,
            Self::Busy => EBUSY,
            Self::InvalidArgument => EINVAL,
            Self::NoDevice => ENODEV,
        }
    }
}

impl core::fmt::Display for HalError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Io => write!(f, "HAL I/O error"),
            Self::Busy => write!(f, "HAL resource busy"),
            Self::InvalidArgument => write!(f, "HAL invalid argument"),
            Self::NoDevice => write!(f, "HAL device not present"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for HalError {}
