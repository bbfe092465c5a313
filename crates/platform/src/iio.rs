//! IIO (Industrial I/O) remote-control contracts
//!
//! In the remote-control build the DAC is handed to an IIO server that speaks
//! the libiio protocol over UART. The server and its request loop are an
//! external collaborator; this module only describes what it is given and
//! what it may ask of a registered device.

use crate::dma::{Rejected, StreamBuffer};
use crate::error::ErrorCode;
use crate::peripheral::UartConfig;

/// Devices a single server instance can host.
pub const MAX_IIO_DEVICES: usize = 4;

/// One IIO channel as advertised to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct IioChannel {
    /// Channel name (e.g. `voltage0`)
    pub name: &'static str,
    /// Scan index
    pub index: u8,
    /// Output (DAC) channel rather than input
    pub output: bool,
    /// Significant bits per sample
    pub real_bits: u8,
    /// Storage bits per sample
    pub storage_bits: u8,
    /// Two's complement samples
    pub signed: bool,
}

/// A device the IIO server can drive on behalf of a client.
pub trait IioDevice {
    /// Error type
    type Error: core::fmt::Debug + ErrorCode;

    /// Channels exposed to clients, in scan order.
    fn channels(&self) -> &[IioChannel];

    /// Write one raw code to a channel.
    async fn write_raw(&mut self, channel: usize, value: u16) -> Result<(), Self::Error>;

    /// Start streaming the first `count` words of `buffer`.
    ///
    /// The device keeps the buffer until [`stop_buffer`](Self::stop_buffer);
    /// a refused buffer comes back inside the error.
    async fn submit_buffer(
        &mut self,
        buffer: StreamBuffer,
        count: usize,
        cyclic: bool,
    ) -> Result<(), Rejected<Self::Error>>;

    /// Stop a running buffer and hand its memory back.
    async fn stop_buffer(&mut self) -> Result<Option<StreamBuffer>, Self::Error>;
}

/// A device entry in the server's registration table.
#[derive(Debug)]
pub struct IioAppDevice<D> {
    /// Name the device is published under
    pub name: &'static str,
    /// The device itself
    pub device: D,
    /// Region clients fill with outgoing samples. The server lends it to the
    /// device while a buffer runs and gets it back when the buffer stops.
    pub write_buffer: Option<&'static mut [u32]>,
}

/// Everything the server needs to start.
#[derive(Debug)]
pub struct IioAppInitParam<D> {
    /// Registered devices
    pub devices: heapless::Vec<IioAppDevice<D>, MAX_IIO_DEVICES>,
    /// Transport the server listens on
    pub uart: UartConfig,
}

impl<D> IioAppInitParam<D> {
    /// Parameters with a single registered device.
    pub fn single(device: IioAppDevice<D>, uart: UartConfig) -> Self {
        Self {
            devices: [device].into_iter().collect(),
            uart,
        }
    }
}

/// The IIO server: initialise once, then serve until failure.
pub trait IioServer<D: IioDevice> {
    /// Error type
    type Error: core::fmt::Debug + ErrorCode;

    /// Take ownership of the device table and open the transport.
    fn init(&mut self, param: IioAppInitParam<D>) -> Result<(), Self::Error>;

    /// Serve client requests. On hardware this does not return unless the
    /// server fails.
    async fn run(&mut self) -> Result<(), Self::Error>;
}

/// Uninhabited server type for builds without the remote-control mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoServer {}

impl<D: IioDevice> IioServer<D> for NoServer {
    type Error = core::convert::Infallible;

    fn init(&mut self, _param: IioAppInitParam<D>) -> Result<(), Self::Error> {
        match *self {}
    }

    async fn run(&mut self) -> Result<(), Self::Error> {
        match *self {}
    }
}
