//! IIO device adapter for the DAC.
//!
//! Publishes the DAC to the IIO server as `ad3552r-hs` with two 16-bit
//! unsigned output channels. Raw writes go straight to the DAC registers,
//! buffers are streamed through the DMA path.

use platform::{IioChannel, IioDevice, Rejected, StreamBuffer};

use crate::dac::{Channel, DacDriver, DacError, WriteMode};

/// Name the DAC is published under.
pub const IIO_DEVICE_NAME: &str = "ad3552r-hs";

const fn output_channel(name: &'static str, index: u8) -> IioChannel {
    IioChannel {
        name,
        index,
        output: true,
        real_bits: 16,
        storage_bits: 16,
        signed: false,
    }
}

/// Channels advertised to IIO clients.
pub static AD3552R_IIO_CHANNELS: [IioChannel; 2] =
    [output_channel("voltage0", 0), output_channel("voltage1", 1)];

/// A DAC wrapped as an IIO device.
pub struct IioDac<D> {
    dac: D,
}

impl<D: DacDriver> IioDac<D> {
    /// Take ownership of an initialised DAC.
    pub fn new(dac: D) -> Self {
        Self { dac }
    }

    /// The wrapped DAC.
    pub fn dac(&self) -> &D {
        &self.dac
    }

    /// Unwrap the DAC again.
    pub fn into_inner(self) -> D {
        self.dac
    }
}

impl<D: DacDriver> IioDevice for IioDac<D> {
    type Error = DacError;

    fn channels(&self) -> &[IioChannel] {
        &AD3552R_IIO_CHANNELS
    }

    async fn write_raw(&mut self, channel: usize, value: u16) -> Result<(), Self::Error> {
        let ch = Channel::from_index(channel).ok_or(DacError::InvalidArgument)?;
        let frame = match ch {
            Channel::Ch0 => [value, 0],
            Channel::Ch1 => [0, value],
        };
        self.dac
            .write_samples(&[frame], ch.mask(), WriteMode::DacRegs)
            .await
    }

    async fn submit_buffer(
        &mut self,
        buffer: StreamBuffer,
        count: usize,
        cyclic: bool,
    ) -> Result<(), Rejected<Self::Error>> {
        debug!("IIO buffer: {} of {} words, cyclic {}", count, buffer.len(), cyclic);
        self.dac.start_stream(buffer, count, cyclic).await
    }

    async fn stop_buffer(&mut self) -> Result<Option<StreamBuffer>, Self::Error> {
        self.dac.stop_stream().await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::dac::mock::DacCall;
    use crate::dac::{ChannelMask, MockDac};

    static WORDS: [u32; 16] = [0; 16];

    #[test]
    fn two_unsigned_16_bit_outputs() {
        let dev = IioDac::new(MockDac::new());
        let chans = dev.channels();
        assert_eq!(chans.len(), 2);
        assert_eq!(chans[0].name, "voltage0");
        assert_eq!(chans[1].name, "voltage1");
        assert!(chans.iter().all(|c| c.output && c.real_bits == 16 && !c.signed));
    }

    #[tokio::test]
    async fn write_raw_targets_one_dac_register() {
        let mut dev = IioDac::new(MockDac::new());
        dev.write_raw(1, 0x1234).await.unwrap();
        assert_eq!(
            dev.dac().calls.as_slice(),
            &[DacCall::Write {
                frame: [0, 0x1234],
                mask: ChannelMask::CH1,
                mode: WriteMode::DacRegs,
            }]
        );
        assert_eq!(dev.write_raw(2, 0).await, Err(DacError::InvalidArgument));
    }

    #[tokio::test]
    async fn buffer_start_and_stop() {
        let mut dev = IioDac::new(MockDac::new());
        dev.submit_buffer(StreamBuffer::from(&WORDS), 16, true)
            .await
            .unwrap();
        assert!(dev.dac().stream_busy());
        let refused = dev
            .submit_buffer(StreamBuffer::from(&WORDS), 16, true)
            .await
            .unwrap_err();
        assert_eq!(refused.error, DacError::DmaBusy);
        assert_eq!(
            dev.stop_buffer().await.unwrap(),
            Some(StreamBuffer::from(&WORDS))
        );
        assert!(!dev.into_inner().stream_busy());
    }

    #[tokio::test]
    async fn submitted_count_selects_prefix_of_region() {
        let mut dev = IioDac::new(MockDac::new());
        let region: &'static mut [u32] = Box::leak(vec![0u32; 8].into_boxed_slice());

        dev.submit_buffer(StreamBuffer::Lent(region), 5, false)
            .await
            .unwrap();

        assert_eq!(
            dev.dac().calls.as_slice(),
            &[DacCall::StartStream {
                count: 5,
                cyclic: false
            }]
        );
        assert_eq!(dev.dac().stream_buffer().map(StreamBuffer::len), Some(8));
    }
}
