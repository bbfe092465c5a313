//! Mock DAC for host-side testing
//!
//! Implements [`DacDriver`] without any hardware dependency. Records all
//! calls for assertion in tests.

use core::cell::Cell;

use platform::{Rejected, StreamBuffer};

use super::{ChannelMask, DacDriver, DacError, SampleFrame, WriteMode};

/// Calls recorded by [`MockDac`].
pub const MOCK_DAC_HISTORY: usize = 32;

/// One recorded driver call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DacCall {
    /// One frame of a [`DacDriver::write_samples`] call
    Write {
        /// Values written
        frame: SampleFrame,
        /// Target channels
        mask: ChannelMask,
        /// Register set
        mode: WriteMode,
    },
    /// LDAC assertion (explicit or from `InputRegsAndTriggerLdac`)
    Ldac(ChannelMask),
    /// Stream started
    StartStream {
        /// Words streamed
        count: usize,
        /// Cyclic transfer
        cyclic: bool,
    },
    /// Stream halted
    StopStream,
}

/// Mock DAC: records all calls for test assertions.
#[derive(Debug, Default)]
pub struct MockDac {
    /// Calls in order (oldest dropped once full)
    pub calls: heapless::Vec<DacCall, MOCK_DAC_HISTORY>,
    /// Whether a stream is running
    pub streaming: bool,
    /// Whether the running stream is cyclic
    pub cyclic: bool,
    /// Busy checks left before a one-shot stream reports done
    /// (`None`: never completes)
    pub one_shot_polls: Cell<Option<usize>>,
    /// Returned (once) by the next call instead of succeeding
    pub fail_next: Option<DacError>,
    /// Set by [`DacDriver::remove`]
    pub removed: bool,
    /// Buffer of the last started stream, until stopped
    held: Option<StreamBuffer>,
}

impl MockDac {
    /// Create a new idle mock DAC.
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&mut self, call: DacCall) -> Result<(), DacError> {
        if let Some(e) = self.fail_next.take() {
            return Err(e);
        }
        if self.calls.is_full() {
            self.calls.remove(0);
        }
        self.calls.push(call).map_err(|_| DacError::InvalidArgument)
    }

    /// Buffer the running (or last finished) stream reads from.
    pub fn stream_buffer(&self) -> Option<&StreamBuffer> {
        self.held.as_ref()
    }

    /// Number of recorded LDAC assertions.
    pub fn ldac_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, DacCall::Ldac(_)))
            .count()
    }
}

impl DacDriver for MockDac {
    async fn write_samples(
        &mut self,
        frames: &[SampleFrame],
        mask: ChannelMask,
        mode: WriteMode,
    ) -> Result<(), DacError> {
        if frames.is_empty() {
            return Err(DacError::InvalidArgument);
        }
        if self.stream_busy() {
            return Err(DacError::DmaBusy);
        }
        for &frame in frames {
            self.record(DacCall::Write { frame, mask, mode })?;
            if mode == WriteMode::InputRegsAndTriggerLdac {
                self.record(DacCall::Ldac(mask))?;
            }
        }
        Ok(())
    }

    async fn trigger_ldac(&mut self, mask: ChannelMask) -> Result<(), DacError> {
        self.record(DacCall::Ldac(mask))
    }

    async fn start_stream(
        &mut self,
        buffer: StreamBuffer,
        count: usize,
        cyclic: bool,
    ) -> Result<(), Rejected<DacError>> {
        if buffer.window(count).is_none() {
            return Err(Rejected::new(DacError::InvalidArgument, buffer));
        }
        if self.stream_busy() {
            return Err(Rejected::new(DacError::DmaBusy, buffer));
        }
        if let Err(e) = self.record(DacCall::StartStream { count, cyclic }) {
            return Err(Rejected::new(e, buffer));
        }
        self.streaming = true;
        self.cyclic = cyclic;
        self.held = Some(buffer);
        Ok(())
    }

    async fn stop_stream(&mut self) -> Result<Option<StreamBuffer>, DacError> {
        if self.streaming {
            self.record(DacCall::StopStream)?;
            self.streaming = false;
        }
        Ok(self.held.take())
    }

    fn stream_busy(&self) -> bool {
        if !self.streaming {
            return false;
        }
        if self.cyclic {
            return true;
        }
        match self.one_shot_polls.get() {
            None => true,
            Some(0) => false,
            Some(n) => {
                self.one_shot_polls.set(Some(n.saturating_sub(1)));
                true
            }
        }
    }

    async fn remove(mut self) -> Result<(), DacError> {
        self.stop_stream().await?;
        self.removed = true;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    static WORDS: [u32; 4] = [0; 4];

    #[tokio::test]
    async fn test_mock_dac_records_ldac_per_frame() {
        let mut dac = MockDac::new();
        dac.write_samples(
            &[[1, 2], [3, 4]],
            ChannelMask::ALL,
            WriteMode::InputRegsAndTriggerLdac,
        )
        .await
        .unwrap();
        assert_eq!(dac.calls.len(), 4);
        assert_eq!(dac.ldac_count(), 2);
    }

    #[tokio::test]
    async fn test_mock_dac_stream_blocks_writes() {
        let mut dac = MockDac::new();
        dac.start_stream(StreamBuffer::from(&WORDS), 4, true)
            .await
            .unwrap();
        assert!(dac.stream_busy());
        assert_eq!(
            dac.write_samples(&[[0, 0]], ChannelMask::CH0, WriteMode::DacRegs)
                .await,
            Err(DacError::DmaBusy)
        );
        dac.stop_stream().await.unwrap();
        assert!(!dac.stream_busy());
    }

    #[tokio::test]
    async fn test_mock_dac_one_shot_completes() {
        let mut dac = MockDac::new();
        dac.one_shot_polls.set(Some(1));
        dac.start_stream(StreamBuffer::from(&WORDS), 2, false)
            .await
            .unwrap();
        assert!(dac.stream_busy());
        assert!(!dac.stream_busy());
    }

    #[tokio::test]
    async fn test_mock_dac_fail_next_is_one_shot() {
        let mut dac = MockDac::new();
        dac.fail_next = Some(DacError::Transport);
        assert_eq!(
            dac.trigger_ldac(ChannelMask::ALL).await,
            Err(DacError::Transport)
        );
        dac.trigger_ldac(ChannelMask::ALL).await.unwrap();
    }

    #[tokio::test]
    async fn test_mock_dac_history_keeps_newest_calls() {
        let mut dac = MockDac::new();
        for _ in 0..MOCK_DAC_HISTORY {
            dac.trigger_ldac(ChannelMask::CH0).await.unwrap();
        }
        dac.trigger_ldac(ChannelMask::CH1).await.unwrap();

        assert_eq!(dac.calls.len(), MOCK_DAC_HISTORY);
        assert_eq!(dac.calls.last(), Some(&DacCall::Ldac(ChannelMask::CH1)));
    }

    #[tokio::test]
    async fn test_mock_dac_hands_buffer_back_on_stop() {
        let mut dac = MockDac::new();
        dac.start_stream(StreamBuffer::from(&WORDS), 4, true)
            .await
            .unwrap();
        assert_eq!(dac.stream_buffer(), Some(&StreamBuffer::from(&WORDS)));
        assert_eq!(
            dac.stop_stream().await.unwrap(),
            Some(StreamBuffer::from(&WORDS))
        );
        assert_eq!(dac.stream_buffer(), None);
    }
}
