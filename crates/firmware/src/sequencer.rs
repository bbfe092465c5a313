//! DAC sample sequencing
//!
//! The three ways the demonstrator drives the DAC:
//!
//! 1. [`write_and_trigger`] - load the input registers, then one LDAC strobe
//!    updates the outputs together.
//! 2. [`write_direct`] - write the DAC registers; outputs change immediately.
//! 3. [`start_cyclic_stream`] - hand a waveform buffer to the DMA path,
//!    optionally hold it for a number of seconds, then stop.
//!
//! Streaming is split into explicit steps: [`begin_stream`] returns a
//! [`CyclicStream`] guard and the caller decides how long to hold it. The
//! guard borrows the DAC, so no register write can race the stream.

use embassy_futures::select::{select, Either};
use embedded_hal_async::delay::DelayNs;
use platform::StreamBuffer;

use crate::dac::{ChannelMask, DacDriver, DacError, SampleFrame, WriteMode};

/// Busy-poll interval while waiting for a one-shot stream.
pub const ONE_SHOT_POLL_MS: u32 = 1;

/// Give up on a one-shot stream after this long.
pub const ONE_SHOT_TIMEOUT_MS: u32 = 500;

/// Wait `secs` whole seconds, one second per delay call, so any `u32`
/// duration fits.
async fn delay_secs<T: DelayNs>(delay: &mut T, secs: u32) {
    for _ in 0..secs {
        delay.delay_ms(1000).await;
    }
}

/// Load `samples` into the input registers of the masked channels, then
/// assert LDAC once so both outputs update together.
pub async fn write_and_trigger<D: DacDriver>(
    dac: &mut D,
    samples: SampleFrame,
    mask: ChannelMask,
) -> Result<(), DacError> {
    let [ch0, ch1] = samples;
    info!("Writing raw samples, ch0/1 {}/{}, using LDAC", ch0, ch1);
    dac.write_samples(&[samples], mask, WriteMode::InputRegsAndTriggerLdac)
        .await
}

/// Write `samples` straight into the DAC registers of the masked channels.
pub async fn write_direct<D: DacDriver>(
    dac: &mut D,
    samples: SampleFrame,
    mask: ChannelMask,
) -> Result<(), DacError> {
    let [ch0, ch1] = samples;
    info!("Writing raw samples, ch0/1 {}/{}, direct DAC REG write", ch0, ch1);
    dac.write_samples(&[samples], mask, WriteMode::DacRegs).await
}

/// Start streaming the first `sample_count` words of `buffer`.
pub async fn begin_stream<'d, D: DacDriver>(
    dac: &'d mut D,
    buffer: &'static [u32],
    sample_count: usize,
    cyclic: bool,
) -> Result<CyclicStream<'d, D>, DacError> {
    dac.start_stream(StreamBuffer::Shared(buffer), sample_count, cyclic)
        .await?;
    Ok(CyclicStream { dac, cyclic })
}

/// A running stream.
///
/// Dropping the guard leaves the stream running, like [`detach`](Self::detach).
#[must_use = "a stream keeps running until stopped"]
pub struct CyclicStream<'d, D: DacDriver> {
    dac: &'d mut D,
    cyclic: bool,
}

impl<D: DacDriver> CyclicStream<'_, D> {
    /// `true` while the DMA path is still moving data.
    pub fn is_running(&self) -> bool {
        self.dac.stream_busy()
    }

    /// Keep the stream running for `secs` seconds, then stop it.
    pub async fn hold_for<T: DelayNs>(self, delay: &mut T, secs: u32) -> Result<(), DacError> {
        delay_secs(delay, secs).await;
        debug!("stream held {} s, stopping", secs);
        self.stop().await
    }

    /// Like [`hold_for`](Self::hold_for), but stops early if `cancel`
    /// completes first. Returns `true` when cancelled.
    pub async fn hold_until<T, F>(self, delay: &mut T, secs: u32, cancel: F) -> Result<bool, DacError>
    where
        T: DelayNs,
        F: core::future::Future<Output = ()>,
    {
        let cancelled = match select(delay_secs(delay, secs), cancel).await {
            Either::First(()) => false,
            Either::Second(()) => {
                debug!("stream hold cancelled");
                true
            }
        };
        self.stop().await?;
        Ok(cancelled)
    }

    /// Wait for a one-shot stream to drain, polling every `poll_ms`.
    ///
    /// Stops the stream and fails with [`DacError::Timeout`] after
    /// `timeout_ms`. A cyclic stream never drains, so it is rejected.
    pub async fn wait_complete<T: DelayNs>(
        self,
        delay: &mut T,
        poll_ms: u32,
        timeout_ms: u32,
    ) -> Result<(), DacError> {
        if self.cyclic {
            return Err(DacError::InvalidArgument);
        }
        let mut waited = 0u32;
        while self.dac.stream_busy() {
            if waited >= timeout_ms {
                warn!("one-shot stream still busy after {} ms", waited);
                self.stop().await?;
                return Err(DacError::Timeout);
            }
            delay.delay_ms(poll_ms).await;
            waited = waited.saturating_add(poll_ms.max(1));
        }
        Ok(())
    }

    /// Stop the stream now.
    pub async fn stop(self) -> Result<(), DacError> {
        self.dac.stop_stream().await.map(|_| ())
    }

    /// Release the guard and leave the stream running.
    pub fn detach(self) {}
}

/// Stream `buffer` through the DAC.
///
/// - `duration_secs > 0`: stream for that long through `delay`, then stop.
/// - `duration_secs == 0`, cyclic: start and return; the stream keeps running.
/// - `duration_secs == 0`, one-shot: wait for it to finish
///   (see [`ONE_SHOT_TIMEOUT_MS`]).
pub async fn start_cyclic_stream<D: DacDriver, T: DelayNs>(
    dac: &mut D,
    delay: &mut T,
    buffer: &'static [u32],
    sample_count: usize,
    cyclic: bool,
    duration_secs: u32,
) -> Result<(), DacError> {
    let stream = begin_stream(dac, buffer, sample_count, cyclic).await?;
    if duration_secs > 0 {
        stream.hold_for(delay, duration_secs).await
    } else if cyclic {
        stream.detach();
        Ok(())
    } else {
        stream
            .wait_complete(delay, ONE_SHOT_POLL_MS, ONE_SHOT_TIMEOUT_MS)
            .await
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects
)]
mod tests {
    use super::*;
    use crate::dac::mock::DacCall;
    use crate::dac::MockDac;
    use crate::waveform::SINE_LUT_WORDS;
    use platform::mocks::{BusEvent, BusLog, MockDelay};

    #[tokio::test]
    async fn write_and_trigger_two_inputs_then_one_ldac() {
        let mut dac = MockDac::new();
        write_and_trigger(&mut dac, [65534, 0], ChannelMask::ALL)
            .await
            .unwrap();

        assert_eq!(
            dac.calls.as_slice(),
            &[
                DacCall::Write {
                    frame: [65534, 0],
                    mask: ChannelMask::ALL,
                    mode: WriteMode::InputRegsAndTriggerLdac,
                },
                DacCall::Ldac(ChannelMask::ALL),
            ]
        );
        assert_eq!(dac.ldac_count(), 1);
    }

    #[tokio::test]
    async fn write_direct_never_triggers_ldac() {
        let mut dac = MockDac::new();
        write_direct(&mut dac, [0, 65534], ChannelMask::ALL)
            .await
            .unwrap();
        assert_eq!(dac.ldac_count(), 0);
        assert_eq!(
            dac.calls[0],
            DacCall::Write {
                frame: [0, 65534],
                mask: ChannelMask::ALL,
                mode: WriteMode::DacRegs,
            }
        );
    }

    #[tokio::test]
    async fn write_errors_propagate() {
        let mut dac = MockDac::new();
        dac.fail_next = Some(DacError::Transport);
        assert_eq!(
            write_direct(&mut dac, [1, 1], ChannelMask::ALL).await,
            Err(DacError::Transport)
        );
    }

    #[tokio::test]
    async fn timed_stream_waits_then_halts() {
        let mut dac = MockDac::new();
        let log = BusLog::new();
        let mut delay = MockDelay::new(log.clone());

        start_cyclic_stream(&mut dac, &mut delay, &SINE_LUT_WORDS, 256, true, 20)
            .await
            .unwrap();

        assert_eq!(delay.total_ms(), 20_000);
        assert_eq!(delay_calls(&log), 20, "one delay per second");
        assert_eq!(
            dac.calls.as_slice(),
            &[
                DacCall::StartStream {
                    count: 256,
                    cyclic: true
                },
                DacCall::StopStream,
            ]
        );
        assert!(!dac.stream_busy());
    }

    #[tokio::test]
    async fn zero_duration_cyclic_returns_with_stream_running() {
        let mut dac = MockDac::new();
        let mut delay = MockDelay::new(BusLog::new());

        start_cyclic_stream(&mut dac, &mut delay, &SINE_LUT_WORDS, 256, true, 0)
            .await
            .unwrap();

        assert_eq!(delay.total_ns(), 0);
        assert!(dac.stream_busy());
        dac.stop_stream().await.unwrap();
    }

    #[tokio::test]
    async fn zero_duration_one_shot_waits_for_completion() {
        let mut dac = MockDac::new();
        dac.one_shot_polls.set(Some(3));
        let mut delay = MockDelay::new(BusLog::new());

        start_cyclic_stream(&mut dac, &mut delay, &SINE_LUT_WORDS, 16, false, 0)
            .await
            .unwrap();

        assert_eq!(delay.total_ms(), 3);
    }

    #[tokio::test]
    async fn one_shot_that_never_finishes_times_out_and_stops() {
        let mut dac = MockDac::new();
        let mut delay = MockDelay::new(BusLog::new());

        let result = start_cyclic_stream(&mut dac, &mut delay, &SINE_LUT_WORDS, 16, false, 0).await;

        assert_eq!(result, Err(DacError::Timeout));
        assert_eq!(delay.total_ms(), u64::from(ONE_SHOT_TIMEOUT_MS));
        assert_eq!(dac.calls.last(), Some(&DacCall::StopStream));
    }

    #[tokio::test]
    async fn stream_start_errors_propagate() {
        let mut dac = MockDac::new();
        let mut delay = MockDelay::new(BusLog::new());
        assert_eq!(
            start_cyclic_stream(&mut dac, &mut delay, &SINE_LUT_WORDS, 0, true, 20).await,
            Err(DacError::InvalidArgument)
        );
        assert_eq!(delay.total_ns(), 0, "no wait after a failed start");
    }

    #[tokio::test]
    async fn hold_until_cancel_stops_early() {
        let mut dac = MockDac::new();
        let mut delay = PendingDelay;

        let stream = begin_stream(&mut dac, &SINE_LUT_WORDS, 256, true)
            .await
            .unwrap();
        let cancelled = stream
            .hold_until(&mut delay, 20, core::future::ready(()))
            .await
            .unwrap();

        assert!(cancelled);
        assert!(!dac.stream_busy());
    }

    #[tokio::test]
    async fn wait_complete_rejects_cyclic() {
        let mut dac = MockDac::new();
        let mut delay = MockDelay::new(BusLog::new());
        let stream = begin_stream(&mut dac, &SINE_LUT_WORDS, 4, true)
            .await
            .unwrap();
        assert_eq!(
            stream.wait_complete(&mut delay, 1, 10).await,
            Err(DacError::InvalidArgument)
        );
    }

    #[tokio::test]
    async fn hold_longer_than_u32_milliseconds_is_not_cut_short() {
        // Just past u32::MAX ms (about 49.7 days).
        const SECS: u32 = 4_294_968;
        let mut dac = MockDac::new();
        let mut delay = TallyDelay::default();

        start_cyclic_stream(&mut dac, &mut delay, &SINE_LUT_WORDS, 256, true, SECS)
            .await
            .unwrap();

        assert_eq!(delay.total_ms, u64::from(SECS) * 1000);
        assert!(delay.total_ms > u64::from(u32::MAX));
        assert_eq!(dac.calls.last(), Some(&DacCall::StopStream));
    }

    #[tokio::test]
    async fn guard_borrow_ends_with_stream() {
        let mut dac = MockDac::new();
        {
            let stream = begin_stream(&mut dac, &SINE_LUT_WORDS, 8, true)
                .await
                .unwrap();
            assert!(stream.is_running());
            stream.stop().await.unwrap();
        }
        // The DAC is usable again once the guard is gone.
        write_direct(&mut dac, [1, 2], ChannelMask::ALL)
            .await
            .unwrap();
        assert_eq!(dac.calls.len(), 3);
    }

    fn delay_calls(log: &BusLog) -> usize {
        log.events()
            .iter()
            .filter(|e| matches!(e, BusEvent::Delay { .. }))
            .count()
    }

    /// Sums requested delays without logging them.
    #[derive(Default)]
    struct TallyDelay {
        total_ms: u64,
    }

    impl DelayNs for TallyDelay {
        async fn delay_ns(&mut self, ns: u32) {
            self.total_ms += u64::from(ns) / 1_000_000;
        }

        async fn delay_ms(&mut self, ms: u32) {
            self.total_ms += u64::from(ms);
        }
    }

    /// A delay that never elapses.
    struct PendingDelay;

    impl DelayNs for PendingDelay {
        async fn delay_ns(&mut self, _ns: u32) {
            core::future::pending::<()>().await;
        }
    }
}
