//! DMA abstraction layer
//!
//! On the FMC board the DAC samples are not pushed over SPI one by one: an
//! AXI-DMAC reads words from memory and feeds the AXI AD3552R core, which
//! clocks them out over QSPI at the rate set by the AXI clock generator.
//! [`DmaChannel`] is that whole path as the driver sees it.
//!
//! The engine keeps reading a buffer after [`DmaChannel::start`] returns,
//! for as long as a cyclic transfer runs, so buffers are `'static`. A
//! [`StreamBuffer`] is moved into the engine on start and handed back by
//! [`DmaChannel::stop`], which lets a writable region be refilled between
//! transfers.

use crate::error::ErrorCode;

/// Memory a transfer reads from.
#[derive(Debug, PartialEq, Eq)]
pub enum StreamBuffer {
    /// Table that lives for the whole program, e.g. a waveform in flash
    Shared(&'static [u32]),
    /// Writable region lent to the engine until the transfer is stopped
    Lent(&'static mut [u32]),
}

impl StreamBuffer {
    /// All words of the buffer.
    pub fn words(&self) -> &[u32] {
        match self {
            Self::Shared(words) => words,
            Self::Lent(words) => words,
        }
    }

    /// Length in words
    pub fn len(&self) -> usize {
        self.words().len()
    }

    /// `true` for a zero-length buffer
    pub fn is_empty(&self) -> bool {
        self.words().is_empty()
    }

    /// The prefix a transfer of `count` words reads, or `None` when `count`
    /// is zero or longer than the buffer.
    pub fn window(&self, count: usize) -> Option<&[u32]> {
        if count == 0 {
            return None;
        }
        self.words().get(..count)
    }

    /// Give a lent region back to its owner. Shared tables yield `None`.
    pub fn into_lent(self) -> Option<&'static mut [u32]> {
        match self {
            Self::Shared(_) => None,
            Self::Lent(words) => Some(words),
        }
    }
}

impl From<&'static [u32]> for StreamBuffer {
    fn from(words: &'static [u32]) -> Self {
        Self::Shared(words)
    }
}

impl<const N: usize> From<&'static [u32; N]> for StreamBuffer {
    fn from(words: &'static [u32; N]) -> Self {
        Self::Shared(words)
    }
}

impl From<&'static mut [u32]> for StreamBuffer {
    fn from(words: &'static mut [u32]) -> Self {
        Self::Lent(words)
    }
}

/// A transfer that was refused, with its buffer handed back.
#[derive(Debug, PartialEq, Eq)]
pub struct Rejected<E> {
    /// Why the transfer did not start
    pub error: E,
    /// The buffer, untouched
    pub buffer: StreamBuffer,
}

impl<E> Rejected<E> {
    /// Pair `error` with the refused `buffer`.
    pub fn new(error: E, buffer: StreamBuffer) -> Self {
        Self { error, buffer }
    }

    /// Convert the error, keeping the buffer.
    pub fn map<F>(self, f: impl FnOnce(E) -> F) -> Rejected<F> {
        Rejected {
            error: f(self.error),
            buffer: self.buffer,
        }
    }
}

impl<E: ErrorCode> ErrorCode for Rejected<E> {
    fn code(&self) -> i32 {
        self.error.code()
    }
}

/// DMA channel feeding the DAC core
pub trait DmaChannel {
    /// Error type
    type Error: core::fmt::Debug + ErrorCode;

    /// Program the clock generator driving the DAC core.
    fn set_clock_rate(&mut self, hz: u32) -> Result<(), Self::Error>;

    /// Start a transfer of the first `count` words of `buffer`.
    ///
    /// With `cyclic` set the engine re-reads the window from the start each
    /// time it reaches the end, until [`stop`](Self::stop) is called. The
    /// engine holds `buffer` until then; a refused buffer comes back inside
    /// the error.
    fn start(
        &mut self,
        buffer: StreamBuffer,
        count: usize,
        cyclic: bool,
    ) -> Result<(), Rejected<Self::Error>>;

    /// Halt the transfer and hand back the buffer it was reading.
    ///
    /// On an idle channel this only returns the buffer of the last finished
    /// transfer, if the engine still holds one.
    fn stop(&mut self) -> Result<Option<StreamBuffer>, Self::Error>;

    /// `true` while a transfer is in flight (always, for a running cyclic one)
    fn is_busy(&self) -> bool;

    /// Words moved since the last start
    fn transfer_count(&self) -> usize;
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects
)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    static WORDS: [u32; 4] = [1, 2, 3, 4];

    #[test]
    fn window_takes_prefix() {
        let buffer = StreamBuffer::from(&WORDS);
        assert_eq!(buffer.window(2), Some(&WORDS[..2]));
        assert_eq!(buffer.window(4), Some(&WORDS[..]));
    }

    #[test]
    fn window_rejects_zero_and_overlong() {
        let buffer = StreamBuffer::from(&WORDS);
        assert_eq!(buffer.window(0), None);
        assert_eq!(buffer.window(5), None);
    }

    #[test]
    fn lent_region_comes_back_shared_table_does_not() {
        let region: &'static mut [u32] = Box::leak(vec![7u32; 3].into_boxed_slice());
        let buffer = StreamBuffer::from(region);
        assert_eq!(buffer.words(), &[7, 7, 7]);
        let region = buffer.into_lent().unwrap();
        region[0] = 9;
        assert_eq!(&region[..], &[9, 7, 7]);

        assert_eq!(StreamBuffer::from(&WORDS).into_lent(), None);
    }

    #[test]
    fn rejected_map_keeps_buffer() {
        let rejected = Rejected::new(5u8, StreamBuffer::from(&WORDS));
        let mapped = rejected.map(i32::from);
        assert_eq!(mapped.error, 5);
        assert_eq!(mapped.buffer.len(), 4);
    }

    static RAMP: [u32; 256] = {
        let mut words = [0u32; 256];
        let mut i = 0;
        while i < words.len() {
            words[i] = i as u32;
            i += 1;
        }
        words
    };

    proptest! {
        #[test]
        fn window_is_exact_prefix_or_none(count in 0usize..512) {
            match StreamBuffer::from(&RAMP).window(count) {
                Some(window) => {
                    prop_assert!(count > 0 && count <= RAMP.len());
                    prop_assert_eq!(window.len(), count);
                    prop_assert_eq!(window.first(), Some(&0));
                }
                None => prop_assert!(count == 0 || count > RAMP.len()),
            }
        }
    }
}
