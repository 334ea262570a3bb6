//! Sample queue shared between the capture callback and the analysis loop

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// Average interleaved stereo byte pairs into mono samples.
///
/// The sum is shifted right by two, not one, so the result stays within
/// `0..=127`. A trailing unpaired byte is ignored.
pub fn downmix_stereo(interleaved: &[u8]) -> impl Iterator<Item = u8> + '_ {
    interleaved
        .chunks_exact(2)
        .map(|pair| ((u16::from(pair[0]) + u16::from(pair[1])) >> 2) as u8)
}

/// FIFO of mono 8-bit samples.
///
/// Cloning yields another handle to the same queue, so the capture side can
/// hold one handle while the analysis loop holds another.
#[derive(Debug, Clone, Default)]
pub struct SampleBuffer {
    samples: Arc<Mutex<VecDeque<u8>>>,
}

impl SampleBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a single mono sample
    pub fn enqueue(&self, sample: u8) {
        self.samples.lock().push_back(sample);
    }

    /// Downmix a chunk of interleaved stereo bytes and append the result.
    ///
    /// Takes the lock once per chunk rather than once per sample.
    pub fn push_interleaved(&self, interleaved: &[u8]) {
        let mut samples = self.samples.lock();
        samples.extend(downmix_stereo(interleaved));
    }

    /// Remove exactly `n` samples from the front.
    ///
    /// Returns `None` and leaves the queue untouched when fewer than `n`
    /// samples are queued.
    pub fn dequeue_window(&self, n: usize) -> Option<Vec<u8>> {
        let mut samples = self.samples.lock();
        if samples.len() < n {
            return None;
        }
        Some(samples.drain(..n).collect())
    }

    pub fn clear(&self) {
        self.samples.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.samples.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.lock().is_empty()
    }
}
