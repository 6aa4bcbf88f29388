//! Sliding median, removes isolated single-frame dropouts and spikes.

use crate::ring::RingBuffer;

#[derive(Debug, Clone)]
pub struct MedianFilter {
    window: RingBuffer<f32>,
    sorted: Vec<f32>,
}

impl MedianFilter {
    pub fn new(size: usize) -> Self {
        Self {
            window: RingBuffer::with_capacity(size),
            sorted: vec![0.0; size],
        }
    }

    /// Pushes `value` and returns the median of the current window.
    pub fn process(&mut self, value: f32) -> f32 {
        self.window.push(value);
        let values = self.window.copy_into(&mut self.sorted);
        let n = values.len();
        let sorted = &mut self.sorted[..n];
        sorted.sort_unstable_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        if n % 2 == 1 {
            sorted[n / 2]
        } else {
            (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
        }
    }

    pub fn reset(&mut self) {
        self.window.clear();
    }
}
