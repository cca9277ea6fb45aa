//! History module for tracking recent CPU and memory samples.
//!
//! This module provides a fixed-size circular buffer holding one sample per
//! collection cycle with predictable memory usage.

use serde::{Deserialize, Serialize};

/// Number of collection cycles retained in the history window.
pub const HISTORY_CAPACITY: usize = 60;

/// One history point per collection cycle.
///
/// A field is `None` when that metric's status was not OK in the cycle —
/// fallback values are never charted, so a degraded stretch shows as a gap
/// rather than a flat line of stale duplicates.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct HistorySample {
    pub cpu: Option<f64>,
    pub memory: Option<f64>,
    /// Unix timestamp in milliseconds.
    pub timestamp: i64,
}

/// A circular buffer of history samples with fixed capacity.
///
/// Insertion is O(1); once full the buffer stays full and the oldest entry
/// is overwritten.
pub struct HistoryBuffer {
    entries: Vec<HistorySample>,
    capacity: usize,
    write_index: usize,
    count: usize,
}

impl HistoryBuffer {
    /// Creates a buffer with the default window size.
    pub fn new() -> Self {
        Self::with_capacity(HISTORY_CAPACITY)
    }

    /// Creates a buffer with the specified capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        let mut entries = Vec::with_capacity(capacity);
        entries.resize(capacity, HistorySample::default());

        Self {
            entries,
            capacity,
            write_index: 0,
            count: 0,
        }
    }

    /// Pushes a new sample into the buffer.
    ///
    /// If the buffer is full, the oldest sample is overwritten.
    pub fn push(&mut self, sample: HistorySample) {
        self.entries[self.write_index] = sample;
        self.write_index = (self.write_index + 1) % self.capacity;

        if self.count < self.capacity {
            self.count += 1;
        }
    }

    /// Returns all samples in chronological order (oldest to newest),
    /// regardless of where the write cursor currently points.
    pub fn samples(&self) -> Vec<HistorySample> {
        if self.count == 0 {
            return Vec::new();
        }

        let mut result = Vec::with_capacity(self.count);

        if self.count < self.capacity {
            // Buffer not yet full, entries are in order from 0 to count-1
            result.extend_from_slice(&self.entries[0..self.count]);
        } else {
            // Buffer is full: oldest starts at write_index, wraps at the end
            result.extend_from_slice(&self.entries[self.write_index..]);
            result.extend_from_slice(&self.entries[0..self.write_index]);
        }

        result
    }

    /// Returns the current number of samples in the buffer.
    pub fn len(&self) -> usize {
        self.count
    }

    /// Returns true if no samples have been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Returns the maximum capacity of the buffer.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for HistoryBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(ts: i64) -> HistorySample {
        HistorySample {
            cpu: Some(10.0),
            memory: Some(40.0),
            timestamp: ts,
        }
    }

    #[test]
    fn test_push_and_read() {
        let mut buf = HistoryBuffer::with_capacity(3);

        assert_eq!(buf.len(), 0);
        assert_eq!(buf.capacity(), 3);

        buf.push(sample(1000));

        assert_eq!(buf.len(), 1);
        let history = buf.samples();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].timestamp, 1000);
    }

    #[test]
    fn test_chronological_order() {
        let mut buf = HistoryBuffer::with_capacity(3);

        for i in 0..3 {
            buf.push(sample(1000 + i * 100));
        }

        let history = buf.samples();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].timestamp, 1000);
        assert_eq!(history[1].timestamp, 1100);
        assert_eq!(history[2].timestamp, 1200);
    }

    #[test]
    fn test_wraparound() {
        let mut buf = HistoryBuffer::with_capacity(3);

        for i in 0..5 {
            buf.push(sample(1000 + i * 100));
        }

        // Only the last 3 entries remain, in chronological order
        let history = buf.samples();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].timestamp, 1200);
        assert_eq!(history[1].timestamp, 1300);
        assert_eq!(history[2].timestamp, 1400);
    }

    #[test]
    fn test_empty() {
        let buf = HistoryBuffer::new();
        assert_eq!(buf.len(), 0);
        assert!(buf.is_empty());
        assert!(buf.samples().is_empty());
    }

    #[test]
    fn test_full_window_after_overrun() {
        let mut buf = HistoryBuffer::new();

        for i in 1..=65 {
            buf.push(sample(i));
        }

        let history = buf.samples();
        assert_eq!(history.len(), HISTORY_CAPACITY);
        // Entries 1-5 were overwritten; entry 6 is the oldest present
        assert_eq!(history[0].timestamp, 6);
        assert_eq!(history[59].timestamp, 65);
        for pair in history.windows(2) {
            assert!(pair[0].timestamp < pair[1].timestamp);
        }
    }

    #[test]
    fn test_gap_samples_preserved() {
        let mut buf = HistoryBuffer::with_capacity(4);
        buf.push(sample(1));
        buf.push(HistorySample {
            cpu: None,
            memory: None,
            timestamp: 2,
        });

        let history = buf.samples();
        assert_eq!(history[1].cpu, None);
        assert_eq!(history[1].memory, None);
    }
}
