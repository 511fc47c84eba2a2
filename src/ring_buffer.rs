//! Bounded ring buffer for readout history.
//!
//! The aggregator pushes one fps readout per tick; sparkline renderers read
//! the window oldest-to-newest. Capacity is fixed at construction and never
//! exceeded.

use std::collections::VecDeque;

/// A fixed-capacity ring buffer for time-series data.
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    data: VecDeque<T>,
    capacity: usize,
}

impl<T> RingBuffer<T> {
    /// Creates a new ring buffer with the specified capacity.
    ///
    /// A capacity of 0 is raised to 1.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self { data: VecDeque::with_capacity(capacity), capacity }
    }

    /// Pushes a value, discarding the oldest one when full.
    pub fn push(&mut self, value: T) {
        if self.data.len() >= self.capacity {
            self.data.pop_front();
        }
        self.data.push_back(value);
    }

    /// Returns the most recent value, if any.
    #[must_use]
    pub fn latest(&self) -> Option<&T> {
        self.data.back()
    }

    /// Returns the current number of elements in the buffer.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the buffer is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns the maximum capacity of the buffer.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns an iterator over the values from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.data.iter()
    }

    /// Clears all elements from the buffer.
    pub fn clear(&mut self) {
        self.data.clear();
    }
}

impl RingBuffer<f64> {
    /// Largest retained value.
    #[must_use]
    pub fn max(&self) -> Option<f64> {
        self.data.iter().copied().reduce(f64::max)
    }

    /// Smallest retained value.
    #[must_use]
    pub fn min(&self) -> Option<f64> {
        self.data.iter().copied().reduce(f64::min)
    }

    /// Arithmetic mean of the retained values.
    #[must_use]
    pub fn mean(&self) -> Option<f64> {
        if self.data.is_empty() {
            return None;
        }
        Some(self.data.iter().sum::<f64>() / self.data.len() as f64)
    }
}

impl<T> Default for RingBuffer<T> {
    /// Two minutes of history at one readout per second.
    fn default() -> Self {
        Self::new(120)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_never_exceeds_capacity() {
        let mut buf = RingBuffer::<u64>::new(100);
        for i in 0..1000 {
            buf.push(i);
            assert!(buf.len() <= 100);
        }
        assert_eq!(buf.len(), 100);
        assert_eq!(buf.iter().next(), Some(&900));
        assert_eq!(buf.latest(), Some(&999));
    }

    #[test]
    fn test_zero_capacity_is_raised() {
        let mut buf = RingBuffer::new(0);
        buf.push(1.0);
        buf.push(2.0);
        assert_eq!(buf.capacity(), 1);
        assert_eq!(buf.latest(), Some(&2.0));
    }

    #[test]
    fn test_stats() {
        let mut buf = RingBuffer::new(4);
        for v in [10.0, 30.0, 20.0] {
            buf.push(v);
        }
        assert_eq!(buf.max(), Some(30.0));
        assert_eq!(buf.min(), Some(10.0));
        assert_eq!(buf.mean(), Some(20.0));

        buf.clear();
        assert!(buf.is_empty());
        assert_eq!(buf.mean(), None);
    }
}
