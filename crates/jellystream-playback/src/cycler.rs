//! Deterministic strategy ring advanced on playback failure.

use jellystream_common::StreamingStrategy;

/// Current strategy plus the number of consecutive failed attempts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StrategyCycler {
    current: StreamingStrategy,
    retry_count: u32,
}

impl StrategyCycler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> StreamingStrategy {
        self.current
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    /// Move to the next strategy in ring order and count the failure.
    pub fn advance(&mut self) -> StreamingStrategy {
        self.current = self.current.next();
        self.retry_count = self.retry_count.saturating_add(1);
        self.current
    }

    /// Back to `Adaptive` with a zero counter. Only for navigation to a new item.
    pub fn reset(&mut self) {
        self.current = StreamingStrategy::default();
        self.retry_count = 0;
    }

    /// Zero the failure counter, keeping the current strategy.
    pub fn clear_retries(&mut self) {
        self.retry_count = 0;
    }

    /// Whether one more failure would reach `ceiling` consecutive failures.
    pub fn ceiling_reached(&self, ceiling: u32) -> bool {
        self.retry_count.saturating_add(1) >= ceiling
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_follows_ring() {
        let mut cycler = StrategyCycler::new();
        assert_eq!(cycler.current(), StreamingStrategy::Adaptive);
        assert_eq!(cycler.advance(), StreamingStrategy::Progressive);
        assert_eq!(cycler.advance(), StreamingStrategy::PassThrough);
        assert_eq!(cycler.advance(), StreamingStrategy::Adaptive);
        assert_eq!(cycler.retry_count(), 3);
    }

    #[test]
    fn test_reset() {
        let mut cycler = StrategyCycler::new();
        cycler.advance();
        cycler.advance();
        cycler.reset();
        assert_eq!(cycler, StrategyCycler::new());
    }

    #[test]
    fn test_clear_retries_keeps_strategy() {
        let mut cycler = StrategyCycler::new();
        cycler.advance();
        cycler.clear_retries();
        assert_eq!(cycler.current(), StreamingStrategy::Progressive);
        assert_eq!(cycler.retry_count(), 0);
    }

    #[test]
    fn test_ceiling() {
        let mut cycler = StrategyCycler::new();
        // Ceiling of 6: failures one through five advance, the sixth is terminal.
        for _ in 0..5 {
            assert!(!cycler.ceiling_reached(6));
            cycler.advance();
        }
        assert!(cycler.ceiling_reached(6));
        assert!(StrategyCycler::new().ceiling_reached(1));
    }
}
