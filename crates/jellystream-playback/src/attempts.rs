//! URLs already issued to the player while viewing the current item.

use std::collections::HashSet;

/// Set of stream URLs already handed to the media element.
///
/// Cleared only by an explicit user retry or navigation to another item.
#[derive(Debug, Clone, Default)]
pub struct AttemptTracker {
    tried: HashSet<String>,
}

impl AttemptTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_tried(&self, url: &str) -> bool {
        self.tried.contains(url)
    }

    /// Record `url`. Returns `false` if it was already recorded.
    pub fn mark_tried(&mut self, url: &str) -> bool {
        self.tried.insert(url.to_string())
    }

    pub fn clear(&mut self) {
        self.tried.clear();
    }

    pub fn len(&self) -> usize {
        self.tried.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tried.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mark_and_check() {
        let mut tracker = AttemptTracker::new();
        let urls = ["http://h/a", "http://h/b?x=1", ""];
        for url in urls {
            assert!(!tracker.has_tried(url));
            assert!(tracker.mark_tried(url));
            assert!(tracker.has_tried(url));
        }
        assert!(!tracker.mark_tried("http://h/a"));
        assert_eq!(tracker.len(), 3);
    }

    #[test]
    fn test_clear_forgets_everything() {
        let mut tracker = AttemptTracker::new();
        tracker.mark_tried("http://h/a");
        tracker.mark_tried("http://h/b");
        tracker.clear();
        assert!(tracker.is_empty());
        assert!(!tracker.has_tried("http://h/a"));
        assert!(!tracker.has_tried("http://h/b"));
    }
}
