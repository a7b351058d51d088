//! Sliding window over the most recent events
//!
//! Two events are "close" when the second one happened less than the
//! configured threshold after the first. Only neighbours in arrival order are
//! compared: three events spaced 300 ms apart are flagged (every adjacent gap
//! is below 400 ms) even though the first and last are 600 ms apart. An event
//! arriving before a later-stamped neighbour gives a negative gap and is close
//! to that neighbour only, not to an older event it happens to sit near.

use ars_common::config::{AmbiguityConfig, MAX_THRESHOLD_MS};
use ars_common::Event;
use chrono::Duration;
use std::collections::VecDeque;

/// Bounded FIFO of recent events, oldest first
#[derive(Debug, Clone)]
pub struct AmbiguityWindow {
    events: VecDeque<Event>,
    capacity: usize,
    threshold: Duration,
}

impl AmbiguityWindow {
    pub fn new(config: &AmbiguityConfig) -> Self {
        Self::with_threshold(config.window_capacity, config.threshold_ms)
    }

    /// `threshold_ms` is clamped to `MAX_THRESHOLD_MS`
    pub fn with_threshold(capacity: usize, threshold_ms: u64) -> Self {
        let capacity = capacity.max(2);
        let millis = i64::try_from(threshold_ms.min(MAX_THRESHOLD_MS)).unwrap_or(i64::MAX);
        Self {
            events: VecDeque::with_capacity(capacity),
            capacity,
            threshold: Duration::milliseconds(millis),
        }
    }

    /// Append `event`, evicting the oldest entry when full
    pub fn observe(&mut self, event: Event) {
        if self.events.len() == self.capacity {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    /// True when any two adjacent events in the window are close
    ///
    /// Fewer than two events is never ambiguous. Events arriving out of
    /// order produce a negative gap and therefore count as close.
    pub fn is_ambiguous(&self) -> bool {
        self.events
            .iter()
            .zip(self.events.iter().skip(1))
            .any(|(earlier, later)| self.is_close(earlier, later))
    }

    /// Newest event plus every predecessor chained to it by close gaps
    ///
    /// Oldest first. Holds a single event when the newest one is not close to
    /// its predecessor, and is empty only for an empty window.
    pub fn ambiguous_cluster(&self) -> Vec<Event> {
        let mut start = self.events.len();
        if start == 0 {
            return Vec::new();
        }
        start -= 1;
        while start > 0 && self.is_close(&self.events[start - 1], &self.events[start]) {
            start -= 1;
        }
        self.events.range(start..).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Events currently held, oldest first
    pub fn events(&self) -> impl Iterator<Item = &Event> {
        self.events.iter()
    }

    fn is_close(&self, earlier: &Event, later: &Event) -> bool {
        later.timestamp() - earlier.timestamp() < self.threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event_at(concept: &str, time: &str) -> Event {
        Event::from_attributes([
            ("concept:name", concept),
            ("time:timestamp", time),
            ("perform:worker", "w1"),
            ("location:station", "s1"),
        ])
        .unwrap()
    }

    fn window() -> AmbiguityWindow {
        AmbiguityWindow::with_threshold(6, 400)
    }

    #[test]
    fn test_empty_and_single_event_are_not_ambiguous() {
        let mut window = window();
        assert!(!window.is_ambiguous());
        assert!(window.ambiguous_cluster().is_empty());

        window.observe(event_at("pick", "2024-03-01T10:00:00.000Z"));
        assert!(!window.is_ambiguous());
        assert_eq!(window.ambiguous_cluster().len(), 1);
    }

    #[test]
    fn test_close_pair_is_ambiguous() {
        let mut window = window();
        window.observe(event_at("pick", "2024-03-01T10:00:00.000Z"));
        window.observe(event_at("place", "2024-03-01T10:00:00.300Z"));

        assert!(window.is_ambiguous());
        let cluster = window.ambiguous_cluster();
        assert_eq!(cluster.len(), 2);
        assert_eq!(cluster[0].concept_name(), "pick");
        assert_eq!(cluster[1].concept_name(), "place");
    }

    #[test]
    fn test_gap_equal_to_threshold_is_not_ambiguous() {
        let mut window = window();
        window.observe(event_at("pick", "2024-03-01T10:00:00.000Z"));
        window.observe(event_at("place", "2024-03-01T10:00:00.400Z"));
        assert!(!window.is_ambiguous());

        window.observe(event_at("inspect", "2024-03-01T10:00:00.799Z"));
        assert!(window.is_ambiguous());
    }

    #[test]
    fn test_chain_of_close_events_forms_one_cluster() {
        let mut window = window();
        window.observe(event_at("a", "2024-03-01T10:00:00.000Z"));
        window.observe(event_at("b", "2024-03-01T10:00:00.300Z"));
        window.observe(event_at("c", "2024-03-01T10:00:00.600Z"));

        assert!(window.is_ambiguous());
        let names: Vec<_> = window
            .ambiguous_cluster()
            .iter()
            .map(|e| e.concept_name().to_string())
            .collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_out_of_order_arrival_counts_as_close() {
        let mut window = window();
        // a and c are 350 ms apart, but b sits between them in arrival order
        window.observe(event_at("a", "2024-03-01T10:00:00.000Z"));
        window.observe(event_at("b", "2024-03-01T10:00:05.000Z"));
        window.observe(event_at("c", "2024-03-01T10:00:00.350Z"));

        // The b -> c gap is negative, so c clusters with b and never with a
        assert!(window.is_ambiguous());
        let cluster = window.ambiguous_cluster();
        assert_eq!(cluster.len(), 2);
        assert_eq!(cluster[0].concept_name(), "b");
    }

    #[test]
    fn test_wide_window_of_spaced_events_is_not_ambiguous() {
        let mut window = window();
        // Spans 800 ms overall, every neighbour gap is exactly the threshold
        window.observe(event_at("a", "2024-03-01T10:00:00.000Z"));
        window.observe(event_at("b", "2024-03-01T10:00:00.400Z"));
        window.observe(event_at("c", "2024-03-01T10:00:00.800Z"));

        assert!(!window.is_ambiguous());
        assert_eq!(window.ambiguous_cluster().len(), 1);
    }

    #[test]
    fn test_oversized_threshold_is_clamped() {
        for threshold_ms in [1 << 63, u64::MAX] {
            let mut window = AmbiguityWindow::with_threshold(6, threshold_ms);
            window.observe(event_at("pick", "2024-03-01T10:00:00.000Z"));
            window.observe(event_at("place", "2024-03-01T10:00:00.000Z"));
            assert!(window.is_ambiguous());
        }

        let mut window = AmbiguityWindow::with_threshold(6, u64::MAX);
        window.observe(event_at("pick", "2024-03-01T09:00:00.000Z"));
        window.observe(event_at("place", "2024-03-01T10:00:00.000Z"));
        // One hour apart is not below the clamped one-hour threshold
        assert!(!window.is_ambiguous());
    }

    #[test]
    fn test_trailing_cluster_ignores_older_pair() {
        let mut window = window();
        window.observe(event_at("a", "2024-03-01T10:00:00.000Z"));
        window.observe(event_at("b", "2024-03-01T10:00:00.200Z"));
        window.observe(event_at("c", "2024-03-01T10:00:02.000Z"));

        assert!(window.is_ambiguous());
        let cluster = window.ambiguous_cluster();
        assert_eq!(cluster.len(), 1);
        assert_eq!(cluster[0].concept_name(), "c");
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let mut window = AmbiguityWindow::with_threshold(3, 400);
        for (i, time) in [
            "2024-03-01T10:00:00.000Z",
            "2024-03-01T10:00:00.100Z",
            "2024-03-01T10:00:05.000Z",
            "2024-03-01T10:00:10.000Z",
        ]
        .iter()
        .enumerate()
        {
            window.observe(event_at(&format!("e{}", i), time));
        }

        assert_eq!(window.len(), 3);
        assert_eq!(window.events().next().unwrap().concept_name(), "e1");
        // The e0/e1 pair left the window with e0
        assert!(!window.is_ambiguous());
    }

    #[test]
    fn test_capacity_floor_is_two() {
        let window = AmbiguityWindow::with_threshold(0, 400);
        assert_eq!(window.capacity(), 2);
    }
}
