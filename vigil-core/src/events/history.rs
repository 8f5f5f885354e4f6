//! Bounded in-memory event history
//!
//! Keeps the most recent session events so a UI log panel can render
//! activity without subscribing from the start of the session. Nothing is
//! persisted; the history dies with the session.

use std::collections::VecDeque;
use std::sync::Mutex;

use super::types::MonitorEvent;

/// Default number of retained events.
const DEFAULT_CAPACITY: usize = 512;

/// Ring buffer of recent session events.
pub struct EventHistory {
    inner: Mutex<VecDeque<MonitorEvent>>,
    capacity: usize,
}

impl EventHistory {
    /// Create a history with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a history retaining at most `capacity` events.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(VecDeque::with_capacity(capacity.min(DEFAULT_CAPACITY))),
            capacity: capacity.max(1),
        }
    }

    /// Record an event, evicting the oldest when full.
    pub fn record(&self, event: MonitorEvent) {
        let mut inner = self.inner.lock().expect("event history lock poisoned");
        if inner.len() == self.capacity {
            inner.pop_front();
        }
        inner.push_back(event);
    }

    /// The most recent `count` events, oldest first.
    pub fn recent(&self, count: usize) -> Vec<MonitorEvent> {
        let inner = self.inner.lock().expect("event history lock poisoned");
        let skip = inner.len().saturating_sub(count);
        inner.iter().skip(skip).cloned().collect()
    }

    /// Number of retained events.
    pub fn len(&self) -> usize {
        self.inner.lock().expect("event history lock poisoned").len()
    }

    /// Whether any events have been recorded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for EventHistory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::types::CycleSkipReason;
    use chrono::Utc;

    fn skip_event() -> MonitorEvent {
        MonitorEvent::CycleSkipped {
            reason: CycleSkipReason::Overlap,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_record_and_recent() {
        let history = EventHistory::new();
        assert!(history.is_empty());

        history.record(skip_event());
        history.record(MonitorEvent::SessionEnded {
            timestamp: Utc::now(),
        });

        assert_eq!(history.len(), 2);
        let recent = history.recent(10);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].event_type(), "cycle_skipped");
        assert_eq!(recent[1].event_type(), "session_ended");
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let history = EventHistory::with_capacity(3);
        history.record(MonitorEvent::SessionStarted {
            rule_preview: "r".to_string(),
            timestamp: Utc::now(),
        });
        for _ in 0..3 {
            history.record(skip_event());
        }

        assert_eq!(history.len(), 3);
        let recent = history.recent(10);
        assert!(recent.iter().all(|e| e.event_type() == "cycle_skipped"));
    }

    #[test]
    fn test_recent_limits_count() {
        let history = EventHistory::new();
        for _ in 0..5 {
            history.record(skip_event());
        }
        assert_eq!(history.recent(2).len(), 2);
    }
}
