//! Bounded rolling log of traffic events
//!
//! The log is ordered newest-first and holds at most `capacity` entries; a
//! push past capacity evicts from the back. Within a batch the last generated
//! event becomes the newest, so ids strictly decrease from the front.

use crate::core::traffic::TrafficEvent;
use serde::Serialize;
use std::collections::VecDeque;

/// Default number of events kept in the live log
pub const LOG_CAPACITY: usize = 100;

/// View selector for the event table
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum LogFilter {
    #[default]
    All,
    Allowed,
    Blocked,
    Threats,
}

impl LogFilter {
    pub fn matches(self, event: &TrafficEvent) -> bool {
        match self {
            LogFilter::All => true,
            LogFilter::Allowed => !event.is_blocked(),
            LogFilter::Blocked => event.is_blocked(),
            LogFilter::Threats => event.is_threat(),
        }
    }

    /// Next filter in tab order, wrapping around
    pub const fn next(self) -> Self {
        match self {
            LogFilter::All => LogFilter::Allowed,
            LogFilter::Allowed => LogFilter::Blocked,
            LogFilter::Blocked => LogFilter::Threats,
            LogFilter::Threats => LogFilter::All,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            LogFilter::All => "All Traffic",
            LogFilter::Allowed => "Allowed",
            LogFilter::Blocked => "Blocked",
            LogFilter::Threats => "Threats",
        }
    }
}

/// Counters shown on the stat cards
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TrafficSummary {
    pub total: usize,
    pub allowed: usize,
    pub blocked: usize,
    pub threats: usize,
    pub bytes: u64,
}

impl TrafficSummary {
    pub fn from_events<'a>(events: impl IntoIterator<Item = &'a TrafficEvent>) -> Self {
        events
            .into_iter()
            .fold(Self::default(), |mut summary, event| {
                summary.total += 1;
                if event.is_blocked() {
                    summary.blocked += 1;
                } else {
                    summary.allowed += 1;
                }
                if event.is_threat() {
                    summary.threats += 1;
                }
                summary.bytes += event.bytes;
                summary
            })
    }

    /// Number of entries a filter tab would show
    pub const fn count_for(&self, filter: LogFilter) -> usize {
        match filter {
            LogFilter::All => self.total,
            LogFilter::Allowed => self.allowed,
            LogFilter::Blocked => self.blocked,
            LogFilter::Threats => self.threats,
        }
    }
}

/// Newest-first ring of events
#[derive(Debug, Clone)]
pub struct TrafficLog {
    events: VecDeque<TrafficEvent>,
    capacity: usize,
}

impl Default for TrafficLog {
    fn default() -> Self {
        Self::with_capacity(LOG_CAPACITY)
    }
}

impl TrafficLog {
    /// Creates an empty log. A zero capacity is raised to one.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Prepends a batch in generation order and evicts the oldest overflow.
    pub fn push_batch(&mut self, batch: impl IntoIterator<Item = TrafficEvent>) {
        for event in batch {
            self.events.push_front(event);
        }
        self.events.truncate(self.capacity);
    }

    pub fn clear(&mut self) {
        self.events.clear();
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

    /// Newest event, if any
    pub fn latest(&self) -> Option<&TrafficEvent> {
        self.events.front()
    }

    /// Events newest-first
    pub fn iter(&self) -> impl Iterator<Item = &TrafficEvent> {
        self.events.iter()
    }

    pub fn iter_filtered(&self, filter: LogFilter) -> impl Iterator<Item = &TrafficEvent> {
        self.events.iter().filter(move |event| filter.matches(event))
    }

    pub fn summary(&self) -> TrafficSummary {
        TrafficSummary::from_events(&self.events)
    }

    /// Copies the entries out, newest-first
    pub fn to_vec(&self) -> Vec<TrafficEvent> {
        self.events.iter().cloned().collect()
    }
}

/// Human-readable byte size ("512 B", "4.2 KB", "1.5 MB")
pub fn format_bytes(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;

    #[allow(clippy::cast_precision_loss)]
    let value = bytes as f64;
    if value < KB {
        format!("{bytes} B")
    } else if value < MB {
        format!("{:.1} KB", value / KB)
    } else {
        format!("{:.1} MB", value / MB)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::test_helpers::{allowed_event, threat_event};

    #[test]
    fn test_batch_order_newest_first() {
        let mut log = TrafficLog::default();
        log.push_batch([allowed_event(1), allowed_event(2), allowed_event(3)]);
        log.push_batch([allowed_event(4)]);

        let ids: Vec<u64> = log.iter().map(|e| e.id.0).collect();
        assert_eq!(ids, vec![4, 3, 2, 1]);
        assert_eq!(log.latest().map(|e| e.id.0), Some(4));
    }

    #[test]
    fn test_overflow_evicts_oldest() {
        let mut log = TrafficLog::with_capacity(3);
        log.push_batch((1..=5).map(allowed_event));

        assert_eq!(log.len(), 3);
        let ids: Vec<u64> = log.iter().map(|e| e.id.0).collect();
        assert_eq!(ids, vec![5, 4, 3]);
    }

    #[test]
    fn test_zero_capacity_is_raised() {
        let mut log = TrafficLog::with_capacity(0);
        log.push_batch([allowed_event(1), allowed_event(2)]);
        assert_eq!(log.capacity(), 1);
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_filters_and_summary() {
        let mut log = TrafficLog::default();
        log.push_batch([
            allowed_event(1),
            threat_event(2, true),
            threat_event(3, false),
            allowed_event(4),
        ]);

        assert_eq!(log.iter_filtered(LogFilter::All).count(), 4);
        assert_eq!(log.iter_filtered(LogFilter::Blocked).count(), 1);
        assert_eq!(log.iter_filtered(LogFilter::Allowed).count(), 3);
        assert_eq!(log.iter_filtered(LogFilter::Threats).count(), 2);

        let summary = log.summary();
        assert_eq!(summary.total, 4);
        assert_eq!(summary.blocked, 1);
        assert_eq!(summary.allowed, 3);
        assert_eq!(summary.threats, 2);
        assert_eq!(summary.count_for(LogFilter::Threats), 2);
    }

    #[test]
    fn test_filter_cycle_wraps() {
        let mut filter = LogFilter::All;
        for _ in 0..4 {
            filter = filter.next();
        }
        assert_eq!(filter, LogFilter::All);
        assert_eq!("threats".parse::<LogFilter>().unwrap(), LogFilter::Threats);
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(4300), "4.2 KB");
        assert_eq!(format_bytes(1_572_864), "1.5 MB");
    }

    #[test]
    fn test_clear_keeps_capacity() {
        let mut log = TrafficLog::with_capacity(10);
        log.push_batch((1..=4).map(allowed_event));
        log.clear();
        assert!(log.is_empty());
        assert_eq!(log.capacity(), 10);
    }
}
