//! Shared test utilities for core module tests
//!
//! Hand-built events and profiles with known contents, so tests of the log,
//! the summaries and the monitor do not depend on the generator's RNG.
//! This module is only compiled in test mode.

use crate::core::traffic::{
    ActivityLevel, AppProtocol, Browser, DeviceProfile, Disposition, EventId, OperatingSystem,
    TrafficEvent, TrafficOrigin,
};
use chrono::Utc;

/// An allowed foreground HTTPS request with the given id.
pub fn allowed_event(id: u64) -> TrafficEvent {
    TrafficEvent {
        id: EventId(id),
        timestamp: Utc::now(),
        source: "192.168.1.100".to_string(),
        destination: "142.250.190.78".to_string(),
        port: 443,
        protocol: AppProtocol::Https,
        disposition: Disposition::Allowed,
        bytes: 1_000,
        origin: TrafficOrigin::Foreground,
        application: Some("Chrome".to_string()),
        activity: Some("Browsing Google".to_string()),
        threat: None,
    }
}

/// A port scan threat with the given id, blocked or let through.
pub fn threat_event(id: u64, blocked: bool) -> TrafficEvent {
    TrafficEvent {
        id: EventId(id),
        timestamp: Utc::now(),
        source: "45.33.97.12".to_string(),
        destination: "192.168.1.100".to_string(),
        port: 0,
        protocol: AppProtocol::Tcp,
        disposition: if blocked {
            Disposition::Blocked
        } else {
            Disposition::Allowed
        },
        bytes: 2_500,
        origin: TrafficOrigin::Foreground,
        application: Some("Chrome".to_string()),
        activity: None,
        threat: Some("Port Scan".to_string()),
    }
}

/// A profile with the given level, OS and browser; other fields default.
///
/// # Panics
///
/// Panics if `level` is outside `[1, 10]`.
pub fn profile(level: u8, operating_system: OperatingSystem, browser: Browser) -> DeviceProfile {
    DeviceProfile {
        operating_system,
        browser,
        activity_level: ActivityLevel::new(level).expect("test level in range"),
        ..DeviceProfile::default()
    }
}
