//! Synthetic traffic generation
//!
//! [`TrafficGenerator`] turns a [`DeviceProfile`] into batches of plausible
//! [`TrafficEvent`]s. It owns its random source and an id counter; it does no
//! I/O and never fails.
//!
//! # Selection
//!
//! Each event rolls a tier from [`GenerationWeights`]:
//!
//! | Tier                   | Weight | Disposition                  |
//! |------------------------|--------|------------------------------|
//! | OS background service  | 3      | allowed                      |
//! | Browser housekeeping   | 2      | allowed                      |
//! | Foreground browsing    | 5      | allowed, or threat (5%)      |
//!
//! A foreground threat is blocked 80% of the time.
//!
//! # Rate
//!
//! The activity level controls both the burst size ([`events_per_tick`]) and
//! the timer period ([`tick_interval`]).
//!
//! # Example
//!
//! ```
//! use fireguard::core::generator::TrafficGenerator;
//! use fireguard::core::traffic::DeviceProfile;
//!
//! let mut generator = TrafficGenerator::seeded(42);
//! let batch = generator.generate_batch(&DeviceProfile::default());
//! assert_eq!(batch.len(), 1); // level 5 emits one event per tick
//! ```

use crate::core::catalog::{
    self, BROWSER_UPDATE_ADDRESS, DESTINATIONS, THREAT_DESTINATION_PREFIX, THREAT_SOURCE_PREFIX,
    THREATS,
};
use crate::core::error::{Error, Result};
use crate::core::traffic::{
    ActivityLevel, DeviceProfile, Disposition, EventId, TrafficEvent, TrafficOrigin,
};
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Relative weight of OS background service events
pub const BACKGROUND_SERVICE_WEIGHT: f64 = 3.0;
/// Relative weight of browser housekeeping events
pub const BROWSER_ACTIVITY_WEIGHT: f64 = 2.0;
/// Relative weight of foreground browsing events
pub const FOREGROUND_WEIGHT: f64 = 5.0;
/// Probability that a foreground event is a threat
pub const THREAT_PROBABILITY: f64 = 0.05;
/// Probability that a threat is blocked rather than slipping through
pub const THREAT_BLOCK_PROBABILITY: f64 = 0.80;

/// Slowest tick period, at activity level 0 (before the floor applies)
pub const BASE_TICK_INTERVAL_MS: u64 = 2000;
/// Period reduction per activity level step
pub const TICK_INTERVAL_STEP_MS: u64 = 150;
/// Fastest allowed tick period
pub const MIN_TICK_INTERVAL_MS: u64 = 500;

/// Exclusive upper bounds for the simulated payload size of each event kind
const BACKGROUND_MAX_BYTES: u64 = 5_000;
const BROWSER_MAX_BYTES: u64 = 10_000;
const THREAT_MAX_BYTES: u64 = 15_000;
const BROWSING_MAX_BYTES: u64 = 20_000;

/// Application label of OS background traffic
const SYSTEM_APPLICATION: &str = "System";

/// Timer period for `level`: `max(500ms, 2000ms - level * 150ms)`.
pub fn tick_interval(level: ActivityLevel) -> Duration {
    let reduction = u64::from(level.get()) * TICK_INTERVAL_STEP_MS;
    let millis = BASE_TICK_INTERVAL_MS
        .saturating_sub(reduction)
        .max(MIN_TICK_INTERVAL_MS);
    Duration::from_millis(millis)
}

/// Events emitted per tick for `level`: `max(1, level / 3)`.
pub fn events_per_tick(level: ActivityLevel) -> usize {
    usize::from(level.get() / 3).max(1)
}

/// Tunable thresholds of the weighted selection
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GenerationWeights {
    #[serde(default = "default_background_weight")]
    pub background_service: f64,
    #[serde(default = "default_browser_weight")]
    pub browser_activity: f64,
    #[serde(default = "default_foreground_weight")]
    pub foreground: f64,
    #[serde(default = "default_threat_probability")]
    pub threat_probability: f64,
    #[serde(default = "default_threat_block_probability")]
    pub threat_block_probability: f64,
}

fn default_background_weight() -> f64 {
    BACKGROUND_SERVICE_WEIGHT
}

fn default_browser_weight() -> f64 {
    BROWSER_ACTIVITY_WEIGHT
}

fn default_foreground_weight() -> f64 {
    FOREGROUND_WEIGHT
}

fn default_threat_probability() -> f64 {
    THREAT_PROBABILITY
}

fn default_threat_block_probability() -> f64 {
    THREAT_BLOCK_PROBABILITY
}

impl Default for GenerationWeights {
    fn default() -> Self {
        Self {
            background_service: BACKGROUND_SERVICE_WEIGHT,
            browser_activity: BROWSER_ACTIVITY_WEIGHT,
            foreground: FOREGROUND_WEIGHT,
            threat_probability: THREAT_PROBABILITY,
            threat_block_probability: THREAT_BLOCK_PROBABILITY,
        }
    }
}

impl GenerationWeights {
    /// Checks that the weights describe a usable distribution.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if a weight is negative or not finite,
    /// all weights are zero, or a probability is outside `[0, 1]`.
    pub fn validate(&self) -> Result<()> {
        let tiers = [
            ("weights.background_service", self.background_service),
            ("weights.browser_activity", self.browser_activity),
            ("weights.foreground", self.foreground),
        ];
        for (field, weight) in tiers {
            if !weight.is_finite() || weight < 0.0 {
                return Err(Error::validation(field, "must be a non-negative number"));
            }
        }
        if self.total() <= 0.0 {
            return Err(Error::validation(
                "weights",
                "at least one tier weight must be positive",
            ));
        }
        // Individually finite weights can still overflow when summed
        if !self.total().is_finite() {
            return Err(Error::validation("weights", "tier weights sum is too large"));
        }

        let probabilities = [
            ("weights.threat_probability", self.threat_probability),
            (
                "weights.threat_block_probability",
                self.threat_block_probability,
            ),
        ];
        for (field, p) in probabilities {
            if !(0.0..=1.0).contains(&p) {
                return Err(Error::validation(field, "must be between 0 and 1"));
            }
        }
        Ok(())
    }

    /// Width of the category roll range
    pub fn total(&self) -> f64 {
        self.background_service + self.browser_activity + self.foreground
    }

    /// Maps a roll in `[0, total)` onto a tier
    pub fn tier_for(&self, roll: f64) -> TrafficOrigin {
        if roll < self.background_service {
            TrafficOrigin::BackgroundService
        } else if roll < self.background_service + self.browser_activity {
            TrafficOrigin::BrowserActivity
        } else {
            TrafficOrigin::Foreground
        }
    }
}

/// Randomized event synthesizer
#[derive(Debug)]
pub struct TrafficGenerator<R = StdRng> {
    rng: R,
    weights: GenerationWeights,
    next_id: u64,
}

impl TrafficGenerator<StdRng> {
    /// Generator seeded from the operating system's entropy source
    pub fn from_entropy() -> Self {
        Self::with_rng(StdRng::from_os_rng(), GenerationWeights::default())
    }

    /// Deterministic generator for reproducible runs
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed), GenerationWeights::default())
    }
}

impl<R: Rng> TrafficGenerator<R> {
    pub fn with_rng(rng: R, weights: GenerationWeights) -> Self {
        Self {
            rng,
            weights,
            next_id: 1,
        }
    }

    /// Replaces the selection weights, keeping the id sequence
    pub fn with_weights(mut self, weights: GenerationWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn weights(&self) -> &GenerationWeights {
        &self.weights
    }

    /// Number of events generated so far
    pub fn generated(&self) -> u64 {
        self.next_id - 1
    }

    /// Generates one tick worth of events, in generation order.
    pub fn generate_batch(&mut self, profile: &DeviceProfile) -> Vec<TrafficEvent> {
        let count = events_per_tick(profile.activity_level);
        (0..count).map(|_| self.generate_event(profile)).collect()
    }

    /// Generates a single event.
    pub fn generate_event(&mut self, profile: &DeviceProfile) -> TrafficEvent {
        let roll = self.rng.random_range(0.0..self.weights.total());
        match self.weights.tier_for(roll) {
            TrafficOrigin::BackgroundService => self.background_service(profile),
            TrafficOrigin::BrowserActivity => self.browser_activity(profile),
            TrafficOrigin::Foreground => self.foreground(profile),
        }
    }

    fn allocate_id(&mut self) -> EventId {
        let id = EventId(self.next_id);
        self.next_id += 1;
        id
    }

    fn pick<'a, T>(&mut self, items: &'a [T]) -> &'a T {
        // Catalogs are static and non-empty
        items
            .choose(&mut self.rng)
            .unwrap_or_else(|| unreachable!("catalog pools are never empty"))
    }

    fn background_service(&mut self, profile: &DeviceProfile) -> TrafficEvent {
        let service = *self.pick(catalog::background_services(profile.operating_system));
        let destination = *self.pick(catalog::operating_system_addresses());

        TrafficEvent {
            id: self.allocate_id(),
            timestamp: chrono::Utc::now(),
            source: profile.source_address.clone(),
            destination: destination.to_string(),
            port: service.port,
            protocol: service.protocol,
            disposition: Disposition::Allowed,
            bytes: self.rng.random_range(0..BACKGROUND_MAX_BYTES),
            origin: TrafficOrigin::BackgroundService,
            application: Some(SYSTEM_APPLICATION.to_string()),
            activity: Some(service.name.to_string()),
            threat: None,
        }
    }

    fn browser_activity(&mut self, profile: &DeviceProfile) -> TrafficEvent {
        let activity = *self.pick(catalog::browser_activities(profile.browser));

        TrafficEvent {
            id: self.allocate_id(),
            timestamp: chrono::Utc::now(),
            source: profile.source_address.clone(),
            destination: BROWSER_UPDATE_ADDRESS.to_string(),
            port: activity.port,
            protocol: activity.protocol,
            disposition: Disposition::Allowed,
            bytes: self.rng.random_range(0..BROWSER_MAX_BYTES),
            origin: TrafficOrigin::BrowserActivity,
            application: Some(profile.browser.display_name().to_string()),
            activity: Some(activity.name.to_string()),
            threat: None,
        }
    }

    fn foreground(&mut self, profile: &DeviceProfile) -> TrafficEvent {
        let pool = *self.pick(DESTINATIONS);

        if self.rng.random_bool(self.weights.threat_probability) {
            return self.threat(profile);
        }

        let destination = *self.pick(pool.addresses);
        let port = *self.pick(pool.ports);
        let protocol = *self.pick(pool.protocols);

        TrafficEvent {
            id: self.allocate_id(),
            timestamp: chrono::Utc::now(),
            source: profile.source_address.clone(),
            destination: destination.to_string(),
            port,
            protocol,
            disposition: Disposition::Allowed,
            bytes: self.rng.random_range(0..BROWSING_MAX_BYTES),
            origin: TrafficOrigin::Foreground,
            application: Some(profile.browser.display_name().to_string()),
            activity: Some(format!("Browsing {}", pool.category)),
            threat: None,
        }
    }

    fn threat(&mut self, profile: &DeviceProfile) -> TrafficEvent {
        let threat = *self.pick(THREATS);
        let source = self.endpoint(profile, THREAT_SOURCE_PREFIX);
        let destination = self.endpoint(profile, THREAT_DESTINATION_PREFIX);
        let disposition = if self.rng.random_bool(self.weights.threat_block_probability) {
            Disposition::Blocked
        } else {
            Disposition::Allowed
        };

        tracing::debug!(threat = threat.name, %disposition, "simulated threat");

        TrafficEvent {
            id: self.allocate_id(),
            timestamp: chrono::Utc::now(),
            source,
            destination,
            port: threat.port,
            protocol: threat.protocol,
            disposition,
            bytes: self.rng.random_range(0..THREAT_MAX_BYTES),
            origin: TrafficOrigin::Foreground,
            application: Some(profile.browser.display_name().to_string()),
            activity: None,
            threat: Some(threat.name.to_string()),
        }
    }

    /// Either the device's own address or a random host in `prefix.0/24`
    fn endpoint(&mut self, profile: &DeviceProfile, prefix: &str) -> String {
        if self.rng.random_bool(0.5) {
            profile.source_address.clone()
        } else {
            format!("{prefix}.{}", self.rng.random_range(0..255u8))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::traffic::{Browser, OperatingSystem};

    fn level(n: u8) -> ActivityLevel {
        ActivityLevel::new(n).unwrap()
    }

    #[test]
    fn test_tick_interval_table() {
        assert_eq!(tick_interval(level(1)), Duration::from_millis(1850));
        assert_eq!(tick_interval(level(5)), Duration::from_millis(1250));
        assert_eq!(tick_interval(level(9)), Duration::from_millis(650));
        assert_eq!(tick_interval(level(10)), Duration::from_millis(500));
    }

    #[test]
    fn test_events_per_tick_table() {
        let expected = [1, 1, 1, 1, 1, 2, 2, 2, 3, 3];
        for (n, want) in (1..=10).zip(expected) {
            assert_eq!(events_per_tick(level(n)), want, "level {n}");
        }
    }

    #[test]
    fn test_tier_boundaries() {
        let weights = GenerationWeights::default();
        assert_eq!(weights.tier_for(0.0), TrafficOrigin::BackgroundService);
        assert_eq!(weights.tier_for(2.999), TrafficOrigin::BackgroundService);
        assert_eq!(weights.tier_for(3.0), TrafficOrigin::BrowserActivity);
        assert_eq!(weights.tier_for(4.999), TrafficOrigin::BrowserActivity);
        assert_eq!(weights.tier_for(5.0), TrafficOrigin::Foreground);
        assert_eq!(weights.tier_for(9.999), TrafficOrigin::Foreground);
    }

    #[test]
    fn test_weights_validation() {
        assert!(GenerationWeights::default().validate().is_ok());

        let negative = GenerationWeights {
            browser_activity: -1.0,
            ..GenerationWeights::default()
        };
        assert!(negative.validate().is_err());

        let all_zero = GenerationWeights {
            background_service: 0.0,
            browser_activity: 0.0,
            foreground: 0.0,
            ..GenerationWeights::default()
        };
        assert!(all_zero.validate().is_err());

        let overflowing = GenerationWeights {
            background_service: 1e308,
            browser_activity: 1e308,
            foreground: 1.0,
            ..GenerationWeights::default()
        };
        assert!(overflowing.total().is_infinite());
        assert!(overflowing.validate().is_err());

        let bad_probability = GenerationWeights {
            threat_probability: 1.5,
            ..GenerationWeights::default()
        };
        assert!(bad_probability.validate().is_err());
    }

    #[test]
    fn test_ids_are_unique_within_a_batch() {
        let mut generator = TrafficGenerator::seeded(7);
        let profile = DeviceProfile {
            activity_level: level(10),
            ..DeviceProfile::default()
        };
        let batch = generator.generate_batch(&profile);
        assert_eq!(batch.len(), 3);
        assert!(batch.windows(2).all(|w| w[0].id < w[1].id));
        assert_eq!(generator.generated(), 3);
    }

    #[test]
    fn test_background_only_weights() {
        let weights = GenerationWeights {
            background_service: 1.0,
            browser_activity: 0.0,
            foreground: 0.0,
            ..GenerationWeights::default()
        };
        let mut generator = TrafficGenerator::seeded(1).with_weights(weights);
        let profile = DeviceProfile {
            operating_system: OperatingSystem::Linux,
            ..DeviceProfile::default()
        };

        for _ in 0..50 {
            let event = generator.generate_event(&profile);
            assert_eq!(event.origin, TrafficOrigin::BackgroundService);
            assert_eq!(event.application.as_deref(), Some("System"));
            assert!(event.bytes < BACKGROUND_MAX_BYTES);
            assert!(catalog::operating_system_addresses().contains(&event.destination.as_str()));
            let activity = event.activity.unwrap();
            assert!(
                ["APT Update", "System Sync", "Package Manager"].contains(&activity.as_str()),
                "unexpected linux service {activity}"
            );
        }
    }

    #[test]
    fn test_browser_fallback_for_other() {
        let weights = GenerationWeights {
            background_service: 0.0,
            browser_activity: 1.0,
            foreground: 0.0,
            ..GenerationWeights::default()
        };
        let mut generator = TrafficGenerator::seeded(3).with_weights(weights);
        let profile = DeviceProfile {
            browser: Browser::Other,
            ..DeviceProfile::default()
        };

        for _ in 0..20 {
            let event = generator.generate_event(&profile);
            assert_eq!(event.destination, BROWSER_UPDATE_ADDRESS);
            assert_eq!(event.application.as_deref(), Some("Other"));
            assert!(event.activity.unwrap().starts_with("Chrome"));
        }
    }

    #[test]
    fn test_forced_threats_are_labelled() {
        let weights = GenerationWeights {
            background_service: 0.0,
            browser_activity: 0.0,
            foreground: 1.0,
            threat_probability: 1.0,
            threat_block_probability: 1.0,
        };
        let mut generator = TrafficGenerator::seeded(11).with_weights(weights);
        let profile = DeviceProfile::default();

        for _ in 0..30 {
            let event = generator.generate_event(&profile);
            assert!(event.is_threat());
            assert!(event.is_blocked());
            assert!(event.activity.is_none());
            assert!(
                event.source == profile.source_address
                    || event.source.starts_with("45.33.97."),
                "unexpected threat source {}",
                event.source
            );
            assert!(
                event.destination == profile.source_address
                    || event.destination.starts_with("103.235.46."),
                "unexpected threat destination {}",
                event.destination
            );
        }
    }

    #[test]
    fn test_benign_browsing_activity_label() {
        let weights = GenerationWeights {
            background_service: 0.0,
            browser_activity: 0.0,
            foreground: 1.0,
            threat_probability: 0.0,
            ..GenerationWeights::default()
        };
        let mut generator = TrafficGenerator::seeded(5).with_weights(weights);

        for _ in 0..30 {
            let event = generator.generate_event(&DeviceProfile::default());
            assert!(!event.is_threat());
            assert_eq!(event.disposition, Disposition::Allowed);
            assert!(event.activity.unwrap().starts_with("Browsing "));
            assert!(event.bytes < BROWSING_MAX_BYTES);
        }
    }

    #[test]
    fn test_seeded_generators_agree() {
        let profile = DeviceProfile::default();
        let mut a = TrafficGenerator::seeded(99);
        let mut b = TrafficGenerator::seeded(99);
        for _ in 0..10 {
            let left = a.generate_event(&profile);
            let right = b.generate_event(&profile);
            assert_eq!(left.destination, right.destination);
            assert_eq!(left.bytes, right.bytes);
            assert_eq!(left.origin, right.origin);
        }
    }
}
