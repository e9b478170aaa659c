//! Device profile and traffic event data structures
//!
//! A [`DeviceProfile`] describes the simulated endpoint; the generator reads it
//! on every tick and produces [`TrafficEvent`] records labelled with the
//! profile's address, operating system and browser.
//!
//! # Example
//!
//! ```
//! use fireguard::core::traffic::{ActivityLevel, DeviceProfile, OperatingSystem, ProfileUpdate};
//!
//! let mut profile = DeviceProfile::default();
//! profile.apply(ProfileUpdate::OperatingSystem(OperatingSystem::Linux));
//! profile.apply(ProfileUpdate::ActivityLevel(ActivityLevel::new(8).unwrap()));
//! assert_eq!(profile.activity_level.get(), 8);
//! ```

use crate::core::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default address of the simulated device
pub const DEFAULT_SOURCE_ADDRESS: &str = "192.168.1.100";

/// Kind of simulated endpoint
#[derive(
    Debug,
    Clone,
    Copy,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    Default,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum DeviceType {
    #[default]
    Laptop,
    Desktop,
    Mobile,
}

impl DeviceType {
    /// Returns display name for UI rendering
    pub const fn display_name(self) -> &'static str {
        match self {
            DeviceType::Laptop => "Laptop",
            DeviceType::Desktop => "Desktop",
            DeviceType::Mobile => "Mobile Device",
        }
    }
}

/// Operating system of the simulated endpoint
///
/// Only some systems have a background service catalog; the rest fall back to
/// the Windows catalog (see [`crate::core::catalog::background_services`]).
#[derive(
    Debug,
    Clone,
    Copy,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    Default,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum OperatingSystem {
    #[default]
    Windows,
    Macos,
    Linux,
    Ios,
    Android,
}

impl OperatingSystem {
    /// Returns display name for UI rendering
    pub const fn display_name(self) -> &'static str {
        match self {
            OperatingSystem::Windows => "Windows",
            OperatingSystem::Macos => "macOS",
            OperatingSystem::Linux => "Linux",
            OperatingSystem::Ios => "iOS",
            OperatingSystem::Android => "Android",
        }
    }
}

/// Primary browser of the simulated endpoint
#[derive(
    Debug,
    Clone,
    Copy,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    Default,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Browser {
    #[default]
    Chrome,
    Firefox,
    Safari,
    Edge,
    Other,
}

impl Browser {
    /// Short name used as the `application` label of browser traffic
    pub const fn display_name(self) -> &'static str {
        match self {
            Browser::Chrome => "Chrome",
            Browser::Firefox => "Firefox",
            Browser::Safari => "Safari",
            Browser::Edge => "Edge",
            Browser::Other => "Other",
        }
    }
}

/// Activity level in `[1, 10]`, drives both tick rate and burst size
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(try_from = "u8", into = "u8")]
pub struct ActivityLevel(u8);

impl ActivityLevel {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 10;

    /// Validates and wraps a raw level.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if `level` is outside `[1, 10]`.
    pub fn new(level: u8) -> Result<Self> {
        if (Self::MIN..=Self::MAX).contains(&level) {
            Ok(Self(level))
        } else {
            Err(Error::validation(
                "activity_level",
                format!("must be between {} and {}", Self::MIN, Self::MAX),
            ))
        }
    }

    /// Builds a level, clamping out-of-range input instead of rejecting it
    pub fn saturating(level: u8) -> Self {
        Self(level.clamp(Self::MIN, Self::MAX))
    }

    pub const fn get(self) -> u8 {
        self.0
    }

    /// One step up, saturating at the maximum
    pub fn increment(self) -> Self {
        Self::saturating(self.0.saturating_add(1))
    }

    /// One step down, saturating at the minimum
    pub fn decrement(self) -> Self {
        Self::saturating(self.0.saturating_sub(1))
    }
}

impl Default for ActivityLevel {
    fn default() -> Self {
        Self(5)
    }
}

impl TryFrom<u8> for ActivityLevel {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        Self::new(value)
    }
}

impl From<ActivityLevel> for u8 {
    fn from(level: ActivityLevel) -> Self {
        level.0
    }
}

impl fmt::Display for ActivityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.0, Self::MAX)
    }
}

/// Simulated endpoint configuration driving traffic synthesis
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeviceProfile {
    #[serde(default)]
    pub device_type: DeviceType,
    #[serde(default)]
    pub operating_system: OperatingSystem,
    #[serde(default)]
    pub browser: Browser,
    /// Free-form text, intentionally not validated
    #[serde(default = "default_source_address")]
    pub source_address: String,
    #[serde(default)]
    pub activity_level: ActivityLevel,
}

fn default_source_address() -> String {
    DEFAULT_SOURCE_ADDRESS.to_string()
}

impl Default for DeviceProfile {
    fn default() -> Self {
        Self {
            device_type: DeviceType::default(),
            operating_system: OperatingSystem::default(),
            browser: Browser::default(),
            source_address: default_source_address(),
            activity_level: ActivityLevel::default(),
        }
    }
}

impl DeviceProfile {
    /// Applies a single-field update.
    ///
    /// Returns `true` when the update changed the activity level, which means
    /// the caller has to reschedule its generation timer.
    pub fn apply(&mut self, update: ProfileUpdate) -> bool {
        match update {
            ProfileUpdate::DeviceType(device_type) => self.device_type = device_type,
            ProfileUpdate::OperatingSystem(os) => self.operating_system = os,
            ProfileUpdate::Browser(browser) => self.browser = browser,
            ProfileUpdate::SourceAddress(address) => self.source_address = address,
            ProfileUpdate::ActivityLevel(level) => {
                let changed = self.activity_level != level;
                self.activity_level = level;
                return changed;
            }
        }
        false
    }

    /// One-line description shown above the traffic table
    pub fn describe(&self) -> String {
        format!(
            "Simulating a {} running {} with {} browser",
            self.device_type.as_ref(),
            self.operating_system.display_name(),
            self.browser.display_name()
        )
    }
}

/// A mutation of exactly one [`DeviceProfile`] field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileUpdate {
    DeviceType(DeviceType),
    OperatingSystem(OperatingSystem),
    Browser(Browser),
    SourceAddress(String),
    ActivityLevel(ActivityLevel),
}

impl ProfileUpdate {
    /// Parses a `field`/`value` pair as typed in a configuration panel.
    ///
    /// Field names accept both `snake_case` and the short forms `os`, `ip`,
    /// `level`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for an unknown field or a value that does
    /// not parse for that field.
    pub fn parse(field: &str, value: &str) -> Result<Self> {
        let value = value.trim();
        let invalid = |what: &str| Error::validation(field, format!("unknown {what} '{value}'"));

        match field.trim().to_ascii_lowercase().as_str() {
            "device_type" | "device" => DeviceType::from_str(value)
                .map(Self::DeviceType)
                .map_err(|_| invalid("device type")),
            "operating_system" | "os" => OperatingSystem::from_str(value)
                .map(Self::OperatingSystem)
                .map_err(|_| invalid("operating system")),
            "browser" => Browser::from_str(value)
                .map(Self::Browser)
                .map_err(|_| invalid("browser")),
            "source_address" | "ip" => Ok(Self::SourceAddress(value.to_string())),
            "activity_level" | "level" => {
                let raw: u8 = value
                    .parse()
                    .map_err(|_| Error::validation(field, "must be a number"))?;
                ActivityLevel::new(raw).map(Self::ActivityLevel)
            }
            _ => Err(Error::validation(field, "unknown profile field")),
        }
    }
}

/// Outcome assigned to a synthesized event
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, strum::Display, strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Disposition {
    Allowed,
    Blocked,
}

/// Which tier of the weighted selection produced an event
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, strum::Display, strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TrafficOrigin {
    /// Operating system background service
    BackgroundService,
    /// Browser housekeeping (updates, sync, extensions)
    BrowserActivity,
    /// User-driven web browsing, the only tier that can carry threats
    Foreground,
}

/// Application-level protocol label of a simulated event
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, strum::Display, strum::AsRefStr,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum AppProtocol {
    Tcp,
    Http,
    Https,
    Dns,
    Ssh,
    Imap,
    Imaps,
    Smtp,
    Smtps,
}

/// Collision-free event identifier, allocated from a per-generator counter
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct EventId(pub u64);

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One synthesized network observation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrafficEvent {
    pub id: EventId,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub source: String,
    pub destination: String,
    pub port: u16,
    pub protocol: AppProtocol,
    pub disposition: Disposition,
    pub bytes: u64,
    pub origin: TrafficOrigin,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threat: Option<String>,
}

impl TrafficEvent {
    pub fn is_threat(&self) -> bool {
        self.threat.is_some()
    }

    pub fn is_blocked(&self) -> bool {
        self.disposition == Disposition::Blocked
    }
}
