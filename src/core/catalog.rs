//! Fixed catalogs the traffic generator draws from
//!
//! Everything here is static data: destination categories with their address,
//! port and protocol pools, per-OS background services, per-browser
//! housekeeping activities, and the threat catalog.
//!
//! Lookups never fail. An operating system or browser without its own catalog
//! gets the default one ([`OperatingSystem::Windows`] and [`Browser::Chrome`]).

use crate::core::traffic::{AppProtocol, Browser, OperatingSystem};

/// Destination of browser housekeeping traffic (update and sync servers)
pub const BROWSER_UPDATE_ADDRESS: &str = "34.107.221.82";

/// First three octets of the external host a simulated threat talks from
pub const THREAT_SOURCE_PREFIX: &str = "45.33.97";

/// First three octets of the external host a simulated threat talks to
pub const THREAT_DESTINATION_PREFIX: &str = "103.235.46";

/// Named background process or browser task with its fixed port/protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceEntry {
    pub name: &'static str,
    pub port: u16,
    pub protocol: AppProtocol,
}

const fn service(name: &'static str, port: u16, protocol: AppProtocol) -> ServiceEntry {
    ServiceEntry {
        name,
        port,
        protocol,
    }
}

/// Simulated attack pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreatEntry {
    pub name: &'static str,
    pub port: u16,
    pub protocol: AppProtocol,
}

/// Kind of site a foreground request goes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumIter)]
pub enum DestinationCategory {
    Google,
    YouTube,
    #[strum(serialize = "Social Media")]
    SocialMedia,
    Email,
    Streaming,
    #[strum(serialize = "Cloud Services")]
    CloudServices,
    #[strum(serialize = "Operating System")]
    OperatingSystem,
}

/// Address, port and protocol pools of one destination category
#[derive(Debug, Clone, Copy)]
pub struct DestinationPool {
    pub category: DestinationCategory,
    pub addresses: &'static [&'static str],
    pub ports: &'static [u16],
    pub protocols: &'static [AppProtocol],
}

pub const DESTINATIONS: &[DestinationPool] = &[
    DestinationPool {
        category: DestinationCategory::Google,
        addresses: &["142.250.190.78", "172.217.22.14", "216.58.210.46"],
        ports: &[443, 80],
        protocols: &[AppProtocol::Https, AppProtocol::Http],
    },
    DestinationPool {
        category: DestinationCategory::YouTube,
        addresses: &["208.65.153.238", "208.117.236.69", "74.125.24.91"],
        ports: &[443],
        protocols: &[AppProtocol::Https],
    },
    DestinationPool {
        category: DestinationCategory::SocialMedia,
        addresses: &[
            "157.240.22.35",
            "3.123.23.159",
            "104.244.42.193",
            "92.223.96.5",
        ],
        ports: &[443],
        protocols: &[AppProtocol::Https],
    },
    DestinationPool {
        category: DestinationCategory::Email,
        addresses: &["142.250.4.17", "40.101.91.6", "74.6.143.25"],
        ports: &[993, 587, 465, 143],
        protocols: &[
            AppProtocol::Imaps,
            AppProtocol::Smtp,
            AppProtocol::Smtps,
            AppProtocol::Imap,
        ],
    },
    DestinationPool {
        category: DestinationCategory::Streaming,
        addresses: &[
            "54.236.123.17",
            "35.186.224.25",
            "151.101.66.167",
            "184.50.87.112",
        ],
        ports: &[443],
        protocols: &[AppProtocol::Https],
    },
    DestinationPool {
        category: DestinationCategory::CloudServices,
        addresses: &[
            "162.125.6.1",
            "13.107.42.13",
            "17.57.144.19",
            "142.250.4.101",
        ],
        ports: &[443],
        protocols: &[AppProtocol::Https],
    },
    DestinationPool {
        category: DestinationCategory::OperatingSystem,
        addresses: &[
            "40.112.72.205",
            "17.253.144.10",
            "185.125.190.17",
            "40.113.200.201",
        ],
        ports: &[443, 80],
        protocols: &[AppProtocol::Https, AppProtocol::Http],
    },
];

const WINDOWS_SERVICES: &[ServiceEntry] = &[
    service("Windows Update", 443, AppProtocol::Https),
    service("Microsoft Defender", 443, AppProtocol::Https),
    service("OneDrive Sync", 443, AppProtocol::Https),
    service("Windows Telemetry", 443, AppProtocol::Https),
];

const MACOS_SERVICES: &[ServiceEntry] = &[
    service("macOS Update", 443, AppProtocol::Https),
    service("iCloud Sync", 443, AppProtocol::Https),
    service("Spotlight Indexing", 443, AppProtocol::Https),
    service("Apple Analytics", 443, AppProtocol::Https),
];

const LINUX_SERVICES: &[ServiceEntry] = &[
    service("APT Update", 80, AppProtocol::Http),
    service("System Sync", 443, AppProtocol::Https),
    service("Package Manager", 80, AppProtocol::Http),
];

/// Operating systems with their own background service catalog
const BACKGROUND_SERVICES: &[(OperatingSystem, &[ServiceEntry])] = &[
    (OperatingSystem::Windows, WINDOWS_SERVICES),
    (OperatingSystem::Macos, MACOS_SERVICES),
    (OperatingSystem::Linux, LINUX_SERVICES),
];

const CHROME_ACTIVITIES: &[ServiceEntry] = &[
    service("Chrome Update", 443, AppProtocol::Https),
    service("Chrome Sync", 443, AppProtocol::Https),
    service("Chrome Extensions", 443, AppProtocol::Https),
];

const FIREFOX_ACTIVITIES: &[ServiceEntry] = &[
    service("Firefox Update", 443, AppProtocol::Https),
    service("Firefox Sync", 443, AppProtocol::Https),
    service("Firefox Add-ons", 443, AppProtocol::Https),
];

const SAFARI_ACTIVITIES: &[ServiceEntry] = &[
    service("Safari Update", 443, AppProtocol::Https),
    service("iCloud Bookmarks", 443, AppProtocol::Https),
];

const EDGE_ACTIVITIES: &[ServiceEntry] = &[
    service("Edge Update", 443, AppProtocol::Https),
    service("Edge Sync", 443, AppProtocol::Https),
    service("Edge Extensions", 443, AppProtocol::Https),
];

/// Browsers with their own housekeeping catalog
const BROWSER_ACTIVITIES: &[(Browser, &[ServiceEntry])] = &[
    (Browser::Chrome, CHROME_ACTIVITIES),
    (Browser::Firefox, FIREFOX_ACTIVITIES),
    (Browser::Safari, SAFARI_ACTIVITIES),
    (Browser::Edge, EDGE_ACTIVITIES),
];

pub const THREATS: &[ThreatEntry] = &[
    ThreatEntry {
        name: "Suspicious Login Attempt",
        port: 22,
        protocol: AppProtocol::Ssh,
    },
    ThreatEntry {
        name: "Port Scan",
        port: 0,
        protocol: AppProtocol::Tcp,
    },
    ThreatEntry {
        name: "Malware Communication",
        port: 8080,
        protocol: AppProtocol::Http,
    },
    ThreatEntry {
        name: "Phishing Site",
        port: 443,
        protocol: AppProtocol::Https,
    },
    ThreatEntry {
        name: "Unauthorized DNS Query",
        port: 53,
        protocol: AppProtocol::Dns,
    },
    ThreatEntry {
        name: "Suspicious File Download",
        port: 443,
        protocol: AppProtocol::Https,
    },
];

/// Background services for `os`, falling back to the Windows catalog.
pub fn background_services(os: OperatingSystem) -> &'static [ServiceEntry] {
    BACKGROUND_SERVICES
        .iter()
        .find(|(key, _)| *key == os)
        .map_or(WINDOWS_SERVICES, |&(_, services)| services)
}

/// Housekeeping activities for `browser`, falling back to the Chrome catalog.
pub fn browser_activities(browser: Browser) -> &'static [ServiceEntry] {
    BROWSER_ACTIVITIES
        .iter()
        .find(|(key, _)| *key == browser)
        .map_or(CHROME_ACTIVITIES, |&(_, activities)| activities)
}

/// Address pool used as destination of OS background services.
pub fn operating_system_addresses() -> &'static [&'static str] {
    destination(DestinationCategory::OperatingSystem).addresses
}

/// Pools of a destination category.
pub fn destination(category: DestinationCategory) -> &'static DestinationPool {
    DESTINATIONS
        .iter()
        .find(|pool| pool.category == category)
        .unwrap_or(&DESTINATIONS[DESTINATIONS.len() - 1])
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_every_category_has_non_empty_pools() {
        for category in DestinationCategory::iter() {
            let pool = destination(category);
            assert_eq!(pool.category, category);
            assert!(!pool.addresses.is_empty(), "{category} has no addresses");
            assert!(!pool.ports.is_empty(), "{category} has no ports");
            assert!(!pool.protocols.is_empty(), "{category} has no protocols");
        }
        assert_eq!(DESTINATIONS.len(), DestinationCategory::iter().count());
    }

    #[test]
    fn test_os_without_catalog_falls_back_to_windows() {
        assert_eq!(background_services(OperatingSystem::Ios), WINDOWS_SERVICES);
        assert_eq!(background_services(OperatingSystem::Android), WINDOWS_SERVICES);
        assert_eq!(background_services(OperatingSystem::Linux), LINUX_SERVICES);
    }

    #[test]
    fn test_browser_without_catalog_falls_back_to_chrome() {
        assert_eq!(browser_activities(Browser::Other), CHROME_ACTIVITIES);
        assert_eq!(browser_activities(Browser::Safari), SAFARI_ACTIVITIES);
    }

    #[test]
    fn test_category_labels() {
        assert_eq!(DestinationCategory::SocialMedia.to_string(), "Social Media");
        assert_eq!(
            DestinationCategory::CloudServices.to_string(),
            "Cloud Services"
        );
        assert_eq!(DestinationCategory::YouTube.to_string(), "YouTube");
    }

    #[test]
    fn test_threat_catalog() {
        assert_eq!(THREATS.len(), 6);
        assert!(THREATS.iter().any(|t| t.name == "Port Scan" && t.port == 0));
    }
}
