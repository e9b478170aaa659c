//! FireGuard - a teaching firewall dashboard backend
//!
//! Simulates the network traffic of a configurable endpoint so that students
//! can watch allowed, blocked and malicious connections scroll by, and manage
//! a small rule list alongside it.
//!
//! # Architecture
//!
//! - [`core`] - Traffic synthesis, the rolling log, the simulator and rules
//! - [`command`] - Undoable rule edits
//! - [`contact`] - Contact form validation and mail relay
//! - [`monitor`] - Terminal dashboard over a running simulator
//! - [`validators`] - Input validation and sanitization
//! - [`config`] - Configuration persistence
//! - [`utils`] - Utility functions (XDG directories, text fitting)
//!
//! # Example
//!
//! ```
//! use fireguard::core::generator::TrafficGenerator;
//! use fireguard::core::traffic::DeviceProfile;
//! use fireguard::core::traffic_log::TrafficLog;
//!
//! let mut generator = TrafficGenerator::seeded(1);
//! let mut log = TrafficLog::default();
//! log.push_batch(generator.generate_batch(&DeviceProfile::default()));
//! assert_eq!(log.len(), 1);
//! ```

// Allow pedantic clippy warnings that are not worth fixing for this codebase
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::needless_lifetimes)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::missing_errors_doc)]

pub mod command;
pub mod config;
pub mod contact;
pub mod core;
pub mod monitor;
pub mod utils;
pub mod validators;

// Re-export commonly used types
pub use core::error::{Error, Result};
pub use core::simulator::{RunState, SimulationSnapshot, Simulator};
pub use core::traffic::{DeviceProfile, ProfileUpdate, TrafficEvent};
