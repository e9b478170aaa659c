//! Core traffic simulation functionality
//!
//! This module contains the types and logic behind the simulated endpoint and
//! its network traffic. It provides:
//!
//! - [`traffic`]: Device profile and traffic event data structures
//! - [`catalog`]: Static destination, service and threat catalogs
//! - [`generator`]: Weighted random synthesis of traffic events
//! - [`traffic_log`]: Bounded newest-first event log, filters and summaries
//! - [`simulator`]: Start/pause/resume lifecycle and the periodic generation task
//! - [`rules`]: Educational firewall rule store with undo/redo
//! - [`error`]: Error types shared by the whole crate

pub mod catalog;
pub mod error;
pub mod generator;
pub mod rules;
pub mod simulator;
pub mod traffic;
pub mod traffic_log;

#[cfg(test)]
pub mod test_helpers;
