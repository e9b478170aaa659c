//! Integration tests for FireGuard
//!
//! These tests drive the public API end to end: the simulator lifecycle on a
//! paused Tokio clock, config-driven construction, the rule store and the
//! contact outbox.
//!
//! ```bash
//! cargo test --test integration_tests
//! ```

#![allow(clippy::uninlined_format_args)]

use fireguard::config::{AppConfig, load_config_from, save_config_to};
use fireguard::contact::{
    self, ContactForm, MESSAGE_INVALID, MESSAGE_SENT, OutboxRelay, RelayCredentials,
};
use fireguard::core::generator::TrafficGenerator;
use fireguard::core::rules::{RuleAction, RuleDraft, RuleProtocol, RuleStore};
use fireguard::core::traffic::{
    ActivityLevel, Browser, DeviceProfile, OperatingSystem, ProfileUpdate,
};
use fireguard::core::traffic_log::{LogFilter, TrafficLog};
use fireguard::{RunState, Simulator};
use std::time::Duration;
use tempfile::TempDir;

fn busy_profile() -> DeviceProfile {
    DeviceProfile {
        operating_system: OperatingSystem::Linux,
        browser: Browser::Chrome,
        activity_level: ActivityLevel::new(10).unwrap(),
        ..DeviceProfile::default()
    }
}

fn simulator_with(profile: DeviceProfile) -> Simulator {
    Simulator::new(profile, TrafficGenerator::seeded(42), TrafficLog::default())
}

async fn advance(millis: u64) {
    tokio::time::sleep(Duration::from_millis(millis)).await;
}

fn event_count(simulator: &Simulator) -> usize {
    simulator.snapshot().events.len()
}

// ============================================================================
// Simulator lifecycle
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_busy_linux_chrome_run() {
    let simulator = simulator_with(busy_profile());
    simulator.start().unwrap();

    // Level 10: a 500ms period with 3 events per tick, 5 ticks by 2750ms
    advance(2750).await;

    let snapshot = simulator.snapshot();
    assert_eq!(snapshot.run_state, RunState::Running);
    assert_eq!(snapshot.events.len(), 15);
    assert_eq!(snapshot.total_generated, 15);
    for event in &snapshot.events {
        assert!(!event.protocol.as_ref().is_empty());
        if event.is_blocked() {
            assert!(event.is_threat());
        }
    }
    assert!(snapshot.events.windows(2).all(|w| w[0].id > w[1].id));
}

#[tokio::test(start_paused = true)]
async fn test_pause_right_after_start_then_resume() {
    let simulator = simulator_with(busy_profile());
    simulator.start().unwrap();
    simulator.pause();

    advance(2000).await;
    assert_eq!(simulator.run_state(), RunState::Paused);
    assert_eq!(event_count(&simulator), 0);

    simulator.resume().unwrap();
    advance(600).await;
    assert_eq!(event_count(&simulator), 3);

    simulator.pause();
    advance(2000).await;
    assert_eq!(event_count(&simulator), 3);

    simulator.resume().unwrap();
    advance(1100).await;
    assert_eq!(event_count(&simulator), 9);
}

#[tokio::test(start_paused = true)]
async fn test_clear_while_running_keeps_generating() {
    let simulator = simulator_with(busy_profile());
    simulator.start().unwrap();

    advance(1100).await;
    assert_eq!(event_count(&simulator), 6);

    simulator.clear();
    assert_eq!(event_count(&simulator), 0);
    assert_eq!(simulator.run_state(), RunState::Running);

    // Next tick is still on the original 500ms grid, at 1500ms
    advance(500).await;
    assert_eq!(event_count(&simulator), 3);
}

#[tokio::test(start_paused = true)]
async fn test_start_resets_log() {
    let simulator = simulator_with(busy_profile());
    simulator.start().unwrap();
    advance(1100).await;
    assert_eq!(event_count(&simulator), 6);

    simulator.start().unwrap();
    assert_eq!(event_count(&simulator), 0);

    advance(600).await;
    let snapshot = simulator.snapshot();
    assert_eq!(snapshot.events.len(), 3);
    // Ids keep counting across restarts
    assert_eq!(snapshot.total_generated, 9);
}

#[tokio::test(start_paused = true)]
async fn test_level_change_reschedules() {
    let profile = DeviceProfile {
        activity_level: ActivityLevel::new(1).unwrap(),
        ..busy_profile()
    };
    let simulator = simulator_with(profile);
    simulator.start().unwrap();
    let first_epoch = simulator.snapshot().epoch;

    // Level 1 ticks every 1850ms
    advance(1000).await;
    assert_eq!(event_count(&simulator), 0);

    simulator
        .update_profile(ProfileUpdate::ActivityLevel(ActivityLevel::new(10).unwrap()))
        .unwrap();
    assert!(simulator.snapshot().epoch > first_epoch);
    assert_eq!(
        simulator.snapshot().tick_interval(),
        Duration::from_millis(500)
    );

    advance(1100).await;
    assert_eq!(event_count(&simulator), 6);
}

#[tokio::test(start_paused = true)]
async fn test_profile_change_applies_to_next_tick() {
    let simulator = simulator_with(busy_profile());
    simulator.start().unwrap();

    simulator
        .update_profile(ProfileUpdate::SourceAddress("10.9.8.7".to_string()))
        .unwrap();
    let epoch = simulator.snapshot().epoch;

    advance(600).await;
    let snapshot = simulator.snapshot();
    assert_eq!(snapshot.epoch, epoch);
    for event in snapshot.events.iter().filter(|e| !e.is_threat()) {
        assert_eq!(event.source, "10.9.8.7");
    }
}

#[tokio::test(start_paused = true)]
async fn test_subscribers_see_every_tick() {
    let simulator = simulator_with(busy_profile());
    let mut updates = simulator.subscribe();
    simulator.start().unwrap();
    updates.borrow_and_update();

    advance(600).await;
    assert!(updates.has_changed().unwrap());
    let snapshot = updates.borrow_and_update().clone();
    assert_eq!(snapshot.events.len(), 3);
    assert_eq!(
        snapshot.filtered(LogFilter::All).count(),
        snapshot.summary.total
    );
}

#[tokio::test(start_paused = true)]
async fn test_default_log_keeps_newest_hundred() {
    let simulator = simulator_with(busy_profile());
    simulator.start().unwrap();

    // 36 ticks of 3 events overflow the 100 entry log
    advance(18_100).await;

    let snapshot = simulator.snapshot();
    assert_eq!(snapshot.total_generated, 108);
    assert_eq!(snapshot.events.len(), 100);
    assert_eq!(snapshot.events[0].id.0, 108);
    assert_eq!(snapshot.events[99].id.0, 9);
    assert!(snapshot.events.windows(2).all(|w| w[0].id > w[1].id));
    assert_eq!(snapshot.summary.total, 100);
}

#[tokio::test(start_paused = true)]
async fn test_log_capacity_from_config() {
    let config = AppConfig {
        profile: busy_profile(),
        log_capacity: 5,
        seed: Some(9),
        ..AppConfig::default()
    };
    let simulator = Simulator::from_config(&config).unwrap();
    simulator.start().unwrap();

    advance(2750).await;
    let snapshot = simulator.snapshot();
    assert_eq!(snapshot.events.len(), 5);
    assert_eq!(snapshot.total_generated, 15);
    assert_eq!(snapshot.events[0].id.0, 15);
}

// ============================================================================
// Configuration
// ============================================================================

#[tokio::test]
async fn test_saved_config_drives_seeded_generation() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");

    let config = AppConfig {
        profile: busy_profile(),
        seed: Some(1234),
        ..AppConfig::default()
    };
    save_config_to(&config, &path).await.unwrap();
    let loaded = load_config_from(&path).await;
    assert_eq!(loaded, config);

    let mut a = TrafficGenerator::seeded(loaded.seed.unwrap());
    let mut b = TrafficGenerator::seeded(1234);
    let left = a.generate_batch(&loaded.profile);
    let right = b.generate_batch(&config.profile);
    assert_eq!(left.len(), 3);
    for (l, r) in left.iter().zip(&right) {
        assert_eq!(l.destination, r.destination);
        assert_eq!(l.bytes, r.bytes);
    }
}

// ============================================================================
// Rule store
// ============================================================================

#[test]
fn test_rule_editing_session() {
    let mut store = RuleStore::with_defaults();
    assert_eq!(store.rules().len(), 4);
    assert_eq!(store.rules().enabled_count(), 3);

    let id = store
        .add(RuleDraft {
            name: "Allow DNS".to_string(),
            source: "Any".to_string(),
            destination: "Any".to_string(),
            port: "53".to_string(),
            protocol: RuleProtocol::Udp,
            action: RuleAction::Allow,
        })
        .unwrap();
    assert!(store.rules().get(id).unwrap().enabled);

    assert!(!store.toggle(id).unwrap());
    store.delete(id).unwrap();
    assert!(store.rules().get(id).is_none());

    store.undo();
    assert!(!store.rules().get(id).unwrap().enabled);
    store.undo();
    store.undo();
    assert!(store.rules().get(id).is_none());
    assert!(!store.can_undo());

    store.redo();
    assert!(store.rules().get(id).unwrap().enabled);
}

#[test]
fn test_rule_requires_fields() {
    let mut store = RuleStore::with_defaults();
    let result = store.add(RuleDraft {
        name: "   ".to_string(),
        port: "80".to_string(),
        ..RuleDraft::default()
    });
    assert!(result.is_err());
    assert_eq!(store.rules().len(), 4);
}

// ============================================================================
// Contact form
// ============================================================================

fn credentials() -> RelayCredentials {
    RelayCredentials {
        user: "relay@fireguard.test".to_string(),
        password: "secret".to_string(),
        recipient: "inbox@fireguard.test".to_string(),
    }
}

fn form() -> ContactForm {
    ContactForm {
        first_name: "Ada".to_string(),
        last_name: "Lovelace".to_string(),
        email: "ada@example.com".to_string(),
        subject: "Blocked traffic".to_string(),
        message: "Why was the port scan <blocked>?\nThanks".to_string(),
    }
}

#[tokio::test]
async fn test_contact_message_lands_in_outbox() {
    let dir = TempDir::new().unwrap();
    let relay = OutboxRelay::new(dir.path().join("outbox.jsonl"), Some(credentials()));

    let result = contact::submit(&form(), &relay).await;
    assert!(result.success);
    assert_eq!(result.message, MESSAGE_SENT);

    let queued = relay.read_recent(10).await.unwrap();
    assert_eq!(queued.len(), 1);
    let mail = &queued[0].mail;
    assert_eq!(mail.subject, "FireGuard Contact: Blocked traffic");
    assert_eq!(mail.to, "inbox@fireguard.test");
    assert!(mail.html.contains("&lt;blocked&gt;"));
    assert!(mail.html.contains("<br>"));
}

#[tokio::test]
async fn test_invalid_contact_is_not_queued() {
    let dir = TempDir::new().unwrap();
    let relay = OutboxRelay::new(dir.path().join("outbox.jsonl"), Some(credentials()));

    let bad = ContactForm {
        email: "nope".to_string(),
        ..form()
    };
    let result = contact::submit(&bad, &relay).await;
    assert!(!result.success);
    assert_eq!(result.message, MESSAGE_INVALID);
    assert_eq!(result.errors.len(), 1);
    assert!(!relay.path().exists());
}
