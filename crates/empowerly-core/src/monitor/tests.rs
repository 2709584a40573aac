use super::*;
use crate::input::InputBus;

fn secs(n: u64) -> Duration {
    Duration::from_secs(n)
}

fn minutes(n: u64) -> Duration {
    Duration::from_secs(n * 60)
}

/// Fire every timer due at `now`, collecting the events
fn drive(monitor: &mut ActivityMonitor<InputBus>, now: Instant) -> Vec<MonitorEvent> {
    let mut events = Vec::new();
    while let Some((_, event)) = monitor.poll_due(now) {
        events.push(event);
    }
    events
}

fn armed_monitor() -> (ActivityMonitor<InputBus>, InputBus, Instant) {
    let bus = InputBus::new();
    let mut monitor = ActivityMonitor::new(MonitorConfig::default(), bus.clone());
    let start = Instant::now();
    monitor.arm(start);
    (monitor, bus, start)
}

// ============================================================================
// Configuration
// ============================================================================

#[test]
fn test_default_config_matches_constants() {
    let config = MonitorConfig::default();
    assert_eq!(config.inactivity_timeout, minutes(15));
    assert_eq!(config.warning_lead, minutes(1));
    assert_eq!(config.throttle_window, secs(1));
    assert_eq!(config.warning_after(), minutes(14));
}

#[test]
fn test_warning_after_saturates() {
    let config = MonitorConfig {
        inactivity_timeout: secs(30),
        warning_lead: secs(60),
        throttle_window: secs(1),
    };
    assert_eq!(config.warning_after(), Duration::ZERO);
}

// ============================================================================
// Arm / disarm
// ============================================================================

#[test]
fn test_new_monitor_is_disarmed_and_idle() {
    let bus = InputBus::new();
    let monitor = ActivityMonitor::new(MonitorConfig::default(), bus.clone());

    assert_eq!(monitor.state(), MonitorState::Disarmed);
    assert_eq!(monitor.pending_timers(), 0);
    assert!(!monitor.is_listening());
    assert_eq!(bus.listener_count(), 0);
}

#[test]
fn test_arm_attaches_listener_and_two_timers() {
    let (monitor, bus, start) = armed_monitor();

    assert_eq!(monitor.state(), MonitorState::Armed);
    assert_eq!(monitor.pending_timers(), 2);
    assert_eq!(bus.listener_count(), 1);
    assert_eq!(monitor.last_activity_at(), Some(start));
    assert_eq!(monitor.time_until_logout(start), Some(minutes(15)));
}

#[test]
fn test_rearm_keeps_single_listener() {
    let (mut monitor, bus, start) = armed_monitor();
    monitor.arm(start + secs(5));

    assert_eq!(bus.listener_count(), 1);
    assert_eq!(monitor.pending_timers(), 2);
}

#[test]
fn test_rearm_drops_outstanding_throttle() {
    let (mut monitor, _bus, start) = armed_monitor();
    assert!(monitor.record_activity(start));
    monitor.arm(start + secs(0));

    assert!(!monitor.is_reset_pending());
    assert_eq!(monitor.pending_timers(), 2);
}

#[test]
fn test_disarm_clears_everything() {
    let (mut monitor, bus, start) = armed_monitor();
    monitor.record_activity(start);
    monitor.disarm();

    assert_eq!(monitor.state(), MonitorState::Disarmed);
    assert_eq!(monitor.pending_timers(), 0);
    assert!(!monitor.is_reset_pending());
    assert_eq!(bus.listener_count(), 0);
    assert_eq!(monitor.last_activity_at(), None);
    assert!(drive(&mut monitor, start + minutes(60)).is_empty());
}

#[test]
fn test_activity_while_disarmed_is_ignored() {
    let bus = InputBus::new();
    let mut monitor = ActivityMonitor::new(MonitorConfig::default(), bus.clone());

    assert!(!bus.dispatch(ActivityKind::Click));
    assert!(!monitor.record_activity(Instant::now()));
    assert_eq!(monitor.pending_timers(), 0);
}

#[test]
fn test_reset_while_disarmed_is_noop() {
    let bus = InputBus::new();
    let mut monitor = ActivityMonitor::new(MonitorConfig::default(), bus);
    monitor.reset(Instant::now());

    assert_eq!(monitor.pending_timers(), 0);
    assert_eq!(monitor.reset_count(), 0);
}

// ============================================================================
// Timer transitions
// ============================================================================

#[test]
fn test_warning_then_expiry_without_activity() {
    let (mut monitor, bus, start) = armed_monitor();

    assert!(drive(&mut monitor, start + minutes(14) - secs(1)).is_empty());
    assert_eq!(
        drive(&mut monitor, start + minutes(14)),
        vec![MonitorEvent::WarningShown]
    );
    assert!(monitor.is_warning_shown());
    assert_eq!(monitor.pending_timers(), 1);
    assert_eq!(monitor.time_until_logout(start + minutes(14)), Some(minutes(1)));

    assert_eq!(
        drive(&mut monitor, start + minutes(15)),
        vec![MonitorEvent::Expired]
    );
    assert_eq!(monitor.state(), MonitorState::Disarmed);
    assert_eq!(monitor.pending_timers(), 0);
    assert_eq!(bus.listener_count(), 0);
}

#[test]
fn test_late_poll_replays_both_transitions_in_order() {
    let (mut monitor, _bus, start) = armed_monitor();
    let mut deadlines = Vec::new();
    while let Some((at, event)) = monitor.poll_due(start + minutes(40)) {
        deadlines.push((at.duration_since(start), event));
    }

    assert_eq!(
        deadlines,
        vec![
            (minutes(14), MonitorEvent::WarningShown),
            (minutes(15), MonitorEvent::Expired),
        ]
    );
}

#[test]
fn test_throttled_reset_runs_one_window_later() {
    let (mut monitor, _bus, start) = armed_monitor();
    let activity_at = start + minutes(3);

    assert!(monitor.record_activity(activity_at));
    assert!(monitor.is_reset_pending());
    assert_eq!(monitor.pending_timers(), 3);

    assert!(drive(&mut monitor, activity_at + Duration::from_millis(999)).is_empty());
    assert_eq!(drive(&mut monitor, activity_at + secs(1)), vec![MonitorEvent::Reset]);

    assert!(!monitor.is_reset_pending());
    assert_eq!(monitor.pending_timers(), 2);
    assert_eq!(monitor.last_activity_at(), Some(activity_at + secs(1)));
    assert_eq!(
        monitor.time_until_logout(activity_at + secs(1)),
        Some(minutes(15))
    );
}

#[test]
fn test_events_inside_window_are_coalesced() {
    let (mut monitor, _bus, start) = armed_monitor();
    let resets_before = monitor.reset_count();

    assert!(monitor.record_activity(start));
    for ms in 1..1000 {
        assert!(!monitor.record_activity(start + Duration::from_millis(ms)));
    }
    drive(&mut monitor, start + secs(1));

    assert_eq!(monitor.reset_count(), resets_before + 1);
}

#[test]
fn test_activity_after_window_schedules_again() {
    let (mut monitor, _bus, start) = armed_monitor();
    monitor.record_activity(start);
    drive(&mut monitor, start + secs(1));

    assert!(monitor.record_activity(start + secs(2)));
}

#[test]
fn test_throttled_reset_clears_warning() {
    let (mut monitor, _bus, start) = armed_monitor();
    drive(&mut monitor, start + minutes(14));
    assert!(monitor.is_warning_shown());

    let activity_at = start + minutes(14) + secs(10);
    monitor.record_activity(activity_at);
    // Warning stays up until the throttled reset runs
    assert!(monitor.is_warning_shown());

    drive(&mut monitor, activity_at + secs(1));
    assert_eq!(monitor.state(), MonitorState::Armed);
    assert_eq!(monitor.pending_timers(), 2);
}

#[test]
fn test_pump_input_drains_bus() {
    let (mut monitor, bus, start) = armed_monitor();
    for _ in 0..25 {
        assert!(bus.dispatch(ActivityKind::PointerMove));
    }

    bus.dispatch(ActivityKind::Scroll);

    // Repeats of a kind are coalesced on the bus
    assert_eq!(monitor.pump_input(start), 2);
    assert_eq!(bus.pending(), 0);
    assert!(monitor.is_reset_pending());
}

#[test]
fn test_custom_config_is_respected() {
    let bus = InputBus::new();
    let config = MonitorConfig {
        inactivity_timeout: secs(30),
        warning_lead: secs(10),
        throttle_window: Duration::from_millis(200),
    };
    let mut monitor = ActivityMonitor::new(config, bus);
    let start = Instant::now();
    monitor.arm(start);

    assert!(drive(&mut monitor, start + secs(19)).is_empty());
    assert_eq!(drive(&mut monitor, start + secs(20)), vec![MonitorEvent::WarningShown]);
    assert_eq!(drive(&mut monitor, start + secs(30)), vec![MonitorEvent::Expired]);
}

#[test]
fn test_out_of_range_durations_do_not_panic() {
    let bus = InputBus::new();
    let config = MonitorConfig {
        inactivity_timeout: Duration::MAX,
        warning_lead: secs(60),
        throttle_window: Duration::MAX,
    };
    let mut monitor = ActivityMonitor::new(config, bus);
    let start = Instant::now();
    monitor.arm(start);

    assert_eq!(monitor.state(), MonitorState::Armed);
    assert_eq!(monitor.pending_timers(), 0);
    assert_eq!(monitor.time_until_logout(start), None);
    assert!(!monitor.record_activity(start));
    assert!(!monitor.is_reset_pending());
}

#[test]
fn test_state_descriptions() {
    assert_eq!(MonitorState::Disarmed.description(), "Signed out");
    assert_eq!(MonitorState::Armed.description(), "Active");
    assert_eq!(MonitorState::WarningShown.description(), "Inactivity warning");
    assert!(!MonitorState::Disarmed.is_armed());
    assert!(MonitorState::WarningShown.is_armed());
}
