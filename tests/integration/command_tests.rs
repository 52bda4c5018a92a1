//! Integration tests: the command contract applied through the queue.

use tankguard::app::commands::Command;
use tankguard::app::events::AppEvent;
use tankguard::config::{ConfigPatch, ControllerConfig};
use tankguard::error::Rejection;
use tankguard::modes::SystemMode;
use tankguard::sensors::level::TankLevel;
use tankguard::supervisor::PumpId;

use crate::mock_hw::{MockHardware, Rig};

const P: PumpId = PumpId::Primary;
const S: PumpId = PumpId::Secondary;

fn idle_rig() -> Rig {
    Rig::auto(MockHardware::with_levels(TankLevel::Medium, TankLevel::Medium))
}

fn short_test_config() -> ControllerConfig {
    ControllerConfig {
        pump_test_secs: 3,
        ..ControllerConfig::default()
    }
}

// ── StartPump / StopAll ───────────────────────────────────────

#[test]
fn start_pump_runs_pump_and_enters_manual() {
    let mut rig = idle_rig();
    assert!(rig.apply(Command::StartPump(S)).is_ok());
    assert!(rig.hw.relay(S));
    assert_eq!(rig.cl.mode(), SystemMode::Manual);
    assert_eq!(rig.cl.status().ticks_in_mode, 0);
    rig.tick();
    assert_eq!(rig.cl.status().ticks_in_mode, 1);
    assert!(rig.sink.events.contains(&AppEvent::ModeChanged {
        from: SystemMode::Auto,
        to: SystemMode::Manual
    }));
}

#[test]
fn start_pump_twice_keeps_run_start() {
    let mut rig = idle_rig();
    rig.apply(Command::StartPump(P));
    let since = rig.cl.ledger().pump(P).active_since_ms();
    assert!(rig.apply(Command::StartPump(P)).is_ok());
    assert_eq!(rig.cl.ledger().pump(P).active_since_ms(), since);
    assert_eq!(rig.hw.relay_writes(P), 1);
}

#[test]
fn stop_all_stops_both_and_halts_automation() {
    let mut rig = Rig::auto(MockHardware::with_levels(TankLevel::Low, TankLevel::Medium));
    rig.tick();
    assert!(rig.hw.relay(P));

    assert!(rig.apply(Command::StopAll).is_ok());
    assert!(!rig.hw.relay(P) && !rig.hw.relay(S));
    assert_eq!(rig.cl.mode(), SystemMode::Manual);

    // The tank still wants water, but nothing restarts on its own.
    rig.tick();
    assert!(!rig.hw.relay(P));
}

#[test]
fn stop_all_in_emergency_stays_in_emergency() {
    let mut rig = idle_rig();
    rig.apply(Command::SetMode(SystemMode::Emergency));
    assert!(rig.apply(Command::StopAll).is_ok());
    assert_eq!(rig.cl.mode(), SystemMode::Emergency);
}

// ── SwitchPump ────────────────────────────────────────────────

#[test]
fn switch_pump_needs_exactly_one_active() {
    let mut rig = idle_rig();
    assert_eq!(
        rig.apply(Command::SwitchPump).result,
        Err(Rejection::NoActivePump)
    );

    rig.apply(Command::StartPump(P));
    assert!(rig.apply(Command::SwitchPump).is_ok());
    assert!(!rig.hw.relay(P));
    assert!(rig.hw.relay(S));

    rig.apply(Command::StartPump(P));
    assert_eq!(
        rig.apply(Command::SwitchPump).result,
        Err(Rejection::BothPumpsActive)
    );
}

// ── TestPump ──────────────────────────────────────────────────

#[test]
fn test_pump_stops_itself_after_test_duration() {
    // Overhead full: the Auto policy would stop the pump if it ran.
    let mut rig = Rig::new(
        short_test_config(),
        MockHardware::with_levels(TankLevel::Full, TankLevel::Medium),
    );
    assert!(rig.apply(Command::TestPump(P)).is_ok());
    assert!(rig.hw.relay(P));
    assert!(rig.cl.tests().is_pending(P));

    rig.tick();
    rig.tick();
    assert!(rig.hw.relay(P), "policy must not cut a test run short");

    rig.tick();
    assert!(!rig.hw.relay(P));
    assert!(!rig.cl.tests().any_pending());
    assert_eq!(rig.alerts_titled("test complete"), 1);
    assert_eq!(rig.cl.mode(), SystemMode::Auto);
    assert_eq!(rig.alerts_titled("tank full"), 0);
}

#[test]
fn stop_all_cancels_pending_test() {
    let mut rig = Rig::new(short_test_config(), MockHardware::new());
    rig.apply(Command::TestPump(S));
    rig.apply(Command::StopAll);
    assert!(!rig.hw.relay(S));
    assert!(!rig.cl.tests().any_pending());
    for _ in 0..5 {
        rig.tick();
    }
    assert_eq!(rig.alerts_titled("test complete"), 0);
}

#[test]
fn emergency_cancels_pending_test() {
    let mut rig = Rig::new(short_test_config(), MockHardware::new());
    rig.apply(Command::TestPump(P));
    rig.apply(Command::SetMode(SystemMode::Emergency));
    assert!(!rig.hw.relay(P));
    assert!(!rig.cl.tests().is_pending(P));
}

#[test]
fn start_pump_takes_over_a_test_run() {
    let mut rig = Rig::new(short_test_config(), MockHardware::new());
    rig.apply(Command::TestPump(P));
    rig.apply(Command::StartPump(P));
    assert!(!rig.cl.tests().is_pending(P));
    for _ in 0..5 {
        rig.tick();
    }
    assert!(rig.hw.relay(P));
}

// ── Config ────────────────────────────────────────────────────

#[test]
fn set_config_merges_present_fields() {
    let mut rig = idle_rig();
    let patch = ConfigPatch {
        max_runtime_minutes: Some(90),
        current_threshold_min: Some(1.0),
        ..ConfigPatch::default()
    };
    assert!(rig.apply(Command::SetConfig(patch)).is_ok());
    let cfg = rig.cl.config();
    assert_eq!(cfg.max_runtime_minutes, 90);
    assert_eq!(cfg.current_threshold_min, 1.0);
    assert_eq!(
        cfg.maintenance_hours,
        ControllerConfig::default().maintenance_hours
    );
    assert!(rig.cl.is_config_dirty());
}

#[test]
fn raised_threshold_turns_running_pump_into_dry_run() {
    let mut rig = idle_rig();
    rig.apply(Command::StartPump(P));
    rig.apply(Command::SetConfig(ConfigPatch {
        current_threshold_min: Some(4.0),
        ..ConfigPatch::default()
    }));
    assert_eq!(rig.alerts_titled("dry run"), 1);
    // Manual mode: alerted but not stopped.
    assert!(rig.hw.relay(P));
}

// ── Alerts ────────────────────────────────────────────────────

#[test]
fn acknowledge_flags_existing_alert_only() {
    let mut rig = idle_rig();
    rig.apply(Command::SetMode(SystemMode::Emergency));
    let id = rig.cl.alerts().latest().map(|a| a.id).unwrap();

    assert!(rig.apply(Command::AcknowledgeAlert(id)).is_ok());
    assert!(rig.cl.alerts().get(id).is_some_and(|a| a.acknowledged));
    assert_eq!(
        rig.apply(Command::AcknowledgeAlert(id + 1_000)).result,
        Err(Rejection::AlertNotFound(id + 1_000))
    );
}

#[test]
fn clear_alerts_keeps_ids_increasing() {
    let mut rig = idle_rig();
    rig.apply(Command::SetMode(SystemMode::Emergency));
    let first = rig.cl.alerts().latest().map(|a| a.id).unwrap();
    assert!(rig.apply(Command::ClearAlerts).is_ok());
    assert!(rig.cl.alerts().is_empty());

    rig.apply(Command::SetMode(SystemMode::Auto));
    rig.apply(Command::SetMode(SystemMode::Emergency));
    let second = rig.cl.alerts().latest().map(|a| a.id).unwrap();
    assert!(second > first);
}

// ── Reset ─────────────────────────────────────────────────────

#[test]
fn reset_restores_a_clean_controller() {
    let mut rig = idle_rig();
    rig.apply(Command::StartPump(P));
    rig.apply(Command::StartPump(S));
    for _ in 0..10 {
        rig.tick();
    }
    rig.apply(Command::SetConfig(ConfigPatch {
        maintenance_hours: Some(7),
        ..ConfigPatch::default()
    }));
    rig.apply(Command::SetMode(SystemMode::Emergency));
    assert!(!rig.cl.alerts().is_empty());

    assert!(rig.apply(Command::Reset).is_ok());
    assert!(!rig.hw.relay(P) && !rig.hw.relay(S));
    assert_eq!(rig.cl.mode(), SystemMode::Auto);
    assert!(rig.cl.alerts().is_empty());
    assert_eq!(rig.cl.ledger().pump(P).total_secs(), 0);
    assert_eq!(rig.cl.ledger().pump(S).daily_secs(), 0);
    assert_eq!(rig.cl.config(), &ControllerConfig::default());
    assert!(rig.cl.is_config_dirty());
}
