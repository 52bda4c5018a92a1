//! Integration tests: ControlLoop tick phases against MockHardware.

use tankguard::alerts::Severity;
use tankguard::app::commands::Command;
use tankguard::app::ports::Timestamp;
use tankguard::config::ControllerConfig;
use tankguard::error::Rejection;
use tankguard::modes::SystemMode;
use tankguard::modes::policies::Decision;
use tankguard::sensors::level::TankLevel;
use tankguard::supervisor::{Lockout, PumpHealth, PumpId};

use crate::mock_hw::{MockHardware, Rig};

const P: PumpId = PumpId::Primary;
const S: PumpId = PumpId::Secondary;

fn severity_of(rig: &Rig, title: &str) -> Option<Severity> {
    rig.cl
        .alerts()
        .iter()
        .find(|a| a.title == title)
        .map(|a| a.severity)
}

// ── Fill policy ───────────────────────────────────────────────

#[test]
fn low_overhead_with_water_starts_primary() {
    let mut rig = Rig::auto(MockHardware::with_levels(TankLevel::Low, TankLevel::Medium));
    let report = rig.tick();
    assert_eq!(report.decision, Some(Decision::Start(P)));
    assert!(rig.hw.relay(P));
    assert!(!rig.hw.relay(S));
    assert!(rig.cl.supervisor().is_active(P));
}

#[test]
fn full_overhead_stops_running_pump_with_info_alert() {
    let mut rig = Rig::auto(MockHardware::with_levels(TankLevel::Low, TankLevel::Medium));
    rig.tick();
    rig.hw.set_levels(TankLevel::Full, TankLevel::Medium);
    let report = rig.tick();

    assert_eq!(report.decision, Some(Decision::StopFull));
    assert!(!rig.hw.relay(P) && !rig.hw.relay(S));
    assert_eq!(rig.cl.supervisor().health(P), PumpHealth::Off);
    assert_eq!(rig.alerts_titled("tank full"), 1);
    assert_eq!(severity_of(&rig, "tank full"), Some(Severity::Info));
}

#[test]
fn dry_run_fails_over_to_secondary_once() {
    let mut rig = Rig::auto(MockHardware::with_levels(TankLevel::Low, TankLevel::Medium));
    rig.tick();
    rig.hw.set_amps(P, 0.1);
    rig.tick();

    assert!(!rig.hw.relay(P));
    assert!(rig.hw.relay(S));
    assert_eq!(rig.alerts_titled("failover"), 1);
    assert_eq!(severity_of(&rig, "failover"), Some(Severity::Warning));
    assert_eq!(rig.alerts_titled("dry run"), 1);
    assert_eq!(severity_of(&rig, "dry run"), Some(Severity::Critical));
    assert_eq!(rig.cl.supervisor().lockout(P), Lockout::Tripped);

    for _ in 0..5 {
        rig.tick();
    }
    assert_eq!(rig.cl.supervisor().health(S), PumpHealth::Running);
    assert_eq!(rig.alerts_titled("failover"), 1);
}

#[test]
fn failover_onto_running_pump_raises_no_failover_alert() {
    let mut rig = Rig::auto(MockHardware::with_levels(TankLevel::Medium, TankLevel::Medium));
    rig.apply(Command::StartPump(P));
    rig.apply(Command::StartPump(S));
    rig.apply(Command::SetMode(SystemMode::Auto));
    assert!(rig.hw.relay(P) && rig.hw.relay(S));

    rig.hw.set_amps(P, 0.1);
    let report = rig.tick();
    assert_eq!(
        report.decision,
        Some(Decision::Failover { from: P, to: Some(S) })
    );
    assert!(!rig.hw.relay(P));
    assert!(rig.hw.relay(S));
    assert_eq!(rig.hw.relay_writes(S), 1);
    assert_eq!(rig.alerts_titled("dry run"), 1);
    assert_eq!(rig.alerts_titled("failover"), 0);
    assert_eq!(rig.cl.supervisor().lockout(P), Lockout::Tripped);
}

#[test]
fn overcurrent_without_target_leaves_both_off() {
    let mut rig = Rig::auto(MockHardware::with_levels(TankLevel::Low, TankLevel::Medium));
    rig.tick();
    // Both pumps overdraw: one failover, then nothing is left to switch to.
    rig.hw.set_amps(P, 12.0);
    rig.hw.set_amps(S, 12.0);
    rig.tick();
    assert!(rig.hw.relay(S));
    rig.tick();

    assert!(!rig.hw.relay(P) && !rig.hw.relay(S));
    assert_eq!(rig.alerts_titled("failover impossible"), 1);
    assert_eq!(rig.cl.supervisor().lockout(P), Lockout::Tripped);
    assert_eq!(rig.cl.supervisor().lockout(S), Lockout::Tripped);
}

#[test]
fn tripped_primary_is_skipped_on_next_fill() {
    let mut rig = Rig::auto(MockHardware::with_levels(TankLevel::Low, TankLevel::Medium));
    rig.tick();
    rig.hw.set_amps(P, 0.1);
    rig.tick();
    rig.hw.set_levels(TankLevel::Full, TankLevel::Medium);
    rig.tick();
    assert!(!rig.hw.relay(S));

    rig.hw.set_levels(TankLevel::Low, TankLevel::Medium);
    let report = rig.tick();
    assert_eq!(report.decision, Some(Decision::Start(S)));

    // An explicit start clears the trip.
    rig.hw.set_amps(P, 3.0);
    assert!(rig.apply(Command::StartPump(P)).is_ok());
    assert_eq!(rig.cl.supervisor().lockout(P), Lockout::None);
}

#[test]
fn dry_source_never_starts_and_alerts_once_per_episode() {
    let mut rig = Rig::auto(MockHardware::with_levels(TankLevel::Low, TankLevel::Empty));
    for _ in 0..4 {
        let report = rig.tick();
        assert_eq!(report.decision, Some(Decision::SourceEmpty));
    }
    assert!(!rig.hw.relay(P) && !rig.hw.relay(S));
    assert_eq!(rig.alerts_titled("source empty"), 1);
    assert_eq!(severity_of(&rig, "source empty"), Some(Severity::Critical));

    // Water returns, fill starts, then the source runs dry mid-fill.
    rig.hw.set_levels(TankLevel::Low, TankLevel::Medium);
    rig.tick();
    assert!(rig.hw.relay(P));
    rig.hw.set_levels(TankLevel::Low, TankLevel::Empty);
    let report = rig.tick();
    assert_eq!(report.decision, Some(Decision::SourceExhausted));
    assert!(!rig.hw.relay(P));
    assert_eq!(rig.alerts_titled("source empty"), 2);
}

#[test]
fn scheduled_mode_follows_auto_policy() {
    let mut hw = MockHardware::with_levels(TankLevel::Low, TankLevel::High);
    hw.set_amps(P, 3.0);
    let config = ControllerConfig {
        auto_mode_default: false,
        ..ControllerConfig::default()
    };
    let mut rig = Rig::new(config, hw);
    rig.tick();
    assert!(!rig.hw.relay(P), "manual mode must not start on its own");

    assert!(rig.apply(Command::SetMode(SystemMode::Scheduled)).is_ok());
    assert!(rig.hw.relay(P));
}

// ── Emergency ─────────────────────────────────────────────────

#[test]
fn emergency_stops_both_pumps_in_the_same_tick() {
    let mut rig = Rig::auto(MockHardware::with_levels(TankLevel::Medium, TankLevel::Medium));
    rig.apply(Command::StartPump(P));
    rig.apply(Command::StartPump(S));
    assert!(rig.hw.relay(P) && rig.hw.relay(S));

    let report = {
        rig.send(Command::SetMode(SystemMode::Emergency));
        rig.tick()
    };
    assert!(report.decision.is_none());
    assert!(!rig.hw.relay(P) && !rig.hw.relay(S));
    assert_eq!(rig.cl.supervisor().health(P), PumpHealth::Off);
    assert_eq!(rig.cl.supervisor().health(S), PumpHealth::Off);
    assert_eq!(severity_of(&rig, "emergency stop"), Some(Severity::Critical));
    assert!(rig.cl.status().emergency_stop);
}

#[test]
fn emergency_rejects_starts_and_holds_policy() {
    let mut rig = Rig::auto(MockHardware::with_levels(TankLevel::Low, TankLevel::High));
    rig.send(Command::SetMode(SystemMode::Emergency));
    rig.tick();

    for cmd in [Command::StartPump(P), Command::TestPump(S), Command::SwitchPump] {
        assert_eq!(rig.apply(cmd).result, Err(Rejection::EmergencyActive));
    }
    assert_eq!(rig.hw.relay_writes(P), 0);
    assert_eq!(rig.hw.relay_writes(S), 0);
    assert_eq!(rig.cl.supervisor().health(P), PumpHealth::Off);
    assert_eq!(rig.sink.rejections(), 3);

    // Leaving emergency hands control back to the policy.
    assert!(rig.apply(Command::SetMode(SystemMode::Auto)).is_ok());
    assert!(rig.hw.relay(P));
}

#[test]
fn start_queued_behind_emergency_is_rejected() {
    let mut rig = Rig::auto(MockHardware::with_levels(TankLevel::Medium, TankLevel::Medium));
    rig.send(Command::SetMode(SystemMode::Emergency));
    let start = rig.send(Command::StartPump(P));
    let report = rig.tick();
    let outcome = report.outcomes.iter().find(|o| o.id == start).unwrap();
    assert_eq!(outcome.result, Err(Rejection::EmergencyActive));
    assert!(!rig.hw.relay(P));
}

#[test]
fn leaving_emergency_in_the_same_tick_does_not_readmit_starts() {
    let mut rig = Rig::auto(MockHardware::with_levels(TankLevel::Medium, TankLevel::Medium));
    let emergency = rig.send(Command::SetMode(SystemMode::Emergency));
    let manual = rig.send(Command::SetMode(SystemMode::Manual));
    let start = rig.send(Command::StartPump(P));
    let report = rig.tick();

    let result = |id: u32| report.outcomes.iter().find(|o| o.id == id).map(|o| o.result);
    assert_eq!(result(emergency), Some(Ok(())));
    assert_eq!(result(manual), Some(Ok(())));
    assert_eq!(result(start), Some(Err(Rejection::EmergencyActive)));
    assert!(!rig.hw.relay(P) && !rig.hw.relay(S));
    assert_eq!(rig.cl.mode(), SystemMode::Manual);

    // The next tick accepts it again.
    assert!(rig.apply(Command::StartPump(P)).is_ok());
    assert!(rig.hw.relay(P));
}

// ── Safety phase ──────────────────────────────────────────────

#[test]
fn max_runtime_stops_pump_once_in_manual() {
    let config = ControllerConfig {
        max_runtime_minutes: 1,
        ..ControllerConfig::default()
    };
    let mut rig = Rig::new(config, MockHardware::with_levels(TankLevel::Medium, TankLevel::Medium));
    rig.apply(Command::StartPump(P));
    assert_eq!(rig.cl.mode(), SystemMode::Manual);

    rig.tick_after(60_000);
    assert!(rig.hw.relay(P), "exactly at the limit is not exceeded");

    let report = rig.tick();
    assert!(report.safety.runtime_stop[P.index()]);
    assert!(!rig.hw.relay(P));
    assert!(matches!(rig.cl.supervisor().lockout(P), Lockout::Cooldown(_)));

    for _ in 0..5 {
        rig.tick();
    }
    assert_eq!(rig.alerts_titled("max runtime"), 1);
    assert_eq!(severity_of(&rig, "max runtime"), Some(Severity::Warning));
}

#[test]
fn cooldown_moves_automatic_fill_to_the_other_pump() {
    let config = ControllerConfig {
        max_runtime_minutes: 1,
        cooldown_minutes: 2,
        ..ControllerConfig::default()
    };
    let mut rig = Rig::new(config, MockHardware::with_levels(TankLevel::Low, TankLevel::Medium));
    rig.tick();
    assert!(rig.hw.relay(P));

    rig.tick_after(61_000);
    assert!(!rig.hw.relay(P));

    let report = rig.tick();
    assert_eq!(report.decision, Some(Decision::Start(S)));

    // Once the cool-down has elapsed the lockout is lifted.
    rig.tick_after(120_000);
    assert_eq!(rig.cl.supervisor().lockout(P), Lockout::None);
}

#[test]
fn maintenance_due_alerts_without_stopping() {
    let config = ControllerConfig {
        maintenance_hours: 1,
        max_runtime_minutes: 120,
        ..ControllerConfig::default()
    };
    let mut rig = Rig::new(config, MockHardware::with_levels(TankLevel::Medium, TankLevel::Medium));
    rig.apply(Command::StartPump(S));
    rig.tick_after(3_600_000);
    rig.tick();

    assert!(rig.hw.relay(S));
    assert_eq!(rig.alerts_titled("maintenance due"), 1);
    assert!(rig.cl.status().pump(S).maintenance_due);
    rig.tick();
    assert_eq!(rig.alerts_titled("maintenance due"), 1);
}

// ── Runtime accounting ────────────────────────────────────────

#[test]
fn day_rollover_resets_daily_counters_once() {
    const DAY: u64 = 86_400;
    let wall0 = 100 * DAY - 5;
    let mut rig = Rig::auto(MockHardware::with_levels(TankLevel::Medium, TankLevel::Medium));
    let tick_at = |rig: &mut Rig, uptime_ms: u64| {
        rig.cl.tick(
            Timestamp {
                uptime_ms,
                wall_secs: Some(wall0 + uptime_ms / 1_000),
            },
            &mut rig.hw,
            &mut rig.sink,
        )
    };

    rig.send(Command::StartPump(P));
    tick_at(&mut rig, 0);
    tick_at(&mut rig, 3_000);
    assert_eq!(rig.cl.ledger().pump(P).daily_secs(), 3);

    tick_at(&mut rig, 6_000);
    assert_eq!(rig.alerts_titled("daily runtime reset"), 1);
    assert_eq!(rig.cl.ledger().pump(P).daily_secs(), 0);
    assert_eq!(rig.cl.ledger().pump(P).total_secs(), 6);

    tick_at(&mut rig, 7_000);
    assert_eq!(rig.alerts_titled("daily runtime reset"), 1);
    assert_eq!(rig.cl.ledger().pump(P).daily_secs(), 1);
}

#[test]
fn multi_day_gap_resets_daily_with_a_single_alert() {
    const DAY: u64 = 86_400;
    let wall0 = 200 * DAY + 100;
    let mut rig = Rig::auto(MockHardware::with_levels(TankLevel::Medium, TankLevel::Medium));
    let tick_at = |rig: &mut Rig, uptime_ms: u64| {
        rig.cl.tick(
            Timestamp {
                uptime_ms,
                wall_secs: Some(wall0 + uptime_ms / 1_000),
            },
            &mut rig.hw,
            &mut rig.sink,
        )
    };

    rig.send(Command::StartPump(P));
    tick_at(&mut rig, 0);
    tick_at(&mut rig, 10_000);
    assert_eq!(rig.cl.ledger().pump(P).daily_secs(), 10);

    // The clock jumps forward more than two calendar days in one tick
    // while the pump is still running.
    let after_gap = (2 * DAY + 3_600) * 1_000;
    tick_at(&mut rig, after_gap);
    assert_eq!(rig.cl.ledger().pump(P).daily_secs(), 0);
    assert_eq!(rig.cl.ledger().pump(P).total_secs(), after_gap / 1_000);
    assert_eq!(rig.alerts_titled("daily runtime reset"), 1);
    assert_eq!(severity_of(&rig, "daily runtime reset"), Some(Severity::Info));

    tick_at(&mut rig, after_gap + 1_000);
    assert_eq!(rig.alerts_titled("daily runtime reset"), 1);
    assert_eq!(rig.cl.ledger().pump(P).daily_secs(), 0);
}

#[test]
fn status_reflects_last_tick() {
    let mut rig = Rig::auto(MockHardware::with_levels(TankLevel::Low, TankLevel::High));
    rig.tick();
    rig.tick();
    let status = rig.cl.status();
    assert_eq!(status.mode, SystemMode::Auto);
    assert_eq!(status.tick, 2);
    assert_eq!(status.ticks_in_mode, 2);
    assert_eq!(status.uptime_ms, 2_000);
    assert_eq!(status.tank(tankguard::sensors::level::TankId::Overhead).level, TankLevel::Low);
    assert_eq!(
        status.tank(tankguard::sensors::level::TankId::Secondary).switches,
        tankguard::sensors::level::FloatSwitches::up_to(TankLevel::High)
    );
    let p = status.pump(P);
    assert!(p.active);
    assert_eq!(p.health, PumpHealth::Running);
    assert!((p.current_a - 3.0).abs() < 0.05);
    assert_eq!(p.daily_runtime_secs, 1);
}
