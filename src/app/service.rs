//! Control loop: the hexagonal core.
//!
//! [`ControlLoop`] owns every piece of control state: mode, pump
//! supervisor, runtime ledger, alert log, condition latches, deferred test
//! stops and the live configuration.  It is the single writer of all of
//! them.  All I/O flows through port traits passed in at call sites.
//!
//! ```text
//!  SensorPort ──▶ ┌──────────────────────────────┐ ──▶ EventSink
//!                 │         ControlLoop          │
//! ActuatorPort ◀──│ modes · supervisor · ledger  │
//!                 │ alerts · latches · tests     │
//!  enqueue() ───▶ └──────────────────────────────┘ ──▶ ConfigPort (after tick)
//! ```
//!
//! ## Tick phases
//!
//! 1. **Commands**: drain the queue FIFO.  Once Emergency is entered, the
//!    remaining non-safety commands of that tick are rejected.
//! 2. **Deferred stops**: stop pumps whose test run has expired.
//! 3. **Sensing**: read inputs, re-derive health, advance the ledger.
//! 4. **Policy**: the current mode's decision, skipped in Emergency and
//!    Manual and while a test run is pending.
//! 5. **Safety**: max-runtime stops and maintenance alerts, in every mode.

use core::fmt::Write as _;

use heapless::{Deque, String, Vec};
use log::{debug, info, warn};

use crate::alerts::{AlertCategory, AlertLog, Severity};
use crate::config::ControllerConfig;
use crate::error::{Condition, Rejection};
use crate::modes::context::PolicyInput;
use crate::modes::policies::Decision;
use crate::modes::{ModeMachine, SystemMode};
use crate::runtime::RuntimeLedger;
use crate::safety::{self, ConditionLatch, SafetyVerdict};
use crate::scheduler::DeferredStops;
use crate::sensors::level::TankId;
use crate::sensors::{SensorReader, SensorSnapshot};
use crate::supervisor::{Lockout, PumpHealth, PumpId, PumpSupervisor};

use super::commands::{Command, CommandEnvelope, CommandOutcome};
use super::events::AppEvent;
use super::ports::{ActuatorPort, ConfigError, ConfigPort, EventSink, SensorPort, Timestamp};
use super::status::{PumpStatus, StatusReport, TankStatus};

/// Commands that can wait for the next tick.
pub const COMMAND_QUEUE_DEPTH: usize = 16;

const MESSAGE_LEN: usize = 96;
const MS_PER_MIN: u64 = 60_000;

/// What happened during one tick.
#[derive(Debug, Clone, Default)]
pub struct TickReport {
    pub tick: u64,
    /// One outcome per command drained this tick, in queue order.
    pub outcomes: Vec<CommandOutcome, COMMAND_QUEUE_DEPTH>,
    /// Policy decision, `None` when the policy phase was skipped.
    pub decision: Option<Decision>,
    pub safety: SafetyVerdict,
}

fn describe(args: core::fmt::Arguments<'_>) -> String<MESSAGE_LEN> {
    let mut s = String::new();
    // Overlong messages are cut at capacity.
    let _ = s.write_fmt(args);
    s
}

// ───────────────────────────────────────────────────────────────
// ControlLoop
// ───────────────────────────────────────────────────────────────

pub struct ControlLoop {
    modes: ModeMachine,
    supervisor: PumpSupervisor,
    ledger: RuntimeLedger,
    alerts: AlertLog,
    latch: ConditionLatch,
    tests: DeferredStops,
    config: ControllerConfig,
    reader: SensorReader,
    snapshot: SensorSnapshot,
    queue: Deque<CommandEnvelope, COMMAND_QUEUE_DEPTH>,
    tick_count: u64,
    now: Timestamp,
    config_dirty: bool,
}

impl ControlLoop {
    /// Construct the loop from configuration with default sensor calibration.
    ///
    /// Does **not** touch the relays: call [`start`](Self::start) next.
    pub fn new(config: ControllerConfig) -> Self {
        Self::with_reader(config, SensorReader::default())
    }

    pub fn with_reader(config: ControllerConfig, reader: SensorReader) -> Self {
        let initial = if config.auto_mode_default {
            SystemMode::Auto
        } else {
            SystemMode::Manual
        };
        Self {
            modes: ModeMachine::new(initial),
            supervisor: PumpSupervisor::new(),
            ledger: RuntimeLedger::new(),
            alerts: AlertLog::new(),
            latch: ConditionLatch::new(),
            tests: DeferredStops::new(),
            config,
            reader,
            snapshot: SensorSnapshot::default(),
            queue: Deque::new(),
            tick_count: 0,
            now: Timestamp::default(),
            config_dirty: false,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Force both relays off and announce the initial mode.
    pub fn start(&mut self, hw: &mut impl ActuatorPort, sink: &mut impl EventSink) {
        self.supervisor.all_off(hw);
        let mode = self.modes.current();
        sink.emit(&AppEvent::Started(mode));
        info!("ControlLoop started in {} mode", mode);
    }

    /// Queue a command for the next tick.  Never blocks.
    pub fn enqueue(&mut self, envelope: CommandEnvelope) -> Result<(), Rejection> {
        self.queue.push_back(envelope).map_err(|env| {
            warn!("Command {} ({}) dropped: queue full", env.id, env.command.name());
            Rejection::QueueFull
        })
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one full control cycle.
    ///
    /// The `hw` parameter satisfies **both** [`SensorPort`] and
    /// [`ActuatorPort`]: this avoids a double mutable borrow while
    /// keeping the port boundary explicit.
    pub fn tick(
        &mut self,
        now: Timestamp,
        hw: &mut (impl SensorPort + ActuatorPort),
        sink: &mut impl EventSink,
    ) -> TickReport {
        self.tick_count += 1;
        self.now = now;
        let mut report = TickReport {
            tick: self.tick_count,
            ..TickReport::default()
        };

        // 1. Commands
        self.command_phase(hw, sink, &mut report);

        // 2. Deferred test stops
        for stop in self.tests.take_due(self.tick_count).into_iter().flatten() {
            self.switch_off(stop.pump, hw, sink);
            let msg = describe(format_args!("{:?} pump test run finished", stop.pump));
            self.raise(Severity::Info, AlertCategory::Test, "test complete", &msg, sink);
        }

        // 3. Sensing
        self.sensing_phase(hw, sink);

        // 4. Mode policy
        if self.tests.any_pending() {
            debug!("Policy skipped: test run pending");
        } else if let Some(decision) = self.modes.decide(&self.policy_input()) {
            self.apply_decision(decision, hw, sink);
            report.decision = Some(decision);
        }

        // 5. Safety
        report.safety = self.safety_phase(hw, sink);

        report
    }

    // ── Queries ───────────────────────────────────────────────

    /// Status as of the most recent tick.
    pub fn status(&self) -> StatusReport {
        let now_ms = self.now.uptime_ms;
        let tanks = TankId::ALL.map(|tank| TankStatus {
            tank,
            level: self.snapshot.level(tank),
            switches: self.snapshot.switches[tank.index()],
        });
        let pumps = PumpId::ALL.map(|pump| {
            let rt = self.ledger.pump(pump);
            PumpStatus {
                pump,
                active: self.supervisor.is_active(pump),
                health: self.supervisor.health(pump),
                current_a: self.supervisor.current(pump),
                daily_runtime_secs: rt.daily_secs(),
                total_runtime_secs: rt.total_secs(),
                run_secs: rt.active_for_secs(now_ms),
                maintenance_due: self
                    .ledger
                    .is_maintenance_due(pump, self.config.maintenance_hours),
                lockout: self.supervisor.lockout(pump),
            }
        });
        StatusReport {
            mode: self.modes.current(),
            emergency_stop: self.modes.current().is_emergency(),
            uptime_ms: now_ms,
            tick: self.tick_count,
            ticks_in_mode: self.modes.ticks_in_mode(self.tick_count),
            tanks,
            pumps,
            alerts: self.alerts.list(),
            pending_tests: self.tests.pending().copied().collect(),
            conditions: self.latch.flags(),
            config: self.config.clone(),
        }
    }

    pub fn mode(&self) -> SystemMode {
        self.modes.current()
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn alerts(&self) -> &AlertLog {
        &self.alerts
    }

    pub fn ledger(&self) -> &RuntimeLedger {
        &self.ledger
    }

    pub fn supervisor(&self) -> &PumpSupervisor {
        &self.supervisor
    }

    pub fn snapshot(&self) -> &SensorSnapshot {
        &self.snapshot
    }

    pub fn tests(&self) -> &DeferredStops {
        &self.tests
    }

    /// Total control ticks executed since startup.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn pending_commands(&self) -> usize {
        self.queue.len()
    }

    // ── Config persistence ────────────────────────────────────

    /// Persist the config if a command changed it.  Called by the outer
    /// loop after each tick, never from inside `tick`.  A failed save keeps
    /// the dirty flag so the next call retries.
    pub fn persist_if_dirty(&mut self, storage: &impl ConfigPort) -> Result<bool, ConfigError> {
        if !self.config_dirty {
            return Ok(false);
        }
        match storage.save(&self.config) {
            Ok(()) => {
                self.config_dirty = false;
                info!("Config persisted");
                Ok(true)
            }
            Err(e) => {
                warn!("Config persist failed: {}", e);
                Err(e)
            }
        }
    }

    /// Whether the config has unsaved changes.
    pub fn is_config_dirty(&self) -> bool {
        self.config_dirty
    }

    // ── Phase 1: commands ─────────────────────────────────────

    fn command_phase(
        &mut self,
        hw: &mut impl ActuatorPort,
        sink: &mut impl EventSink,
        report: &mut TickReport,
    ) {
        let mut entered_emergency = false;
        while let Some(CommandEnvelope { id, command }) = self.queue.pop_front() {
            let name = command.name();
            let safety = command.is_safety();
            let was_emergency = self.modes.current().is_emergency();

            let result = if entered_emergency && !safety {
                Err(Rejection::EmergencyActive)
            } else {
                self.apply(command, hw, sink)
            };

            // Sticky for the rest of the drain, even if a later safety
            // command leaves Emergency again.
            if !was_emergency && self.modes.current().is_emergency() {
                entered_emergency = true;
            }

            match result {
                Ok(()) => debug!("Command {} ({}) applied", id, name),
                Err(reason) => {
                    warn!("Command {} ({}) rejected: {}", id, name, reason);
                    sink.emit(&AppEvent::CommandRejected {
                        id,
                        command: name,
                        reason,
                    });
                }
            }
            // Cannot overflow: outcomes and queue share a capacity.
            let _ = report.outcomes.push(CommandOutcome { id, result });
        }
    }

    fn apply(
        &mut self,
        command: Command,
        hw: &mut impl ActuatorPort,
        sink: &mut impl EventSink,
    ) -> Result<(), Rejection> {
        match command {
            Command::StartPump(pump) => {
                self.require_start_allowed()?;
                self.tests.cancel(pump);
                self.supervisor.clear_lockout(pump);
                self.switch_on(pump, hw, sink)?;
                self.set_mode(SystemMode::Manual, hw, sink);
            }
            Command::StopAll => {
                self.tests.cancel_all();
                self.stop_both(hw, sink);
                if !self.modes.current().is_emergency() {
                    self.set_mode(SystemMode::Manual, hw, sink);
                }
            }
            Command::SwitchPump => {
                self.require_start_allowed()?;
                let from = match self.supervisor.active_count() {
                    0 => return Err(Rejection::NoActivePump),
                    1 => self.supervisor.sole_active().ok_or(Rejection::NoActivePump)?,
                    _ => return Err(Rejection::BothPumpsActive),
                };
                let to = from.other();
                self.tests.cancel(from);
                self.switch_off(from, hw, sink);
                self.supervisor.clear_lockout(to);
                self.switch_on(to, hw, sink)?;
                info!("Switched {:?} -> {:?}", from, to);
            }
            Command::TestPump(pump) => {
                self.require_start_allowed()?;
                self.supervisor.clear_lockout(pump);
                self.switch_on(pump, hw, sink)?;
                let stop_at = self.tick_count + self.config.test_duration_ticks();
                self.tests.schedule(pump, stop_at);
            }
            Command::SetMode(mode) => self.set_mode(mode, hw, sink),
            Command::SetConfig(patch) => {
                let merged = self.config.merged(&patch);
                merged.validate().map_err(|e| match e {
                    ConfigError::ValidationFailed(reason) => Rejection::InvalidConfig(reason),
                    _ => Rejection::InvalidConfig("unusable config"),
                })?;
                if merged != self.config {
                    self.config = merged;
                    self.config_dirty = true;
                    info!("Config updated: {:?}", self.config);
                }
            }
            Command::Reset => self.reset(hw, sink),
            Command::AcknowledgeAlert(id) => {
                if !self.alerts.acknowledge(id) {
                    return Err(Rejection::AlertNotFound(id));
                }
            }
            Command::ClearAlerts => {
                info!("Alert log cleared ({} entries)", self.alerts.len());
                self.alerts.clear();
            }
        }
        Ok(())
    }

    fn require_start_allowed(&self) -> Result<(), Rejection> {
        if self.modes.descriptor().accepts_start {
            Ok(())
        } else {
            Err(Rejection::EmergencyActive)
        }
    }

    fn set_mode(&mut self, next: SystemMode, hw: &mut impl ActuatorPort, sink: &mut impl EventSink) {
        let Some(prev) = self.modes.set(next, self.tick_count) else {
            return;
        };
        sink.emit(&AppEvent::ModeChanged {
            from: prev,
            to: next,
        });
        if next.is_emergency() {
            self.tests.cancel_all();
            self.stop_both(hw, sink);
            let msg = describe(format_args!("emergency stop engaged from {} mode", prev));
            self.raise(Severity::Critical, AlertCategory::Mode, "emergency stop", &msg, sink);
        }
    }

    fn reset(&mut self, hw: &mut impl ActuatorPort, sink: &mut impl EventSink) {
        self.tests.cancel_all();
        self.stop_both(hw, sink);
        self.alerts.clear();
        self.ledger.reset_all();
        self.latch.clear_all();
        for pump in PumpId::ALL {
            self.supervisor.clear_lockout(pump);
        }
        self.config = ControllerConfig::default();
        // Persisted even when unchanged so storage matches the defaults.
        self.config_dirty = true;
        self.set_mode(SystemMode::Auto, hw, sink);
        info!("Controller reset to defaults");
    }

    // ── Phase 3: sensing ──────────────────────────────────────

    fn sensing_phase(&mut self, hw: &mut impl SensorPort, sink: &mut impl EventSink) {
        let now_ms = self.now.uptime_ms;
        self.snapshot = self.reader.read_all(hw);
        debug!(
            "Sensing: overhead={:?} source={:?} current={:?}",
            self.snapshot.level(TankId::Overhead),
            self.snapshot.level(TankId::Secondary),
            self.snapshot.current_a
        );

        let transitions = self.supervisor.update_health(
            self.snapshot.current_a,
            self.config.current_threshold_min,
            self.config.current_threshold_max,
            self.tick_count,
        );
        for t in transitions.into_iter().flatten() {
            sink.emit(&AppEvent::HealthChanged {
                pump: t.pump,
                from: t.from,
                to: t.to,
                current_a: t.current_a,
            });
            let (title, band) = match t.to {
                PumpHealth::DryRun => ("dry run", self.config.current_threshold_min),
                _ => ("pump fault", self.config.current_threshold_max),
            };
            let msg = describe(format_args!(
                "{:?} pump drawing {:.2} A (limit {:.2} A)",
                t.pump, t.current_a, band
            ));
            self.raise(Severity::Critical, AlertCategory::Pump, title, &msg, sink);
        }

        for pump in PumpId::ALL {
            if let Lockout::Cooldown(until) = self.supervisor.lockout(pump) {
                if now_ms >= until {
                    self.supervisor.clear_lockout(pump);
                }
            }
        }

        if self.ledger.tick(now_ms, self.now.day_index()) {
            self.raise(
                Severity::Info,
                AlertCategory::Runtime,
                "daily runtime reset",
                "day rollover, daily counters zeroed",
                sink,
            );
        }
    }

    // ── Phase 4: mode policy ──────────────────────────────────

    fn policy_input(&self) -> PolicyInput {
        let now_ms = self.now.uptime_ms;
        PolicyInput {
            overhead: self.snapshot.level(TankId::Overhead),
            source: self.snapshot.level(TankId::Secondary),
            active: PumpId::ALL.map(|p| self.supervisor.is_active(p)),
            health: PumpId::ALL.map(|p| self.supervisor.health(p)),
            available: PumpId::ALL.map(|p| self.supervisor.is_available(p, now_ms)),
        }
    }

    fn apply_decision(
        &mut self,
        decision: Decision,
        hw: &mut impl ActuatorPort,
        sink: &mut impl EventSink,
    ) {
        let source_dry = self.latch.observe(
            Condition::SourceEmpty,
            matches!(decision, Decision::SourceEmpty | Decision::SourceExhausted),
        );
        let none_available = self
            .latch
            .observe(Condition::NoPumpAvailable, decision == Decision::NoPumpAvailable);

        match decision {
            Decision::Hold => {}
            Decision::Start(pump) => {
                info!(
                    "Auto: overhead {:?}, starting {:?}",
                    self.snapshot.level(TankId::Overhead),
                    pump
                );
                if let Err(e) = self.switch_on(pump, hw, sink) {
                    warn!("Auto start of {:?} refused: {}", pump, e);
                }
            }
            Decision::StopFull => {
                self.stop_both(hw, sink);
                self.raise(
                    Severity::Info,
                    AlertCategory::Level,
                    "tank full",
                    "overhead tank full, pumps stopped",
                    sink,
                );
            }
            Decision::Failover { from, to } => {
                let failed = self.supervisor.health(from);
                self.switch_off(from, hw, sink);
                self.supervisor.set_lockout(from, Lockout::Tripped);
                match to {
                    Some(to) => match self.switch_on(to, hw, sink) {
                        Ok(false) => info!(
                            "{:?} pump {:?}, {:?} already carrying the fill",
                            from, failed, to
                        ),
                        Ok(true) => {
                            let msg = describe(format_args!(
                                "{:?} pump {:?}, switched to {:?}",
                                from, failed, to
                            ));
                            self.raise(Severity::Warning, AlertCategory::Pump, "failover", &msg, sink);
                        }
                        Err(e) => warn!("Failover to {:?} refused: {}", to, e),
                    },
                    None => {
                        let msg = describe(format_args!(
                            "{:?} pump {:?}, no pump or water to fail over to",
                            from, failed
                        ));
                        self.raise(
                            Severity::Critical,
                            AlertCategory::Pump,
                            "failover impossible",
                            &msg,
                            sink,
                        );
                    }
                }
            }
            Decision::SourceEmpty => {
                if source_dry {
                    self.raise(
                        Severity::Critical,
                        AlertCategory::Level,
                        "source empty",
                        "secondary reservoir empty, fill withheld",
                        sink,
                    );
                }
            }
            Decision::NoPumpAvailable => {
                if none_available {
                    self.raise(
                        Severity::Warning,
                        AlertCategory::Pump,
                        "no pump available",
                        "fill needed but both pumps are locked out",
                        sink,
                    );
                }
            }
            Decision::SourceExhausted => {
                self.stop_both(hw, sink);
                if source_dry {
                    self.raise(
                        Severity::Critical,
                        AlertCategory::Level,
                        "source empty",
                        "secondary reservoir ran dry, pumps stopped",
                        sink,
                    );
                }
            }
        }
    }

    // ── Phase 5: safety ───────────────────────────────────────

    fn safety_phase(&mut self, hw: &mut impl ActuatorPort, sink: &mut impl EventSink) -> SafetyVerdict {
        let now_ms = self.now.uptime_ms;
        let verdict = safety::evaluate(&self.ledger, &mut self.latch, &self.config, now_ms);

        for pump in PumpId::ALL {
            if verdict.runtime_stop[pump.index()] {
                self.tests.cancel(pump);
                self.switch_off(pump, hw, sink);
                let until = now_ms + u64::from(self.config.cooldown_minutes) * MS_PER_MIN;
                self.supervisor.set_lockout(pump, Lockout::Cooldown(until));
                let msg = describe(format_args!(
                    "{:?} pump ran past {} min, stopped for {} min",
                    pump, self.config.max_runtime_minutes, self.config.cooldown_minutes
                ));
                self.raise(Severity::Warning, AlertCategory::Runtime, "max runtime", &msg, sink);
            }
            if verdict.maintenance_due[pump.index()] {
                let msg = describe(format_args!(
                    "{:?} pump passed {} h of runtime",
                    pump, self.config.maintenance_hours
                ));
                self.raise(
                    Severity::Warning,
                    AlertCategory::Maintenance,
                    "maintenance due",
                    &msg,
                    sink,
                );
            }
        }
        verdict
    }

    // ── Actuation helpers ─────────────────────────────────────
    //
    // Every relay change goes through these so the ledger's open runs
    // always match the supervisor's commanded state.

    fn switch_on(
        &mut self,
        pump: PumpId,
        hw: &mut impl ActuatorPort,
        sink: &mut impl EventSink,
    ) -> Result<bool, Rejection> {
        let emergency = self.modes.current().is_emergency();
        let changed = self
            .supervisor
            .command_on(pump, emergency, self.tick_count, hw)?;
        if changed {
            self.ledger.mark_started(pump, self.now.uptime_ms);
            sink.emit(&AppEvent::PumpSwitched { pump, on: true });
        }
        Ok(changed)
    }

    fn switch_off(&mut self, pump: PumpId, hw: &mut impl ActuatorPort, sink: &mut impl EventSink) -> bool {
        let changed = self.supervisor.command_off(pump, hw);
        if changed {
            self.ledger.mark_stopped(pump, self.now.uptime_ms);
            sink.emit(&AppEvent::PumpSwitched { pump, on: false });
        }
        changed
    }

    fn stop_both(&mut self, hw: &mut impl ActuatorPort, sink: &mut impl EventSink) {
        let changed = self.supervisor.all_off(hw);
        for pump in PumpId::ALL {
            if changed[pump.index()] {
                self.ledger.mark_stopped(pump, self.now.uptime_ms);
                sink.emit(&AppEvent::PumpSwitched { pump, on: false });
            }
        }
    }

    fn raise(
        &mut self,
        severity: Severity,
        category: AlertCategory,
        title: &'static str,
        message: &str,
        sink: &mut impl EventSink,
    ) -> u32 {
        let id = self
            .alerts
            .add(severity, category, title, message, self.now.uptime_ms);
        match severity {
            Severity::Info => info!("Alert #{} [{:?}] {}: {}", id, severity, title, message),
            _ => warn!("Alert #{} [{:?}] {}: {}", id, severity, title, message),
        }
        sink.emit(&AppEvent::AlertRaised {
            id,
            severity,
            category,
            title,
        });
        id
    }
}
