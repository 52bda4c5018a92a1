//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the `log` facade, one `TAG | key=value` record per event.
//! A client push adapter would implement the same trait.

use log::{info, warn};

use crate::alerts::Severity;
use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the console.
#[derive(Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started(mode) => {
                info!("START | mode={}", mode);
            }
            AppEvent::ModeChanged { from, to } => {
                info!("STATE | mode {} -> {}", from, to);
            }
            AppEvent::PumpSwitched { pump, on } => {
                info!(
                    "PUMP  | pump={:?} relay={}",
                    pump,
                    if *on { "ON" } else { "OFF" }
                );
            }
            AppEvent::HealthChanged {
                pump,
                from,
                to,
                current_a,
            } => {
                warn!(
                    "PUMP  | pump={:?} health {:?} -> {:?} | current={:.2}A",
                    pump, from, to, current_a
                );
            }
            AppEvent::AlertRaised {
                id,
                severity,
                category,
                title,
            } => {
                let line = format_args!(
                    "ALERT | id={} severity={:?} category={:?} title=\"{}\"",
                    id, severity, category, title
                );
                if *severity == Severity::Info {
                    info!("{}", line);
                } else {
                    warn!("{}", line);
                }
            }
            AppEvent::CommandRejected {
                id,
                command,
                reason,
            } => {
                warn!("REJECT | id={} command={} reason=\"{}\"", id, command, reason);
            }
        }
    }
}
