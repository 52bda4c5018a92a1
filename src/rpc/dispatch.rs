//! Control-loop side of the RPC bridge.
//!
//! Called by the outer loop around every tick:
//!
//! 1. [`drain_inbound`] before the tick: commands go into the loop's queue,
//!    status queries are answered straight away from the last tick.
//! 2. [`publish_outcomes`] after the tick: one reply per applied command.
//!
//! Neither function blocks.  A full response channel drops the reply with
//! a warning; the command itself has already been applied or rejected.

use log::{debug, warn};

use crate::app::commands::CommandOutcome;
use crate::app::service::{ControlLoop, TickReport};

use super::channels::{Inbound, InboundChannel, ResponseChannel, ResponseMsg};
use super::request;

/// Move every pending inbound request into `cl`.  Returns how many were taken.
pub fn drain_inbound(rx: &InboundChannel, tx: &ResponseChannel, cl: &mut ControlLoop) -> usize {
    let mut taken = 0;
    while let Ok(msg) = rx.try_receive() {
        taken += 1;
        match msg {
            Inbound::Command(envelope) => {
                let id = envelope.id;
                if let Err(reason) = cl.enqueue(envelope) {
                    send_outcome(tx, &CommandOutcome {
                        id,
                        result: Err(reason),
                    });
                }
            }
            Inbound::Status { id } => match request::encode_status(id, &cl.status()) {
                Ok(data) => send(tx, ResponseMsg { id, data }),
                Err(e) => warn!("RPC: status {} encode failed: {}", id, e),
            },
        }
    }
    if taken > 0 {
        debug!("RPC: drained {} inbound requests", taken);
    }
    taken
}

/// Reply to every command the tick applied or rejected.
pub fn publish_outcomes(report: &TickReport, tx: &ResponseChannel) {
    for outcome in &report.outcomes {
        send_outcome(tx, outcome);
    }
}

fn send_outcome(tx: &ResponseChannel, outcome: &CommandOutcome) {
    match request::encode_outcome(outcome) {
        Ok(data) => send(tx, ResponseMsg {
            id: outcome.id,
            data,
        }),
        Err(e) => warn!("RPC: outcome {} encode failed: {}", outcome.id, e),
    }
}

fn send(tx: &ResponseChannel, msg: ResponseMsg) {
    let id = msg.id;
    if tx.try_send(msg).is_err() {
        warn!("RPC: response channel full, reply {} dropped", id);
    }
}
