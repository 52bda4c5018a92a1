//! JSON request codec.
//!
//! The transport hands over one JSON object per request.  Decoding turns it
//! into a typed [`Request`] here, at the boundary, so the control loop only
//! ever sees [`Command`] values.
//!
//! ```text
//!   {"id":7,"cmd":"set_mode","mode":"emergency"}
//!   {"id":8,"cmd":"start_pump","pump":"secondary"}
//!   {"id":9,"cmd":"set_config","config":{"max_runtime_minutes":45}}
//!   {"id":10,"cmd":"status"}
//! ```
//!
//! - An unknown mode name is [`Rejection::InvalidMode`].
//! - Anything else that does not decode (unknown pump, unknown command,
//!   bad field type, unknown config field) is [`Rejection::Malformed`].
//! - The request id is recovered whenever the object carries one, so the
//!   rejection can still be matched to its request.

use serde::{Deserialize, Serialize};

use crate::app::commands::{Command, CommandEnvelope, CommandOutcome};
use crate::app::status::StatusReport;
use crate::config::ConfigPatch;
use crate::error::Rejection;
use crate::modes::SystemMode;
use crate::supervisor::PumpId;

/// Longest request the decoder accepts, in bytes.
pub const MAX_REQUEST_LEN: usize = 1024;

/// A decoded request.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    /// A control command for the next tick.
    Command(CommandEnvelope),
    /// A read-only status query, answered without waiting for a tick.
    Status { id: u32 },
}

impl Request {
    pub fn id(&self) -> u32 {
        match self {
            Request::Command(env) => env.id,
            Request::Status { id } => *id,
        }
    }
}

/// Why a request could not be decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeError {
    /// Request id, 0 when the object carried none.
    pub id: u32,
    pub reason: Rejection,
}

#[derive(Deserialize)]
struct Wire {
    #[serde(default)]
    id: u32,
    #[serde(flatten)]
    body: WireBody,
}

#[derive(Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
enum WireBody {
    StartPump { pump: PumpId },
    StopAll,
    SwitchPump,
    TestPump { pump: PumpId },
    SetMode { mode: String },
    SetConfig { config: ConfigPatch },
    Reset,
    AckAlert { alert: u32 },
    ClearAlerts,
    Status,
}

#[derive(Deserialize)]
struct IdOnly {
    #[serde(default)]
    id: u32,
}

/// Decode one request object.
pub fn decode(bytes: &[u8]) -> Result<Request, DecodeError> {
    if bytes.len() > MAX_REQUEST_LEN {
        return Err(DecodeError {
            id: 0,
            reason: Rejection::Malformed,
        });
    }

    let wire: Wire = serde_json::from_slice(bytes).map_err(|_| DecodeError {
        id: serde_json::from_slice::<IdOnly>(bytes).map_or(0, |w| w.id),
        reason: Rejection::Malformed,
    })?;
    let id = wire.id;

    let command = match wire.body {
        WireBody::Status => return Ok(Request::Status { id }),
        WireBody::StartPump { pump } => Command::StartPump(pump),
        WireBody::StopAll => Command::StopAll,
        WireBody::SwitchPump => Command::SwitchPump,
        WireBody::TestPump { pump } => Command::TestPump(pump),
        WireBody::SetMode { mode } => {
            let mode = mode
                .parse::<SystemMode>()
                .map_err(|reason| DecodeError { id, reason })?;
            Command::SetMode(mode)
        }
        WireBody::SetConfig { config } => Command::SetConfig(config),
        WireBody::Reset => Command::Reset,
        WireBody::AckAlert { alert } => Command::AcknowledgeAlert(alert),
        WireBody::ClearAlerts => Command::ClearAlerts,
    };
    Ok(Request::Command(CommandEnvelope::new(id, command)))
}

#[derive(Serialize)]
struct Reply<'a> {
    id: u32,
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<Rejection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<&'a StatusReport>,
}

/// Render a command outcome as a JSON reply.
pub fn encode_outcome(outcome: &CommandOutcome) -> Result<Vec<u8>, serde_json::Error> {
    let reply = match outcome.result {
        Ok(()) => Reply {
            id: outcome.id,
            ok: true,
            error: None,
            reason: None,
            status: None,
        },
        Err(reason) => Reply {
            id: outcome.id,
            ok: false,
            error: Some(reason.to_string()),
            reason: Some(reason),
            status: None,
        },
    };
    serde_json::to_vec(&reply)
}

/// Render a decode failure as a JSON reply.
pub fn encode_error(err: &DecodeError) -> Result<Vec<u8>, serde_json::Error> {
    encode_outcome(&CommandOutcome {
        id: err.id,
        result: Err(err.reason),
    })
}

/// Render a status report as a JSON reply.
pub fn encode_status(id: u32, status: &StatusReport) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(&Reply {
        id,
        ok: true,
        error: None,
        reason: None,
        status: Some(status),
    })
}
