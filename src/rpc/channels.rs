//! RPC inter-task communication channels.
//!
//! Uses `embassy-sync` bounded MPMC channels to bridge the transport
//! threads with the synchronous control loop.  Both sides share these
//! static channels; the control loop only ever uses the non-blocking
//! `try_receive` / `try_send`, so it never waits on the network.
//!
//! ```text
//! ┌──────────────┐   Inbound    ┌──────────────┐
//! │  Transport   │────────────▶│ Control Loop │
//! │  (threads)   │◀────────────│  (sync)      │
//! └──────────────┘  Response    └──────────────┘
//! ```

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;

use crate::app::commands::CommandEnvelope;

/// Inbound request from a client, delivered to the control loop.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// Queued for the next tick.
    Command(CommandEnvelope),
    /// Answered from the last tick's state.
    Status { id: u32 },
}

/// Outbound reply from the control loop, already encoded as JSON.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseMsg {
    pub id: u32,
    pub data: Vec<u8>,
}

/// Channel depth for inbound requests.
pub const INBOUND_DEPTH: usize = 16;

/// Channel depth for outbound replies.
pub const RESPONSE_DEPTH: usize = 32;

pub type InboundChannel = Channel<CriticalSectionRawMutex, Inbound, INBOUND_DEPTH>;
pub type ResponseChannel = Channel<CriticalSectionRawMutex, ResponseMsg, RESPONSE_DEPTH>;

/// Inbound channel: transport → control loop.
pub static COMMAND_CHANNEL: InboundChannel = Channel::new();

/// Outbound channel: control loop → transport.
pub static OUTCOME_CHANNEL: ResponseChannel = Channel::new();
