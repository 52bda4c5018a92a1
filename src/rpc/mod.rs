//! Transport-agnostic RPC boundary.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         RPC Stack                            │
//! │                                                              │
//! │  ┌───────────┐   ┌──────────┐   ┌─────────────────────────┐  │
//! │  │ Transport │──▶│ request  │──▶│ channels ──▶ dispatch    │  │
//! │  │ (thread)  │   │ (decode) │   │   → ControlLoop::enqueue │  │
//! │  └───────────┘   └──────────┘   └─────────────────────────┘  │
//! │       ▲                                    │                 │
//! │       └────────── channels ◀── encode ─────┘                 │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Requests are decoded into typed commands on the transport side; the
//! control loop only sees [`Command`](crate::app::commands::Command) values.

pub mod channels;
pub mod dispatch;
pub mod request;
