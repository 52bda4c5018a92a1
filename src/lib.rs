//! TankGuard controller library.
//!
//! Dual-pump reservoir controller: float-switch level sensing, pump health
//! supervision, the automatic fill policy and the safety phase, all behind
//! port traits so the core runs identically on a board and on the host.

#![deny(unused_must_use)]

pub mod adapters;
pub mod alerts;
pub mod app;
pub mod config;
pub mod error;
pub mod modes;
pub mod rpc;
pub mod runtime;
pub mod safety;
pub mod scheduler;
pub mod sensors;
pub mod supervisor;
