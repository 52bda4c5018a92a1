//! Application core: pure domain logic, zero I/O.
//!
//! This module contains the business rules for the TankGuard controller:
//! command application, the per-tick control loop, and the status surface.
//! All interaction with hardware happens through **port traits** defined
//! in [`ports`], keeping this layer fully testable without real peripherals.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
pub mod status;
