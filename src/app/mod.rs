//! Application core — pure domain logic, zero I/O.
//!
//! This module holds the SenseBe business rules: mode orchestration,
//! gesture handling and radio configuration intake.  All interaction with
//! hardware happens through **port traits** defined in [`ports`], keeping
//! this layer fully testable without real peripherals.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
