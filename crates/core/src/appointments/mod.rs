//! Appointment reconciliation

pub mod engine;
pub mod ports;

pub use engine::{AppointmentSyncEngine, EngineSettings};
