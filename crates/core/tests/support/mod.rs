//! Shared test helpers for `fieldbridge-core` integration tests.
//!
//! In-memory gateways and stores plus a controllable clock, so the engine
//! tests can focus on behaviour instead of boilerplate.

#![allow(dead_code)]

pub mod clock;
pub mod fixtures;
pub mod gateways;
pub mod stores;
