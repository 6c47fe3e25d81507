//! # FieldBridge App
//!
//! Composition root and command surface.
//!
//! This crate contains:
//! - Application context (dependency injection over the infra adapters)
//! - Commands: the entry points a host (HTTP layer, CLI, queue consumer)
//!   calls to trigger reconciliation
//! - The `fieldbridge` binary, which runs the schedulers until shutdown
//!
//! ## Architecture
//! - Depends on `domain`, `core`, and `infra`
//! - Wires up the hexagonal architecture

pub mod cli;
pub mod commands;
pub mod context;
pub mod utils;

pub use commands::*;
pub use context::*;
