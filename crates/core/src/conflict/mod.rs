//! Conflict resolution between competing appointment versions

pub mod resolver;

pub use resolver::{resolve, resolve_timestamps, Resolution};
