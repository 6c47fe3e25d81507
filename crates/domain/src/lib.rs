//! # FieldBridge Domain
//!
//! Business domain types for reconciling a field-service system (FSS) with a
//! CRM platform.
//!
//! This crate contains:
//! - Sync state records, team/calendar mappings, quote records
//! - Domain error types and Result definitions
//! - Application configuration structures
//! - Ordered-fallback extraction helpers for external JSON payloads
//!
//! ## Architecture
//! - No dependencies on other FieldBridge crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;
pub mod utils;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
