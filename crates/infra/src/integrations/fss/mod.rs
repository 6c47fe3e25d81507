//! Field-service system adapter
//!
//! Teams own appointments (`/teams/{team}/appointments`), quotes are scoped
//! to a location (`/locations/{location}/quotes`).

pub mod client;
pub mod types;

pub use client::FssClient;
