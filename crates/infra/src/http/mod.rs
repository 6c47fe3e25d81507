//! HTTP plumbing shared by the gateway adapters

pub mod client;

pub use client::{HttpClient, HttpClientBuilder};
