//! Double-booking detection across interchangeable teams

pub mod service;

pub use service::AvailabilityService;
