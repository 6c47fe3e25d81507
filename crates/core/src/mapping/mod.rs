//! Team/calendar mapping: store port and service

pub mod ports;
pub mod service;

pub use service::TeamCalendarMappingService;
