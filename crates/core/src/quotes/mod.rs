//! Quote discovery and propagation to CRM contacts and opportunities

pub mod discovery;
pub mod mapping;
pub mod poller;
pub mod ports;
pub mod service;

pub use poller::QuotePoller;
pub use service::QuoteSyncService;
