//! External platform adapters

pub mod crm;
pub mod fss;

pub use crm::CrmClient;
pub use fss::FssClient;
