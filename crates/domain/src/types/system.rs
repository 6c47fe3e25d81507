use serde::{Deserialize, Serialize};

/// The two platforms being reconciled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExternalSystem {
    Fss,
    Crm,
}

impl ExternalSystem {
    pub fn counterpart(self) -> Self {
        match self {
            Self::Fss => Self::Crm,
            Self::Crm => Self::Fss,
        }
    }
}

crate::impl_domain_status_conversions!(ExternalSystem {
    Fss => "fss",
    Crm => "crm",
});
