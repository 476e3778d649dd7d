//! License engine error types.
//!
//! Capacity exhaustion is not an error: a request that cannot be allocated
//! is queued and reported as such.

use thiserror::Error;

/// Errors returned by registry and ledger operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LicenseError {
    #[error("Unknown license type: {license}")]
    UnknownLicense { license: String },

    #[error("Invocation {id} is already queued or allocated")]
    DuplicateInvocation { id: String },

    #[error("Invocation {id} not found")]
    InvocationNotFound { id: String },

    #[error("License registry is shutting down")]
    ShuttingDown,
}

impl LicenseError {
    /// Returns true if this error indicates a caller contract breach.
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, Self::DuplicateInvocation { .. })
    }

    /// Returns true if this error should be logged as a warning.
    pub fn is_warning(&self) -> bool {
        matches!(self, Self::UnknownLicense { .. } | Self::InvocationNotFound { .. })
    }
}
