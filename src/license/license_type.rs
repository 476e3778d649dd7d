//! License type identity and its map-key encoding.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Separator joining vendor and feature into a registry key.
pub const KEY_SEPARATOR: &str = "::";

/// Vendor reported when a key cannot be decoded.
pub const UNKNOWN_VENDOR: &str = "<UNKNOWN>";

/// A (vendor, feature) pair naming a class of interchangeable licenses.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LicenseType {
    pub vendor: String,
    pub feature: String,
}

impl LicenseType {
    pub fn new(vendor: impl Into<String>, feature: impl Into<String>) -> Self {
        Self {
            vendor: vendor.into(),
            feature: feature.into(),
        }
    }

    /// Registry key for this license type.
    pub fn key(&self) -> String {
        format!("{}{}{}", self.vendor, KEY_SEPARATOR, self.feature)
    }

    /// Decode a registry key.
    ///
    /// Splits on the first separator. A key without one yields the unknown
    /// vendor and the whole key as the feature.
    pub fn from_key(key: &str) -> Self {
        match key.split_once(KEY_SEPARATOR) {
            Some((vendor, feature)) => Self::new(vendor, feature),
            None => Self::new(UNKNOWN_VENDOR, key),
        }
    }
}

impl fmt::Display for LicenseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.vendor, KEY_SEPARATOR, self.feature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_joins_vendor_and_feature() {
        assert_eq!(LicenseType::new("acme", "sim").key(), "acme::sim");
    }

    #[test]
    fn from_key_splits_on_first_separator() {
        let license = LicenseType::from_key("acme::sim::gpu");
        assert_eq!(license.vendor, "acme");
        assert_eq!(license.feature, "sim::gpu");
    }

    #[test]
    fn from_key_without_separator_uses_unknown_vendor() {
        let license = LicenseType::from_key("orphan");
        assert_eq!(license.vendor, UNKNOWN_VENDOR);
        assert_eq!(license.feature, "orphan");
    }
}
