//! Span helpers for license operations.

use tracing::{info_span, Span};

use crate::license::LicenseType;

/// Extension trait for recording operation outcomes on a span.
pub trait SpanExt {
    fn record_result<T, E>(&self, result: &Result<T, E>)
    where
        E: std::fmt::Display;
}

impl SpanExt for Span {
    fn record_result<T, E>(&self, result: &Result<T, E>)
    where
        E: std::fmt::Display,
    {
        match result {
            Ok(_) => {
                self.record("status", "ok");
            }
            Err(e) => {
                self.record("status", "error");
                self.record("error.message", e.to_string().as_str());
            }
        }
    }
}

/// Span covering one client operation on a license type.
///
/// `status` and `error.message` are filled in by [`SpanExt::record_result`].
pub fn license_span(license: &LicenseType, invocation_id: &str) -> Span {
    info_span!(
        "license_request",
        vendor = %license.vendor,
        feature = %license.feature,
        invocation_id = %invocation_id,
        status = tracing::field::Empty,
        error.message = tracing::field::Empty,
    )
}
