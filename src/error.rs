//! Error types for the expectation provider.

use crate::http::HttpRequest;
use thiserror::Error;

/// Errors raised while registering expectations or building requests.
#[derive(Debug, Error)]
pub enum Error {
    /// Status code outside the 100..=599 range
    #[error("invalid status code: {0}")]
    InvalidStatus(u16),

    /// Method name that is not a known HTTP method
    #[error("unknown HTTP method: {0}")]
    UnknownMethod(String),

    /// Received traffic did not match the registered expectations.
    ///
    /// Never built by the provider itself; lets callers returning
    /// `Result<_, Error>` propagate a failed `verify` with `?`.
    #[error(transparent)]
    Unsatisfied(#[from] UnsatisfiedExpectation),
}

/// Raised by verification when received traffic differs from the registered
/// expectations.
///
/// Either collection may be empty, but never both.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", render_report(.missing, .unexpected))]
pub struct UnsatisfiedExpectation {
    /// Expected requests that were never received
    pub missing: Vec<HttpRequest>,
    /// Received requests that were never expected
    pub unexpected: Vec<HttpRequest>,
}

impl UnsatisfiedExpectation {
    /// Expected requests that were never received.
    pub fn missing(&self) -> &[HttpRequest] {
        &self.missing
    }

    /// Received requests that were never expected.
    pub fn unexpected(&self) -> &[HttpRequest] {
        &self.unexpected
    }
}

fn render_report(missing: &[HttpRequest], unexpected: &[HttpRequest]) -> String {
    let mut report = format!(
        "unsatisfied expectations ({} missing, {} unexpected)",
        missing.len(),
        unexpected.len()
    );
    for request in missing {
        report.push_str(&format!("\n  missing:    {}", request));
    }
    for request in unexpected {
        report.push_str(&format!("\n  unexpected: {}", request));
    }
    report
}
