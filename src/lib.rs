//! HTTP Expectations
//!
//! An in-memory response provider for HTTP test servers. Tests register the
//! requests they expect together with canned responses; the test server asks
//! the provider for a response to every captured request, and the test
//! finally verifies that each expectation was exercised and nothing else
//! arrived.
//!
//! # Features
//!
//! - **Request Matching**: Match by method, path, content type and body
//! - **Wildcards**: Ignore path, content type or body with dedicated markers
//! - **Verification**: Report missing and unexpected requests
//! - **YAML Expectations**: Load expectations from a configuration file
//!
//! # Example
//!
//! ```
//! use http_expectations::{
//!     HttpRequest, HttpResponseProvider, Method, SimpleResponseProvider, IGNORE_CONTENT,
//! };
//!
//! let provider = SimpleResponseProvider::new();
//! provider
//!     .expect(Method::Get, "/foo")
//!     .respond_with(200, "text/plain", "ok")
//!     .expect(Method::Post, "/items")
//!     .content(IGNORE_CONTENT)
//!     .respond_with_status(201);
//!
//! let response = provider.get_response(&HttpRequest::new(Method::Get, "/foo"));
//! assert_eq!(response.map(|r| r.status()), Some(200));
//!
//! let err = provider.verify().unwrap_err();
//! assert_eq!(err.missing().len(), 1);
//! ```
//!
//! # Example Configuration
//!
//! ```yaml
//! expectations:
//!   - id: get-foo
//!     request:
//!       method: GET
//!       path:
//!         type: exact
//!         value: /foo
//!     response:
//!       status: 200
//!       body:
//!         type: text
//!         content: ok
//! ```

pub mod config;
pub mod error;
pub mod http;
pub mod matcher;
pub mod provider;

pub use config::ExpectationsConfig;
pub use error::{Error, UnsatisfiedExpectation};
pub use http::{HttpMessageHeader, HttpRequest, HttpResponse, Method, CONTENT_TYPE};
pub use matcher::{
    ContentMatcher, ContentTypeMatcher, IgnoreContent, IgnoreContentType, IgnorePath,
    PathMatcher, IGNORE_CONTENT, IGNORE_CONTENT_TYPE, IGNORE_PATH,
};
pub use provider::{ExpectationBuilder, HttpResponseProvider, SimpleResponseProvider};
