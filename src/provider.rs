//! In-memory response provider.
//!
//! Holds the registered expectations, answers captured requests and
//! verifies afterwards that traffic matched the expectations exactly.

use crate::config::{ExpectationsConfig, GlobalSettings};
use crate::error::{Error, UnsatisfiedExpectation};
use crate::http::{HttpRequest, HttpResponse, Method};
use crate::matcher::{ContentMatcher, ContentTypeMatcher, PathMatcher, RequestFingerprint};
use anyhow::Context;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

/// Source of responses for an HTTP transport used in tests.
///
/// The transport calls [`get_response`](Self::get_response) for every
/// captured request and decides what to send when `None` comes back.
pub trait HttpResponseProvider: Send + Sync {
    /// Response for `request`, or `None` if no expectation matches.
    fn get_response(&self, request: &HttpRequest) -> Option<HttpResponse>;

    /// Check that every expectation was exercised and nothing else arrived.
    fn verify(&self) -> Result<(), UnsatisfiedExpectation>;
}

#[derive(Debug, Default)]
struct ProviderState {
    /// Registration order, unique by fingerprint
    expected: Vec<(RequestFingerprint, HttpResponse)>,
    /// Position of each fingerprint in `expected`
    expected_index: HashMap<RequestFingerprint, usize>,
    /// Distinct received fingerprints, arrival order
    received: Vec<RequestFingerprint>,
    received_index: HashSet<RequestFingerprint>,
}

impl ProviderState {
    fn insert_expected(&mut self, fingerprint: RequestFingerprint, response: HttpResponse) {
        match self.expected_index.get(&fingerprint) {
            Some(&idx) => self.expected[idx].1 = response,
            None => {
                self.expected_index
                    .insert(fingerprint.clone(), self.expected.len());
                self.expected.push((fingerprint, response));
            }
        }
    }

    fn record_received(&mut self, fingerprint: RequestFingerprint) {
        if self.received_index.insert(fingerprint.clone()) {
            self.received.push(fingerprint);
        }
    }
}

/// Response provider backed by programmatically registered expectations.
///
/// ```
/// use http_expectations::{HttpRequest, HttpResponseProvider, Method, SimpleResponseProvider};
///
/// let provider = SimpleResponseProvider::new();
/// provider
///     .expect(Method::Get, "/foo")
///     .respond_with(200, "text/plain", "ok");
///
/// let response = provider
///     .get_response(&HttpRequest::new(Method::Get, "/foo"))
///     .unwrap();
/// assert_eq!(response.status(), 200);
/// assert!(provider.verify().is_ok());
/// ```
#[derive(Debug)]
pub struct SimpleResponseProvider {
    settings: GlobalSettings,
    state: Mutex<ProviderState>,
    requests_total: AtomicU64,
    requests_matched: AtomicU64,
    requests_unmatched: AtomicU64,
}

impl SimpleResponseProvider {
    /// Create an empty provider with default settings.
    pub fn new() -> Self {
        Self::with_settings(GlobalSettings::default())
    }

    /// Create an empty provider with the given settings.
    pub fn with_settings(settings: GlobalSettings) -> Self {
        Self {
            settings,
            state: Mutex::new(ProviderState::default()),
            requests_total: AtomicU64::new(0),
            requests_matched: AtomicU64::new(0),
            requests_unmatched: AtomicU64::new(0),
        }
    }

    /// Create a provider holding every expectation of `config`.
    pub fn from_config(config: &ExpectationsConfig) -> anyhow::Result<Self> {
        config.validate()?;
        let provider = Self::with_settings(config.settings.clone());
        for def in &config.expectations {
            let fingerprint = def
                .request
                .fingerprint()
                .with_context(|| format!("expectation {}", def.id))?;
            let response = def
                .response
                .to_response()
                .with_context(|| format!("expectation {}", def.id))?;
            provider.insert(fingerprint, response);
        }

        info!(
            expectations = provider.expectation_count(),
            "Response provider initialized from configuration"
        );
        Ok(provider)
    }

    /// Create a provider from a YAML document.
    pub fn from_yaml(yaml: &str) -> anyhow::Result<Self> {
        let config: ExpectationsConfig = serde_yaml::from_str(yaml)?;
        Self::from_config(&config)
    }

    pub fn settings(&self) -> &GlobalSettings {
        &self.settings
    }

    /// Begin an expectation without content type or content.
    ///
    /// `path` is a literal path or [`IGNORE_PATH`](crate::IGNORE_PATH).
    pub fn expect(&self, method: Method, path: impl Into<PathMatcher>) -> ExpectationBuilder<'_> {
        ExpectationBuilder {
            provider: self,
            fingerprint: RequestFingerprint {
                method,
                path: path.into(),
                content_type: ContentTypeMatcher::Unset,
                content: ContentMatcher::Unset,
            },
        }
    }

    /// Begin an expectation with content type and content.
    pub fn expect_with(
        &self,
        method: Method,
        path: impl Into<PathMatcher>,
        content_type: impl Into<ContentTypeMatcher>,
        content: impl Into<ContentMatcher>,
    ) -> ExpectationBuilder<'_> {
        self.expect(method, path)
            .content_type(content_type)
            .content(content)
    }

    /// Number of registered expectations.
    pub fn expectation_count(&self) -> usize {
        self.state().expected.len()
    }

    /// Number of distinct requests received so far.
    pub fn received_count(&self) -> usize {
        self.state().received.len()
    }

    /// Get total requests processed.
    pub fn total_requests(&self) -> u64 {
        self.requests_total.load(Ordering::Relaxed)
    }

    /// Get total requests matched.
    pub fn total_matched(&self) -> u64 {
        self.requests_matched.load(Ordering::Relaxed)
    }

    /// Get total requests unmatched.
    pub fn total_unmatched(&self) -> u64 {
        self.requests_unmatched.load(Ordering::Relaxed)
    }

    // The state is plain data; a panic elsewhere cannot leave it half-updated.
    fn state(&self) -> MutexGuard<'_, ProviderState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn insert(&self, fingerprint: RequestFingerprint, response: HttpResponse) {
        debug!(
            method = %fingerprint.method,
            path = ?fingerprint.path,
            status = response.status(),
            "Registering expectation"
        );

        self.state().insert_expected(fingerprint, response);
    }
}

impl Default for SimpleResponseProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpResponseProvider for SimpleResponseProvider {
    fn get_response(&self, request: &HttpRequest) -> Option<HttpResponse> {
        self.requests_total.fetch_add(1, Ordering::Relaxed);

        let received =
            RequestFingerprint::of_request(request, self.settings.case_insensitive_headers);

        let response = {
            let mut state = self.state();
            let response = state
                .expected
                .iter()
                .find(|(expected, _)| expected.matches(&received))
                .map(|(_, response)| response.clone());
            state.record_received(received);
            response
        };

        match &response {
            Some(response) => {
                self.requests_matched.fetch_add(1, Ordering::Relaxed);
                if self.settings.log_matches {
                    info!(
                        method = %request.method(),
                        path = %request.path(),
                        status = response.status(),
                        "Request matched expectation"
                    );
                }
            }
            None => {
                self.requests_unmatched.fetch_add(1, Ordering::Relaxed);
                if self.settings.log_unmatched {
                    warn!(
                        method = %request.method(),
                        path = %request.path(),
                        "No matching expectation found"
                    );
                }
            }
        }

        response
    }

    fn verify(&self) -> Result<(), UnsatisfiedExpectation> {
        let state = self.state();

        let missing: Vec<HttpRequest> = state
            .expected
            .iter()
            .map(|(fp, _)| fp)
            .filter(|fp| !state.received_index.contains(*fp))
            .map(RequestFingerprint::to_request)
            .collect();

        let unexpected: Vec<HttpRequest> = state
            .received
            .iter()
            .filter(|fp| !state.expected_index.contains_key(*fp))
            .map(RequestFingerprint::to_request)
            .collect();

        // Both sides are duplicate-free, so two empty differences mean equal sets.
        if missing.is_empty() && unexpected.is_empty() {
            debug!(
                expectations = state.expected.len(),
                "All expectations satisfied"
            );
            return Ok(());
        }

        warn!(
            missing = missing.len(),
            unexpected = unexpected.len(),
            "Unsatisfied expectations"
        );
        Err(UnsatisfiedExpectation {
            missing,
            unexpected,
        })
    }
}

/// Pending expectation started by [`SimpleResponseProvider::expect`].
///
/// Nothing is registered until a response is attached; dropping the builder
/// discards the expectation.
#[must_use = "an expectation is only registered once a response is attached"]
#[derive(Debug)]
pub struct ExpectationBuilder<'a> {
    provider: &'a SimpleResponseProvider,
    fingerprint: RequestFingerprint,
}

impl<'a> ExpectationBuilder<'a> {
    /// Expected content type: a literal value or
    /// [`IGNORE_CONTENT_TYPE`](crate::IGNORE_CONTENT_TYPE).
    pub fn content_type(mut self, content_type: impl Into<ContentTypeMatcher>) -> Self {
        self.fingerprint.content_type = content_type.into();
        self
    }

    /// Expected content: text, bytes or [`IGNORE_CONTENT`](crate::IGNORE_CONTENT).
    pub fn content(mut self, content: impl Into<ContentMatcher>) -> Self {
        self.fingerprint.content = content.into();
        self
    }

    /// Attach `response`, rejecting status codes outside 100..=599.
    pub fn try_respond(self, response: HttpResponse) -> Result<&'a SimpleResponseProvider, Error> {
        if !(100..=599).contains(&response.status()) {
            return Err(Error::InvalidStatus(response.status()));
        }
        self.provider.insert(self.fingerprint, response);
        Ok(self.provider)
    }

    /// Attach `response`.
    ///
    /// # Panics
    ///
    /// Panics if the status code is outside 100..=599.
    pub fn respond(self, response: HttpResponse) -> &'a SimpleResponseProvider {
        match self.try_respond(response) {
            Ok(provider) => provider,
            Err(e) => panic!("invalid expectation: {}", e),
        }
    }

    /// Attach a response with content type and body.
    ///
    /// # Panics
    ///
    /// Panics if the status code is outside 100..=599.
    pub fn respond_with(
        self,
        status: u16,
        content_type: &str,
        content: impl Into<Vec<u8>>,
    ) -> &'a SimpleResponseProvider {
        self.respond(HttpResponse::new(
            status,
            Some(content_type.to_string()),
            Some(content.into()),
        ))
    }

    /// Attach a response carrying only a status code.
    ///
    /// # Panics
    ///
    /// Panics if the status code is outside 100..=599.
    pub fn respond_with_status(self, status: u16) -> &'a SimpleResponseProvider {
        self.respond(HttpResponse::new(status, None, None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::CONTENT_TYPE;
    use crate::matcher::{IGNORE_CONTENT, IGNORE_CONTENT_TYPE, IGNORE_PATH};

    fn get(path: &str) -> HttpRequest {
        HttpRequest::new(Method::Get, path)
    }

    #[test]
    fn test_exact_match_returns_response() {
        let provider = SimpleResponseProvider::new();
        provider
            .expect(Method::Get, "/foo")
            .respond_with(200, "text/plain", "ok");

        let response = provider.get_response(&get("/foo")).unwrap();
        assert_eq!(response.status(), 200);
        assert_eq!(response.content_type(), Some("text/plain"));
        assert_eq!(response.content(), Some(&b"ok"[..]));

        assert!(provider.verify().is_ok());
    }

    #[test]
    fn test_match_with_content_and_content_type() {
        let provider = SimpleResponseProvider::new();
        provider
            .expect_with(Method::Post, "/items", "application/json", r#"{"a":1}"#)
            .respond_with(201, "application/json", r#"{"id":7}"#);

        let request = HttpRequest::new(Method::Post, "/items")
            .header(CONTENT_TYPE, "application/json")
            .content(r#"{"a":1}"#);
        let response = provider.get_response(&request).unwrap();
        assert_eq!(response.status(), 201);

        let other_body = HttpRequest::new(Method::Post, "/items")
            .header(CONTENT_TYPE, "application/json")
            .content(r#"{"a":2}"#);
        assert!(provider.get_response(&other_body).is_none());
    }

    #[test]
    fn test_ignore_content_matches_any_body() {
        let provider = SimpleResponseProvider::new();
        provider
            .expect(Method::Post, "/items")
            .content(IGNORE_CONTENT)
            .respond_with_status(201);

        for body in ["abc", "xyz"] {
            let request = HttpRequest::new(Method::Post, "/items").content(body);
            assert_eq!(provider.get_response(&request).unwrap().status(), 201);
        }
        let no_body = HttpRequest::new(Method::Post, "/items");
        assert_eq!(provider.get_response(&no_body).unwrap().status(), 201);

        // Received fingerprints keep the real bodies.
        assert_eq!(provider.received_count(), 3);
    }

    #[test]
    fn test_ignore_content_type_matches_any_header() {
        let provider = SimpleResponseProvider::new();
        provider
            .expect(Method::Put, "/doc")
            .content_type(IGNORE_CONTENT_TYPE)
            .respond_with_status(204);

        let without = HttpRequest::new(Method::Put, "/doc");
        let with = HttpRequest::new(Method::Put, "/doc").header(CONTENT_TYPE, "text/xml");

        assert!(provider.get_response(&without).is_some());
        assert!(provider.get_response(&with).is_some());
    }

    #[test]
    fn test_ignore_path_matches_any_path() {
        let provider = SimpleResponseProvider::new();
        provider
            .expect(Method::Get, IGNORE_PATH)
            .respond_with(200, "text/plain", "anything");

        assert!(provider.get_response(&get("/a")).is_some());
        assert!(provider.get_response(&get("/b/c")).is_some());
        assert!(provider
            .get_response(&HttpRequest::new(Method::Post, "/a"))
            .is_none());
    }

    #[test]
    fn test_wildcard_expectations_are_not_satisfied_by_concrete_requests() {
        let provider = SimpleResponseProvider::new();
        provider
            .expect(Method::Post, "/items")
            .content(IGNORE_CONTENT)
            .respond_with_status(201);

        provider.get_response(&HttpRequest::new(Method::Post, "/items").content("abc"));
        provider.get_response(&HttpRequest::new(Method::Post, "/items").content("xyz"));

        let err = provider.verify().unwrap_err();
        assert_eq!(err.missing().len(), 1);
        assert_eq!(err.missing()[0].path(), "/items");
        assert_eq!(err.missing()[0].body(), None);
        assert_eq!(err.unexpected().len(), 2);
    }

    #[test]
    fn test_unmatched_request_is_reported_unexpected() {
        let provider = SimpleResponseProvider::new();
        provider
            .expect(Method::Get, "/foo")
            .respond_with(200, "text/plain", "ok");

        assert!(provider.get_response(&get("/foo")).is_some());
        assert!(provider.get_response(&get("/bar")).is_none());

        let err = provider.verify().unwrap_err();
        assert!(err.missing().is_empty());
        assert_eq!(err.unexpected(), &[get("/bar")]);
    }

    #[test]
    fn test_missing_and_unexpected() {
        let provider = SimpleResponseProvider::new();
        provider.expect(Method::Delete, "/x").respond_with_status(204);

        assert!(provider.get_response(&get("/y")).is_none());

        let err = provider.verify().unwrap_err();
        assert_eq!(err.missing(), &[HttpRequest::new(Method::Delete, "/x")]);
        assert_eq!(err.unexpected(), &[get("/y")]);
    }

    #[test]
    fn test_missing_only() {
        let provider = SimpleResponseProvider::new();
        provider
            .expect_with(Method::Post, "/form", "text/plain", "a=b")
            .respond_with_status(200);

        let err = provider.verify().unwrap_err();
        assert!(err.unexpected().is_empty());
        let expected = HttpRequest::new(Method::Post, "/form")
            .content("a=b")
            .header(CONTENT_TYPE, "text/plain");
        assert_eq!(err.missing(), &[expected]);
    }

    #[test]
    fn test_repeated_requests_count_once() {
        let provider = SimpleResponseProvider::new();
        provider
            .expect(Method::Get, "/foo")
            .respond_with(200, "text/plain", "ok");

        for _ in 0..3 {
            provider.get_response(&get("/foo"));
        }

        assert_eq!(provider.received_count(), 1);
        assert_eq!(provider.total_requests(), 3);
        assert_eq!(provider.total_matched(), 3);
        assert!(provider.verify().is_ok());
    }

    #[test]
    fn test_many_requests_keep_arrival_order() {
        let provider = SimpleResponseProvider::new();
        for i in 0..200 {
            provider
                .expect(Method::Get, format!("/item/{}", i))
                .respond_with_status(200);
        }
        // Same fingerprint again replaces the response without moving it.
        provider
            .expect(Method::Get, "/item/0")
            .respond_with_status(202);
        assert_eq!(provider.expectation_count(), 200);

        for i in (0..200).rev() {
            provider.get_response(&get(&format!("/item/{}", i)));
            provider.get_response(&get(&format!("/item/{}", i)));
        }
        for i in 0..3 {
            provider.get_response(&get(&format!("/other/{}", i)));
            provider.get_response(&get(&format!("/other/{}", i)));
        }

        assert_eq!(provider.received_count(), 203);
        assert_eq!(
            provider.get_response(&get("/item/0")).map(|r| r.status()),
            Some(202)
        );

        let err = provider.verify().unwrap_err();
        assert!(err.missing().is_empty());
        let paths: Vec<&str> = err.unexpected().iter().map(|r| r.path()).collect();
        assert_eq!(paths, vec!["/other/0", "/other/1", "/other/2"]);
    }

    #[test]
    fn test_verify_is_idempotent() {
        let provider = SimpleResponseProvider::new();
        provider.expect(Method::Delete, "/x").respond_with_status(204);
        provider.get_response(&get("/y"));

        let first = provider.verify().unwrap_err();
        let second = provider.verify().unwrap_err();
        assert_eq!(first, second);
        assert_eq!(provider.expectation_count(), 1);
        assert_eq!(provider.received_count(), 1);
    }

    #[test]
    fn test_verify_with_nothing_registered_or_received() {
        let provider = SimpleResponseProvider::new();
        assert!(provider.verify().is_ok());
    }

    #[test]
    fn test_same_fingerprint_overwrites_response() {
        let provider = SimpleResponseProvider::new();
        provider
            .expect(Method::Get, "/foo")
            .respond_with(200, "text/plain", "first")
            .expect(Method::Get, "/foo")
            .respond_with(200, "text/plain", "second");

        assert_eq!(provider.expectation_count(), 1);
        let response = provider.get_response(&get("/foo")).unwrap();
        assert_eq!(response.content(), Some(&b"second"[..]));
    }

    #[test]
    fn test_dropped_builder_registers_nothing() {
        let provider = SimpleResponseProvider::new();
        let _ = provider.expect(Method::Get, "/abandoned");
        provider.expect(Method::Get, "/kept").respond_with_status(200);

        assert_eq!(provider.expectation_count(), 1);
        assert!(provider.get_response(&get("/abandoned")).is_none());
    }

    #[test]
    fn test_first_registered_match_wins() {
        let provider = SimpleResponseProvider::new();
        provider
            .expect(Method::Get, IGNORE_PATH)
            .respond_with(200, "text/plain", "wildcard")
            .expect(Method::Get, "/foo")
            .respond_with(200, "text/plain", "exact");

        let response = provider.get_response(&get("/foo")).unwrap();
        assert_eq!(response.content(), Some(&b"wildcard"[..]));
    }

    #[test]
    fn test_content_type_from_first_header() {
        let provider = SimpleResponseProvider::new();
        provider
            .expect(Method::Post, "/upload")
            .content_type("text/csv")
            .respond_with_status(202);

        let request = HttpRequest::new(Method::Post, "/upload")
            .header("content-type", "text/csv")
            .header(CONTENT_TYPE, "application/json");
        assert_eq!(provider.get_response(&request).unwrap().status(), 202);
    }

    #[test]
    fn test_exact_header_names() {
        let settings = GlobalSettings {
            case_insensitive_headers: false,
            ..GlobalSettings::default()
        };
        let provider = SimpleResponseProvider::with_settings(settings);
        provider
            .expect(Method::Post, "/upload")
            .content_type("text/csv")
            .respond_with_status(202);

        let lower = HttpRequest::new(Method::Post, "/upload").header("content-type", "text/csv");
        assert!(provider.get_response(&lower).is_none());

        let exact = HttpRequest::new(Method::Post, "/upload").header(CONTENT_TYPE, "text/csv");
        assert!(provider.get_response(&exact).is_some());
    }

    #[test]
    fn test_invalid_status_is_rejected() {
        let provider = SimpleResponseProvider::new();
        let result = provider
            .expect(Method::Get, "/foo")
            .try_respond(HttpResponse::new(42, None, None));

        assert!(matches!(result, Err(Error::InvalidStatus(42))));
        assert_eq!(provider.expectation_count(), 0);
    }

    #[test]
    #[should_panic(expected = "invalid status code: 700")]
    fn test_respond_panics_on_invalid_status() {
        let provider = SimpleResponseProvider::new();
        provider.expect(Method::Get, "/foo").respond_with_status(700);
    }

    #[test]
    fn test_counters() {
        let provider = SimpleResponseProvider::new();
        provider.expect(Method::Get, "/foo").respond_with_status(200);

        assert_eq!(provider.total_requests(), 0);

        provider.get_response(&get("/foo"));
        provider.get_response(&get("/bar"));

        assert_eq!(provider.total_requests(), 2);
        assert_eq!(provider.total_matched(), 1);
        assert_eq!(provider.total_unmatched(), 1);
    }

    #[test]
    fn test_concurrent_handlers() {
        let provider = SimpleResponseProvider::new();
        for i in 0..4 {
            provider
                .expect(Method::Get, format!("/item/{}", i))
                .respond_with_status(200);
        }

        std::thread::scope(|s| {
            for i in 0..4 {
                let provider = &provider;
                s.spawn(move || {
                    for _ in 0..25 {
                        let request = HttpRequest::new(Method::Get, format!("/item/{}", i));
                        assert!(provider.get_response(&request).is_some());
                    }
                });
            }
        });

        assert_eq!(provider.total_requests(), 100);
        assert_eq!(provider.received_count(), 4);
        assert!(provider.verify().is_ok());
    }

    #[test]
    fn test_from_yaml_sample() {
        let provider =
            SimpleResponseProvider::from_yaml(include_str!("../demos/default-expectations.yaml"))
                .unwrap();
        assert_eq!(provider.expectation_count(), 3);

        let ok = provider.get_response(&get("/foo")).unwrap();
        assert_eq!(ok.content_type(), Some("text/plain"));
        assert_eq!(ok.content(), Some(&b"ok"[..]));

        let created = provider
            .get_response(
                &HttpRequest::new(Method::Post, "/items")
                    .header(CONTENT_TYPE, "application/json")
                    .content(r#"{"name":"x"}"#),
            )
            .unwrap();
        assert_eq!(created.status(), 201);
        assert_eq!(created.content_type(), Some("application/json"));
        assert_eq!(created.content(), Some(&br#"{"id":1}"#[..]));

        let err = provider.verify().unwrap_err();
        assert_eq!(err.missing().len(), 2);
        assert_eq!(err.unexpected().len(), 1);
    }

    #[test]
    fn test_from_yaml_rejects_invalid_config() {
        let yaml = r#"
expectations:
  - id: ""
    request:
      method: GET
      path:
        type: any
    response:
      status: 200
"#;
        assert!(SimpleResponseProvider::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_usable_as_trait_object() {
        let provider = SimpleResponseProvider::new();
        provider.expect(Method::Head, "/ping").respond_with_status(200);

        let dyn_provider: &dyn HttpResponseProvider = &provider;
        assert!(dyn_provider
            .get_response(&HttpRequest::new(Method::Head, "/ping"))
            .is_some());
        assert!(dyn_provider.verify().is_ok());
    }
}
