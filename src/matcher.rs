//! Request fingerprints and wildcard-aware matching.
//!
//! A fingerprint reduces a request to method, path, content type and content.
//! Expectations may replace path, content type or content with a wildcard;
//! the wildcards can only be produced from the marker types below, never
//! from request data.

use crate::http::{HttpRequest, Method, CONTENT_TYPE};

/// Marker meaning "match any path".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IgnorePath;

/// Marker meaning "match any content type, including none".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IgnoreContentType;

/// Marker meaning "match any content, including none".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IgnoreContent;

pub const IGNORE_PATH: IgnorePath = IgnorePath;
pub const IGNORE_CONTENT_TYPE: IgnoreContentType = IgnoreContentType;
pub const IGNORE_CONTENT: IgnoreContent = IgnoreContent;

/// Expected path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathMatcher {
    Exact(String),
    Any,
}

/// Expected content type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum ContentTypeMatcher {
    /// No content type header
    #[default]
    Unset,
    Exact(String),
    Any,
}

/// Expected request content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum ContentMatcher {
    /// No body
    #[default]
    Unset,
    Exact(Vec<u8>),
    Any,
}

impl From<&str> for PathMatcher {
    fn from(path: &str) -> Self {
        PathMatcher::Exact(path.to_string())
    }
}

impl From<String> for PathMatcher {
    fn from(path: String) -> Self {
        PathMatcher::Exact(path)
    }
}

impl From<IgnorePath> for PathMatcher {
    fn from(_: IgnorePath) -> Self {
        PathMatcher::Any
    }
}

impl From<&str> for ContentTypeMatcher {
    fn from(content_type: &str) -> Self {
        ContentTypeMatcher::Exact(content_type.to_string())
    }
}

impl From<String> for ContentTypeMatcher {
    fn from(content_type: String) -> Self {
        ContentTypeMatcher::Exact(content_type)
    }
}

impl From<Option<String>> for ContentTypeMatcher {
    fn from(content_type: Option<String>) -> Self {
        content_type.map_or(ContentTypeMatcher::Unset, ContentTypeMatcher::Exact)
    }
}

impl From<IgnoreContentType> for ContentTypeMatcher {
    fn from(_: IgnoreContentType) -> Self {
        ContentTypeMatcher::Any
    }
}

impl From<&str> for ContentMatcher {
    fn from(content: &str) -> Self {
        ContentMatcher::Exact(content.as_bytes().to_vec())
    }
}

impl From<String> for ContentMatcher {
    fn from(content: String) -> Self {
        ContentMatcher::Exact(content.into_bytes())
    }
}

impl From<&[u8]> for ContentMatcher {
    fn from(content: &[u8]) -> Self {
        ContentMatcher::Exact(content.to_vec())
    }
}

impl From<Vec<u8>> for ContentMatcher {
    fn from(content: Vec<u8>) -> Self {
        ContentMatcher::Exact(content)
    }
}

impl From<Option<Vec<u8>>> for ContentMatcher {
    fn from(content: Option<Vec<u8>>) -> Self {
        content.map_or(ContentMatcher::Unset, ContentMatcher::Exact)
    }
}

impl From<IgnoreContent> for ContentMatcher {
    fn from(_: IgnoreContent) -> Self {
        ContentMatcher::Any
    }
}

/// Reduced request used as key of the expectation store and the received set.
///
/// Equality and hashing are structural over all four fields. A wildcard is
/// a distinct variant, so it never equals a concrete value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct RequestFingerprint {
    pub method: Method,
    pub path: PathMatcher,
    pub content_type: ContentTypeMatcher,
    pub content: ContentMatcher,
}

impl RequestFingerprint {
    /// Fingerprint of an incoming request. Never contains wildcards.
    pub fn of_request(request: &HttpRequest, case_insensitive_headers: bool) -> Self {
        Self {
            method: request.method(),
            path: PathMatcher::Exact(request.path().to_string()),
            content_type: request
                .first_header(CONTENT_TYPE, case_insensitive_headers)
                .map(ContentTypeMatcher::from)
                .unwrap_or_default(),
            content: request.body().map(ContentMatcher::from).unwrap_or_default(),
        }
    }

    /// Whether this (expected) fingerprint accepts the `received` one.
    pub fn matches(&self, received: &RequestFingerprint) -> bool {
        if self.method != received.method {
            return false;
        }

        let path_ok = match &self.path {
            PathMatcher::Any => true,
            expected => *expected == received.path,
        };
        if !path_ok {
            return false;
        }

        let content_type_ok = match &self.content_type {
            ContentTypeMatcher::Any => true,
            expected => *expected == received.content_type,
        };
        if !content_type_ok {
            return false;
        }

        match &self.content {
            ContentMatcher::Any => true,
            expected => *expected == received.content,
        }
    }

    /// Rebuild a request shape for reporting.
    ///
    /// A wildcard path is rendered as `*`; wildcard content type and content
    /// are left out.
    pub fn to_request(&self) -> HttpRequest {
        let path = match &self.path {
            PathMatcher::Exact(path) => path.as_str(),
            PathMatcher::Any => "*",
        };
        let mut request = HttpRequest::new(self.method, path);
        if let ContentMatcher::Exact(content) = &self.content {
            request = request.content(content.clone());
        }
        if let ContentTypeMatcher::Exact(content_type) = &self.content_type {
            request = request.header(CONTENT_TYPE, content_type.clone());
        }
        request
    }
}
