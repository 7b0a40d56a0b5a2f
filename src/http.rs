//! Request and response shapes exchanged with the HTTP transport.
//!
//! The provider never parses HTTP itself. The transport hands it an
//! [`HttpRequest`] and turns the returned [`HttpResponse`] into bytes on the
//! wire.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Name of the content type header.
pub const CONTENT_TYPE: &str = "Content-Type";

/// HTTP request method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Head,
    Post,
    Put,
    Delete,
    Connect,
    Options,
    Trace,
    Patch,
}

impl Method {
    /// Upper-case method name as it appears on the request line.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Connect => "CONNECT",
            Method::Options => "OPTIONS",
            Method::Trace => "TRACE",
            Method::Patch => "PATCH",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "HEAD" => Ok(Method::Head),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "DELETE" => Ok(Method::Delete),
            "CONNECT" => Ok(Method::Connect),
            "OPTIONS" => Ok(Method::Options),
            "TRACE" => Ok(Method::Trace),
            "PATCH" => Ok(Method::Patch),
            _ => Err(Error::UnknownMethod(s.to_string())),
        }
    }
}

/// A single header as captured by the transport.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HttpMessageHeader {
    pub name: String,
    pub value: String,
}

impl HttpMessageHeader {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A captured (or reconstructed) HTTP request.
///
/// Headers keep the order the transport delivered them in. `content` is
/// `None` when the request carried no body, which is not the same as an
/// empty body.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HttpRequest {
    method: Method,
    path: String,
    content: Option<Vec<u8>>,
    headers: Vec<HttpMessageHeader>,
}

impl HttpRequest {
    /// Create a request without body or headers.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            content: None,
            headers: Vec::new(),
        }
    }

    /// Set the request body.
    #[must_use]
    pub fn content(mut self, content: impl Into<Vec<u8>>) -> Self {
        self.content = Some(content.into());
        self
    }

    /// Append a header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push(HttpMessageHeader::new(name, value));
        self
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn body(&self) -> Option<&[u8]> {
        self.content.as_deref()
    }

    pub fn headers(&self) -> &[HttpMessageHeader] {
        &self.headers
    }

    /// Value of the first header named `name`.
    ///
    /// With `case_insensitive` unset the name must match exactly.
    pub fn first_header(&self, name: &str, case_insensitive: bool) -> Option<&str> {
        self.headers
            .iter()
            .find(|h| {
                if case_insensitive {
                    h.name.eq_ignore_ascii_case(name)
                } else {
                    h.name == name
                }
            })
            .map(|h| h.value.as_str())
    }
}

impl fmt::Display for HttpRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)?;
        if let Some(content_type) = self.first_header(CONTENT_TYPE, true) {
            write!(f, " [{}]", content_type)?;
        }
        if let Some(content) = &self.content {
            match std::str::from_utf8(content) {
                Ok(text) if text.len() <= 64 => write!(f, " {:?}", text)?,
                _ => write!(f, " ({} bytes)", content.len())?,
            }
        }
        Ok(())
    }
}

/// A canned response returned for a matched request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    status: u16,
    content_type: Option<String>,
    content: Option<Vec<u8>>,
}

impl HttpResponse {
    pub fn new(status: u16, content_type: Option<String>, content: Option<Vec<u8>>) -> Self {
        Self {
            status,
            content_type,
            content,
        }
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn content(&self) -> Option<&[u8]> {
        self.content.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_parsing() {
        assert_eq!("get".parse::<Method>().unwrap(), Method::Get);
        assert_eq!("DELETE".parse::<Method>().unwrap(), Method::Delete);
        assert_eq!("Patch".parse::<Method>().unwrap(), Method::Patch);
        assert!(matches!(
            "FETCH".parse::<Method>(),
            Err(Error::UnknownMethod(m)) if m == "FETCH"
        ));
    }

    #[test]
    fn test_method_serde_uppercase() {
        let method: Method = serde_yaml::from_str("POST").unwrap();
        assert_eq!(method, Method::Post);
        assert_eq!(serde_json::to_string(&Method::Options).unwrap(), "\"OPTIONS\"");
    }

    #[test]
    fn test_first_header() {
        let request = HttpRequest::new(Method::Post, "/items")
            .header("content-type", "text/plain")
            .header("Content-Type", "application/json");

        assert_eq!(request.first_header(CONTENT_TYPE, true), Some("text/plain"));
        assert_eq!(
            request.first_header(CONTENT_TYPE, false),
            Some("application/json")
        );
        assert_eq!(request.first_header("Accept", true), None);
    }

    #[test]
    fn test_request_display() {
        let request = HttpRequest::new(Method::Post, "/items")
            .header(CONTENT_TYPE, "text/plain")
            .content("abc");
        assert_eq!(request.to_string(), "POST /items [text/plain] \"abc\"");

        let binary = HttpRequest::new(Method::Put, "/blob").content(vec![0xff, 0xfe]);
        assert_eq!(binary.to_string(), "PUT /blob (2 bytes)");
    }

    #[test]
    fn test_absent_and_empty_body_differ() {
        let absent = HttpRequest::new(Method::Get, "/");
        let empty = HttpRequest::new(Method::Get, "/").content(Vec::new());
        assert_eq!(absent.body(), None);
        assert_eq!(empty.body(), Some(&[][..]));
        assert_ne!(absent, empty);
    }
}
