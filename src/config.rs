//! Configuration for the response provider.
//!
//! Expectations can be written in YAML instead of registered in code.

use crate::http::{HttpResponse, Method};
use crate::matcher::{ContentMatcher, ContentTypeMatcher, PathMatcher, RequestFingerprint};
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Main configuration for the response provider.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ExpectationsConfig {
    /// Expected requests and their responses
    #[serde(default)]
    pub expectations: Vec<ExpectationDefinition>,

    /// Global settings
    #[serde(default)]
    pub settings: GlobalSettings,
}

impl ExpectationsConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse and validate a YAML document.
    pub fn from_yaml(yaml: &str) -> anyhow::Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> anyhow::Result<()> {
        let mut ids = HashSet::new();
        let mut requests = HashMap::new();
        for (i, def) in self.expectations.iter().enumerate() {
            def.validate()
                .map_err(|e| anyhow::anyhow!("Expectation {}: {}", i, e))?;
            if !ids.insert(def.id.as_str()) {
                anyhow::bail!("Expectation {}: duplicate id {}", i, def.id);
            }
            // Identical requests would silently share one response.
            let fingerprint = def
                .request
                .fingerprint()
                .map_err(|e| anyhow::anyhow!("Expectation {}: {}", i, e))?;
            if let Some(other) = requests.insert(fingerprint, def.id.as_str()) {
                anyhow::bail!(
                    "Expectation {}: request of {} is identical to {}",
                    i,
                    def.id,
                    other
                );
            }
        }
        Ok(())
    }
}

/// A single expected request with its response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExpectationDefinition {
    /// Unique identifier for this expectation
    pub id: String,

    /// Optional name/description
    #[serde(default)]
    pub name: Option<String>,

    /// Expected request
    pub request: RequestDefinition,

    /// Response to return
    pub response: ResponseDefinition,
}

impl ExpectationDefinition {
    /// Validate the expectation definition.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.id.is_empty() {
            anyhow::bail!("Expectation id cannot be empty");
        }
        self.request.validate()?;
        self.response.validate()?;
        Ok(())
    }
}

/// Expected request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RequestDefinition {
    /// HTTP method
    pub method: Method,

    /// Path matching
    pub path: PathDefinition,

    /// Content type matching (absent = no content type header)
    #[serde(default)]
    pub content_type: Option<ContentTypeDefinition>,

    /// Content matching (absent = no body)
    #[serde(default)]
    pub content: Option<ContentDefinition>,
}

impl RequestDefinition {
    /// Validate the request definition.
    pub fn validate(&self) -> anyhow::Result<()> {
        if let Some(content) = &self.content {
            content.to_matcher()?;
        }
        Ok(())
    }

    pub(crate) fn fingerprint(&self) -> anyhow::Result<RequestFingerprint> {
        let path = match &self.path {
            PathDefinition::Exact { value } => PathMatcher::Exact(value.clone()),
            PathDefinition::Any => PathMatcher::Any,
        };
        let content_type = match &self.content_type {
            None => ContentTypeMatcher::Unset,
            Some(ContentTypeDefinition::Exact { value }) => ContentTypeMatcher::Exact(value.clone()),
            Some(ContentTypeDefinition::Any) => ContentTypeMatcher::Any,
        };
        let content = match &self.content {
            None => ContentMatcher::Unset,
            Some(def) => def.to_matcher()?,
        };

        Ok(RequestFingerprint {
            method: self.method,
            path,
            content_type,
            content,
        })
    }
}

/// Path matching configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PathDefinition {
    /// Exact path match
    Exact { value: String },
    /// Any path
    Any,
}

/// Content type matching configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentTypeDefinition {
    /// Exact header value
    Exact { value: String },
    /// Any value, or no header at all
    Any,
}

/// Request content matching configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentDefinition {
    /// Exact text body
    Text { content: String },
    /// JSON body, compared after compact serialization
    Json { content: serde_json::Value },
    /// Base64 encoded binary body
    Base64 { content: String },
    /// Any body, or no body at all
    Any,
}

impl ContentDefinition {
    fn to_matcher(&self) -> anyhow::Result<ContentMatcher> {
        match self {
            ContentDefinition::Text { content } => Ok(ContentMatcher::from(content.as_str())),
            ContentDefinition::Json { content } => {
                Ok(ContentMatcher::Exact(serde_json::to_vec(content)?))
            }
            ContentDefinition::Base64 { content } => base64::engine::general_purpose::STANDARD
                .decode(content)
                .map(ContentMatcher::Exact)
                .map_err(|e| anyhow::anyhow!("Invalid base64: {}", e)),
            ContentDefinition::Any => Ok(ContentMatcher::Any),
        }
    }
}

/// Response definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResponseDefinition {
    /// HTTP status code
    #[serde(default = "default_status")]
    pub status: u16,

    /// Content type; defaults to the body's natural type
    #[serde(default)]
    pub content_type: Option<String>,

    /// Response body
    #[serde(default)]
    pub body: Option<ResponseBody>,
}

fn default_status() -> u16 {
    200
}

impl ResponseDefinition {
    /// Validate the response definition.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.status < 100 || self.status > 599 {
            anyhow::bail!("Invalid status code: {}", self.status);
        }
        if let Some(ResponseBody::Base64 { content }) = &self.body {
            base64::engine::general_purpose::STANDARD
                .decode(content)
                .map_err(|e| anyhow::anyhow!("Invalid base64: {}", e))?;
        }
        Ok(())
    }

    /// Build the canned response.
    pub fn to_response(&self) -> anyhow::Result<HttpResponse> {
        let content = self.body.as_ref().map(ResponseBody::to_bytes).transpose()?;
        let content_type = self.content_type.clone().or_else(|| {
            self.body
                .as_ref()
                .map(|b| b.content_type().to_string())
        });
        Ok(HttpResponse::new(self.status, content_type, content))
    }
}

/// Response body configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseBody {
    /// Plain text body
    Text { content: String },
    /// JSON body
    Json { content: serde_json::Value },
    /// Base64 encoded binary
    Base64 { content: String },
    /// Load from file
    File { path: String },
}

impl ResponseBody {
    /// Get the body content as bytes.
    pub fn to_bytes(&self) -> anyhow::Result<Vec<u8>> {
        match self {
            ResponseBody::Text { content } => Ok(content.as_bytes().to_vec()),
            ResponseBody::Json { content } => Ok(serde_json::to_vec(content)?),
            ResponseBody::Base64 { content } => base64::engine::general_purpose::STANDARD
                .decode(content)
                .map_err(|e| anyhow::anyhow!("Invalid base64: {}", e)),
            ResponseBody::File { path } => std::fs::read(path)
                .map_err(|e| anyhow::anyhow!("Failed to read file {}: {}", path, e)),
        }
    }

    /// Get content type for this body.
    pub fn content_type(&self) -> &'static str {
        match self {
            ResponseBody::Text { .. } => "text/plain",
            ResponseBody::Json { .. } => "application/json",
            ResponseBody::Base64 { .. } => "application/octet-stream",
            ResponseBody::File { .. } => "application/octet-stream",
        }
    }
}

/// Global settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GlobalSettings {
    /// Log matched requests
    #[serde(default = "default_true")]
    pub log_matches: bool,

    /// Log unmatched requests
    #[serde(default = "default_true")]
    pub log_unmatched: bool,

    /// Case-insensitive lookup of the content type header
    #[serde(default = "default_true")]
    pub case_insensitive_headers: bool,
}

fn default_true() -> bool {
    true
}

impl Default for GlobalSettings {
    fn default() -> Self {
        Self {
            log_matches: true,
            log_unmatched: true,
            case_insensitive_headers: true,
        }
    }
}
