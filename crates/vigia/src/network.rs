//! Request interception: canned responses for matching URLs.
//!
//! A [`RouteTable`] is built before a session is acquired and handed to the
//! launcher. The table is frozen for the lifetime of the session; the CDP
//! driver consults it for every paused request and lets unmatched requests
//! continue to the network.

use crate::result::{HarnessError, HarnessResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// HTTP methods for request matching
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// GET request
    Get,
    /// POST request
    Post,
    /// PUT request
    Put,
    /// DELETE request
    Delete,
    /// PATCH request
    Patch,
    /// HEAD request
    Head,
    /// OPTIONS request
    Options,
}

impl HttpMethod {
    /// Convert to string
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Patch => "PATCH",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
        }
    }
}

impl FromStr for HttpMethod {
    type Err = HarnessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "DELETE" => Ok(Self::Delete),
            "PATCH" => Ok(Self::Patch),
            "HEAD" => Ok(Self::Head),
            "OPTIONS" => Ok(Self::Options),
            other => Err(HarnessError::invalid(format!("unknown HTTP method '{other}'"))),
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A canned HTTP response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MockResponse {
    /// HTTP status code
    pub status: u16,
    /// Response headers
    pub headers: BTreeMap<String, String>,
    /// Response body
    pub body: String,
    /// Content type
    pub content_type: String,
}

impl Default for MockResponse {
    fn default() -> Self {
        Self {
            status: 200,
            headers: BTreeMap::new(),
            body: String::new(),
            content_type: "application/json".to_string(),
        }
    }
}

impl MockResponse {
    /// Create a new mock response
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a JSON response
    pub fn json<T: Serialize>(data: &T) -> HarnessResult<Self> {
        Ok(Self {
            body: serde_json::to_string(data)?,
            ..Self::default()
        })
    }

    /// Create a text response
    #[must_use]
    pub fn text(content: &str) -> Self {
        Self {
            body: content.to_string(),
            content_type: "text/plain".to_string(),
            ..Self::default()
        }
    }

    /// Create an error response
    #[must_use]
    pub fn error(status: u16, message: &str) -> Self {
        Self {
            status,
            body: serde_json::json!({ "error": message }).to_string(),
            ..Self::default()
        }
    }

    /// Set status code
    #[must_use]
    pub const fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// Set body
    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Add a header
    #[must_use]
    pub fn with_header(mut self, key: &str, value: &str) -> Self {
        self.headers.insert(key.to_string(), value.to_string());
        self
    }

    /// Set content type
    #[must_use]
    pub fn with_content_type(mut self, content_type: &str) -> Self {
        self.content_type = content_type.to_string();
        self
    }

    /// All response headers including `Content-Type`, in a stable order
    #[must_use]
    pub fn header_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![("Content-Type".to_string(), self.content_type.clone())];
        pairs.extend(
            self.headers
                .iter()
                .filter(|(k, _)| !k.eq_ignore_ascii_case("content-type"))
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        pairs
    }
}

/// Pattern for matching request URLs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UrlPattern {
    /// Exact URL match
    Exact(String),
    /// Prefix match
    Prefix(String),
    /// Contains substring
    Contains(String),
    /// Regex match
    Regex(RegexPattern),
    /// Glob pattern (e.g., "**/api/users/*")
    Glob(String),
    /// Match any URL
    Any,
}

impl UrlPattern {
    /// Check if a URL matches this pattern
    #[must_use]
    pub fn matches(&self, url: &str) -> bool {
        match self {
            Self::Exact(pattern) => url == pattern,
            Self::Prefix(pattern) => url.starts_with(pattern.as_str()),
            Self::Contains(pattern) => url.contains(pattern.as_str()),
            Self::Regex(pattern) => pattern.compiled().is_some_and(|re| re.is_match(url)),
            Self::Glob(pattern) => glob_matches(pattern, url),
            Self::Any => true,
        }
    }

    /// Reject patterns that can never match (currently: invalid regexes)
    pub fn validate(&self) -> HarnessResult<()> {
        if let Self::Regex(pattern) = self {
            if pattern.compiled().is_none() {
                let err = regex::Regex::new(pattern.as_str())
                    .err()
                    .map_or_else(String::new, |e| e.to_string());
                return Err(HarnessError::invalid(format!("bad URL regex '{pattern}': {err}")));
            }
        }
        Ok(())
    }
}

impl fmt::Display for UrlPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(s) | Self::Prefix(s) | Self::Contains(s) | Self::Glob(s) => {
                write!(f, "{s}")
            }
            Self::Regex(pattern) => write!(f, "{pattern}"),
            Self::Any => write!(f, "*"),
        }
    }
}

/// URL regex source, compiled on first use and cached with the route
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct RegexPattern {
    source: String,
    compiled: OnceLock<Option<regex::Regex>>,
}

impl RegexPattern {
    /// Pattern from its source text
    #[must_use]
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            compiled: OnceLock::new(),
        }
    }

    /// Source text
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Compiled regex; `None` when the source is invalid
    #[must_use]
    pub fn compiled(&self) -> Option<&regex::Regex> {
        self.compiled
            .get_or_init(|| regex::Regex::new(&self.source).ok())
            .as_ref()
    }
}

impl PartialEq for RegexPattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for RegexPattern {}

impl From<String> for RegexPattern {
    fn from(source: String) -> Self {
        Self::new(source)
    }
}

impl From<&str> for RegexPattern {
    fn from(source: &str) -> Self {
        Self::new(source)
    }
}

impl From<RegexPattern> for String {
    fn from(pattern: RegexPattern) -> Self {
        pattern.source
    }
}

impl fmt::Display for RegexPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Glob match where `*` (and `**`) stands for any run of characters,
/// including `/`.
pub(crate) fn glob_matches(pattern: &str, text: &str) -> bool {
    let parts: Vec<&str> = pattern.split('*').collect();
    if parts.len() == 1 {
        return pattern == text;
    }

    let first = parts[0];
    let last = parts[parts.len() - 1];
    if !text.starts_with(first) || text.len() < first.len() + last.len() {
        return false;
    }
    if !text[first.len()..].ends_with(last) {
        return false;
    }

    let mut rest = &text[first.len()..text.len() - last.len()];
    for part in &parts[1..parts.len() - 1] {
        if part.is_empty() {
            continue;
        }
        match rest.find(part) {
            Some(found) => rest = &rest[found + part.len()..],
            None => return false,
        }
    }
    true
}

/// One intercepted pattern with its canned response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MockRoute {
    /// URL pattern
    pub pattern: UrlPattern,
    /// Restrict to one HTTP method; `None` matches every method
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<HttpMethod>,
    /// Response served for matching requests
    #[serde(default)]
    pub response: MockResponse,
}

impl MockRoute {
    /// Route matching `pattern` for every method
    #[must_use]
    pub fn new(pattern: UrlPattern, response: MockResponse) -> Self {
        Self {
            pattern,
            method: None,
            response,
        }
    }

    /// Route matching a glob, the common case in scenario files
    #[must_use]
    pub fn glob(pattern: &str, response: MockResponse) -> Self {
        Self::new(UrlPattern::Glob(pattern.to_string()), response)
    }

    /// Restrict to one method
    #[must_use]
    pub const fn with_method(mut self, method: HttpMethod) -> Self {
        self.method = Some(method);
        self
    }

    /// Check whether a request matches this route
    #[must_use]
    pub fn matches(&self, url: &str, method: &str) -> bool {
        let method_ok = self
            .method
            .map_or(true, |m| m.as_str().eq_ignore_ascii_case(method));
        method_ok && self.pattern.matches(url)
    }
}

/// Ordered, immutable set of routes for one session
///
/// The first registered route that matches wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RouteTable {
    routes: Vec<MockRoute>,
}

impl RouteTable {
    /// Create an empty table
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a route (builder style)
    #[must_use]
    pub fn with_route(mut self, route: MockRoute) -> Self {
        self.routes.push(route);
        self
    }

    /// Find the route serving a request
    #[must_use]
    pub fn lookup(&self, url: &str, method: &str) -> Option<&MockRoute> {
        self.routes.iter().find(|r| r.matches(url, method))
    }

    /// Validate every pattern
    pub fn validate(&self) -> HarnessResult<()> {
        self.routes.iter().try_for_each(|r| r.pattern.validate())
    }

    /// Number of routes
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Whether the table is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Iterate routes in registration order
    pub fn iter(&self) -> impl Iterator<Item = &MockRoute> {
        self.routes.iter()
    }
}

impl FromIterator<MockRoute> for RouteTable {
    fn from_iter<I: IntoIterator<Item = MockRoute>>(iter: I) -> Self {
        Self {
            routes: iter.into_iter().collect(),
        }
    }
}
