//! Batch items: embedded HTTP requests and responses

use std::fmt;

use http::{Method, StatusCode};
use once_cell::sync::Lazy;
use regex::Regex;
use smallvec::SmallVec;
use tracing::{error, warn};

/// Protocol marker of every embedded start line
pub const HTTP_1_1: &str = "HTTP/1.1";

static PATTERN_REQUEST_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(DELETE|PATCH|POST|PUT) (\S+) HTTP/1\.1\s*$").unwrap());

static PATTERN_STATUS_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^HTTP/1\.1 (\S+)").unwrap());

type HeaderValues = SmallVec<[String; 2]>;

/// Header map with case-insensitive names, kept in insertion order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, HeaderValues)>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|(key, _)| key.eq_ignore_ascii_case(name))
    }

    /// Append one value; the first spelling of a name is kept
    pub fn append(&mut self, name: &str, value: &str) {
        match self.position(name) {
            Some(i) => self.entries[i].1.push(value.to_string()),
            None => {
                let mut values = HeaderValues::new();
                values.push(value.to_string());
                self.entries.push((name.to_string(), values));
            }
        }
    }

    /// Append every comma-separated, trimmed element of `value`
    pub fn append_split(&mut self, name: &str, value: &str) {
        for element in value.split(',') {
            self.append(name, element.trim());
        }
    }

    /// Replace all values of `name`
    pub fn set(&mut self, name: &str, value: &str) {
        self.remove(name);
        self.append(name, value);
    }

    pub fn remove(&mut self, name: &str) -> Option<Vec<String>> {
        self.position(name)
            .map(|i| self.entries.remove(i).1.into_vec())
    }

    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.position(name).map(|i| self.entries[i].1.as_slice())
    }

    /// First value of `name`
    pub fn first(&self, name: &str) -> Option<&str> {
        self.get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of distinct header names
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// (name, values) pairs in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(name, values)| (name.as_str(), values.as_slice()))
    }
}

impl<'a> FromIterator<(&'a str, &'a str)> for Headers {
    fn from_iter<I: IntoIterator<Item = (&'a str, &'a str)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (name, value) in iter {
            headers.append(name, value);
        }
        headers
    }
}

/// An embedded HTTP message carried by one batch body part
///
/// Parsing clones a caller-supplied template, so the template's type decides
/// whether parts are read as requests or responses.
pub trait BatchItem: Clone + fmt::Debug {
    fn headers(&self) -> &Headers;

    fn headers_mut(&mut self) -> &mut Headers;

    fn content(&self) -> &str;

    fn set_content(&mut self, content: String);

    /// Fill fields from an `HTTP/1.1` start line (line ending included or not)
    fn apply_start_line(&mut self, line: &str);

    /// Start line without line ending, if the item has one to emit
    fn start_line(&self) -> Option<String>;
}

/// An embedded request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchRequestItem {
    pub method: Option<Method>,
    pub request_uri: Option<String>,
    pub query_string: Option<String>,
    pub headers: Headers,
    pub content: String,
}

impl BatchRequestItem {
    pub fn new(method: Method, request_uri: &str) -> Self {
        Self {
            method: Some(method),
            request_uri: Some(request_uri.to_string()),
            ..Self::default()
        }
    }

    pub fn with_query(mut self, query_string: &str) -> Self {
        self.query_string = Some(query_string.to_string());
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn with_content(mut self, content: &str) -> Self {
        self.content = content.to_string();
        self
    }
}

impl BatchItem for BatchRequestItem {
    fn headers(&self) -> &Headers {
        &self.headers
    }

    fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    fn content(&self) -> &str {
        &self.content
    }

    fn set_content(&mut self, content: String) {
        self.content = content;
    }

    fn apply_start_line(&mut self, line: &str) {
        let Some(captures) = PATTERN_REQUEST_LINE.captures(line) else {
            warn!(line = line.trim_end(), "unsupported batch request line");
            return;
        };

        self.method = Method::from_bytes(captures[1].as_bytes()).ok();
        match captures[2].split_once('?') {
            Some((path, query)) => {
                self.request_uri = Some(path.to_string());
                self.query_string = Some(query.to_string());
            }
            None => {
                self.request_uri = Some(captures[2].to_string());
                self.query_string = None;
            }
        }
    }

    fn start_line(&self) -> Option<String> {
        let method = self.method.as_ref()?;
        let uri = self.request_uri.as_deref().unwrap_or("/");
        Some(match self.query_string.as_deref() {
            Some(query) => format!("{} {}?{} {}", method, uri, query, HTTP_1_1),
            None => format!("{} {} {}", method, uri, HTTP_1_1),
        })
    }
}

/// An embedded response
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchResponseItem {
    pub status: Option<u16>,
    pub headers: Headers,
    pub content: String,
}

impl BatchResponseItem {
    pub fn new(status: u16) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn with_content(mut self, content: &str) -> Self {
        self.content = content.to_string();
        self
    }
}

impl BatchItem for BatchResponseItem {
    fn headers(&self) -> &Headers {
        &self.headers
    }

    fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    fn content(&self) -> &str {
        &self.content
    }

    fn set_content(&mut self, content: String) {
        self.content = content;
    }

    fn apply_start_line(&mut self, line: &str) {
        let token = PATTERN_STATUS_LINE
            .captures(line)
            .and_then(|captures| captures.get(1))
            .map(|m| m.as_str());

        match token.map(|t| (t, t.parse::<u16>())) {
            Some((_, Ok(status))) => self.status = Some(status),
            Some((token, Err(e))) => {
                error!(status = token, error = %e, "invalid batch response status");
            }
            None => warn!(line = line.trim_end(), "unsupported batch status line"),
        }
    }

    fn start_line(&self) -> Option<String> {
        let status = self.status?;
        let reason = StatusCode::from_u16(status)
            .ok()
            .and_then(|code| code.canonical_reason());
        Some(match reason {
            Some(reason) => format!("{} {} {}", HTTP_1_1, status, reason),
            None => format!("{} {}", HTTP_1_1, status),
        })
    }
}
