//! Multipart media type and charset handling

use std::fmt;

use rand::Rng;

use crate::error::{CoreError, Result};

/// Charsets understood by the line reader
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Charset {
    #[default]
    Utf8,
    Iso8859_1,
    UsAscii,
}

impl Charset {
    /// Resolve a charset label, ignoring case and surrounding quotes
    pub fn for_label(label: &str) -> Result<Charset> {
        let normalized = label.trim().trim_matches('"').to_ascii_lowercase();
        match normalized.as_str() {
            "utf-8" | "utf8" => Ok(Charset::Utf8),
            "iso-8859-1" | "iso8859-1" | "iso_8859-1" | "latin1" | "l1" => Ok(Charset::Iso8859_1),
            "us-ascii" | "ascii" => Ok(Charset::UsAscii),
            _ => Err(CoreError::UnsupportedCharset(label.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Charset::Utf8 => "UTF-8",
            Charset::Iso8859_1 => "ISO-8859-1",
            Charset::UsAscii => "US-ASCII",
        }
    }

    /// Decode bytes, replacing anything the charset cannot represent
    pub fn decode(&self, bytes: &[u8]) -> String {
        match self {
            Charset::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
            Charset::Iso8859_1 => bytes.iter().map(|&b| b as char).collect(),
            Charset::UsAscii => bytes
                .iter()
                .map(|&b| {
                    if b.is_ascii() {
                        b as char
                    } else {
                        char::REPLACEMENT_CHARACTER
                    }
                })
                .collect(),
        }
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A `multipart/mixed` media type: boundary parameter plus charset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartMixed {
    boundary: String,
    charset: Charset,
}

impl MultipartMixed {
    /// Media type for the bare boundary parameter (without leading `--`)
    pub fn new(boundary: &str) -> Self {
        Self {
            boundary: boundary.to_string(),
            charset: Charset::default(),
        }
    }

    pub fn with_charset(mut self, charset: Charset) -> Self {
        self.charset = charset;
        self
    }

    /// Fresh `batch_<hex>` boundary
    pub fn random() -> Self {
        let mut rng = rand::thread_rng();
        let id: u128 = rng.gen();
        Self::new(&format!("batch_{:032x}", id))
    }

    /// Read boundary and charset from a `multipart/mixed` Content-Type value
    pub fn parse(content_type: &str) -> Result<Self> {
        let media: mime::Mime = content_type
            .trim()
            .parse()
            .map_err(|e| CoreError::InvalidContentType(format!("{}: {}", content_type, e)))?;

        if media.type_() != mime::MULTIPART || media.subtype() != "mixed" {
            return Err(CoreError::InvalidContentType(format!(
                "Expected multipart/mixed, got {}",
                media.essence_str()
            )));
        }

        let boundary = media
            .get_param(mime::BOUNDARY)
            .map(|b| b.as_str().trim_matches('"').to_string())
            .filter(|b| !b.is_empty())
            .ok_or_else(|| {
                CoreError::InvalidContentType(format!(
                    "Missing boundary parameter: {}",
                    content_type
                ))
            })?;

        let charset = match media.get_param(mime::CHARSET) {
            Some(label) => Charset::for_label(label.as_str())?,
            None => Charset::default(),
        };

        Ok(Self { boundary, charset })
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    pub fn charset(&self) -> Charset {
        self.charset
    }

    /// Line opening a body part: `--boundary`
    pub fn delimiter(&self) -> String {
        format!("--{}", self.boundary)
    }

    /// Line ending the multipart body: `--boundary--`
    pub fn close_delimiter(&self) -> String {
        format!("--{}--", self.boundary)
    }

    /// Content-Type header value announcing this boundary
    pub fn content_type(&self) -> String {
        format!("multipart/mixed;boundary={}", self.boundary)
    }
}

/// Content-Type of every batch body part
pub const APPLICATION_HTTP: &str = "application/http";

/// Content-Transfer-Encoding of every batch body part
pub const BINARY: &str = "binary";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_charset_labels() {
        assert_eq!(Charset::for_label("UTF-8").unwrap(), Charset::Utf8);
        assert_eq!(Charset::for_label("\"iso-8859-1\"").unwrap(), Charset::Iso8859_1);
        assert_eq!(Charset::for_label(" US-ASCII ").unwrap(), Charset::UsAscii);
        assert!(matches!(
            Charset::for_label("EBCDIC").unwrap_err(),
            CoreError::UnsupportedCharset(_)
        ));
    }

    #[test]
    fn test_charset_decode() {
        let bytes = [0x63, 0x61, 0x66, 0xe9];
        assert_eq!(Charset::Iso8859_1.decode(&bytes), "café");
        assert_eq!(Charset::Utf8.decode("café".as_bytes()), "café");
        assert_eq!(Charset::UsAscii.decode(&bytes), "caf\u{fffd}");
    }

    #[test]
    fn test_parse_content_type() {
        let media = MultipartMixed::parse("multipart/mixed;boundary=batch_1234").unwrap();
        assert_eq!(media.boundary(), "batch_1234");
        assert_eq!(media.charset(), Charset::Utf8);
        assert_eq!(media.delimiter(), "--batch_1234");
        assert_eq!(media.close_delimiter(), "--batch_1234--");

        let media =
            MultipartMixed::parse("multipart/mixed; boundary=\"b\"; charset=ISO-8859-1").unwrap();
        assert_eq!(media.boundary(), "b");
        assert_eq!(media.charset(), Charset::Iso8859_1);
    }

    #[test]
    fn test_parse_rejects_other_types() {
        assert!(matches!(
            MultipartMixed::parse("application/json").unwrap_err(),
            CoreError::InvalidContentType(_)
        ));
        assert!(matches!(
            MultipartMixed::parse("multipart/mixed").unwrap_err(),
            CoreError::InvalidContentType(_)
        ));
    }

    #[test]
    fn test_random_boundary_round_trips() {
        let media = MultipartMixed::random();
        assert!(media.boundary().starts_with("batch_"));
        assert_eq!(media.boundary().len(), "batch_".len() + 32);
        assert_ne!(media, MultipartMixed::random());

        let parsed = MultipartMixed::parse(&media.content_type()).unwrap();
        assert_eq!(parsed, media);
    }
}
