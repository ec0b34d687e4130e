//! Incremental line reader for batch payloads
//!
//! Splits a byte stream into lines (line endings kept) and tracks where each
//! body part's headers end, so body bytes are decoded with the charset the part
//! declared while header lines use the default charset.

use std::io::{ErrorKind, Read};

use tracing::debug;

use crate::batch::media::{Charset, MultipartMixed};
use crate::config::BatchConfig;
use crate::error::Result;

const CR: u8 = b'\r';
const LF: u8 = b'\n';
const CRLF: &str = "\r\n";
const CONTENT_TYPE: &str = "Content-Type";

/// One logical line, numbered from 1
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchPayloadLine {
    pub content: String,
    pub line_number: usize,
}

impl BatchPayloadLine {
    pub fn new(content: impl Into<String>, line_number: usize) -> Self {
        Self {
            content: content.into(),
            line_number,
        }
    }
}

/// Blank lines seen since the last boundary line
///
/// A body part has a header block and, after the embedded start line and
/// headers, a second block; the body starts after the second blank line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadState {
    blank_lines: u8,
}

impl ReadState {
    /// Blank lines that separate a part's header blocks from its body
    pub const BODY_THRESHOLD: u8 = 2;

    pub fn found_linebreak(&mut self) {
        self.blank_lines = self.blank_lines.saturating_add(1);
    }

    pub fn found_boundary(&mut self) {
        self.blank_lines = 0;
    }

    pub fn is_read_body(&self) -> bool {
        self.blank_lines >= Self::BODY_THRESHOLD
    }
}

/// Reads a batch payload line by line
///
/// Owns the stream for the duration of [`read`](Self::read); dropping the
/// reader releases it.
pub struct BatchPayloadLineReader<R: Read> {
    inner: R,
    buffer: Vec<u8>,
    offset: usize,
    limit: usize,
    exhausted: bool,
    default_charset: Charset,
    current_charset: Charset,
    current_boundary: String,
    state: ReadState,
}

impl<R: Read> BatchPayloadLineReader<R> {
    /// Reader with the default buffer size and charset
    pub fn new(inner: R, media: &MultipartMixed) -> Self {
        Self::build(inner, media, BatchConfig::default().buffer_size, Charset::default())
    }

    pub fn with_config(inner: R, media: &MultipartMixed, config: &BatchConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(inner, media, config.buffer_size, config.charset()?))
    }

    fn build(inner: R, media: &MultipartMixed, buffer_size: usize, default_charset: Charset) -> Self {
        Self {
            inner,
            buffer: vec![0; buffer_size.max(1)],
            offset: 0,
            limit: 0,
            exhausted: false,
            default_charset,
            current_charset: media.charset(),
            current_boundary: media.delimiter(),
            state: ReadState::default(),
        }
    }

    /// Read every line; the first line becomes the boundary marker if it is a delimiter
    pub fn read(mut self) -> Result<Vec<BatchPayloadLine>> {
        let mut lines = Vec::new();

        if let Some(first) = self.read_line()? {
            let marker = first.trim();
            if marker.starts_with("--") {
                self.current_boundary = marker.trim_end_matches("--").to_string();
            }
            lines.push(BatchPayloadLine::new(first, 1));

            while let Some(line) = self.read_line()? {
                let line_number = lines.len() + 1;
                lines.push(BatchPayloadLine::new(line, line_number));
            }
        }

        debug!(lines = lines.len(), "read batch payload");
        Ok(lines)
    }

    /// Next line with its line ending, or `None` at end of stream
    pub fn read_line(&mut self) -> Result<Option<String>> {
        let mut line = Vec::new();

        loop {
            if self.offset >= self.limit && !self.fill_buffer()? {
                break;
            }

            let byte = self.buffer[self.offset];
            self.offset += 1;
            line.push(byte);

            if byte == LF {
                break;
            }
            if byte == CR {
                if self.offset >= self.limit {
                    self.fill_buffer()?;
                }
                if self.offset < self.limit && self.buffer[self.offset] == LF {
                    line.push(LF);
                    self.offset += 1;
                }
                break;
            }
        }

        if line.is_empty() {
            return Ok(None);
        }

        let charset = if self.state.is_read_body() {
            self.current_charset
        } else {
            self.default_charset
        };
        let line = charset.decode(&line);
        self.update_state(&line)?;

        Ok(Some(line))
    }

    /// Refill from the stream; false once it is exhausted
    fn fill_buffer(&mut self) -> Result<bool> {
        if self.exhausted {
            return Ok(false);
        }

        loop {
            match self.inner.read(&mut self.buffer) {
                Ok(0) => {
                    self.exhausted = true;
                    self.offset = 0;
                    self.limit = 0;
                    return Ok(false);
                }
                Ok(n) => {
                    self.offset = 0;
                    self.limit = n;
                    return Ok(true);
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn update_state(&mut self, line: &str) -> Result<()> {
        if let Some(value) = header_value(line, CONTENT_TYPE) {
            self.update_content_type(value)?;
        } else if line == CRLF {
            self.state.found_linebreak();
        } else if self.is_boundary(line) {
            self.state.found_boundary();
        }
        Ok(())
    }

    fn update_content_type(&mut self, value: &str) -> Result<()> {
        let media: mime::Mime = match value.parse() {
            Ok(media) => media,
            Err(e) => {
                debug!(value, error = %e, "unparsable content type, using default charset");
                self.current_charset = self.default_charset;
                return Ok(());
            }
        };

        self.current_charset = match media.get_param(mime::CHARSET) {
            Some(label) => Charset::for_label(label.as_str())?,
            None => self.default_charset,
        };
        if let Some(boundary) = media.get_param(mime::BOUNDARY) {
            self.current_boundary = format!("--{}", boundary.as_str().trim_matches('"'));
        }
        Ok(())
    }

    fn is_boundary(&self, line: &str) -> bool {
        let line = line.trim_end_matches([CR as char, LF as char]);
        line == self.current_boundary
            || line
                .strip_prefix(self.current_boundary.as_str())
                .is_some_and(|rest| rest == "--")
    }

    /// Charset used for body lines of the current part
    pub fn current_charset(&self) -> Charset {
        self.current_charset
    }

    pub fn state(&self) -> ReadState {
        self.state
    }
}

/// Value of a `name: value` line when the name matches case-insensitively
fn header_value<'a>(line: &'a str, name: &str) -> Option<&'a str> {
    let (key, value) = line.split_once(':')?;
    key.trim()
        .eq_ignore_ascii_case(name)
        .then(|| value.trim())
}
