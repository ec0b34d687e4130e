//! Batch payload parser
//!
//! Groups the reader's lines into body parts and turns each part into a
//! [`BatchItem`] cloned from the caller's template.

use std::io::Read;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::batch::item::{BatchItem, HTTP_1_1};
use crate::batch::media::MultipartMixed;
use crate::batch::reader::{BatchPayloadLine, BatchPayloadLineReader};
use crate::config::BatchConfig;
use crate::error::{CoreError, Result};

/// `Token: value`, line ending included
static PATTERN_HEADER_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([\w!#$%&'*+\-.^`|~]+):\s?(.*?)\s*$").unwrap());

static PATTERN_BLANK_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*$").unwrap());

/// Parse a batch payload with the default configuration
pub fn parse_batch<R: Read, T: BatchItem>(
    reader: R,
    media: &MultipartMixed,
    template: &T,
) -> Result<Vec<T>> {
    parse_batch_with_config(reader, media, template, &BatchConfig::default())
}

/// Parse a batch payload; the stream is consumed and dropped
pub fn parse_batch_with_config<R: Read, T: BatchItem>(
    reader: R,
    media: &MultipartMixed,
    template: &T,
    config: &BatchConfig,
) -> Result<Vec<T>> {
    let lines = BatchPayloadLineReader::with_config(reader, media, config)?.read()?;
    parse_lines(lines, media, template)
}

/// Build items from already-read lines
pub fn parse_lines<T: BatchItem>(
    lines: Vec<BatchPayloadLine>,
    media: &MultipartMixed,
    template: &T,
) -> Result<Vec<T>> {
    split(lines, media)?
        .into_iter()
        .enumerate()
        .map(|(index, part)| {
            debug!(part = index, lines = part.len(), "parsing batch body part");
            Ok(parse_part(part, template))
        })
        .collect()
}

/// Split lines into body parts, dropping the preamble and the epilogue
pub fn split(
    lines: Vec<BatchPayloadLine>,
    media: &MultipartMixed,
) -> Result<Vec<Vec<BatchPayloadLine>>> {
    let quoted = regex::escape(media.boundary());
    let close_delimiter = Regex::new(&format!(r"^--{}--\s*$", quoted))
        .map_err(|e| CoreError::InvalidContentType(e.to_string()))?;
    let delimiter = Regex::new(&format!(r"^--{}\s*$", quoted))
        .map_err(|e| CoreError::InvalidContentType(e.to_string()))?;

    let first_line = lines.first().map_or(0, |line| line.line_number);
    let mut parts = Vec::new();
    let mut current = Vec::new();
    let mut end_reached = false;

    for line in lines {
        if close_delimiter.is_match(&line.content) {
            remove_ending_crlf(&mut current);
            parts.push(std::mem::take(&mut current));
            end_reached = true;
            break;
        } else if delimiter.is_match(&line.content) {
            remove_ending_crlf(&mut current);
            parts.push(std::mem::take(&mut current));
        } else {
            current.push(line);
        }
    }

    if !end_reached {
        return Err(CoreError::MissingCloseDelimiter { line: first_line });
    }

    // preamble
    parts.remove(0);
    Ok(parts)
}

/// The line ending before a delimiter belongs to the delimiter
fn remove_ending_crlf(part: &mut [BatchPayloadLine]) {
    if let Some(last) = part.last_mut() {
        if last.content.ends_with("\r\n") {
            last.content.truncate(last.content.len() - 2);
        }
    }
}

fn parse_part<T: BatchItem>(part: Vec<BatchPayloadLine>, template: &T) -> T {
    let mut item = template.clone();
    let mut lines = part.into_iter().peekable();

    // part headers (Content-Type, Content-Transfer-Encoding) are not kept
    while let Some((name, _)) = lines.peek().and_then(|line| header(&line.content)) {
        debug!(header = name, "skipping body part header");
        lines.next();
    }
    lines.next_if(|line| PATTERN_BLANK_LINE.is_match(&line.content));

    if let Some(line) = lines.next_if(|line| line.content.contains(HTTP_1_1)) {
        item.apply_start_line(&line.content);
    }

    while let Some((name, value)) = lines.peek().and_then(|line| header(&line.content)) {
        item.headers_mut().append_split(name, value);
        lines.next();
    }
    lines.next_if(|line| PATTERN_BLANK_LINE.is_match(&line.content));

    let content: String = lines.map(|line| line.content).collect();
    item.set_content(content);
    item
}

fn header(line: &str) -> Option<(&str, &str)> {
    let captures = PATTERN_HEADER_LINE.captures(line)?;
    Some((
        captures.get(1)?.as_str().trim(),
        captures.get(2)?.as_str().trim(),
    ))
}
