//! Batch payload generator

use tracing::debug;

use crate::batch::item::BatchItem;
use crate::batch::media::{MultipartMixed, APPLICATION_HTTP, BINARY};

const CRLF: &str = "\r\n";

/// Serialize items as a `multipart/mixed` body delimited by `media`'s boundary
///
/// Every line ends with CRLF. Content is written as-is.
pub fn generate_batch<T: BatchItem>(items: &[T], media: &MultipartMixed) -> String {
    let delimiter = media.delimiter();
    let mut payload = String::new();

    for item in items {
        write_item(&mut payload, &delimiter, item);
    }
    push_line(&mut payload, &media.close_delimiter());

    debug!(items = items.len(), bytes = payload.len(), "generated batch payload");
    payload
}

fn write_item<T: BatchItem>(out: &mut String, delimiter: &str, item: &T) {
    push_line(out, delimiter);
    push_line(out, &format!("Content-Type: {}", APPLICATION_HTTP));
    push_line(out, &format!("Content-Transfer-Encoding: {}", BINARY));
    out.push_str(CRLF);

    if let Some(start_line) = item.start_line() {
        push_line(out, &start_line);
    }

    if !item.headers().is_empty() {
        for (name, values) in item.headers().iter() {
            for value in values {
                push_line(out, &format!("{}: {}", name, value));
            }
        }
        out.push_str(CRLF);
    }

    if !item.content().is_empty() {
        push_line(out, item.content());
    }
}

fn push_line(out: &mut String, line: &str) {
    out.push_str(line);
    out.push_str(CRLF);
}
