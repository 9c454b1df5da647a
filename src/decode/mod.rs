mod flate;

use std::ops::Range;
use std::sync::LazyLock;

use regex::bytes::Regex;

use crate::error::Result;

pub use flate::flate_decode;

static STREAM_KEYWORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?-u)stream(?:\r\n|\n)").expect("stream keyword regex"));

static OBJECT_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?-u)(\d+)\s+\d+\s+obj\b").expect("object header regex"));

static TOUNICODE_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?-u)/ToUnicode\s+(\d+)\s+\d+\s+R").expect("ToUnicode ref regex"));

/// A `stream ... endstream` block located in the document bytes
#[derive(Debug)]
pub struct LocatedStream {
    /// Indirect object that owns the stream, when an `N G obj` header precedes it
    pub object: Option<u32>,
    /// Byte range of the raw payload
    pub range: Range<usize>,
    /// Decompressed payload, or the reason it was skipped
    pub payload: Result<Vec<u8>>,
}

impl LocatedStream {
    /// Decompressed bytes, `None` for skipped streams
    pub fn data(&self) -> Option<&[u8]> {
        self.payload.as_deref().ok()
    }

    pub fn is_cmap(&self) -> bool {
        self.data().is_some_and(|d| contains(d, b"begincmap"))
    }

    /// Heuristic for page content: has a text object and is not a CMap
    pub fn is_text_content(&self) -> bool {
        match self.data() {
            Some(d) => !contains(d, b"begincmap") && has_operator(d, b"BT"),
            None => false,
        }
    }
}

/// Iterator over every stream in a PDF byte buffer, in document order.
///
/// No cross-reference table is built: stream boundaries are found by keyword
/// search and ownership by the closest preceding object header.
pub struct StreamLocator<'a> {
    data: &'a [u8],
    pos: usize,
    /// (byte offset, object number) of every `N G obj` header
    headers: Vec<(usize, u32)>,
}

impl<'a> StreamLocator<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        let headers = OBJECT_HEADER
            .captures_iter(data)
            .filter_map(|caps| {
                let start = caps.get(0)?.start();
                let num = std::str::from_utf8(caps.get(1)?.as_bytes())
                    .ok()?
                    .parse()
                    .ok()?;
                Some((start, num))
            })
            .collect();

        Self {
            data,
            pos: 0,
            headers,
        }
    }

    fn owner_of(&self, keyword_pos: usize) -> Option<u32> {
        let idx = self.headers.partition_point(|&(off, _)| off < keyword_pos);
        idx.checked_sub(1).map(|i| self.headers[i].1)
    }
}

impl Iterator for StreamLocator<'_> {
    type Item = LocatedStream;

    fn next(&mut self) -> Option<LocatedStream> {
        loop {
            let m = STREAM_KEYWORD.find_at(self.data, self.pos)?;

            // "endstream\n" also matches the keyword pattern
            if m.start() >= 3 && &self.data[m.start() - 3..m.start()] == b"end" {
                self.pos = m.end();
                continue;
            }

            let start = m.end();
            let Some(len) = find(&self.data[start..], b"endstream") else {
                self.pos = self.data.len();
                return None;
            };
            let end = start + len;
            self.pos = end + b"endstream".len();

            let range = strip_eol(self.data, start..end);
            let payload = flate_decode(&self.data[range.clone()], range.start);

            match &payload {
                Ok(bytes) => log::debug!(
                    "stream at {}: {} -> {} bytes",
                    range.start,
                    range.len(),
                    bytes.len()
                ),
                Err(e) => log::warn!("skipping stream: {}", e),
            }

            return Some(LocatedStream {
                object: self.owner_of(m.start()),
                range,
                payload,
            });
        }
    }
}

/// Object numbers referenced by `/ToUnicode N G R` entries, in reference order
pub fn tounicode_refs(data: &[u8]) -> Vec<u32> {
    let mut refs: Vec<u32> = Vec::new();
    for caps in TOUNICODE_REF.captures_iter(data) {
        let num = caps
            .get(1)
            .and_then(|m| std::str::from_utf8(m.as_bytes()).ok())
            .and_then(|s| s.parse().ok());
        if let Some(num) = num {
            if !refs.contains(&num) {
                refs.push(num);
            }
        }
    }
    refs
}

/// Drop the single end-of-line that precedes `endstream`
fn strip_eol(data: &[u8], range: Range<usize>) -> Range<usize> {
    let mut end = range.end;
    if end > range.start && data[end - 1] == b'\n' {
        end -= 1;
    }
    if end > range.start && data[end - 1] == b'\r' {
        end -= 1;
    }
    range.start..end
}

pub(crate) fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    find(haystack, needle).is_some()
}

/// True if `op` occurs as a standalone operator (delimited by whitespace)
fn has_operator(data: &[u8], op: &[u8]) -> bool {
    data.windows(op.len()).enumerate().any(|(i, w)| {
        w == op
            && (i == 0 || data[i - 1].is_ascii_whitespace())
            && data
                .get(i + op.len())
                .is_none_or(|b| b.is_ascii_whitespace())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::ZlibEncoder;
    use std::io::Write;

    fn deflate(data: &[u8]) -> Vec<u8> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    fn object(num: u32, payload: &[u8]) -> Vec<u8> {
        let mut out = format!("{} 0 obj\n<< /Length {} /Filter /FlateDecode >>\nstream\n", num, payload.len())
            .into_bytes();
        out.extend_from_slice(payload);
        out.extend_from_slice(b"\nendstream\nendobj\n");
        out
    }

    #[test]
    fn test_locates_streams_in_order() {
        let mut pdf = b"%PDF-1.7\n".to_vec();
        pdf.extend(object(4, &deflate(b"BT (a) Tj ET")));
        pdf.extend(object(7, &deflate(b"begincmap endcmap")));

        let streams: Vec<_> = StreamLocator::new(&pdf).collect();

        assert_eq!(streams.len(), 2);
        assert_eq!(streams[0].object, Some(4));
        assert_eq!(streams[0].data(), Some(&b"BT (a) Tj ET"[..]));
        assert!(streams[0].is_text_content());
        assert_eq!(streams[1].object, Some(7));
        assert!(streams[1].is_cmap());
        assert!(!streams[1].is_text_content());
    }

    #[test]
    fn test_undecompressable_stream_is_reported_not_fatal() {
        let mut pdf = b"%PDF-1.7\n".to_vec();
        pdf.extend(object(1, b"plain bytes"));
        pdf.extend(object(2, &deflate(b"BT (b) Tj ET")));

        let streams: Vec<_> = StreamLocator::new(&pdf).collect();

        assert_eq!(streams.len(), 2);
        assert!(streams[0].payload.is_err());
        assert!(streams[0].data().is_none());
        assert_eq!(streams[1].data(), Some(&b"BT (b) Tj ET"[..]));
    }

    #[test]
    fn test_crlf_after_keyword() {
        let mut pdf = b"%PDF-1.7\n3 0 obj\n<< >>\nstream\r\n".to_vec();
        pdf.extend(deflate(b"BT ET"));
        pdf.extend_from_slice(b"\r\nendstream\r\nendobj\r\n");

        let streams: Vec<_> = StreamLocator::new(&pdf).collect();

        assert_eq!(streams.len(), 1);
        assert_eq!(streams[0].data(), Some(&b"BT ET"[..]));
    }

    #[test]
    fn test_unterminated_stream_ends_scan() {
        let pdf = b"%PDF-1.7\n1 0 obj\n<< >>\nstream\nabc";
        assert_eq!(StreamLocator::new(pdf).count(), 0);
    }

    #[test]
    fn test_tounicode_refs_deduplicated() {
        let pdf = b"<< /ToUnicode 12 0 R >> << /ToUnicode 9 0 R >> << /ToUnicode 12 0 R >>";
        assert_eq!(tounicode_refs(pdf), vec![12, 9]);
    }

    #[test]
    fn test_operator_detection_needs_delimiters() {
        assert!(has_operator(b"q\nBT\n/F1 1 Tf", b"BT"));
        assert!(!has_operator(b"/BTFont 1 Tf", b"BT"));
    }
}
