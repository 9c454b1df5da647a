//! String operands of text-showing operators and their decoding to Unicode.

use encoding_rs::{BIG5, UTF_16BE};

use crate::error::ExtractError;
use crate::font::CMap;

/// A raw string operand as found in a content stream
#[derive(Debug, Clone, PartialEq)]
pub enum PdfString {
    /// Hex digits between `<` and `>`, whitespace removed
    Hex(Vec<u8>),
    /// Body of a `(...)` literal with escapes still in place
    Literal(Vec<u8>),
}

impl PdfString {
    /// Raw string bytes with hex pairs or escapes resolved
    pub fn bytes(&self) -> Vec<u8> {
        match self {
            PdfString::Hex(digits) => decode_hex_digits(digits),
            PdfString::Literal(raw) => unescape_literal(raw),
        }
    }

    pub fn decode(&self, cmap: &CMap) -> String {
        decode_text(&self.bytes(), cmap)
    }
}

/// Two hex digits per byte; an odd trailing digit is padded with `0`
pub fn decode_hex_digits(digits: &[u8]) -> Vec<u8> {
    let mut hex: Vec<u8> = digits.iter().copied().filter(u8::is_ascii_hexdigit).collect();
    if hex.len() % 2 == 1 {
        hex.push(b'0');
    }

    hex.chunks(2)
        .map(|pair| (hex_val(pair[0]) << 4) | hex_val(pair[1]))
        .collect()
}

/// Resolve backslash escapes in a literal string body.
///
/// Unescaped parentheses are kept as they are; the tokenizer has already
/// matched them.
pub fn unescape_literal(raw: &[u8]) -> Vec<u8> {
    let mut result = Vec::with_capacity(raw.len());
    let mut i = 0;

    while i < raw.len() {
        let b = raw[i];
        i += 1;

        if b != b'\\' || i >= raw.len() {
            result.push(b);
            continue;
        }

        let escaped = raw[i];
        i += 1;
        match escaped {
            b'n' => result.push(b'\n'),
            b'r' => result.push(b'\r'),
            b't' => result.push(b'\t'),
            b'b' => result.push(0x08),
            b'f' => result.push(0x0C),
            b'(' => result.push(b'('),
            b')' => result.push(b')'),
            b'\\' => result.push(b'\\'),
            b'0'..=b'7' => {
                // Octal escape (1-3 digits)
                let mut octal = (escaped - b'0') as u32;
                for _ in 0..2 {
                    match raw.get(i) {
                        Some(&d @ b'0'..=b'7') => {
                            i += 1;
                            octal = octal * 8 + (d - b'0') as u32;
                        }
                        _ => break,
                    }
                }
                result.push(octal as u8);
            }
            b'\r' => {
                // Line continuation
                if raw.get(i) == Some(&b'\n') {
                    i += 1;
                }
            }
            b'\n' => {}
            _ => result.push(escaped),
        }
    }

    result
}

/// Decode string bytes to text through the CMap.
///
/// Bytes are grouped into codes of `cmap.code_width()` bytes. Codes missing
/// from the map are read directly as UTF-8 or UTF-16. If nothing could be
/// mapped the whole buffer goes through [`fallback_text`]. Never fails.
pub fn decode_text(bytes: &[u8], cmap: &CMap) -> String {
    if bytes.is_empty() {
        return String::new();
    }

    let width = cmap.code_width();
    if !cmap.is_empty() && bytes.len() % width == 0 {
        let mut out = String::new();

        for chunk in bytes.chunks(width) {
            let code = chunk.iter().fold(0u32, |acc, &b| (acc << 8) | b as u32);
            match cmap.get(code) {
                Some(text) if !text.is_empty() => out.push_str(text),
                _ => {
                    if let Some(text) = direct_code_text(chunk) {
                        out.push_str(&text);
                    }
                }
            }
        }

        if !out.is_empty() {
            return out;
        }
    }

    fallback_text(bytes)
}

/// Unmapped code read as UTF-8, then as a single UTF-16 unit
fn direct_code_text(chunk: &[u8]) -> Option<String> {
    if let Ok(s) = std::str::from_utf8(chunk) {
        if !s.chars().any(char::is_control) {
            return Some(s.to_string());
        }
    }
    if let [hi, lo] = chunk {
        let c = char::from_u32(u16::from_be_bytes([*hi, *lo]) as u32)?;
        if !c.is_control() {
            return Some(c.to_string());
        }
    }
    None
}

/// Whole-buffer decoding: UTF-8, BOM-marked UTF-16BE, then Big5 with
/// undecodable sequences dropped
pub fn fallback_text(bytes: &[u8]) -> String {
    if let Ok(s) = std::str::from_utf8(bytes) {
        return s.to_string();
    }

    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        if let Some(s) = UTF_16BE.decode_without_bom_handling_and_without_replacement(rest) {
            return s.into_owned();
        }
    }

    let (decoded, had_errors) = BIG5.decode_without_bom_handling(bytes);
    let text: String = decoded
        .chars()
        .filter(|&c| c != char::REPLACEMENT_CHARACTER && !c.is_control())
        .collect();

    if had_errors {
        log::trace!("{}", ExtractError::UndecodableString(bytes.len()));
    }
    text
}

fn hex_val(b: u8) -> u8 {
    match b {
        b'0'..=b'9' => b - b'0',
        b'a'..=b'f' => b - b'a' + 10,
        b'A'..=b'F' => b - b'A' + 10,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn wide_cmap() -> CMap {
        CMap::parse(
            "2 beginbfchar\n<0102> <684C>\n<0103> <5712>\nendbfchar\n1 beginbfrange\n<0200> <0202> <5E02>\nendbfrange\n"
                .as_bytes(),
        )
    }

    #[test]
    fn test_hex_digits_with_odd_length() {
        assert_eq!(decode_hex_digits(b"48656C6C6F"), b"Hello");
        assert_eq!(decode_hex_digits(b"4 8 6"), vec![0x48, 0x60]);
    }

    #[test]
    fn test_named_and_octal_escapes() {
        assert_eq!(unescape_literal(br"a\nb\)c\\"), b"a\nb)c\\");
        assert_eq!(unescape_literal(br"\101\60x\7"), vec![b'A', 0o60, b'x', 7]);
    }

    #[test]
    fn test_nested_parens_kept() {
        assert_eq!(unescape_literal(b"a(b)c"), b"a(b)c");
    }

    #[test]
    fn test_line_continuation() {
        assert_eq!(unescape_literal(b"ab\\\r\ncd"), b"abcd");
    }

    #[test]
    fn test_decode_two_byte_codes() {
        let cmap = wide_cmap();
        let s = PdfString::Hex(b"01020103".to_vec());
        assert_eq!(s.decode(&cmap), "桌園");
        assert_eq!(PdfString::Hex(b"0202".to_vec()).decode(&cmap), "\u{5E04}");
    }

    #[test]
    fn test_unmapped_code_reads_directly() {
        let cmap = wide_cmap();
        // "12" as a two-byte code is not in the map but is valid UTF-8
        assert_eq!(decode_text(b"\x01\x0212", &cmap), "桌12");
        // 0x0031 read as a UTF-16 unit
        assert_eq!(decode_text(&[0x00, 0x31], &cmap), "1");
    }

    #[test]
    fn test_odd_length_falls_back_to_utf8() {
        let cmap = wide_cmap();
        assert_eq!(PdfString::Literal(b"123".to_vec()).decode(&cmap), "123");
    }

    #[test]
    fn test_fallback_never_fails() {
        assert_eq!(fallback_text("市".as_bytes()), "市");
        assert_eq!(fallback_text(&[0xFE, 0xFF, 0x5E, 0x02]), "市");
        // Big5 for 桃
        assert_eq!(fallback_text(&[0xAE, 0xE7]), "桃");
        assert_eq!(fallback_text(&[0xFF]), "");
    }

    proptest! {
        #[test]
        fn prop_hex_codes_round_trip(codes in proptest::collection::vec(0x0100u32..0x0140, 1..40)) {
            let mut cmap = CMap::new();
            for code in 0x0100u32..0x0140 {
                // distinct CJK ideographs
                cmap.insert(code, char::from_u32(0x4E00 + code).unwrap().to_string());
            }
            let hex: String = codes.iter().map(|c| format!("{:04X}", c)).collect();
            let text = PdfString::Hex(hex.into_bytes()).decode(&cmap);
            prop_assert_eq!(cmap.encode(&text), Some(codes));
        }

        #[test]
        fn prop_literal_length_minus_escapes(
            parts in proptest::collection::vec(
                prop_oneof![
                    "[a-zA-Z0-9 ]{1,4}".prop_map(|s| (s, 0usize)),
                    prop_oneof![
                        Just(r"\n"), Just(r"\r"), Just(r"\t"), Just(r"\b"),
                        Just(r"\f"), Just(r"\("), Just(r"\)"), Just(r"\\"),
                    ].prop_map(|s| (s.to_string(), 1usize)),
                    "[a-z]{0,3}".prop_map(|s| (format!("({})", s), 0usize)),
                ],
                0..20,
            )
        ) {
            let literal: String = parts.iter().map(|(s, _)| s.as_str()).collect();
            let escapes: usize = parts.iter().map(|(_, n)| n).sum();
            let decoded = unescape_literal(literal.as_bytes());
            prop_assert_eq!(decoded.len(), literal.len() - escapes);
        }
    }
}
