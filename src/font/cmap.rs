use std::collections::{BTreeMap, HashMap};

use encoding_rs::UTF_16BE;

use crate::error::ExtractError;

/// Upper bound on codes expanded from a single bfrange entry
const MAX_RANGE_SPAN: u32 = 0x1_0000;

/// ToUnicode character map: source code -> Unicode text.
///
/// Built once per document and then only read. Later entries for the same
/// code replace earlier ones, in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CMap {
    map: HashMap<u32, String>,
    max_code: u32,
}

impl CMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a decompressed ToUnicode CMap stream
    pub fn parse(data: &[u8]) -> Self {
        let text = String::from_utf8_lossy(data);
        let mut cmap = CMap::new();
        let mut remaining: &str = &text;

        // Sections are visited in document order so that overrides hold
        // across bfchar and bfrange blocks.
        while let Some((kind, start)) = next_section(remaining) {
            let body = &remaining[start..];
            let (end_kw, parse): (&str, fn(&str, &mut CMap)) = match kind {
                Section::Char => ("endbfchar", parse_bfchar_line),
                Section::Range => ("endbfrange", parse_bfrange_line),
            };

            let Some(end) = body.find(end_kw) else {
                log::debug!("unterminated {:?} section", kind);
                break;
            };

            for line in logical_lines(&body[..end]) {
                parse(&line, &mut cmap);
            }

            remaining = &body[end + end_kw.len()..];
        }

        log::debug!("parsed CMap with {} entries", cmap.len());
        cmap
    }

    pub fn insert(&mut self, code: u32, text: String) {
        log::trace!("CMap 0x{:04X} -> {:?}", code, text);
        self.max_code = self.max_code.max(code);
        self.map.insert(code, text);
    }

    /// Fold `other` into `self`; entries of `other` win
    pub fn merge(&mut self, other: CMap) {
        self.max_code = self.max_code.max(other.max_code);
        self.map.extend(other.map);
    }

    pub fn get(&self, code: u32) -> Option<&str> {
        self.map.get(&code).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Bytes per character code: 2 when any key exceeds one byte
    pub fn code_width(&self) -> usize {
        if self.max_code > 0xFF { 2 } else { 1 }
    }

    /// Map text back to character codes, longest match first.
    ///
    /// When several codes produce the same text the lowest code is used.
    /// Returns `None` if some part of `text` has no code.
    pub fn encode(&self, text: &str) -> Option<Vec<u32>> {
        let mut reverse: BTreeMap<&str, u32> = BTreeMap::new();
        for (&code, value) in &self.map {
            if value.is_empty() {
                continue;
            }
            reverse
                .entry(value.as_str())
                .and_modify(|c| *c = (*c).min(code))
                .or_insert(code);
        }
        let longest = reverse.keys().map(|k| k.len()).max().unwrap_or(0);

        let mut codes = Vec::new();
        let mut rest = text;
        while !rest.is_empty() {
            let (code, used) = (1..=longest.min(rest.len()))
                .rev()
                .filter(|&n| rest.is_char_boundary(n))
                .find_map(|n| reverse.get(&rest[..n]).map(|&c| (c, n)))?;
            codes.push(code);
            rest = &rest[used..];
        }
        Some(codes)
    }
}

#[derive(Debug, Clone, Copy)]
enum Section {
    Char,
    Range,
}

/// Find the next `beginbfchar` / `beginbfrange`, returning the offset just
/// past the keyword
fn next_section(text: &str) -> Option<(Section, usize)> {
    let chr = text.find("beginbfchar").map(|i| (Section::Char, i + "beginbfchar".len()));
    let rng = text
        .find("beginbfrange")
        .map(|i| (Section::Range, i + "beginbfrange".len()));

    match (chr, rng) {
        (Some(c), Some(r)) => Some(if c.1 < r.1 { c } else { r }),
        (c, r) => c.or(r),
    }
}

/// Split a section body into lines, joining lines while a `[` array is open
fn logical_lines(body: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut depth = 0i32;

    for line in body.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        depth += line.matches('[').count() as i32 - line.matches(']').count() as i32;
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(line);
        if depth <= 0 {
            lines.push(std::mem::take(&mut current));
            depth = 0;
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

#[derive(Debug, Clone, PartialEq)]
enum Tok<'a> {
    Hex(&'a str),
    ArrayStart,
    ArrayEnd,
}

fn tokenize(line: &str) -> Vec<Tok<'_>> {
    let mut toks = Vec::new();
    let mut rest = line;

    while let Some(c) = rest.chars().next() {
        match c {
            '<' => {
                let Some(close) = rest.find('>') else { break };
                toks.push(Tok::Hex(&rest[1..close]));
                rest = &rest[close + 1..];
            }
            '[' => {
                toks.push(Tok::ArrayStart);
                rest = &rest[1..];
            }
            ']' => {
                toks.push(Tok::ArrayEnd);
                rest = &rest[1..];
            }
            '%' => break,
            _ => rest = &rest[c.len_utf8()..],
        }
    }
    toks
}

fn warn_line(line: &str) {
    log::debug!("{}", ExtractError::CMapParseWarning(line.to_string()));
}

/// `<src> <dst>` pairs
fn parse_bfchar_line(line: &str, cmap: &mut CMap) {
    let toks = tokenize(line);
    let mut iter = toks.chunks_exact(2);

    for pair in iter.by_ref() {
        match (&pair[0], &pair[1]) {
            (Tok::Hex(src), Tok::Hex(dst)) => match parse_code(src) {
                Some(code) => cmap.insert(code, decode_destination(dst)),
                None => warn_line(line),
            },
            _ => warn_line(line),
        }
    }

    if !iter.remainder().is_empty() {
        warn_line(line);
    }
}

/// `<lo> <hi> <dst>` or `<lo> <hi> [<dst0> <dst1> ...]`
fn parse_bfrange_line(line: &str, cmap: &mut CMap) {
    let toks = tokenize(line);
    let mut i = 0;

    while i < toks.len() {
        let (Some(Tok::Hex(lo)), Some(Tok::Hex(hi))) = (toks.get(i), toks.get(i + 1)) else {
            warn_line(line);
            return;
        };
        let (Some(lo), Some(hi)) = (parse_code(lo), parse_code(hi)) else {
            warn_line(line);
            return;
        };
        if hi < lo || hi - lo >= MAX_RANGE_SPAN {
            warn_line(line);
            return;
        }

        match toks.get(i + 2) {
            Some(Tok::Hex(dst)) => {
                for offset in 0..=(hi - lo) {
                    if let Some(text) = offset_destination(dst, offset) {
                        cmap.insert(lo + offset, text);
                    }
                }
                i += 3;
            }
            Some(Tok::ArrayStart) => {
                let mut j = i + 3;
                let mut codes = lo..=hi;
                while let Some(Tok::Hex(dst)) = toks.get(j) {
                    // extra destinations past `hi` are ignored
                    if let Some(code) = codes.next() {
                        cmap.insert(code, decode_destination(dst));
                    }
                    j += 1;
                }
                if toks.get(j) != Some(&Tok::ArrayEnd) {
                    warn_line(line);
                    return;
                }
                i = j + 1;
            }
            _ => {
                warn_line(line);
                return;
            }
        }
    }
}

fn parse_code(hex: &str) -> Option<u32> {
    let hex: String = hex.chars().filter(|c| !c.is_whitespace()).collect();
    if hex.is_empty() || hex.len() > 8 {
        return None;
    }
    u32::from_str_radix(&hex, 16).ok()
}

fn hex_bytes(hex: &str) -> Option<Vec<u8>> {
    let digits: Vec<u8> = hex.bytes().filter(|b| !b.is_ascii_whitespace()).collect();
    if digits.len() % 2 != 0 {
        return None;
    }
    digits
        .chunks(2)
        .map(|pair| {
            let s = std::str::from_utf8(pair).ok()?;
            u8::from_str_radix(s, 16).ok()
        })
        .collect()
}

/// Destination text: UTF-16BE, then UTF-8, else empty
pub(crate) fn decode_destination(hex: &str) -> String {
    let Some(bytes) = hex_bytes(hex) else {
        return String::new();
    };
    if bytes.len() % 2 == 0 {
        if let Some(s) = UTF_16BE.decode_without_bom_handling_and_without_replacement(&bytes) {
            return s.into_owned();
        }
    }
    String::from_utf8(bytes).unwrap_or_default()
}

/// Destination for the `offset`-th code of a scalar bfrange
fn offset_destination(hex: &str, offset: u32) -> Option<String> {
    let bytes = hex_bytes(hex)?;

    if bytes.len() <= 2 {
        let base = bytes.iter().fold(0u32, |acc, &b| (acc << 8) | b as u32);
        return char::from_u32(base + offset).map(|c| c.to_string());
    }
    if bytes.len() % 2 != 0 {
        return None;
    }

    let mut units: Vec<u16> = bytes
        .chunks(2)
        .map(|p| u16::from_be_bytes([p[0], p[1]]))
        .collect();
    let last = units.last_mut()?;
    *last = last.checked_add(u16::try_from(offset).ok()?)?;
    String::from_utf16(&units).ok()
}
