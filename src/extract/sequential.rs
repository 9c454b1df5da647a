//! Record reconstruction from the flat token stream.
//!
//! Layout is ignored. Records are delimited by the triple
//! `(next id, category, short CJK sub-label)`, searched for in order.

use crate::content::TextFragment;
use crate::error::{ExtractError, Result};
use crate::types::Shop;

use super::fields::{is_city, is_sub_label, split_address_tokens, split_phone};
use super::markers::{HEADER_ROW, is_category, is_skip_token};
use super::{DocumentToRecords, Extraction};

#[derive(Debug, Clone, Default)]
pub struct SequentialStrategy {
    expected_total: Option<usize>,
}

impl SequentialStrategy {
    pub fn new(expected_total: Option<usize>) -> Self {
        Self { expected_total }
    }
}

impl DocumentToRecords for SequentialStrategy {
    fn name(&self) -> &'static str {
        "sequential"
    }

    fn to_records(&self, fragments: &[TextFragment]) -> Result<Extraction> {
        let tokens = normalize_tokens(fragments.iter().map(|f| f.text.as_str()));
        let starts = locate_entries(&tokens);

        if let Some(total) = self.expected_total {
            if starts.len() < total {
                return Err(ExtractError::RecordBoundaryNotFound {
                    expected_id: starts.len() as u32 + 1,
                    recovered: starts.len(),
                    expected_total: Some(total),
                });
            }
        }
        if starts.is_empty() && !tokens.is_empty() {
            log::warn!("no record boundary found in {} tokens", tokens.len());
        } else {
            log::debug!(
                "{} boundaries located; boundary for id {} not found",
                starts.len(),
                starts.len() + 1
            );
        }

        let mut extraction = Extraction::default();
        let ends = starts.iter().skip(1).copied().chain(std::iter::once(tokens.len()));

        for (id, (start, end)) in (1u32..).zip(starts.iter().copied().zip(ends)) {
            match parse_span(id, &tokens[start..end]) {
                Ok(shop) => extraction.shops.push(shop),
                Err(reason) => extraction.drop_record(id, reason),
            }
        }

        Ok(extraction)
    }
}

/// Trimmed, non-noise tokens with header rows removed, starting at the
/// first all-digit token
pub fn normalize_tokens<'a>(texts: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let cleaned: Vec<&str> = texts
        .into_iter()
        .map(str::trim)
        .filter(|t| !t.is_empty() && !is_skip_token(t))
        .collect();

    let mut tokens: Vec<String> = Vec::with_capacity(cleaned.len());
    let mut i = 0;
    while i < cleaned.len() {
        if cleaned[i..].starts_with(HEADER_ROW) {
            i += HEADER_ROW.len();
            continue;
        }
        tokens.push(cleaned[i].to_string());
        i += 1;
    }

    let first_id = tokens.iter().position(|t| is_id_token(t)).unwrap_or(tokens.len());
    tokens.drain(..first_id);
    tokens
}

fn is_id_token(token: &str) -> bool {
    !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit())
}

/// Token indices where records 1, 2, 3, ... begin.
///
/// Stops at the first id whose boundary triple cannot be found.
pub fn locate_entries(tokens: &[String]) -> Vec<usize> {
    let mut starts = Vec::new();
    let mut cursor = 0;
    let mut current_id: u32 = 1;

    loop {
        let target = current_id.to_string();
        let found = (cursor..tokens.len().saturating_sub(2)).find(|&i| {
            tokens[i] == target && is_category(&tokens[i + 1]) && is_sub_label(&tokens[i + 2])
        });

        let Some(i) = found else { break };
        starts.push(i);
        cursor = i + 1;
        current_id += 1;
    }

    starts
}

/// Parse one record span: `id, category, sub-label, name+phone..., city,
/// district, address..., offers...`
fn parse_span(id: u32, span: &[String]) -> std::result::Result<Shop, ExtractError> {
    let body = &span[3..];
    let Some(city_at) = body.iter().position(|t| is_city(t)) else {
        return Err(ExtractError::FieldPatternMismatch { id, field: "city" });
    };

    let (name, phone) = split_phone(&body[..city_at].concat());
    let district = body.get(city_at + 1).map(|d| d.trim().to_string()).unwrap_or_default();
    let rest = body.get(city_at + 2..).unwrap_or_default();
    let (address, offers) = split_address_tokens(rest);

    Ok(Shop {
        id,
        category_main: span[1].clone(),
        category_sub: span[2].clone(),
        name,
        phone,
        city: body[city_at].trim().to_string(),
        district,
        address,
        offers,
    })
}
