//! Field-level parsing inside one reconstructed record.

use std::sync::LazyLock;

use regex::Regex;

use super::markers::{HEADER_FRAGMENTS, find_address_break};

/// Mobile `09xx-xxxxxx`, or landline with optional parenthesised area code
static PHONE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"09\d{2}-?\d{6}|\(?0\d{1,3}\)?-?\d{3,4}-?\d{3,4}").expect("phone regex")
});

static PAGE_FOOTER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"第\s*\d+\s*頁\s*[，,]?\s*共\s*\d+\s*頁").expect("page footer regex")
});

static CITY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r".*[市縣]$").expect("city regex"));

static SUB_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\x{4e00}-\x{9fff}]{1,4}$").expect("sub-label regex"));

/// City tokens end in 市 or 縣
pub fn is_city(token: &str) -> bool {
    CITY.is_match(token.trim())
}

/// One to four CJK ideographs, as in a category sub-label
pub fn is_sub_label(token: &str) -> bool {
    SUB_LABEL.is_match(token)
}

/// Split a name+phone run into `(name, phone)`.
///
/// The first phone-shaped match is removed once; the rest is the name.
pub fn split_phone(run: &str) -> (String, String) {
    match PHONE.find(run) {
        Some(m) => {
            let name = format!("{}{}", &run[..m.start()], &run[m.end()..]);
            (name.trim().to_string(), m.as_str().to_string())
        }
        None => (run.trim().to_string(), String::new()),
    }
}

/// Split text at the first address-break word into `(address, offers)`
pub fn split_address_offers(text: &str) -> (String, String) {
    match find_address_break(text) {
        Some(at) => (cleanup_text(&text[..at]), cleanup_text(&text[at..])),
        None => (cleanup_text(text), String::new()),
    }
}

/// Split address/offer tokens: tokens before the first one containing an
/// address-break word form the address, the rest the offers
pub fn split_address_tokens(tokens: &[String]) -> (String, String) {
    let at = tokens
        .iter()
        .position(|t| find_address_break(t).is_some())
        .unwrap_or(tokens.len());

    (
        cleanup_text(&tokens[..at].concat()),
        cleanup_text(&tokens[at..].concat()),
    )
}

/// Remove page footers and repeated title fragments
pub fn cleanup_text(value: &str) -> String {
    let mut value = PAGE_FOOTER.replace_all(value, "").into_owned();
    for fragment in HEADER_FRAGMENTS {
        value = value.replace(fragment, "");
    }
    value.trim().to_string()
}

/// True if `text` is a page footer such as `第3頁，共10頁`
pub fn is_page_footer(text: &str) -> bool {
    PAGE_FOOTER.is_match(text)
}
