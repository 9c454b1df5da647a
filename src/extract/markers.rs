//! Fixed vocabularies of the partner-shop list.

/// Main category labels that follow a record id
pub const CATEGORIES: &[&str] = &[
    "生活", "休閒", "藝文", "教育", "醫療", "交通", "旅宿", "購物", "美容", "服務", "保健", "其他",
];

/// Words that open the offer text; the address ends before the first one
pub const ADDRESS_BREAK: &[&str] = &[
    "優惠", "折", "享", "憑", "送", "贈", "消費", "即可", "持", "出示", "折扣", "折抵", "使用", "需",
    "本優惠", "折價", "任選", "至", "於", "內含",
];

/// Column header row repeated at the top of every page, as split in the stream
pub const HEADER_ROW: &[&str] = &[
    "編", "號", "分", "類", "店家名稱", "聯絡電話", "縣市", "區域", "地址", "提供之優", "惠",
];

/// Layout noise: language tags from marked content and stray punctuation
pub const SKIP_TOKENS: &[&str] = &["en-US", "zh-TW", "zh-TWen-US", "en-USen-US", "(", ")"];

/// Page title and note, whole and in the pieces they are drawn in.
///
/// Whole strings come first so they are removed before their pieces.
pub const HEADER_FRAGMENTS: &[&str] = &[
    "桃園市政府員工卡特約商店名單及優惠措施一覽表",
    "備註：詳細優惠內容請洽各特約商店",
    "桃園市政府員工卡特",
    "約商店名單及",
    "優惠措施一覽",
    "備註：詳",
    "細優惠內容請",
    "洽各特約商店",
];

/// Text that marks a geometric row as page header or footer
pub const HEADER_ROW_KEYWORDS: &[&str] = &[
    "店家名稱",
    "聯絡電話",
    "提供之優惠",
    "一覽表",
    "備註：",
];

pub fn is_category(token: &str) -> bool {
    CATEGORIES.contains(&token)
}

pub fn is_skip_token(token: &str) -> bool {
    SKIP_TOKENS.contains(&token)
}

/// Byte offset of the earliest address-break word in `text`
pub fn find_address_break(text: &str) -> Option<usize> {
    ADDRESS_BREAK.iter().filter_map(|m| text.find(m)).min()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_membership() {
        assert!(is_category("生活"));
        assert!(!is_category("餐飲"));
    }

    #[test]
    fn test_earliest_break_wins() {
        let text = "中正路5號1樓憑卡享9折";
        assert_eq!(find_address_break(text), text.find("憑"));
        assert_eq!(find_address_break("中正路5號"), None);
    }

    #[test]
    fn test_whole_title_precedes_pieces() {
        let whole = HEADER_FRAGMENTS[0];
        let pieces = ["桃園市政府員工卡特", "約商店名單及", "優惠措施一覽"];
        for piece in pieces {
            let at = HEADER_FRAGMENTS.iter().position(|f| *f == piece).unwrap();
            assert!(at > 0 && whole.contains(piece));
        }
    }
}
