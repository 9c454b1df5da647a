//! Record reconstruction from fragment positions.
//!
//! Fragments are clustered into rows by y, rows are split into the fixed
//! table columns by x, and rows without a category/name pair continue the
//! record above them.

use std::cmp::Ordering;

use crate::config::{COLUMN_COUNT, ExtractConfig};
use crate::content::TextFragment;
use crate::error::{ExtractError, Result};
use crate::types::Shop;

use super::fields::{cleanup_text, is_city, is_page_footer, split_address_offers, split_phone};
use super::markers::{CATEGORIES, HEADER_ROW, HEADER_ROW_KEYWORDS};
use super::{DocumentToRecords, Extraction};

/// Table columns, left to right
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Index,
    Category,
    Name,
    Phone,
    City,
    District,
    Address,
    Offer,
}

impl Column {
    const ALL: [Column; COLUMN_COUNT] = [
        Column::Index,
        Column::Category,
        Column::Name,
        Column::Phone,
        Column::City,
        Column::District,
        Column::Address,
        Column::Offer,
    ];

    /// Columns a continuation row may add to
    const CONTINUED: [Column; 5] = [
        Column::Phone,
        Column::City,
        Column::District,
        Column::Address,
        Column::Offer,
    ];
}

type Cells = [Vec<String>; COLUMN_COUNT];

#[derive(Debug, Clone)]
pub struct GeometricStrategy {
    row_tolerance: f64,
    column_bounds: [f64; COLUMN_COUNT],
    body_top: f64,
    body_bottom: f64,
    expected_total: Option<usize>,
}

impl GeometricStrategy {
    pub fn from_config(config: &ExtractConfig) -> Self {
        Self {
            row_tolerance: config.row_tolerance,
            column_bounds: config.column_bounds,
            body_top: config.body_top,
            body_bottom: config.body_bottom,
            expected_total: config.expected_total,
        }
    }

    /// First column whose right edge exceeds `x`
    pub fn column_for(&self, x: f64) -> Column {
        let idx = self
            .column_bounds
            .iter()
            .position(|&edge| edge > x)
            .unwrap_or(COLUMN_COUNT - 1);
        Column::ALL[idx]
    }

    fn is_body_row(&self, row: &[&TextFragment]) -> bool {
        let y = row[0].y;
        if y > self.body_top || y < self.body_bottom {
            return false;
        }

        // second line of the two-line column header, e.g. `號 類 惠`
        if row.iter().all(|f| HEADER_ROW.contains(&f.text.trim())) {
            return false;
        }

        let text: String = row
            .iter()
            .flat_map(|f| f.text.chars())
            .filter(|c| !c.is_whitespace())
            .collect();
        !(HEADER_ROW_KEYWORDS.iter().any(|k| text.contains(k)) || is_page_footer(&text))
    }

    fn cells(&self, row: &[&TextFragment]) -> Cells {
        let mut cells: Cells = std::array::from_fn(|_| Vec::new());
        for fragment in row {
            let col = self.column_for(fragment.x) as usize;
            cells[col].push(fragment.text.trim().to_string());
        }
        cells
    }
}

impl DocumentToRecords for GeometricStrategy {
    fn name(&self) -> &'static str {
        "geometric"
    }

    fn to_records(&self, fragments: &[TextFragment]) -> Result<Extraction> {
        let mut extraction = Extraction::default();
        let mut open: Option<Cells> = None;
        let mut next_id: u32 = 1;

        for page in split_pages(fragments) {
            for row in cluster_into_rows(page, self.row_tolerance) {
                if !self.is_body_row(&row) {
                    continue;
                }

                let cells = self.cells(&row);
                let starts_record = !cells[Column::Category as usize].is_empty()
                    && !cells[Column::Name as usize].is_empty();

                if starts_record {
                    if let Some(done) = open.take() {
                        finish(&mut extraction, next_id, done);
                        next_id += 1;
                    }
                    open = Some(cells);
                } else if let Some(current) = open.as_mut() {
                    append_continuation(current, cells);
                } else {
                    log::debug!("row before first record ignored at y={:.1}", row[0].y);
                }
            }
        }

        let located = match open.take() {
            Some(done) => {
                finish(&mut extraction, next_id, done);
                next_id as usize
            }
            None => 0,
        };

        if let Some(total) = self.expected_total {
            if located < total {
                return Err(ExtractError::RecordBoundaryNotFound {
                    expected_id: located as u32 + 1,
                    recovered: located,
                    expected_total: Some(total),
                });
            }
        }

        Ok(extraction)
    }
}

/// Fragments grouped by page, pages in first-seen order
fn split_pages(fragments: &[TextFragment]) -> Vec<Vec<&TextFragment>> {
    let mut pages: Vec<(usize, Vec<&TextFragment>)> = Vec::new();
    for fragment in fragments {
        match pages.iter_mut().find(|(page, _)| *page == fragment.page) {
            Some((_, list)) => list.push(fragment),
            None => pages.push((fragment.page, vec![fragment])),
        }
    }
    pages.into_iter().map(|(_, list)| list).collect()
}

/// Group fragments into rows by y, top of page first, each row sorted by x
fn cluster_into_rows(mut fragments: Vec<&TextFragment>, tolerance: f64) -> Vec<Vec<&TextFragment>> {
    fragments.sort_by(|a, b| {
        b.y.partial_cmp(&a.y)
            .unwrap_or(Ordering::Equal)
            .then(a.x.partial_cmp(&b.x).unwrap_or(Ordering::Equal))
    });

    let mut rows: Vec<Vec<&TextFragment>> = Vec::new();
    let mut current_row: Vec<&TextFragment> = Vec::new();
    let mut current_y: Option<f64> = None;

    for fragment in fragments {
        match current_y {
            Some(y) if (fragment.y - y).abs() <= tolerance => current_row.push(fragment),
            _ => {
                if !current_row.is_empty() {
                    rows.push(current_row);
                }
                current_y = Some(fragment.y);
                current_row = vec![fragment];
            }
        }
    }

    if !current_row.is_empty() {
        rows.push(current_row);
    }

    for row in &mut rows {
        row.sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap_or(Ordering::Equal));
    }
    rows
}

fn append_continuation(open: &mut Cells, cells: Cells) {
    for col in Column::CONTINUED {
        let target = &mut open[col as usize];
        for text in &cells[col as usize] {
            if !target.contains(text) {
                target.push(text.clone());
            }
        }
    }
}

fn finish(extraction: &mut Extraction, id: u32, cells: Cells) {
    match build_shop(id, &cells) {
        Ok(shop) => extraction.shops.push(shop),
        Err(reason) => extraction.drop_record(id, reason),
    }
}

fn build_shop(id: u32, cells: &Cells) -> std::result::Result<Shop, ExtractError> {
    let cell = |col: Column| cells[col as usize].concat();

    let index = cell(Column::Index);
    if let Ok(printed) = index.trim().parse::<u32>() {
        if printed != id {
            log::warn!("row numbered {} reconstructed as record {}", printed, id);
        }
    }

    let city = cell(Column::City).trim().to_string();
    if !is_city(&city) {
        return Err(ExtractError::FieldPatternMismatch { id, field: "city" });
    }

    let (category_main, category_sub) = split_category(&cells[Column::Category as usize]);
    let (name, phone) = split_phone(&format!("{}{}", cell(Column::Name), cell(Column::Phone)));
    let (address, spill) = split_address_offers(&cell(Column::Address));
    let offers = cleanup_text(&format!("{}{}", spill, cell(Column::Offer)));

    Ok(Shop {
        id,
        category_main,
        category_sub,
        name,
        phone,
        city,
        district: cell(Column::District).trim().to_string(),
        address,
        offers,
    })
}

/// Split the category cell into main and sub label
fn split_category(parts: &[String]) -> (String, String) {
    let words: Vec<&str> = parts.iter().flat_map(|p| p.split_whitespace()).collect();

    match words.as_slice() {
        [] => (String::new(), String::new()),
        [single] => {
            // "生活餐飲" drawn as one run
            match CATEGORIES.iter().find(|c| single.starts_with(*c) && single.len() > c.len()) {
                Some(main) => (main.to_string(), single[main.len()..].to_string()),
                None => (single.to_string(), String::new()),
            }
        }
        [main, rest @ ..] => (main.to_string(), rest.concat()),
    }
}
