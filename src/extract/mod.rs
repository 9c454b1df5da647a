//! Shop records from decoded text fragments.

pub mod fields;
mod geometric;
pub mod markers;
mod sequential;

use std::fmt;

use crate::config::{ExtractConfig, Strategy};
use crate::content::TextFragment;
use crate::error::{ExtractError, Result};
use crate::types::Shop;

pub use geometric::{Column, GeometricStrategy};
pub use sequential::{SequentialStrategy, locate_entries, normalize_tokens};

/// Turns the fragments of a whole document into shop records
pub trait DocumentToRecords {
    fn name(&self) -> &'static str;

    fn to_records(&self, fragments: &[TextFragment]) -> Result<Extraction>;
}

/// Strategy implementation for `strategy`, configured from `config`
pub fn reconstructor(strategy: Strategy, config: &ExtractConfig) -> Box<dyn DocumentToRecords> {
    match strategy {
        Strategy::Sequential => Box::new(SequentialStrategy::new(config.expected_total)),
        Strategy::Geometric => Box::new(GeometricStrategy::from_config(config)),
    }
}

/// A record that was located but could not be parsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedRecord {
    pub id: u32,
    pub reason: String,
}

/// Result of one extraction run
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    /// Parsed records, ordered by id
    pub shops: Vec<Shop>,
    pub dropped: Vec<DroppedRecord>,
    /// Streams whose payload could not be decompressed
    pub skipped_streams: usize,
}

impl Extraction {
    pub(crate) fn drop_record(&mut self, id: u32, reason: ExtractError) {
        log::warn!("dropping record {}: {}", id, reason);
        self.dropped.push(DroppedRecord {
            id,
            reason: reason.to_string(),
        });
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscrepancyKind {
    MissingInOracle,
    MissingInPrimary,
    Field {
        field: &'static str,
        primary: String,
        oracle: String,
    },
}

/// One disagreement between two extractions of the same document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discrepancy {
    pub id: u32,
    pub kind: DiscrepancyKind,
}

impl fmt::Display for Discrepancy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            DiscrepancyKind::MissingInOracle => write!(f, "record {}: only in primary", self.id),
            DiscrepancyKind::MissingInPrimary => write!(f, "record {}: only in oracle", self.id),
            DiscrepancyKind::Field {
                field,
                primary,
                oracle,
            } => write!(
                f,
                "record {} {}: primary {:?}, oracle {:?}",
                self.id, field, primary, oracle
            ),
        }
    }
}

/// Compare two record lists by id, field by field.
///
/// Neither side is corrected; the result only lists where they differ.
pub fn cross_check(primary: &[Shop], oracle: &[Shop]) -> Vec<Discrepancy> {
    let mut found = Vec::new();

    for shop in primary {
        match oracle.iter().find(|o| o.id == shop.id) {
            None => found.push(Discrepancy {
                id: shop.id,
                kind: DiscrepancyKind::MissingInOracle,
            }),
            Some(other) => {
                for ((field, mine), (_, theirs)) in shop.fields().into_iter().zip(other.fields()) {
                    if mine != theirs {
                        found.push(Discrepancy {
                            id: shop.id,
                            kind: DiscrepancyKind::Field {
                                field,
                                primary: mine.to_string(),
                                oracle: theirs.to_string(),
                            },
                        });
                    }
                }
            }
        }
    }

    for shop in oracle {
        if !primary.iter().any(|p| p.id == shop.id) {
            found.push(Discrepancy {
                id: shop.id,
                kind: DiscrepancyKind::MissingInPrimary,
            });
        }
    }

    found.sort_by_key(|d| d.id);
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shop(id: u32, name: &str) -> Shop {
        Shop {
            id,
            category_main: "生活".into(),
            category_sub: "餐飲".into(),
            name: name.into(),
            city: "桃園市".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_identical_lists_agree() {
        let shops = vec![shop(1, "A店"), shop(2, "B店")];
        assert!(cross_check(&shops, &shops).is_empty());
    }

    #[test]
    fn test_cross_check_reports_each_difference() {
        let primary = vec![shop(1, "A店"), shop(2, "B店")];
        let oracle = vec![shop(1, "A 店"), shop(3, "C店")];

        let found = cross_check(&primary, &oracle);

        assert_eq!(found.len(), 3);
        assert_eq!(
            found[0].kind,
            DiscrepancyKind::Field {
                field: "name",
                primary: "A店".into(),
                oracle: "A 店".into(),
            }
        );
        assert_eq!(found[1].kind, DiscrepancyKind::MissingInOracle);
        assert_eq!(found[2].id, 3);
        assert_eq!(found[2].kind, DiscrepancyKind::MissingInPrimary);
        assert_eq!(found[0].to_string(), "record 1 name: primary \"A店\", oracle \"A 店\"");
    }

    #[test]
    fn test_reconstructor_by_strategy() {
        let config = ExtractConfig::new();
        assert_eq!(reconstructor(Strategy::Sequential, &config).name(), "sequential");
        assert_eq!(reconstructor(Strategy::Geometric, &config).name(), "geometric");
    }

    #[test]
    fn test_drop_record_keeps_reason() {
        let mut extraction = Extraction::default();
        extraction.drop_record(4, ExtractError::FieldPatternMismatch { id: 4, field: "city" });
        assert_eq!(extraction.dropped[0].id, 4);
        assert!(extraction.dropped[0].reason.contains("city"));
    }
}
