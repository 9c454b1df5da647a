//! Extraction settings.

/// Number of table columns: index, category, name, phone, city, district,
/// address, offer
pub const COLUMN_COUNT: usize = 8;

/// Right edges of the table columns on the partner-shop list, in PDF units
pub const DEFAULT_COLUMN_BOUNDS: [f64; COLUMN_COUNT] =
    [62.0, 128.0, 262.0, 340.0, 392.0, 446.0, 640.0, f64::INFINITY];

/// How decoded fragments are turned into records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strategy {
    /// Token stream segmented on `id, category, sub-label` boundaries
    #[default]
    Sequential,
    /// Rows clustered by position and split on fixed column bounds
    Geometric,
}

impl Strategy {
    /// The other strategy, used as a cross-check oracle
    pub fn other(self) -> Self {
        match self {
            Strategy::Sequential => Strategy::Geometric,
            Strategy::Geometric => Strategy::Sequential,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExtractConfig {
    pub strategy: Strategy,

    /// Max vertical distance between fragments of one row
    pub row_tolerance: f64,

    /// Right edge of each column; a fragment belongs to the first column
    /// whose edge exceeds its x
    pub column_bounds: [f64; COLUMN_COUNT],

    /// Rows above this y are page header
    pub body_top: f64,

    /// Rows below this y are page footer
    pub body_bottom: f64,

    /// Number of records the document is known to hold
    pub expected_total: Option<usize>,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtractConfig {
    pub fn new() -> Self {
        Self {
            strategy: Strategy::default(),
            row_tolerance: 2.0,
            column_bounds: DEFAULT_COLUMN_BOUNDS,
            body_top: 800.0,
            body_bottom: 40.0,
            expected_total: None,
        }
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_row_tolerance(mut self, tolerance: f64) -> Self {
        self.row_tolerance = tolerance;
        self
    }

    pub fn with_column_bounds(mut self, bounds: [f64; COLUMN_COUNT]) -> Self {
        self.column_bounds = bounds;
        self
    }

    pub fn with_body_region(mut self, top: f64, bottom: f64) -> Self {
        self.body_top = top;
        self.body_bottom = bottom;
        self
    }

    pub fn with_expected_total(mut self, total: Option<usize>) -> Self {
        self.expected_total = total;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let config = ExtractConfig::new()
            .with_strategy(Strategy::Geometric)
            .with_row_tolerance(3.5)
            .with_body_region(500.0, 20.0)
            .with_expected_total(Some(12));

        assert_eq!(config.strategy, Strategy::Geometric);
        assert_eq!(config.row_tolerance, 3.5);
        assert_eq!((config.body_top, config.body_bottom), (500.0, 20.0));
        assert_eq!(config.expected_total, Some(12));
        assert_eq!(config.strategy.other(), Strategy::Sequential);
    }
}
