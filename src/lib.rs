pub mod config;
pub mod content;
pub mod decode;
pub mod document;
pub mod error;
pub mod extract;
pub mod font;
pub mod output;
pub mod types;

#[cfg(all(feature = "wasm", target_arch = "wasm32"))]
mod wasm;

pub use config::{ExtractConfig, Strategy};
pub use content::TextFragment;
pub use document::Document;
pub use error::{ExtractError, Result};
pub use extract::{Discrepancy, DocumentToRecords, Extraction, cross_check};
pub use font::CMap;
pub use output::write_json;
pub use types::Shop;

/// Extract the shop records of a PDF held in memory
pub fn extract_shops(data: &[u8], config: &ExtractConfig) -> Result<Extraction> {
    Document::new(data)?.extract(config)
}
