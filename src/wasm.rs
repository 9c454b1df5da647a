use wasm_bindgen::prelude::*;

use crate::config::{ExtractConfig, Strategy};
use crate::extract_shops;
use crate::output::to_json;

/// Initialize panic hook for better error messages in browser console
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

/// Extract shop records from PDF bytes and return them as a JSON array
#[wasm_bindgen]
pub fn pdf_to_shops_json(data: &[u8]) -> Result<String, JsValue> {
    shops_json(data, ExtractConfig::new())
}

/// Same as `pdf_to_shops_json`, reconstructing rows by position
#[wasm_bindgen]
pub fn pdf_to_shops_json_geometric(data: &[u8]) -> Result<String, JsValue> {
    shops_json(data, ExtractConfig::new().with_strategy(Strategy::Geometric))
}

fn shops_json(data: &[u8], config: ExtractConfig) -> Result<String, JsValue> {
    let extraction = extract_shops(data, &config)
        .map_err(|e| JsValue::from_str(&format!("Extraction error: {}", e)))?;

    to_json(&extraction.shops).map_err(|e| JsValue::from_str(&format!("JSON error: {}", e)))
}
