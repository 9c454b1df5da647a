use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Invalid PDF: missing %PDF header")]
    MissingHeader,

    #[error("Stream at byte {offset} could not be decompressed: {message}")]
    StreamDecompressionFailure { offset: usize, message: String },

    #[error("Malformed CMap line skipped: {0}")]
    CMapParseWarning(String),

    #[error("Undecodable string operand ({0} bytes)")]
    UndecodableString(usize),

    #[error(
        "Record boundary for id {expected_id} not found: recovered {recovered} record(s){}",
        expected_total.map(|n| format!(" of {}", n)).unwrap_or_default()
    )]
    RecordBoundaryNotFound {
        expected_id: u32,
        recovered: usize,
        expected_total: Option<usize>,
    },

    #[error("Record {id}: no {field} field found")]
    FieldPatternMismatch { id: u32, field: &'static str },

    #[error("Document has no text content streams")]
    NoContent,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ExtractError>;
