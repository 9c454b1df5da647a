use flate2::read::ZlibDecoder;
use std::io::Read;

use crate::error::{ExtractError, Result};

/// Decompress zlib/deflate data
///
/// `offset` is the position of the payload in the document and is only used
/// for error reporting.
pub fn flate_decode(data: &[u8], offset: usize) -> Result<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(data);
    let mut result = Vec::new();

    decoder
        .read_to_end(&mut result)
        .map_err(|e| ExtractError::StreamDecompressionFailure {
            offset,
            message: format!("FlateDecode failed: {}", e),
        })?;

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::ZlibEncoder;
    use std::io::Write;

    #[test]
    fn test_flate_decode() {
        let original = "BT /F1 12 Tf (桃園市) Tj ET".as_bytes();
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(original).unwrap();
        let compressed = encoder.finish().unwrap();

        let decoded = flate_decode(&compressed, 0).unwrap();

        assert_eq!(decoded, original);
    }

    #[test]
    fn test_flate_decode_rejects_raw_bytes() {
        let err = flate_decode(b"not deflate at all", 42).unwrap_err();
        match err {
            ExtractError::StreamDecompressionFailure { offset, .. } => assert_eq!(offset, 42),
            other => panic!("unexpected error: {other}"),
        }
    }
}
