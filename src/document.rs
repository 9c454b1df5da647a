use crate::config::ExtractConfig;
use crate::content::{ContentParser, TextFragment};
use crate::decode::{LocatedStream, StreamLocator, tounicode_refs};
use crate::error::{ExtractError, Result};
use crate::extract::{Extraction, reconstructor};
use crate::font::CMap;

/// PDF document opened for text extraction.
///
/// Streams are located once, up front, by keyword scan.
pub struct Document<'a> {
    data: &'a [u8],
    streams: Vec<LocatedStream>,
}

impl<'a> Document<'a> {
    /// Open a PDF from bytes
    pub fn new(data: &'a [u8]) -> Result<Self> {
        if !data.starts_with(b"%PDF-") {
            return Err(ExtractError::MissingHeader);
        }

        let streams: Vec<LocatedStream> = StreamLocator::new(data).collect();
        log::debug!("located {} streams", streams.len());

        Ok(Document { data, streams })
    }

    /// Every located stream, in document order
    pub fn streams(&self) -> &[LocatedStream] {
        &self.streams
    }

    /// Number of streams whose payload could not be decompressed
    pub fn skipped_streams(&self) -> usize {
        self.streams.iter().filter(|s| s.payload.is_err()).count()
    }

    /// Stream owned by indirect object `num`
    pub fn object_stream(&self, num: u32) -> Option<&LocatedStream> {
        self.streams.iter().find(|s| s.object == Some(num))
    }

    /// Merged code-to-text map of the document's fonts.
    ///
    /// Streams named by `/ToUnicode` references are used when any of them
    /// resolves to a readable stream; otherwise every stream holding a CMap
    /// program. Later definitions of a code replace earlier ones.
    pub fn cmap(&self) -> CMap {
        let refs = tounicode_refs(self.data);

        let mut sources: Vec<&[u8]> = refs
            .iter()
            .filter_map(|&num| self.object_stream(num))
            .filter_map(LocatedStream::data)
            .collect();

        if sources.is_empty() {
            if !refs.is_empty() {
                log::warn!("no /ToUnicode reference resolved, using every CMap stream");
            }
            sources = self
                .streams
                .iter()
                .filter(|s| s.is_cmap())
                .filter_map(LocatedStream::data)
                .collect();
        }

        let mut cmap = CMap::new();
        for data in sources {
            cmap.merge(CMap::parse(data));
        }

        log::debug!("merged CMap holds {} codes", cmap.len());
        cmap
    }

    /// Positioned text of every content stream, one page per stream
    pub fn fragments(&self, cmap: &CMap) -> Result<Vec<TextFragment>> {
        let contents: Vec<&[u8]> = self
            .streams
            .iter()
            .filter(|s| s.is_text_content())
            .filter_map(|s| s.data())
            .collect();

        if contents.is_empty() {
            return Err(ExtractError::NoContent);
        }

        let mut fragments = Vec::new();
        for (page, data) in contents.into_iter().enumerate() {
            let page_fragments = ContentParser::new(data, cmap).with_page(page).parse();
            log::trace!("page {}: {} fragments", page, page_fragments.len());
            fragments.extend(page_fragments);
        }

        Ok(fragments)
    }

    /// Run the whole pipeline with the strategy chosen in `config`
    pub fn extract(&self, config: &ExtractConfig) -> Result<Extraction> {
        let cmap = self.cmap();
        let fragments = self.fragments(&cmap)?;

        let strategy = reconstructor(config.strategy, config);
        let mut extraction = strategy.to_records(&fragments)?;
        extraction.skipped_streams = self.skipped_streams();

        for shop in &extraction.shops {
            log::debug!("{}", shop);
        }

        log::info!(
            "{}: {} records, {} dropped, {} streams skipped",
            strategy.name(),
            extraction.shops.len(),
            extraction.dropped.len(),
            extraction.skipped_streams
        );
        Ok(extraction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Strategy;
    use flate2::Compression;
    use flate2::write::ZlibEncoder;
    use std::io::Write;

    fn deflate(data: &[u8]) -> Vec<u8> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    fn stream_object(num: u32, payload: &[u8]) -> Vec<u8> {
        let compressed = deflate(payload);
        let mut out = format!("{} 0 obj\n<< /Length {} /Filter /FlateDecode >>\nstream\n", num, compressed.len())
            .into_bytes();
        out.extend(compressed);
        out.extend_from_slice(b"\nendstream\nendobj\n");
        out
    }

    fn cmap_program(pairs: &[(u16, &str)]) -> Vec<u8> {
        let mut out = format!("begincmap\n{} beginbfchar\n", pairs.len());
        for (code, text) in pairs {
            let hex: String = text.encode_utf16().map(|u| format!("{:04X}", u)).collect();
            out.push_str(&format!("<{:04X}> <{}>\n", code, hex));
        }
        out.push_str("endbfchar\nendcmap\n");
        out.into_bytes()
    }

    #[test]
    fn test_missing_header() {
        assert!(matches!(Document::new(b"hello"), Err(ExtractError::MissingHeader)));
    }

    #[test]
    fn test_no_content_streams() {
        let mut pdf = b"%PDF-1.7\n".to_vec();
        pdf.extend(stream_object(1, &cmap_program(&[(1, "A")])));

        let doc = Document::new(&pdf).unwrap();
        let cmap = doc.cmap();
        assert!(matches!(doc.fragments(&cmap), Err(ExtractError::NoContent)));
    }

    #[test]
    fn test_tounicode_streams_preferred() {
        let mut pdf = b"%PDF-1.7\n1 0 obj\n<< /Type /Font /ToUnicode 3 0 R >>\nendobj\n".to_vec();
        pdf.extend(stream_object(2, &cmap_program(&[(1, "X")])));
        pdf.extend(stream_object(3, &cmap_program(&[(1, "A")])));

        let doc = Document::new(&pdf).unwrap();

        assert_eq!(doc.cmap().get(1), Some("A"));
        assert!(doc.object_stream(2).is_some());
        assert!(doc.object_stream(9).is_none());
    }

    #[test]
    fn test_unresolved_references_fall_back_to_cmap_streams() {
        // object 7 is missing and object 3 does not decompress
        let mut pdf = b"%PDF-1.7\n1 0 obj\n<< /ToUnicode 7 0 R /ToUnicode 3 0 R >>\nendobj\n".to_vec();
        pdf.extend(stream_object(2, &cmap_program(&[(1, "A")])));
        pdf.extend_from_slice(b"3 0 obj\n<< >>\nstream\nnot deflate\nendstream\nendobj\n");

        let cmap = Document::new(&pdf).unwrap().cmap();

        assert_eq!(cmap.len(), 1);
        assert_eq!(cmap.get(1), Some("A"));
    }

    #[test]
    fn test_later_cmap_wins_without_references() {
        let mut pdf = b"%PDF-1.7\n".to_vec();
        pdf.extend(stream_object(2, &cmap_program(&[(1, "X"), (2, "Y")])));
        pdf.extend(stream_object(3, &cmap_program(&[(1, "A")])));

        let cmap = Document::new(&pdf).unwrap().cmap();

        assert_eq!(cmap.get(1), Some("A"));
        assert_eq!(cmap.get(2), Some("Y"));
    }

    #[test]
    fn test_pages_follow_content_stream_order() {
        let mut pdf = b"%PDF-1.7\n".to_vec();
        pdf.extend(stream_object(1, &cmap_program(&[(0x0101, "甲"), (0x0102, "乙")])));
        pdf.extend(stream_object(2, b"BT /F1 9 Tf 40 700 Td <0101> Tj ET"));
        pdf.extend(stream_object(3, b"BT /F1 9 Tf 40 700 Td <0102> Tj ET"));
        pdf.extend_from_slice(b"4 0 obj\n<< >>\nstream\nnot deflate\nendstream\nendobj\n");

        let doc = Document::new(&pdf).unwrap();
        let fragments = doc.fragments(&doc.cmap()).unwrap();

        assert_eq!(doc.skipped_streams(), 1);
        assert_eq!(fragments.len(), 2);
        assert_eq!((fragments[0].text.as_str(), fragments[0].page), ("甲", 0));
        assert_eq!((fragments[1].text.as_str(), fragments[1].page), ("乙", 1));
    }

    #[test]
    fn test_extract_reports_skipped_streams() {
        let mut pdf = b"%PDF-1.7\n".to_vec();
        pdf.extend(stream_object(1, b"BT (1) Tj (x) Tj ET"));
        pdf.extend_from_slice(b"2 0 obj\n<< >>\nstream\ngarbage\nendstream\nendobj\n");

        let doc = Document::new(&pdf).unwrap();
        let config = ExtractConfig::new().with_strategy(Strategy::Sequential);
        let extraction = doc.extract(&config).unwrap();

        assert!(extraction.shops.is_empty());
        assert_eq!(extraction.skipped_streams, 1);
    }
}
