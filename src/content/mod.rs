mod parser;
pub mod string;

pub use parser::{ContentParser, TextFragment};
pub use string::{PdfString, decode_text};
