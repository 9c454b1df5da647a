use crate::content::string::PdfString;
use crate::font::CMap;

/// Decoded text drawn by one text-showing operator
#[derive(Debug, Clone, PartialEq)]
pub struct TextFragment {
    pub text: String,
    pub x: f64,
    pub y: f64,
    pub font_size: f64,
    pub font_name: Option<String>,
    /// Index of the content stream the fragment came from
    pub page: usize,
}

/// Text state that operators mutate in stream order
#[derive(Debug, Clone)]
struct GraphicsState {
    // Text matrix components [a, b, c, d, e, f]
    text_matrix: [f64; 6],
    // Line matrix - reset at start of each line
    line_matrix: [f64; 6],
    font_size: f64,
    font_name: Option<String>,
    leading: f64,
}

impl Default for GraphicsState {
    fn default() -> Self {
        Self {
            text_matrix: IDENTITY,
            line_matrix: IDENTITY,
            font_size: 12.0,
            font_name: None,
            leading: 0.0,
        }
    }
}

const IDENTITY: [f64; 6] = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

impl GraphicsState {
    fn x(&self) -> f64 {
        self.text_matrix[4]
    }

    fn y(&self) -> f64 {
        self.text_matrix[5]
    }

    fn next_line(&mut self) {
        self.line_matrix[5] -= self.leading;
        self.text_matrix = self.line_matrix;
    }

    fn translate_line(&mut self, tx: f64, ty: f64) {
        self.line_matrix[4] += tx;
        self.line_matrix[5] += ty;
        self.text_matrix = self.line_matrix;
    }
}

/// Content stream tokenizer.
///
/// Walks the stream once, applying font and positioning operators to the
/// current state and emitting a [`TextFragment`] for every `Tj`, `TJ`, `'`
/// and `"`. String operands are decoded through the document CMap.
pub struct ContentParser<'a> {
    data: &'a [u8],
    pos: usize,
    cmap: &'a CMap,
    page: usize,
    state: GraphicsState,
    state_stack: Vec<GraphicsState>,
    fragments: Vec<TextFragment>,
}

impl<'a> ContentParser<'a> {
    pub fn new(data: &'a [u8], cmap: &'a CMap) -> Self {
        Self {
            data,
            pos: 0,
            cmap,
            page: 0,
            state: GraphicsState::default(),
            state_stack: Vec::new(),
            fragments: Vec::new(),
        }
    }

    /// Tag emitted fragments with a page index
    pub fn with_page(mut self, page: usize) -> Self {
        self.page = page;
        self
    }

    /// Parse the content stream into fragments, in drawing order
    pub fn parse(mut self) -> Vec<TextFragment> {
        let mut operands: Vec<Operand> = Vec::new();

        loop {
            self.skip_whitespace();
            let Some(&b) = self.data.get(self.pos) else {
                break;
            };

            if b.is_ascii_alphabetic() || b == b'\'' || b == b'"' {
                let operator = self.read_operator();
                if operator == "ID" {
                    self.skip_inline_image();
                } else {
                    self.execute_operator(&operator, &operands);
                }
                operands.clear();
                continue;
            }

            if let Some(operand) = self.parse_operand() {
                operands.push(operand);
            }
        }

        self.fragments
    }

    fn skip_whitespace(&mut self) {
        while self.pos < self.data.len() {
            match self.data[self.pos] {
                b' ' | b'\t' | b'\n' | b'\r' | 0x0C | 0x00 => self.pos += 1,
                b'%' => {
                    while self.pos < self.data.len() && self.data[self.pos] != b'\n' {
                        self.pos += 1;
                    }
                }
                _ => break,
            }
        }
    }

    fn read_operator(&mut self) -> String {
        let start = self.pos;
        while self.pos < self.data.len() {
            let b = self.data[self.pos];
            if b.is_ascii_alphabetic() || b == b'*' || b == b'\'' || b == b'"' {
                self.pos += 1;
            } else {
                break;
            }
        }
        String::from_utf8_lossy(&self.data[start..self.pos]).to_string()
    }

    /// Parse one operand; `None` means the byte was consumed as noise
    fn parse_operand(&mut self) -> Option<Operand> {
        self.skip_whitespace();
        let b = *self.data.get(self.pos)?;

        match b {
            b'+' | b'-' | b'.' | b'0'..=b'9' => Some(Operand::Number(self.read_number()?)),
            b'(' => Some(Operand::String(PdfString::Literal(self.read_literal()))),
            b'<' => {
                self.pos += 1;
                if self.data.get(self.pos) == Some(&b'<') {
                    self.skip_dict();
                    None
                } else {
                    Some(Operand::String(PdfString::Hex(self.read_hex_string())))
                }
            }
            b'/' => Some(Operand::Name(self.read_name())),
            b'[' => Some(Operand::Array(self.read_array())),
            _ => {
                self.pos += 1;
                None
            }
        }
    }

    fn read_number(&mut self) -> Option<f64> {
        let start = self.pos;

        if matches!(self.data.get(self.pos), Some(b'+' | b'-')) {
            self.pos += 1;
        }
        while let Some(b'0'..=b'9' | b'.') = self.data.get(self.pos) {
            self.pos += 1;
        }

        let num_str = std::str::from_utf8(&self.data[start..self.pos]).ok()?;
        num_str.parse().ok()
    }

    /// Literal body up to the matching `)`, escapes left unresolved.
    ///
    /// Unescaped parentheses nest, so `(a(b)c)` yields `a(b)c`.
    fn read_literal(&mut self) -> Vec<u8> {
        self.pos += 1; // Skip '('
        let mut result = Vec::new();
        let mut depth = 1;

        while let Some(&b) = self.data.get(self.pos) {
            self.pos += 1;
            match b {
                b'\\' => {
                    result.push(b);
                    if let Some(&next) = self.data.get(self.pos) {
                        result.push(next);
                        self.pos += 1;
                    }
                }
                b'(' => {
                    depth += 1;
                    result.push(b);
                }
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                    result.push(b);
                }
                _ => result.push(b),
            }
        }

        result
    }

    fn read_hex_string(&mut self) -> Vec<u8> {
        let mut hex_chars = Vec::new();

        while let Some(&b) = self.data.get(self.pos) {
            self.pos += 1;
            match b {
                b'>' => break,
                b'0'..=b'9' | b'a'..=b'f' | b'A'..=b'F' => hex_chars.push(b),
                _ => continue,
            }
        }

        hex_chars
    }

    fn read_name(&mut self) -> String {
        self.pos += 1; // Skip '/'
        let start = self.pos;

        while let Some(&b) = self.data.get(self.pos) {
            if b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b'+' | b'.' | b'#') {
                self.pos += 1;
            } else {
                break;
            }
        }

        String::from_utf8_lossy(&self.data[start..self.pos]).to_string()
    }

    fn read_array(&mut self) -> Vec<Operand> {
        self.pos += 1; // Skip '['
        let mut items = Vec::new();

        loop {
            self.skip_whitespace();
            match self.data.get(self.pos) {
                None => break,
                Some(b']') => {
                    self.pos += 1;
                    break;
                }
                Some(_) => {
                    if let Some(operand) = self.parse_operand() {
                        items.push(operand);
                    }
                }
            }
        }

        items
    }

    fn skip_dict(&mut self) {
        self.pos += 1; // Skip second '<'
        let mut depth = 1;

        while self.pos < self.data.len() && depth > 0 {
            match &self.data[self.pos..] {
                [b'<', b'<', ..] => {
                    depth += 1;
                    self.pos += 2;
                }
                [b'>', b'>', ..] => {
                    depth -= 1;
                    self.pos += 2;
                }
                _ => self.pos += 1,
            }
        }
    }

    /// Skip binary image data between `ID` and a whitespace-delimited `EI`
    fn skip_inline_image(&mut self) {
        while self.pos + 2 <= self.data.len() {
            let at_ei = &self.data[self.pos..self.pos + 2] == b"EI"
                && self.data[self.pos - 1].is_ascii_whitespace()
                && self
                    .data
                    .get(self.pos + 2)
                    .is_none_or(|b| b.is_ascii_whitespace());
            self.pos += 1;
            if at_ei {
                self.pos += 1;
                return;
            }
        }
        self.pos = self.data.len();
    }

    fn execute_operator(&mut self, op: &str, operands: &[Operand]) {
        match op {
            "q" => self.state_stack.push(self.state.clone()),
            "Q" => {
                if let Some(state) = self.state_stack.pop() {
                    self.state = state;
                }
            }

            "BT" => {
                self.state.text_matrix = IDENTITY;
                self.state.line_matrix = IDENTITY;
            }

            // /FontName size Tf
            "Tf" => {
                if let [.., Operand::Name(name), Operand::Number(size)] = operands {
                    self.state.font_name = Some(name.clone());
                    self.state.font_size = *size;
                }
            }

            "TL" => {
                if let Some(Operand::Number(leading)) = operands.last() {
                    self.state.leading = *leading;
                }
            }

            // tx ty Td
            "Td" => {
                if let [.., Operand::Number(tx), Operand::Number(ty)] = operands {
                    self.state.translate_line(*tx, *ty);
                }
            }

            // tx ty TD
            "TD" => {
                if let [.., Operand::Number(tx), Operand::Number(ty)] = operands {
                    self.state.leading = -ty;
                    self.state.translate_line(*tx, *ty);
                }
            }

            // a b c d e f Tm
            "Tm" => {
                let nums: Vec<f64> = operands.iter().filter_map(Operand::as_number).collect();
                if let [.., a, b, c, d, e, f] = *nums.as_slice() {
                    self.state.text_matrix = [a, b, c, d, e, f];
                    self.state.line_matrix = self.state.text_matrix;
                }
            }

            "T*" => self.state.next_line(),

            "Tj" => {
                if let Some(Operand::String(s)) = operands.last() {
                    let text = s.decode(self.cmap);
                    self.emit(text, s.bytes().len());
                }
            }

            // [(string) num (string) ...] TJ
            "TJ" => {
                if let Some(Operand::Array(items)) = operands.last() {
                    let (x, y) = (self.state.x(), self.state.y());
                    let mut text = String::new();
                    let mut advance = 0.0;

                    for item in items {
                        match item {
                            Operand::String(s) => {
                                text.push_str(&s.decode(self.cmap));
                                advance += self.glyph_advance(s.bytes().len());
                            }
                            Operand::Number(n) => {
                                advance -= n / 1000.0 * self.state.font_size;
                            }
                            _ => {}
                        }
                    }

                    self.push_fragment(text, x, y);
                    self.state.text_matrix[4] += advance;
                }
            }

            "'" => {
                self.state.next_line();
                if let Some(Operand::String(s)) = operands.last() {
                    let text = s.decode(self.cmap);
                    self.emit(text, s.bytes().len());
                }
            }

            // aw ac (string) "
            "\"" => {
                self.state.next_line();
                if let Some(Operand::String(s)) = operands.last() {
                    let text = s.decode(self.cmap);
                    self.emit(text, s.bytes().len());
                }
            }

            _ => {}
        }
    }

    fn emit(&mut self, text: String, byte_len: usize) {
        let (x, y) = (self.state.x(), self.state.y());
        self.push_fragment(text, x, y);
        self.state.text_matrix[4] += self.glyph_advance(byte_len);
    }

    fn push_fragment(&mut self, text: String, x: f64, y: f64) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        self.fragments.push(TextFragment {
            text: text.to_string(),
            x,
            y,
            font_size: self.state.font_size,
            font_name: self.state.font_name.clone(),
            page: self.page,
        });
    }

    /// Approximate advance; glyph widths are not read from the font
    fn glyph_advance(&self, byte_len: usize) -> f64 {
        byte_len as f64 * self.state.font_size * 0.5
    }
}

/// Operand types in content stream
#[derive(Debug, Clone)]
enum Operand {
    Number(f64),
    String(PdfString),
    Name(String),
    Array(Vec<Operand>),
}

impl Operand {
    fn as_number(&self) -> Option<f64> {
        match self {
            Operand::Number(n) => Some(*n),
            _ => None,
        }
    }
}
