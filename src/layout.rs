use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use tracing::debug;

pub const DEFAULT_PAGE_HEIGHT: f32 = 842.0;

const BASELINE_TOLERANCE: f32 = 1.0;
const ASCENT_RATIO: f32 = 0.8;
const TJ_SPACE_THRESHOLD: f32 = 200.0;
const MAX_PARENT_DEPTH: usize = 32;
const MAX_FORM_DEPTH: usize = 8;
const IDENTITY: [f32; 6] = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

#[derive(Debug, Clone, PartialEq)]
pub struct RawSpan {
    pub text: String,
    pub font_size: f32,
    pub is_bold: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawLine {
    pub spans: Vec<RawSpan>,
    pub top: f32,
}

#[derive(Debug, Clone)]
pub struct LayoutPage {
    pub number: u32,
    pub height: f32,
    pub lines: Vec<RawLine>,
}

#[derive(Debug, Clone, Default)]
pub struct LayoutDocument {
    pub pages: Vec<LayoutPage>,
}

pub fn load_document(path: &Path) -> Result<LayoutDocument> {
    let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    LayoutDocument::from_bytes(&bytes)
        .with_context(|| format!("failed to extract layout from {}", path.display()))
}

impl LayoutDocument {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let document = Document::load_mem(bytes).context("failed to parse PDF bytes")?;
        Self::from_pdf(&document)
    }

    fn from_pdf(document: &Document) -> Result<Self> {
        let mut pages = Vec::new();
        for (number, page_id) in document.get_pages() {
            pages.push(extract_page(document, number, page_id)?);
        }

        Ok(Self { pages })
    }
}

fn extract_page(document: &Document, number: u32, page_id: ObjectId) -> Result<LayoutPage> {
    let height = page_height(document, page_id);
    let fonts = document.get_page_fonts(page_id).unwrap_or_default();
    let xobjects = inherited(document, page_id, b"Resources")
        .and_then(|resources| resources.as_dict().ok())
        .and_then(|resources| resource_dict(document, resources, b"XObject"));

    let raw_content = document
        .get_page_content(page_id)
        .with_context(|| format!("failed to read content stream of page {number}"))?;
    let content = Content::decode(&raw_content)
        .with_context(|| format!("failed to decode content stream of page {number}"))?;

    let mut walker = TextWalker::new(document, fonts, xobjects, height);
    walker.run(&content);
    let lines = walker.finish();

    debug!(page = number, height, lines = lines.len(), "extracted page layout");

    Ok(LayoutPage {
        number,
        height,
        lines,
    })
}

fn inherited<'d>(document: &'d Document, page_id: ObjectId, key: &[u8]) -> Option<&'d Object> {
    let mut current = document.get_dictionary(page_id).ok();
    let mut depth = 0usize;

    while let Some(dictionary) = current {
        if let Ok(value) = dictionary.get_deref(key, document) {
            return Some(value);
        }

        depth += 1;
        if depth > MAX_PARENT_DEPTH {
            break;
        }
        current = dictionary.get_deref(b"Parent", document).and_then(Object::as_dict).ok();
    }

    None
}

fn page_height(document: &Document, page_id: ObjectId) -> f32 {
    inherited(document, page_id, b"MediaBox")
        .and_then(media_box_height)
        .unwrap_or(DEFAULT_PAGE_HEIGHT)
}

fn media_box_height(media_box: &Object) -> Option<f32> {
    let values = media_box.as_array().ok()?;
    if values.len() < 4 {
        return None;
    }

    let bottom = number(&values[1])?;
    let top = number(&values[3])?;
    let height = (top - bottom).abs();
    (height > 0.0).then_some(height)
}

fn resource_dict<'d>(
    document: &'d Document,
    resources: &'d Dictionary,
    key: &[u8],
) -> Option<&'d Dictionary> {
    resources
        .get_deref(key, document)
        .and_then(Object::as_dict)
        .ok()
}

fn font_map<'d>(document: &'d Document, fonts: &'d Dictionary) -> BTreeMap<Vec<u8>, &'d Dictionary> {
    fonts
        .iter()
        .filter_map(|(name, value)| {
            document
                .dereference(value)
                .and_then(|(_, object)| object.as_dict())
                .ok()
                .map(|font| (name.clone(), font))
        })
        .collect()
}

fn stream_content(stream: &Stream) -> Vec<u8> {
    stream
        .decompressed_content()
        .unwrap_or_else(|_| stream.content.clone())
}

fn multiply(left: [f32; 6], right: [f32; 6]) -> [f32; 6] {
    [
        left[0] * right[0] + left[1] * right[2],
        left[0] * right[1] + left[1] * right[3],
        left[2] * right[0] + left[3] * right[2],
        left[2] * right[1] + left[3] * right[3],
        left[4] * right[0] + left[5] * right[2] + right[4],
        left[4] * right[1] + left[5] * right[3] + right[5],
    ]
}

fn matrix_operands(operands: &[Object]) -> Option<[f32; 6]> {
    if operands.len() < 6 {
        return None;
    }
    let mut matrix = IDENTITY;
    for (slot, operand) in matrix.iter_mut().zip(operands) {
        *slot = number(operand)?;
    }
    Some(matrix)
}

#[derive(Debug, Clone)]
struct TextState {
    matrix: [f32; 6],
    line_matrix: [f32; 6],
    leading: f32,
    font_size: f32,
    font_key: Vec<u8>,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            matrix: IDENTITY,
            line_matrix: IDENTITY,
            leading: 0.0,
            font_size: 12.0,
            font_key: Vec::new(),
        }
    }
}

impl TextState {
    fn translate(&mut self, tx: f32, ty: f32) {
        self.line_matrix = multiply([1.0, 0.0, 0.0, 1.0, tx, ty], self.line_matrix);
        self.matrix = self.line_matrix;
    }

    fn next_line(&mut self) {
        self.translate(0.0, -self.leading);
    }
}

#[derive(Debug, Clone)]
struct GraphicsState {
    ctm: [f32; 6],
    leading: f32,
    font_size: f32,
    font_key: Vec<u8>,
}

struct PendingLine {
    baseline: f32,
    top: f32,
    spans: Vec<RawSpan>,
}

struct TextWalker<'a> {
    document: &'a Document,
    fonts: BTreeMap<Vec<u8>, &'a Dictionary>,
    xobjects: Option<&'a Dictionary>,
    page_height: f32,
    ctm: [f32; 6],
    saved: Vec<GraphicsState>,
    form_depth: usize,
    state: TextState,
    in_text: bool,
    pending: Option<PendingLine>,
    lines: Vec<RawLine>,
}

impl<'a> TextWalker<'a> {
    fn new(
        document: &'a Document,
        fonts: BTreeMap<Vec<u8>, &'a Dictionary>,
        xobjects: Option<&'a Dictionary>,
        page_height: f32,
    ) -> Self {
        Self {
            document,
            fonts,
            xobjects,
            page_height,
            ctm: IDENTITY,
            saved: Vec::new(),
            form_depth: 0,
            state: TextState::default(),
            in_text: false,
            pending: None,
            lines: Vec::new(),
        }
    }

    fn run(&mut self, content: &Content) {
        for operation in &content.operations {
            self.apply(&operation.operator, &operation.operands);
        }
    }

    fn apply(&mut self, operator: &str, operands: &[Object]) {
        match operator {
            "q" => self.saved.push(GraphicsState {
                ctm: self.ctm,
                leading: self.state.leading,
                font_size: self.state.font_size,
                font_key: self.state.font_key.clone(),
            }),
            "Q" => {
                if let Some(saved) = self.saved.pop() {
                    self.ctm = saved.ctm;
                    self.state.leading = saved.leading;
                    self.state.font_size = saved.font_size;
                    self.state.font_key = saved.font_key;
                }
            }
            "cm" => {
                if let Some(matrix) = matrix_operands(operands) {
                    self.ctm = multiply(matrix, self.ctm);
                }
            }
            "Do" => {
                if let Some(Object::Name(name)) = operands.first() {
                    self.draw_form(name);
                }
            }
            "BT" => {
                self.in_text = true;
                self.state.matrix = IDENTITY;
                self.state.line_matrix = IDENTITY;
            }
            "ET" => {
                self.in_text = false;
                self.flush();
            }
            "Tf" => {
                if let (Some(Object::Name(font_key)), Some(size)) =
                    (operands.first(), operands.get(1).and_then(number))
                {
                    self.state.font_key = font_key.clone();
                    self.state.font_size = size;
                }
            }
            "TL" => {
                if let Some(leading) = operands.first().and_then(number) {
                    self.state.leading = leading;
                }
            }
            "Td" | "TD" => {
                let tx = operands.first().and_then(number).unwrap_or(0.0);
                let ty = operands.get(1).and_then(number).unwrap_or(0.0);
                if operator == "TD" {
                    self.state.leading = -ty;
                }
                self.state.translate(tx, ty);
            }
            "Tm" => {
                if let Some(matrix) = matrix_operands(operands) {
                    self.state.matrix = matrix;
                    self.state.line_matrix = matrix;
                }
            }
            "T*" => self.state.next_line(),
            "Tj" => {
                if let Some(Object::String(bytes, _)) = operands.first() {
                    let text = self.decode(bytes);
                    self.push_text(text);
                }
            }
            "TJ" => {
                if let Some(Object::Array(items)) = operands.first() {
                    let text = self.decode_array(items);
                    self.push_text(text);
                }
            }
            "'" | "\"" => {
                self.state.next_line();
                let index = if operator == "\"" { 2 } else { 0 };
                if let Some(Object::String(bytes, _)) = operands.get(index) {
                    let text = self.decode(bytes);
                    self.push_text(text);
                }
            }
            _ => {}
        }
    }

    fn draw_form(&mut self, name: &[u8]) {
        if self.form_depth >= MAX_FORM_DEPTH {
            return;
        }
        let Some(stream) = self
            .xobjects
            .and_then(|xobjects| xobjects.get_deref(name, self.document).ok())
            .and_then(|object| object.as_stream().ok())
        else {
            return;
        };
        if stream.dict.get(b"Subtype").and_then(Object::as_name).ok() != Some(b"Form".as_slice()) {
            return;
        }

        let content = match Content::decode(&stream_content(stream)) {
            Ok(content) => content,
            Err(error) => {
                debug!(form = %String::from_utf8_lossy(name), error = %error, "skipping undecodable form");
                return;
            }
        };

        let resources = stream
            .dict
            .get_deref(b"Resources", self.document)
            .and_then(Object::as_dict)
            .ok();
        let fonts = resources
            .and_then(|resources| resource_dict(self.document, resources, b"Font"))
            .map(|fonts| font_map(self.document, fonts))
            .unwrap_or_else(|| self.fonts.clone());
        let xobjects = resources
            .and_then(|resources| resource_dict(self.document, resources, b"XObject"))
            .or(self.xobjects);
        let form_matrix = stream
            .dict
            .get_deref(b"Matrix", self.document)
            .and_then(Object::as_array)
            .ok()
            .and_then(|values| matrix_operands(values))
            .unwrap_or(IDENTITY);

        self.flush();
        let mut form = TextWalker::new(self.document, fonts, xobjects, self.page_height);
        form.ctm = multiply(form_matrix, self.ctm);
        form.form_depth = self.form_depth + 1;
        form.run(&content);
        self.lines.extend(form.finish());
    }

    fn finish(mut self) -> Vec<RawLine> {
        self.flush();
        self.lines
    }

    fn flush(&mut self) {
        if let Some(pending) = self.pending.take() {
            if !pending.spans.is_empty() {
                self.lines.push(RawLine {
                    spans: pending.spans,
                    top: pending.top,
                });
            }
        }
    }

    fn push_text(&mut self, text: String) {
        if !self.in_text || text.trim().is_empty() {
            return;
        }

        let rendering = multiply(self.state.matrix, self.ctm);
        let scale = (rendering[1].powi(2) + rendering[3].powi(2)).sqrt();
        let scale = if scale > 0.0 { scale } else { 1.0 };
        let font_size = (self.state.font_size * scale).abs();
        let baseline = rendering[5];
        let top = (self.page_height - (baseline + ASCENT_RATIO * font_size)).max(0.0);
        let span = RawSpan {
            text,
            font_size,
            is_bold: font_is_bold(&self.current_font_name()),
        };

        let extends_pending = self
            .pending
            .as_ref()
            .is_some_and(|pending| (pending.baseline - baseline).abs() < BASELINE_TOLERANCE);
        if !extends_pending {
            self.flush();
            self.pending = Some(PendingLine {
                baseline,
                top,
                spans: Vec::new(),
            });
        }

        if let Some(pending) = self.pending.as_mut() {
            pending.top = pending.top.min(top);
            pending.spans.push(span);
        }
    }

    fn current_font_name(&self) -> String {
        self.fonts
            .get(&self.state.font_key)
            .and_then(|font| font.get(b"BaseFont").ok())
            .and_then(|name| name.as_name().ok())
            .map(|name| String::from_utf8_lossy(name).to_string())
            .unwrap_or_else(|| String::from_utf8_lossy(&self.state.font_key).to_string())
    }

    fn decode(&self, bytes: &[u8]) -> String {
        if let Some(font) = self.fonts.get(&self.state.font_key) {
            if let Ok(encoding) = font.get_font_encoding(self.document) {
                if let Ok(text) = Document::decode_text(&encoding, bytes) {
                    return text;
                }
            }
        }

        decode_text_fallback(bytes)
    }

    fn decode_array(&self, items: &[Object]) -> String {
        let mut combined = String::new();
        for item in items {
            match item {
                Object::String(bytes, _) => combined.push_str(&self.decode(bytes)),
                other => {
                    let Some(adjustment) = number(other) else {
                        continue;
                    };
                    if -adjustment > TJ_SPACE_THRESHOLD
                        && !combined.is_empty()
                        && !combined.ends_with(char::is_whitespace)
                    {
                        combined.push(' ');
                    }
                }
            }
        }
        combined
    }
}

fn number(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(value) => Some(*value as f32),
        Object::Real(value) => Some(*value),
        _ => None,
    }
}

fn font_is_bold(font_name: &str) -> bool {
    let lower = font_name.to_ascii_lowercase();
    lower.contains("bold") || lower.contains("black") || lower.contains("heavy")
}

fn decode_text_fallback(bytes: &[u8]) -> String {
    if let Some(utf16) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units = utf16
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect::<Vec<u16>>();
        return String::from_utf16_lossy(&units);
    }

    if let Ok(text) = std::str::from_utf8(bytes) {
        return text.to_string();
    }

    bytes.iter().map(|&byte| byte as char).collect()
}
