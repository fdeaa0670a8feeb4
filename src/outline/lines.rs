use crate::layout::{LayoutDocument, LayoutPage, RawLine};

#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    pub text: String,
    pub page_number: u32,
    pub y_position: f32,
    pub font_size: f32,
    pub is_bold: bool,
}

#[derive(Debug, Clone)]
pub struct PageLines {
    pub page_number: u32,
    pub page_height: f32,
    pub lines: Vec<TextLine>,
}

pub fn normalize_document(document: &LayoutDocument) -> Vec<PageLines> {
    let mut pages = document
        .pages
        .iter()
        .map(normalize_page)
        .collect::<Vec<PageLines>>();
    pages.sort_by_key(|page| page.page_number);
    pages
}

pub fn normalize_page(page: &LayoutPage) -> PageLines {
    let mut lines = page
        .lines
        .iter()
        .filter_map(|raw| normalize_line(raw, page.number))
        .collect::<Vec<TextLine>>();
    lines.sort_by(|a, b| a.y_position.total_cmp(&b.y_position));

    PageLines {
        page_number: page.number,
        page_height: page.height,
        lines,
    }
}

pub fn normalize_line(raw: &RawLine, page_number: u32) -> Option<TextLine> {
    let text = raw
        .spans
        .iter()
        .map(|span| span.text.trim())
        .filter(|text| !text.is_empty())
        .collect::<Vec<&str>>()
        .join(" ");
    if text.is_empty() {
        return None;
    }

    let font_size = raw
        .spans
        .iter()
        .map(|span| span.font_size)
        .fold(0.0_f32, f32::max);
    if font_size <= 0.0 {
        return None;
    }

    Some(TextLine {
        text,
        page_number,
        y_position: raw.top,
        font_size,
        is_bold: raw.spans.iter().any(|span| span.is_bold),
    })
}
