use std::collections::HashMap;

use super::lines::TextLine;
use super::position_index::quantize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RowKey {
    pub page_number: u32,
    pub y_bucket: i64,
    pub size_key: i64,
    pub is_bold: bool,
}

impl RowKey {
    pub fn for_line(line: &TextLine, row_tolerance: f32) -> Self {
        Self {
            page_number: line.page_number,
            y_bucket: quantize(line.y_position, row_tolerance),
            size_key: (line.font_size * 100.0).round() as i64,
            is_bold: line.is_bold,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MergedLine {
    pub text: String,
    pub page_number: u32,
    pub y_position: f32,
    pub font_size: f32,
    pub is_bold: bool,
    pub fragment_count: usize,
}

pub fn merge_pair(accumulator: &str, fragment: &str, min_overlap: usize) -> Option<String> {
    if fragment.is_empty() {
        return Some(accumulator.to_string());
    }
    if accumulator.is_empty() {
        return Some(fragment.to_string());
    }
    if accumulator.contains(fragment) {
        return Some(accumulator.to_string());
    }
    if fragment.contains(accumulator) {
        return Some(fragment.to_string());
    }

    if let Some(split) = seam_overlap(accumulator, fragment, min_overlap) {
        return Some(format!("{accumulator}{}", &fragment[split..]));
    }
    if let Some(split) = seam_overlap(fragment, accumulator, min_overlap) {
        return Some(format!("{fragment}{}", &accumulator[split..]));
    }

    None
}

/// Longest overlap where `left` ends with a prefix of `right`; yields the byte
/// offset in `right` just past that prefix.
fn seam_overlap(left: &str, right: &str, min_overlap: usize) -> Option<usize> {
    let longest = left.chars().count().min(right.chars().count());
    (min_overlap.max(1)..=longest).rev().find_map(|length| {
        let prefix = char_prefix(right, length);
        left.ends_with(prefix).then_some(prefix.len())
    })
}

fn char_prefix(text: &str, length: usize) -> &str {
    match text.char_indices().nth(length) {
        Some((offset, _)) => &text[..offset],
        None => text,
    }
}

pub fn merge_fragments(fragments: &[&str], min_overlap: usize) -> Vec<String> {
    let mut merged = Vec::new();
    let mut accumulator: Option<String> = None;

    for fragment in fragments {
        let fragment = fragment.trim();
        if fragment.is_empty() {
            continue;
        }

        accumulator = Some(match accumulator.take() {
            None => fragment.to_string(),
            Some(current) => match merge_pair(&current, fragment, min_overlap) {
                Some(joined) => joined,
                None => {
                    merged.push(current);
                    fragment.to_string()
                }
            },
        });
    }

    if let Some(current) = accumulator {
        merged.push(current);
    }
    merged
}

pub fn merge_rows<'a, I>(lines: I, row_tolerance: f32, min_overlap: usize) -> Vec<MergedLine>
where
    I: IntoIterator<Item = &'a TextLine>,
{
    let mut order = Vec::<(RowKey, Vec<&TextLine>)>::new();
    let mut positions = HashMap::<RowKey, usize>::new();

    for line in lines {
        let key = RowKey::for_line(line, row_tolerance);
        match positions.get(&key) {
            Some(&position) => order[position].1.push(line),
            None => {
                positions.insert(key, order.len());
                order.push((key, vec![line]));
            }
        }
    }

    let mut rows = Vec::new();
    for (_, group) in order {
        let first = group[0];
        let texts = group
            .iter()
            .map(|line| line.text.as_str())
            .collect::<Vec<&str>>();
        let merged = merge_fragments(&texts, min_overlap);
        let fragment_count = if merged.len() == 1 { group.len() } else { 1 };

        for text in merged {
            rows.push(MergedLine {
                text,
                page_number: first.page_number,
                y_position: first.y_position,
                font_size: first.font_size,
                is_bold: first.is_bold,
                fragment_count,
            });
        }
    }
    rows
}
