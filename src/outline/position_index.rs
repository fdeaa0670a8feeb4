use std::collections::BTreeMap;

use super::lines::PageLines;

#[derive(Debug, Clone, PartialEq)]
pub struct PositionEntry {
    pub text: String,
    pub page_number: u32,
    pub y_position: f32,
}

#[derive(Debug, Clone)]
pub struct PositionIndex {
    tolerance: f32,
    buckets: BTreeMap<i64, Vec<PositionEntry>>,
}

pub fn quantize(y_position: f32, tolerance: f32) -> i64 {
    (y_position / tolerance).round() as i64
}

impl PositionIndex {
    pub fn build(pages: &[PageLines], tolerance: f32) -> Self {
        let mut buckets = BTreeMap::<i64, Vec<PositionEntry>>::new();
        for page in pages {
            for line in &page.lines {
                buckets
                    .entry(quantize(line.y_position, tolerance))
                    .or_default()
                    .push(PositionEntry {
                        text: line.text.clone(),
                        page_number: line.page_number,
                        y_position: line.y_position,
                    });
            }
        }

        Self { tolerance, buckets }
    }

    pub fn nearby(&self, y_position: f32, radius: f32) -> impl Iterator<Item = &PositionEntry> + '_ {
        let center = quantize(y_position, self.tolerance);
        let span = (radius / self.tolerance).ceil().max(0.0) as i64;
        self.buckets
            .range(center - span..=center + span)
            .flat_map(|(_, entries)| entries.iter())
            .filter(move |entry| (entry.y_position - y_position).abs() < radius)
    }

    pub fn entry_count(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }
}
