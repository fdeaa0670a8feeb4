use std::collections::BTreeSet;

use anyhow::{Context, Result};
use regex::Regex;

use super::classify::SECTION_KEYWORDS;
use super::config::HeuristicsConfig;
use super::lines::TextLine;
use super::position_index::PositionIndex;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum LineDisposition {
    Content,
    Trivial,
    PatternBoilerplate,
}

pub struct BoilerplateFilter {
    patterns: Vec<Regex>,
    short_phrase: Regex,
    section_keywords: Regex,
    min_text_len: usize,
    top_margin_fraction: f32,
    bottom_margin_fraction: f32,
    neighbor_tolerance: f32,
    min_repeat_pages: usize,
    similarity_threshold: f64,
}

impl BoilerplateFilter {
    pub fn new(config: &HeuristicsConfig) -> Result<Self> {
        let sources = [
            r"(?i)^page\s+\d+(\s+of\s+\d+)?$".to_string(),
            r"^\d+$".to_string(),
            r"(?i)^chapter\s+\d+$".to_string(),
            r"^\s*\d{1,2}[/-]\d{1,2}[/-]\d{2,4}\s*$".to_string(),
            r"^\s*\d{4}-\d{1,2}-\d{1,2}\s*$".to_string(),
            r"(?i)^\s*(jan|feb|mar|apr|may|jun|jul|aug|sep|sept|oct|nov|dec)[a-z]*\.?\s+\d{1,2},?\s+\d{4}\s*$"
                .to_string(),
            r"(?i)^\s*\d{1,2}\s+(jan|feb|mar|apr|may|jun|jul|aug|sep|sept|oct|nov|dec)[a-z]*\.?,?\s+\d{4}\s*$"
                .to_string(),
            r"^\s*[ivx]+\s*$".to_string(),
            r"^[A-Za-z0-9\s\-_]{1,20}\s+\|\s+\d+$".to_string(),
        ];

        let patterns = sources
            .iter()
            .map(|source| {
                Regex::new(source)
                    .with_context(|| format!("failed to compile boilerplate regex {source}"))
            })
            .collect::<Result<Vec<Regex>>>()?;

        let short_phrase = format!(r"^[A-Za-z0-9\s]{{1,{}}}$", config.short_phrase_max_len.max(1));
        Ok(Self {
            patterns,
            short_phrase: Regex::new(&short_phrase)
                .with_context(|| format!("failed to compile boilerplate regex {short_phrase}"))?,
            section_keywords: Regex::new(SECTION_KEYWORDS)
                .context("failed to compile section keyword regex")?,
            min_text_len: config.min_text_len,
            top_margin_fraction: config.top_margin_fraction,
            bottom_margin_fraction: config.bottom_margin_fraction,
            neighbor_tolerance: config.neighbor_tolerance,
            min_repeat_pages: config.min_repeat_pages,
            similarity_threshold: config.similarity_threshold,
        })
    }

    pub fn screen_text(&self, text: &str) -> LineDisposition {
        let text = text.trim();
        if is_trivial_text(text, self.min_text_len) {
            LineDisposition::Trivial
        } else if self.matches_pattern(text) {
            LineDisposition::PatternBoilerplate
        } else {
            LineDisposition::Content
        }
    }

    #[cfg(test)]
    pub fn is_boilerplate(&self, line: &TextLine, page_height: f32, index: &PositionIndex) -> bool {
        self.matches_pattern(&line.text) || self.is_repeated(line, page_height, index)
    }

    pub fn matches_pattern(&self, text: &str) -> bool {
        let text = text.trim();
        self.patterns.iter().any(|pattern| pattern.is_match(text))
            || (self.short_phrase.is_match(text) && !self.section_keywords.is_match(text))
    }

    pub fn in_margin_band(&self, y_position: f32, page_height: f32) -> bool {
        y_position < page_height * self.top_margin_fraction
            || y_position > page_height * (1.0 - self.bottom_margin_fraction)
    }

    pub fn is_repeated(&self, line: &TextLine, page_height: f32, index: &PositionIndex) -> bool {
        if !self.in_margin_band(line.y_position, page_height) {
            return false;
        }

        let text = line.text.trim();
        let other_pages = index
            .nearby(line.y_position, self.neighbor_tolerance)
            .filter(|entry| entry.page_number != line.page_number)
            .filter(|entry| texts_similar(&entry.text, text, self.similarity_threshold))
            .map(|entry| entry.page_number)
            .collect::<BTreeSet<u32>>();

        other_pages.len() >= self.min_repeat_pages
    }
}

pub fn is_trivial_text(text: &str, min_len: usize) -> bool {
    let text = text.trim();
    text.is_empty()
        || text.chars().count() < min_len
        || text.chars().all(|character| character.is_ascii_digit())
}

pub fn text_similarity(left: &str, right: &str) -> f64 {
    strsim::normalized_levenshtein(&left.to_lowercase(), &right.to_lowercase())
}

pub fn texts_similar(left: &str, right: &str, threshold: f64) -> bool {
    let left = left.trim();
    let right = right.trim();
    if left.chars().count() > 3
        && right.chars().count() > 3
        && (left.contains(right) || right.contains(left))
    {
        return true;
    }
    text_similarity(left, right) > threshold
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FIXTURE_PAGE_HEIGHT, page, text_line};

    fn filter() -> BoilerplateFilter {
        BoilerplateFilter::new(&HeuristicsConfig::default()).unwrap()
    }

    #[test]
    fn pattern_rules_cover_footer_idioms() {
        let filter = filter();
        for text in [
            "Page 3",
            "Page 3 of 12",
            "page 10 OF 40",
            "42",
            "Chapter 7",
            "12/05/2024",
            "3-14-99",
            "2024-06-30",
            "March 3, 2024",
            "14 Feb 2023",
            "Draft v2",
            "xiv",
            "Annual Report | 12",
        ] {
            assert!(filter.matches_pattern(text), "expected boilerplate: {text}");
        }
    }

    #[test]
    fn pattern_rules_leave_real_headings_alone() {
        let filter = filter();
        for text in [
            "1. Introduction",
            "Introduction to Systems",
            "2.3 Results and Discussion",
            "Chapter 3: Methods",
            "Revision History",
        ] {
            assert!(!filter.matches_pattern(text), "unexpected boilerplate: {text}");
        }
    }

    #[test]
    fn short_section_keywords_survive_the_short_phrase_rule() {
        let filter = filter();
        for text in ["Conclusion", "References", "Background", "Summary", "Section 2"] {
            assert!(!filter.matches_pattern(text), "unexpected boilerplate: {text}");
        }
        assert!(filter.matches_pattern("Draft v2"));
        assert!(filter.matches_pattern("Chapter 7"));
    }

    #[test]
    fn screening_reports_why_text_is_dropped() {
        let filter = filter();
        assert_eq!(filter.screen_text(" 7 "), LineDisposition::Trivial);
        assert_eq!(filter.screen_text("Page 4 of 9"), LineDisposition::PatternBoilerplate);
        assert_eq!(filter.screen_text("Introd"), LineDisposition::PatternBoilerplate);
        assert_eq!(
            filter.screen_text("Introduction to Systems"),
            LineDisposition::Content
        );
    }

    #[test]
    fn trivial_text_guard() {
        assert!(is_trivial_text("", 3));
        assert!(is_trivial_text("  ab ", 3));
        assert!(is_trivial_text("2024", 3));
        assert!(!is_trivial_text("abc", 3));
        assert!(!is_trivial_text("1.2 Scope", 3));
    }

    #[test]
    fn similarity_accepts_containment_and_close_matches() {
        assert!(texts_similar("Acme Annual Report", "Acme Annual Report - Draft", 0.85));
        assert!(texts_similar("Quarterly Review 2024", "Quarterly Reveiw 2024", 0.85));
        assert!(!texts_similar("Methods and Materials", "Results and Discussion", 0.85));
        assert!((text_similarity("ABC", "abc") - 1.0).abs() < f64::EPSILON);
    }

    fn header_pages(text: &str, page_count: u32, y_position: f32) -> Vec<crate::outline::PageLines> {
        (1..=page_count)
            .map(|number| {
                page(
                    number,
                    vec![
                        text_line(text, number, y_position, 9.0, false),
                        text_line("Body paragraph text", number, 300.0, 11.0, false),
                    ],
                )
            })
            .collect()
    }

    #[test]
    fn repeated_margin_text_is_boilerplate() {
        let filter = filter();
        let pages = header_pages("Acme Corp - Confidential Draft", 3, 30.0);
        let index = PositionIndex::build(&pages, 10.0);

        let line = &pages[1].lines[0];
        assert!(filter.is_repeated(line, FIXTURE_PAGE_HEIGHT, &index));
        assert!(filter.is_boilerplate(line, FIXTURE_PAGE_HEIGHT, &index));
        assert_eq!(filter.screen_text(&line.text), LineDisposition::Content);

        let body = &pages[1].lines[1];
        assert!(!filter.is_boilerplate(body, FIXTURE_PAGE_HEIGHT, &index));
    }

    #[test]
    fn two_page_repetition_is_not_enough() {
        let filter = filter();
        let pages = header_pages("Acme Corp - Confidential Draft", 2, 30.0);
        let index = PositionIndex::build(&pages, 10.0);

        assert!(!filter.is_repeated(&pages[0].lines[0], FIXTURE_PAGE_HEIGHT, &index));
    }

    #[test]
    fn same_page_occurrences_do_not_count() {
        let filter = filter();
        let text = "Acme Corp - Confidential Draft";
        let pages = vec![page(
            1,
            vec![
                text_line(text, 1, 30.0, 9.0, false),
                text_line(text, 1, 32.0, 9.0, false),
                text_line(text, 1, 35.0, 9.0, false),
            ],
        )];
        let index = PositionIndex::build(&pages, 10.0);

        assert!(!filter.is_repeated(&pages[0].lines[0], FIXTURE_PAGE_HEIGHT, &index));
    }

    #[test]
    fn repetition_outside_margin_bands_is_content() {
        let filter = filter();
        let pages = header_pages("Section overview repeated mid page", 4, 300.0);
        let index = PositionIndex::build(&pages, 10.0);

        assert!(!filter.in_margin_band(300.0, FIXTURE_PAGE_HEIGHT));
        assert!(!filter.is_boilerplate(&pages[2].lines[0], FIXTURE_PAGE_HEIGHT, &index));
    }

    #[test]
    fn bottom_band_repetition_is_detected() {
        let filter = filter();
        let pages = header_pages("Prepared for the Review Board - 2024", 3, 760.0);
        let index = PositionIndex::build(&pages, 10.0);

        assert!(filter.in_margin_band(760.0, FIXTURE_PAGE_HEIGHT));
        assert!(filter.is_boilerplate(&pages[0].lines[0], FIXTURE_PAGE_HEIGHT, &index));
    }
}
