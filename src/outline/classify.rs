use anyhow::{Context, Result};
use regex::Regex;

use super::config::HeuristicsConfig;
use crate::model::HeadingLevel;

const STOP_WORDS: [&str; 5] = ["page", "of", "and", "the", "for"];

pub const SECTION_KEYWORDS: &str = r"(?i)\b(?:introduction|overview|conclusions?|summary|references|appendix|acknowledge?ments?|table\s+of\s+contents|revision\s+history|abstract|executive\s+summary|(?:chapter|section|part)\s+\d+|background|methodology|results|discussion|future\s+work)\b";

#[derive(Debug, Clone, Copy)]
pub struct LineFeatures<'a> {
    pub text: &'a str,
    pub font_size: f32,
    pub is_bold: bool,
    pub page_number: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Heading(HeadingLevel),
    NotHeading,
}

#[derive(Clone, Copy)]
pub struct ClassificationRule {
    pub name: &'static str,
    evaluate: fn(&HeadingClassifier, &LineFeatures<'_>) -> Option<Verdict>,
}

const RULES: [ClassificationRule; 4] = [
    ClassificationRule {
        name: "trivial_text",
        evaluate: trivial_text_rule,
    },
    ClassificationRule {
        name: "numbering",
        evaluate: numbering_rule,
    },
    ClassificationRule {
        name: "keyword",
        evaluate: keyword_rule,
    },
    ClassificationRule {
        name: "font_threshold",
        evaluate: font_threshold_rule,
    },
];

pub struct HeadingClassifier {
    config: HeuristicsConfig,
    numbering: [(Regex, HeadingLevel); 3],
    keywords: Regex,
}

impl HeadingClassifier {
    pub fn new(config: &HeuristicsConfig) -> Result<Self> {
        Ok(Self {
            config: config.clone(),
            numbering: [
                (
                    Regex::new(r"^\d+\.\d+\.\d+\.?\s+\S")
                        .context("failed to compile three-level numbering regex")?,
                    HeadingLevel::H3,
                ),
                (
                    Regex::new(r"^\d+\.\d+\.?\s+\S")
                        .context("failed to compile two-level numbering regex")?,
                    HeadingLevel::H2,
                ),
                (
                    Regex::new(r"^\d+\.\s+\S")
                        .context("failed to compile one-level numbering regex")?,
                    HeadingLevel::H1,
                ),
            ],
            keywords: Regex::new(SECTION_KEYWORDS)
                .context("failed to compile section keyword regex")?,
        })
    }

    pub fn rules(&self) -> &'static [ClassificationRule] {
        &RULES
    }

    pub fn classify(
        &self,
        text: &str,
        font_size: f32,
        is_bold: bool,
        page_number: u32,
    ) -> Option<HeadingLevel> {
        self.classify_with_rule(&LineFeatures {
            text: text.trim(),
            font_size,
            is_bold,
            page_number,
        })
        .0
    }

    pub fn classify_with_rule(&self, features: &LineFeatures<'_>) -> (Option<HeadingLevel>, &'static str) {
        for rule in self.rules() {
            match (rule.evaluate)(self, features) {
                Some(Verdict::Heading(level)) => return (Some(level), rule.name),
                Some(Verdict::NotHeading) => return (None, rule.name),
                None => {}
            }
        }
        (None, "unmatched")
    }

    pub fn numbering_level(&self, text: &str) -> Option<HeadingLevel> {
        self.numbering
            .iter()
            .find(|(pattern, _)| pattern.is_match(text))
            .map(|(_, level)| *level)
    }

    pub fn has_section_keyword(&self, text: &str) -> bool {
        self.keywords.is_match(text)
    }
}

fn trivial_text_rule(classifier: &HeadingClassifier, features: &LineFeatures<'_>) -> Option<Verdict> {
    let text = features.text.trim();
    let too_short = text.chars().count() < classifier.config.min_text_len;
    let stop_word = STOP_WORDS
        .iter()
        .any(|word| text.eq_ignore_ascii_case(word));
    (too_short || stop_word).then_some(Verdict::NotHeading)
}

fn numbering_rule(classifier: &HeadingClassifier, features: &LineFeatures<'_>) -> Option<Verdict> {
    classifier
        .numbering_level(features.text)
        .map(Verdict::Heading)
}

fn keyword_rule(classifier: &HeadingClassifier, features: &LineFeatures<'_>) -> Option<Verdict> {
    if !classifier.has_section_keyword(features.text) {
        return None;
    }

    if features.font_size >= classifier.config.keyword_h1_font_size || features.is_bold {
        Some(Verdict::Heading(HeadingLevel::H1))
    } else {
        Some(Verdict::Heading(HeadingLevel::H2))
    }
}

fn font_threshold_rule(classifier: &HeadingClassifier, features: &LineFeatures<'_>) -> Option<Verdict> {
    let config = &classifier.config;
    let size = features.font_size;
    let bold = features.is_bold;

    let level = if size >= config.h1_font_size || size >= config.h1_secondary_font_size {
        Some(HeadingLevel::H1)
    } else if size >= config.bold_h1_font_size && bold {
        if features.page_number <= config.early_page_limit {
            Some(HeadingLevel::H1)
        } else {
            Some(HeadingLevel::H2)
        }
    } else if size >= config.h2_font_size {
        if bold {
            Some(HeadingLevel::H2)
        } else {
            Some(HeadingLevel::H3)
        }
    } else if size >= config.bold_h3_font_size && bold {
        Some(HeadingLevel::H3)
    } else {
        None
    };

    Some(level.map_or(Verdict::NotHeading, Verdict::Heading))
}
