use anyhow::{Context, Result};
use regex::Regex;

use super::config::HeuristicsConfig;
use super::lines::TextLine;

pub struct TitleSelector {
    numbering: Regex,
    rejected_prefix: Regex,
    min_words: usize,
    min_font_size: f32,
    fallback_min_len: usize,
}

impl TitleSelector {
    pub fn new(config: &HeuristicsConfig) -> Result<Self> {
        Ok(Self {
            numbering: Regex::new(r"^\d+(\.\d+)*\.?\s")
                .context("failed to compile title numbering regex")?,
            rejected_prefix: Regex::new(r"(?i)^(?:page|chapter|section)\b")
                .context("failed to compile title prefix regex")?,
            min_words: config.title_min_words,
            min_font_size: config.title_min_font_size,
            fallback_min_len: config.title_fallback_min_len,
        })
    }

    pub fn is_eligible(&self, line: &TextLine) -> bool {
        let text = line.text.trim();
        if text.split_whitespace().count() < self.min_words {
            return false;
        }
        if text.ends_with(':')
            || self.numbering.is_match(text)
            || self.rejected_prefix.is_match(text)
        {
            return false;
        }

        line.font_size >= self.min_font_size || line.is_bold
    }

    pub fn select(&self, first_page: &[TextLine]) -> String {
        let mut eligible = first_page
            .iter()
            .filter(|line| self.is_eligible(line))
            .collect::<Vec<&TextLine>>();
        eligible.sort_by(|a, b| {
            b.is_bold
                .cmp(&a.is_bold)
                .then_with(|| b.font_size.total_cmp(&a.font_size))
        });

        if let Some(best) = eligible.first() {
            return best.text.trim().to_string();
        }

        self.fallback(first_page).unwrap_or_default()
    }

    fn fallback(&self, first_page: &[TextLine]) -> Option<String> {
        let mut best: Option<&TextLine> = None;
        for line in first_page {
            let length = line.text.trim().chars().count();
            if length < self.fallback_min_len {
                continue;
            }

            let better = match best {
                None => true,
                Some(current) => {
                    line.font_size > current.font_size
                        || (line.font_size == current.font_size
                            && length > current.text.trim().chars().count())
                }
            };
            if better {
                best = Some(line);
            }
        }
        best.map(|line| line.text.trim().to_string())
    }
}
