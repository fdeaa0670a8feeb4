use std::path::Path;

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::util::read_json;

/// Missing fields in a JSON override file fall back to the defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeuristicsConfig {
    pub position_tolerance: f32,
    pub neighbor_tolerance: f32,
    pub row_tolerance: f32,
    pub top_margin_fraction: f32,
    pub bottom_margin_fraction: f32,
    pub min_repeat_pages: usize,
    pub similarity_threshold: f64,
    pub short_phrase_max_len: usize,
    pub min_text_len: usize,
    pub min_fragment_overlap: usize,

    pub h1_font_size: f32,
    pub h1_secondary_font_size: f32,
    pub bold_h1_font_size: f32,
    pub early_page_limit: u32,
    pub h2_font_size: f32,
    pub bold_h3_font_size: f32,
    pub keyword_h1_font_size: f32,

    pub title_min_words: usize,
    pub title_min_font_size: f32,
    pub title_fallback_min_len: usize,
}

impl Default for HeuristicsConfig {
    fn default() -> Self {
        Self {
            position_tolerance: 10.0,
            neighbor_tolerance: 20.0,
            row_tolerance: 5.0,
            top_margin_fraction: 0.10,
            bottom_margin_fraction: 0.10,
            min_repeat_pages: 2,
            similarity_threshold: 0.85,
            short_phrase_max_len: 10,
            min_text_len: 3,
            min_fragment_overlap: 1,

            h1_font_size: 18.0,
            h1_secondary_font_size: 16.0,
            bold_h1_font_size: 14.0,
            early_page_limit: 2,
            h2_font_size: 13.0,
            bold_h3_font_size: 12.0,
            keyword_h1_font_size: 16.0,

            title_min_words: 3,
            title_min_font_size: 16.0,
            title_fallback_min_len: 4,
        }
    }
}

impl HeuristicsConfig {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => {
                let config: Self = read_json(path)?;
                info!(path = %path.display(), "loaded heuristics overrides");
                config
            }
            None => Self::default(),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("position_tolerance", self.position_tolerance),
            ("neighbor_tolerance", self.neighbor_tolerance),
            ("row_tolerance", self.row_tolerance),
        ] {
            if !(value.is_finite() && value > 0.0) {
                bail!("{name} must be a positive number, got {value}");
            }
        }

        for (name, value) in [
            ("top_margin_fraction", self.top_margin_fraction),
            ("bottom_margin_fraction", self.bottom_margin_fraction),
        ] {
            if !(value > 0.0 && value <= 0.5) {
                bail!("{name} must be within (0, 0.5], got {value}");
            }
        }

        if !(self.similarity_threshold > 0.0 && self.similarity_threshold <= 1.0) {
            bail!(
                "similarity_threshold must be within (0, 1], got {}",
                self.similarity_threshold
            );
        }

        if self.min_repeat_pages == 0 {
            bail!("min_repeat_pages must be at least 1");
        }

        if self.min_fragment_overlap == 0 {
            bail!("min_fragment_overlap must be at least 1");
        }

        Ok(())
    }
}
