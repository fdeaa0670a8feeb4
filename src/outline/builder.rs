use std::any::Any;
use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use anyhow::Result;
use tracing::{debug, warn};

use super::boilerplate::{BoilerplateFilter, LineDisposition};
use super::classify::HeadingClassifier;
use super::config::HeuristicsConfig;
use super::fragments::merge_rows;
use super::lines::{PageLines, TextLine, normalize_document};
use super::position_index::PositionIndex;
use super::title::TitleSelector;
use crate::layout::load_document;
use crate::model::{HeadingCandidate, OutlineResult};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutlineStats {
    pub lines_seen: usize,
    pub trivial_removed: usize,
    pub boilerplate_removed: usize,
    pub fragments_merged: usize,
    pub duplicates_dropped: usize,
    pub headings_emitted: usize,
}

#[derive(Debug, Clone)]
pub struct DocumentOutcome {
    pub result: OutlineResult,
    pub stats: OutlineStats,
    pub error: Option<String>,
}

#[derive(Debug, Default)]
pub struct SeenHeadings {
    texts: HashSet<String>,
}

impl SeenHeadings {
    pub fn admit(&mut self, text: &str) -> bool {
        if self.texts.contains(text) {
            return false;
        }
        self.texts.insert(text.to_string());
        true
    }
}

pub struct OutlineBuilder {
    config: HeuristicsConfig,
    boilerplate: BoilerplateFilter,
    classifier: HeadingClassifier,
    title: TitleSelector,
}

impl OutlineBuilder {
    pub fn new(config: HeuristicsConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            boilerplate: BoilerplateFilter::new(&config)?,
            classifier: HeadingClassifier::new(&config)?,
            title: TitleSelector::new(&config)?,
            config,
        })
    }

    #[cfg(test)]
    pub fn build(&self, pages: &[PageLines]) -> OutlineResult {
        self.build_with_stats(pages).0
    }

    pub fn build_with_stats(&self, pages: &[PageLines]) -> (OutlineResult, OutlineStats) {
        let mut stats = OutlineStats::default();

        let index = PositionIndex::build(pages, self.config.position_tolerance);
        debug!(entries = index.entry_count(), "position index built");

        let title = pages
            .iter()
            .find(|page| page.page_number == 1)
            .map(|page| self.title.select(&page.lines))
            .unwrap_or_default();

        let mut seen = SeenHeadings::default();
        let mut outline = Vec::new();
        for page in pages {
            let unrepeated = self.unrepeated_lines(page, &index, &mut stats);
            let rows = merge_rows(
                unrepeated,
                self.config.row_tolerance,
                self.config.min_fragment_overlap,
            );

            for row in rows {
                stats.fragments_merged += row.fragment_count.saturating_sub(1);

                match self.boilerplate.screen_text(&row.text) {
                    LineDisposition::Content => {}
                    LineDisposition::Trivial => {
                        stats.trivial_removed += 1;
                        continue;
                    }
                    LineDisposition::PatternBoilerplate => {
                        stats.boilerplate_removed += 1;
                        continue;
                    }
                }

                let text = row.text.trim();
                let Some(level) =
                    self.classifier
                        .classify(text, row.font_size, row.is_bold, row.page_number)
                else {
                    continue;
                };

                if !seen.admit(text) {
                    stats.duplicates_dropped += 1;
                    continue;
                }

                outline.push(HeadingCandidate {
                    level,
                    text: text.to_string(),
                    page_number: row.page_number,
                });
            }
        }

        stats.headings_emitted = outline.len();
        debug!(
            lines = stats.lines_seen,
            trivial = stats.trivial_removed,
            boilerplate = stats.boilerplate_removed,
            merged = stats.fragments_merged,
            duplicates = stats.duplicates_dropped,
            headings = stats.headings_emitted,
            "outline built"
        );

        (OutlineResult { title, outline }, stats)
    }

    fn unrepeated_lines<'a>(
        &self,
        page: &'a PageLines,
        index: &PositionIndex,
        stats: &mut OutlineStats,
    ) -> Vec<&'a TextLine> {
        let mut kept = Vec::with_capacity(page.lines.len());
        for line in &page.lines {
            stats.lines_seen += 1;
            if self.boilerplate.is_repeated(line, page.page_height, index) {
                stats.boilerplate_removed += 1;
            } else {
                kept.push(line);
            }
        }
        kept
    }

    pub fn extract_path(&self, path: &Path) -> DocumentOutcome {
        contain_failures(path, || {
            let document = load_document(path)?;
            let pages = normalize_document(&document);
            Ok(self.build_with_stats(&pages))
        })
    }
}

fn contain_failures<F>(path: &Path, extract: F) -> DocumentOutcome
where
    F: FnOnce() -> Result<(OutlineResult, OutlineStats)>,
{
    let message = match panic::catch_unwind(AssertUnwindSafe(extract)) {
        Ok(Ok((result, stats))) => {
            return DocumentOutcome {
                result,
                stats,
                error: None,
            };
        }
        Ok(Err(error)) => format!("{error:#}"),
        Err(payload) => format!(
            "panicked while processing document: {}",
            panic_message(payload.as_ref())
        ),
    };

    warn!(path = %path.display(), error = %message, "failed to read document");
    DocumentOutcome {
        result: OutlineResult::empty(),
        stats: OutlineStats::default(),
        error: Some(message),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic"
    }
}
