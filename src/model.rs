use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum HeadingLevel {
    H1,
    H2,
    H3,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeadingCandidate {
    pub level: HeadingLevel,
    pub text: String,
    #[serde(rename = "page")]
    pub page_number: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutlineResult {
    pub title: String,
    pub outline: Vec<HeadingCandidate>,
}

impl OutlineResult {
    pub fn empty() -> Self {
        Self::default()
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Ok,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub filename: String,
    pub output_filename: String,
    pub sha256: Option<String>,
    pub status: DocumentStatus,
    pub error: Option<String>,
    pub title: String,
    pub heading_count: usize,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchRunManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub started_at: String,
    pub updated_at: String,
    pub input_directory: String,
    pub output_directory: String,
    pub document_count: usize,
    pub succeeded_count: usize,
    pub failed_count: usize,
    pub documents: Vec<DocumentRecord>,
}
