use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "outline-infer",
    version,
    about = "Infer document titles and H1/H2/H3 outlines from PDF page layout"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Process every PDF in a directory, writing one JSON outline per document.
    Batch(BatchArgs),
    /// Infer the outline of a single PDF.
    Extract(ExtractArgs),
}

#[derive(Args, Debug, Clone)]
pub struct BatchArgs {
    #[arg(long, default_value = "input")]
    pub input: PathBuf,

    #[arg(long, default_value = "output")]
    pub output: PathBuf,

    /// Worker threads; defaults to the number of available cores.
    #[arg(long)]
    pub jobs: Option<usize>,

    /// JSON file overriding heading heuristics thresholds.
    #[arg(long)]
    pub heuristics: Option<PathBuf>,

    #[arg(long)]
    pub manifest_path: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct ExtractArgs {
    pub pdf_path: PathBuf,

    /// Write the result here instead of stdout.
    #[arg(long)]
    pub output: Option<PathBuf>,

    #[arg(long)]
    pub heuristics: Option<PathBuf>,
}
