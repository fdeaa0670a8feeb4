use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use rayon::ThreadPoolBuilder;
use rayon::prelude::*;
use tracing::{info, warn};

use crate::cli::BatchArgs;
use crate::model::{BatchRunManifest, DocumentRecord, DocumentStatus};
use crate::outline::{HeuristicsConfig, OutlineBuilder};
use crate::util::{
    ensure_directory, now_utc_string, sha256_file, utc_compact_string, write_json_pretty,
};

pub fn run(args: BatchArgs) -> Result<()> {
    let config = HeuristicsConfig::load(args.heuristics.as_deref())?;
    let manifest = run_batch(&args.input, &args.output, args.jobs, config)?;

    if let Some(manifest_path) = args.manifest_path {
        write_json_pretty(&manifest_path, &manifest)?;
        info!(path = %manifest_path.display(), "wrote batch run manifest");
    }

    info!(
        documents = manifest.document_count,
        succeeded = manifest.succeeded_count,
        failed = manifest.failed_count,
        "batch completed"
    );
    Ok(())
}

pub fn run_batch(
    input: &Path,
    output: &Path,
    jobs: Option<usize>,
    config: HeuristicsConfig,
) -> Result<BatchRunManifest> {
    if !input.exists() {
        bail!("input directory does not exist: {}", input.display());
    }
    if !input.is_dir() {
        bail!("input path is not a directory: {}", input.display());
    }

    let started = Utc::now();
    let run_id = format!("run-{}", utc_compact_string(started));
    let started_at = now_utc_string();
    info!(run_id = %run_id, input = %input.display(), output = %output.display(), "starting batch");

    let builder = OutlineBuilder::new(config)?;
    let mut pdf_paths = discover_pdfs(input)?;
    pdf_paths.sort();

    ensure_directory(output)?;

    let documents = if pdf_paths.is_empty() {
        info!(input = %input.display(), "no PDF files found");
        Vec::new()
    } else {
        let pool = ThreadPoolBuilder::new()
            .num_threads(jobs.unwrap_or(0))
            .build()
            .context("failed to build worker pool")?;
        pool.install(|| {
            pdf_paths
                .par_iter()
                .map(|path| process_document(&builder, path, output))
                .collect::<Vec<DocumentRecord>>()
        })
    };

    let succeeded_count = documents
        .iter()
        .filter(|record| record.status == DocumentStatus::Ok)
        .count();

    Ok(BatchRunManifest {
        manifest_version: 1,
        run_id,
        started_at,
        updated_at: now_utc_string(),
        input_directory: input.display().to_string(),
        output_directory: output.display().to_string(),
        document_count: documents.len(),
        succeeded_count,
        failed_count: documents.len() - succeeded_count,
        documents,
    })
}

fn process_document(builder: &OutlineBuilder, path: &Path, output: &Path) -> DocumentRecord {
    let started = Instant::now();
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default();
    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_default();
    let output_filename = format!("{stem}.json");

    let sha256 = sha256_file(path).ok();
    let outcome = builder.extract_path(path);
    let mut error = outcome.error;

    let output_path = output.join(&output_filename);
    if let Err(write_error) = write_json_pretty(&output_path, &outcome.result) {
        let message = format!("{write_error:#}");
        warn!(path = %output_path.display(), error = %message, "failed to write outline");
        error = Some(error.map_or(message.clone(), |existing| format!("{existing}; {message}")));
    }

    let elapsed_ms = started.elapsed().as_millis() as u64;
    let status = if error.is_some() {
        DocumentStatus::Failed
    } else {
        DocumentStatus::Ok
    };

    match status {
        DocumentStatus::Ok => info!(
            file = %filename,
            title = %outcome.result.title,
            headings = outcome.result.outline.len(),
            elapsed_ms,
            "processed document"
        ),
        DocumentStatus::Failed => warn!(
            file = %filename,
            error = %error.as_deref().unwrap_or_default(),
            elapsed_ms,
            "document failed, wrote empty outline"
        ),
    }

    DocumentRecord {
        filename,
        output_filename,
        sha256,
        status,
        error,
        heading_count: outcome.result.outline.len(),
        title: outcome.result.title,
        elapsed_ms,
    }
}

fn discover_pdfs(input: &Path) -> Result<Vec<PathBuf>> {
    let mut pdfs = Vec::new();

    let entries =
        fs::read_dir(input).with_context(|| format!("failed to read {}", input.display()))?;

    for entry in entries {
        let entry = entry.with_context(|| format!("failed to read entry in {}", input.display()))?;
        let path = entry.path();

        if !entry
            .file_type()
            .with_context(|| format!("failed to inspect file type: {}", path.display()))?
            .is_file()
        {
            continue;
        }

        let is_pdf = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));

        if is_pdf {
            pdfs.push(path);
        }
    }

    Ok(pdfs)
}
