use std::io::Write;

use anyhow::{Context, Result};
use tracing::info;

use crate::cli::ExtractArgs;
use crate::outline::{HeuristicsConfig, OutlineBuilder};
use crate::util::write_json_pretty;

pub fn run(args: ExtractArgs) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    run_with_writer(&args, &mut stdout)
}

fn run_with_writer<W: Write>(args: &ExtractArgs, stdout: &mut W) -> Result<()> {
    let config = HeuristicsConfig::load(args.heuristics.as_deref())?;
    let builder = OutlineBuilder::new(config)?;

    let outcome = builder.extract_path(&args.pdf_path);
    info!(
        path = %args.pdf_path.display(),
        title = %outcome.result.title,
        headings = outcome.result.outline.len(),
        boilerplate = outcome.stats.boilerplate_removed,
        "extracted outline"
    );

    match &args.output {
        Some(output) => {
            write_json_pretty(output, &outcome.result)?;
            info!(path = %output.display(), "wrote outline");
        }
        None => {
            let data = serde_json::to_vec_pretty(&outcome.result)
                .context("failed to serialize outline")?;
            stdout.write_all(&data).context("failed to write outline to stdout")?;
            stdout.write_all(b"\n").context("failed to write outline to stdout")?;
        }
    }

    Ok(())
}
