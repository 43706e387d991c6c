//! mesh-split batch command - split several meshes in parallel.
//!
//! Each input is an independent job with its own output directory under
//! the batch output, named after the input file. One failed job does not
//! stop the others; the command fails if any job failed.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use colored::Colorize;
use mesh_core::load_mesh;
use mesh_segment::{BatchJob, segment_batch};
use rayon::prelude::*;
use serde::Serialize;

use crate::commands::split::{SplitSummary, build_config, print_summary};
use crate::export::export_result;
use crate::{Cli, OutputFormat, SplitOptions, output};

#[derive(Serialize)]
struct BatchFailure {
    input: String,
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<String>,
}

#[derive(Serialize)]
struct BatchSummary {
    succeeded: Vec<SplitSummary>,
    failed: Vec<BatchFailure>,
}

/// Output sub-directory name for an input file.
fn job_name(input: &Path) -> Result<String> {
    input
        .file_stem()
        .and_then(|s| s.to_str())
        .map(String::from)
        .with_context(|| format!("Cannot derive a job name from {:?}", input))
}

pub fn run(inputs: &[PathBuf], output_dir: &Path, options: &SplitOptions, cli: &Cli) -> Result<()> {
    let config = build_config(options)?;

    let names = inputs.iter().map(|p| job_name(p)).collect::<Result<Vec<_>>>()?;
    let unique: BTreeSet<&String> = names.iter().collect();
    if unique.len() != names.len() {
        bail!("Input file names must be unique; each becomes an output directory");
    }
    for name in &names {
        let dir = output_dir.join(name);
        if dir.exists() && !options.force {
            bail!("Output directory {:?} already exists (use --force to replace it)", dir);
        }
    }

    let meshes = inputs
        .par_iter()
        .map(|input| load_mesh(input).with_context(|| format!("Failed to load mesh from {:?}", input)))
        .collect::<Result<Vec<_>>>()?;

    let jobs: Vec<BatchJob> = names
        .iter()
        .zip(meshes)
        .map(|(name, mesh)| BatchJob::new(name.clone(), mesh, config.clone()))
        .collect();

    output::info(
        &format!("Splitting {} meshes in parallel...", jobs.len()),
        cli.format,
        cli.quiet,
    );

    let outcomes = segment_batch(&jobs);

    let mut summary = BatchSummary {
        succeeded: Vec::new(),
        failed: Vec::new(),
    };
    for ((input, name), outcome) in inputs.iter().zip(&names).zip(outcomes) {
        let exported = outcome.result.map_err(anyhow::Error::from).and_then(|result| {
            let report = export_result(
                &result,
                &input.display().to_string(),
                &output_dir.join(name),
                options.part_format,
                options.force,
            )?;
            Ok((result, report))
        });
        match exported {
            Ok((result, report)) => {
                let split = SplitSummary::new(input, &result, &report);
                if matches!(cli.format, OutputFormat::Text) {
                    print_summary(&split, &result, cli);
                }
                summary.succeeded.push(split);
            }
            Err(e) => {
                let code = e
                    .downcast_ref::<mesh_segment::SegmentError>()
                    .map(|err| err.code().to_string());
                if !cli.quiet {
                    eprintln!("{} {}: {:#}", "✗".red().bold(), input.display(), e);
                }
                summary.failed.push(BatchFailure {
                    input: input.display().to_string(),
                    error: format!("{:#}", e),
                    code,
                });
            }
        }
    }

    output::print(&summary, cli.format, cli.quiet);

    if !summary.failed.is_empty() {
        bail!("{} of {} jobs failed", summary.failed.len(), inputs.len());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_name_from_stem() {
        assert_eq!(job_name(Path::new("models/statue.stl")).unwrap(), "statue");
        assert!(job_name(Path::new("/")).is_err());
    }
}
