use std::path::{Path, PathBuf};

use ahash::AHashSet;
use anyhow::{bail, ensure, Context, Result};
use itertools::Itertools;
use log::info;
use path_absolutize::Absolutize;
use rayon::prelude::*;

use crate::{demux::DemultiplexJob, opts::Opts, utils::InputFastq};

/// Fails if any output path is shared by more than one job.
fn check_disjoint_destinations(jobs: &[DemultiplexJob]) -> Result<()> {
    let mut seen: AHashSet<PathBuf> = AHashSet::new();
    let shared: Vec<PathBuf> = jobs
        .iter()
        .flat_map(DemultiplexJob::destinations)
        .filter(|path| !seen.insert(path.clone()))
        .unique()
        .collect();
    if !shared.is_empty() {
        bail!(
            "Output files would be written by more than one input FASTQ: {}",
            shared.iter().map(|p| p.to_string_lossy()).join(", ")
        );
    }
    Ok(())
}

/// Run a single job, adding the input's path to any error.
fn run_job(job: &DemultiplexJob) -> Result<usize> {
    job.run().with_context(|| format!("Failed to demultiplex {}", job.input.path.to_string_lossy()))
}

fn absolutize(path: &Path) -> Result<PathBuf> {
    Ok(path
        .absolutize()
        .with_context(|| format!("Unable to resolve path: {}", path.to_string_lossy()))?
        .to_path_buf())
}

/// Run demultiplexing over every FASTQ in the input directory.
///
/// Returns the total number of records processed.
pub fn run(opts: Opts) -> Result<usize> {
    let input_dir = absolutize(&opts.input_dir)?;
    let output_dir = absolutize(&opts.output_dir)?;

    // Preflight checks
    ensure!(
        input_dir.is_dir(),
        "Input directory does not exist: {}",
        input_dir.to_string_lossy()
    );
    ensure!(
        output_dir.is_dir(),
        "Output directory does not exist: {}",
        output_dir.to_string_lossy()
    );
    ensure!(opts.threads > 0, "At least one thread must be used");
    let barcodes = opts.barcodes()?;
    ensure!(
        !barcodes.is_empty(),
        "At least one barcode must be given with --barcode or --samplesheet"
    );

    let groups = InputFastq::slurp(&input_dir)?;
    let mut jobs = vec![];
    for group in groups {
        info!("Found {} FASTQ(s) for {}", group.fastqs.len(), group.name);
        for fastq in group.fastqs {
            jobs.push(DemultiplexJob::new(fastq, &barcodes, opts.mismatches, &output_dir));
        }
    }
    if jobs.is_empty() {
        info!("No FASTQs found in {}", input_dir.to_string_lossy());
        return Ok(0);
    }

    let total = if opts.threads == 1 {
        let mut total = 0;
        for job in &jobs {
            total += run_job(job)?;
        }
        total
    } else {
        check_disjoint_destinations(&jobs)?;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(opts.threads)
            .build()
            .context("Failed to create thread pool")?;
        pool.install(|| jobs.par_iter().map(run_job).sum::<Result<usize>>())?
    };

    info!("Processed {} reads from {} FASTQ(s)", total, jobs.len());
    Ok(total)
}
