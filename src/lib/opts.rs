#![forbid(unsafe_code)]

use std::{path::PathBuf, vec::Vec};

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use log::info;

use crate::{sample_metadata::Barcode, sample_sheet::SampleSheet, utils::built_info};

pub static TOOL_NAME: &str = "udemux";

static SHORT_USAGE: &str = "Demultiplexes the undetermined FASTQs of a sequencing run by index sequence.";

static LONG_USAGE: &str = "
Demultiplexes the undetermined FASTQs of a sequencing run by index sequence.

Every FASTQ found in DIR, and in each of its immediate subdirectories, whose name follows the
Illumina convention <sample>_<barcode>_L<lane>_R<read>_<set>.fastq[.gz] is demultiplexed against
the barcodes assigned to its lane.  The index sequence of each read is taken from the last
`:`-delimited field of its header.  A read is written to the output of the first barcode it
matches, in the order the barcodes were given, or to the unbinned output if it matches none.

A read matches a barcode if the barcode is a prefix of the read's index, or if the two differ at
no more than --mismatches positions.

Outputs are named <name>_<barcode>_L<lane>_R<read>_<set>.fastq and
unbinned_L<lane>_R<read>_<set>.fastq, and are created in --output-dir, which must exist.  Existing
files are never overwritten: if any output of a FASTQ already exists, none are created.

Barcodes are given with --barcode NAME:BARCODE:LANE (repeatable) and/or --samplesheet, a
CASAVA-style sample sheet with at least the columns Lane, SampleID and Index.  Sample sheet
barcodes are used after those given on the command line.

Example invocation:

udemux \\
  --barcode PB1:ATTAGA:1 \\
  --barcode PB2:CGATGT:1 \\
  --output-dir demuxed/ \\
  Unaligned/Undetermined_indices/
";

#[derive(Parser, Debug, Clone)]
#[clap(name = TOOL_NAME, version = built_info::VERSION.as_str(), about=SHORT_USAGE, long_about=LONG_USAGE, term_width=0)]
pub struct Opts {
    /// The directory of undetermined FASTQs.
    #[clap(value_name = "DIR", display_order = 1)]
    pub input_dir: PathBuf,

    /// A barcode to assign, as NAME:BARCODE:LANE.
    #[clap(long = "barcode", short = 'b', value_name = "NAME:BARCODE:LANE", display_order = 2)]
    pub barcodes: Vec<Barcode>,

    /// A CASAVA-style sample sheet of barcodes to assign.
    #[clap(long = "samplesheet", short = 's', value_name = "FILE", display_order = 3)]
    pub sample_sheet: Option<PathBuf>,

    /// The directory to write outputs, the directory must exist.
    #[clap(long, short, default_value = ".", display_order = 4)]
    pub output_dir: PathBuf,

    /// Number of allowed mismatches between the observed index and the expected barcode.
    #[clap(long, short = 'm', default_value = "1", display_order = 11)]
    pub mismatches: usize,

    /// Number of FASTQs to demultiplex concurrently.
    #[clap(long, short = 't', default_value = "1", display_order = 31)]
    pub threads: usize,
}

impl Opts {
    /// All barcodes to assign: those given with `--barcode` followed by those in the sample
    /// sheet, if one was given.
    pub fn barcodes(&self) -> Result<Vec<Barcode>> {
        let mut barcodes = self.barcodes.clone();
        if let Some(path) = &self.sample_sheet {
            let sheet = SampleSheet::from_path(path).with_context(|| {
                format!("Failed to read sample sheet: {}", path.to_string_lossy())
            })?;
            barcodes.extend(sheet.barcodes);
        }
        for barcode in &barcodes {
            info!(
                "Assigning barcode {} in lane {} to {}",
                barcode.sequence, barcode.lane, barcode.name
            );
        }
        Ok(barcodes)
    }
}

/// Implement defaults that match the CLI options to allow for easier testing.
///
/// Note that these defaults exist only within test code.
#[cfg(test)]
impl Default for Opts {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::default(),
            barcodes: vec![],
            sample_sheet: None,
            output_dir: PathBuf::from("."),
            mismatches: 1,
            threads: 1,
        }
    }
}

/// Parse args and set up logging / tracing
pub fn setup() -> Opts {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info");
    }
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    Opts::parse()
}
