//! Functionality directly related to demultiplexing the records of a single FASTQ.
//!
//! A [`DemultiplexJob`] bins every record of one input FASTQ to the output of the first
//! barcode (for the FASTQ's lane) that its index sequence matches, or to the unbinned output.

use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::{
    errors::DemuxError,
    fastq_header::index_sequence,
    format::RecordShape,
    matcher::{FirstMatchMatcher, MatchResult, Matcher},
    reads::{Record, RecordReader},
    sample_metadata::{barcodes_for_lane, Barcode},
    sample_writer::SampleWriters,
    utils::{filenames, InputFastq},
};

/// Assigns records to destinations using a [`Matcher`].
///
/// Destination `i` receives the records matching barcode `i`; the last destination receives
/// the records matching no barcode.
pub struct Demultiplexer<M: Matcher> {
    /// The matcher to use for determining which barcode the observed index matches.
    matcher: M,
    /// The index of the unbinned destination.
    unbinned_index: usize,
}

impl<M: Matcher> Demultiplexer<M> {
    /// Create a new [`Demultiplexer`] for `num_barcodes` barcodes plus the unbinned destination.
    pub fn new(matcher: M, num_barcodes: usize) -> Self {
        Self { matcher, unbinned_index: num_barcodes }
    }

    /// Returns the index of the destination for a record.
    ///
    /// # Errors
    ///
    /// - [`DemuxError::MalformedHeader`] if no index sequence can be extracted from the header
    pub fn destination(&self, record: &Record, path: &Path) -> Result<usize, DemuxError> {
        let header = record.header();
        let observed = index_sequence(header).ok_or_else(|| DemuxError::MalformedHeader {
            header: header.to_owned(),
            path: path.to_path_buf(),
        })?;
        Ok(match self.matcher.find(observed) {
            MatchResult::Match { barcode_index } => barcode_index,
            MatchResult::NoMatch => self.unbinned_index,
        })
    }

    /// Write every record from `records` to its destination, returning the number of records.
    pub fn demultiplex<I>(
        &self,
        records: I,
        path: &Path,
        writers: &mut SampleWriters,
    ) -> Result<usize, DemuxError>
    where
        I: Iterator<Item = Result<Record, DemuxError>>,
    {
        let mut count = 0;
        for record in records {
            let record = record?;
            let index = self.destination(&record, path)?;
            writers.write_record(index, &record)?;
            count += 1;
        }
        Ok(count)
    }
}

/// Everything needed to demultiplex a single input FASTQ.
#[derive(Debug, Clone)]
pub struct DemultiplexJob {
    /// The FASTQ to demultiplex.
    pub input: InputFastq,
    /// The barcodes assigned to the FASTQ's lane, in priority order.
    pub barcodes: Vec<Barcode>,
    /// The maximum number of mismatches allowed when matching a barcode.
    pub max_mismatches: usize,
    /// The directory in which to create the outputs.
    pub output_dir: PathBuf,
}

impl DemultiplexJob {
    /// Create a new [`DemultiplexJob`], keeping only the barcodes in the input's lane.
    pub fn new<P: AsRef<Path>>(
        input: InputFastq,
        barcodes: &[Barcode],
        max_mismatches: usize,
        output_dir: P,
    ) -> Self {
        let barcodes = barcodes_for_lane(barcodes, input.lane);
        Self { input, barcodes, max_mismatches, output_dir: output_dir.as_ref().to_path_buf() }
    }

    /// The output paths for this job: one per barcode, then the unbinned output.  Empty if no
    /// barcodes are assigned to the input's lane.
    pub fn destinations(&self) -> Vec<PathBuf> {
        if self.barcodes.is_empty() {
            vec![]
        } else {
            filenames(&self.barcodes, &self.input, &self.output_dir)
        }
    }

    /// Demultiplex the input, returning the number of records processed.
    ///
    /// Does nothing and returns zero if no barcodes are assigned to the input's lane.  No output
    /// is created unless the input can be opened and none of the outputs already exist.
    ///
    /// # Errors
    ///
    /// - [`DemuxError::UnrecognizedFormat`] if the input's format cannot be determined
    /// - [`DemuxError::InvalidArgument`] if the input is not a FASTQ
    /// - [`DemuxError::DestinationCollision`] if any output already exists
    /// - [`DemuxError::MalformedHeader`] if a record has no index sequence in its header
    /// - [`DemuxError::Open`] or [`DemuxError::Io`] on any failure to read or write
    pub fn run(&self) -> Result<usize, DemuxError> {
        let path = &self.input.path;
        info!("Processing {}", path.to_string_lossy());
        if self.barcodes.is_empty() {
            debug!("No barcodes assigned to lane {}, skipping", self.input.lane);
            return Ok(0);
        }

        let records = RecordReader::from_path(path)?;
        if records.shape() != RecordShape::FourLine {
            return Err(DemuxError::InvalidArgument(format!(
                "only FASTQ files can be demultiplexed: {}",
                path.to_string_lossy()
            )));
        }

        let destinations = self.destinations();
        for (barcode, destination) in self.barcodes.iter().zip(destinations.iter()) {
            info!("\t{}\t{}", barcode.sequence, destination.to_string_lossy());
        }
        let mut writers = SampleWriters::create(destinations)?;

        let matcher = FirstMatchMatcher::new(&self.barcodes, self.max_mismatches);
        let demultiplexer = Demultiplexer::new(matcher, self.barcodes.len());
        let count = demultiplexer.demultiplex(records, path, &mut writers)?;
        writers.finish()?;

        let file_name = path.file_name().map_or_else(
            || path.to_string_lossy().to_string(),
            |n| n.to_string_lossy().to_string(),
        );
        info!("\tMatched {} reads for {}", count, file_name);
        Ok(count)
    }
}
