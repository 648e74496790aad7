//! Utility functions.
use std::path::{Path, PathBuf};

use lazy_static::lazy_static;
use log::debug;
use regex::Regex;

use crate::{errors::DemuxError, format::RecordShape, sample_metadata::Barcode};

pub mod built_info {
    use lazy_static::lazy_static;
    include!(concat!(env!("OUT_DIR"), "/built.rs"));

    /// Get a software version string including
    ///   - Git commit hash
    ///   - Git dirty info (whether the repo had uncommitted changes)
    ///   - Cargo package version if no git info found
    fn get_software_version() -> String {
        let prefix = if let Some(s) = GIT_COMMIT_HASH {
            format!("{}-{}", PKG_VERSION, s[0..8].to_owned())
        } else {
            // This shouldn't happen
            PKG_VERSION.to_string()
        };
        let suffix = match GIT_DIRTY {
            Some(true) => "-dirty",
            _ => "",
        };
        format!("{}{}", prefix, suffix)
    }

    lazy_static! {
        /// Version of the software with git hash
        pub static ref VERSION: String = get_software_version();
    }
}

/// The name given to the output for reads that match no barcode.
pub const UNBINNED_NAME: &str = "unbinned";

lazy_static! {
    /// <sample>_<barcode>_L<lane>_R<read>_<set>, followed by the format suffix(es)
    static ref INPUT_FASTQ_REGEX: Regex =
        Regex::new(r"^(.*)_([^_]*)_L(\d{3})_R(\d+)_(\d{3})\.[^_]+$").unwrap();
}

/// Contains information about an Illumina FASTQ that has been inferred from the file name: the
/// lane, the read number (e.g. R1 or R2), and the set number (the file's ordinal within a
/// split read).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputFastq {
    pub path: PathBuf,
    pub sample_name: String,
    pub barcode: String,
    pub lane: usize,
    pub read_number: usize,
    pub set_number: usize,
}

impl InputFastq {
    /// Create a new `InputFastq` inferring information from the file name, e.g.
    /// `lane1_Undetermined_L001_R1_001.fastq.gz`.
    ///
    /// # Errors
    ///
    /// - [`DemuxError::InvalidArgument`] if the file name does not follow the Illumina naming
    ///   convention or does not name a FASTQ
    pub fn new<P: AsRef<Path>>(path: P) -> Result<InputFastq, DemuxError> {
        let path = path.as_ref();
        let file_name =
            path.file_name().map(|name| name.to_string_lossy().to_string()).unwrap_or_default();
        let invalid = || {
            DemuxError::InvalidArgument(format!(
                "not an Illumina FASTQ file name (<sample>_<barcode>_L<lane>_R<read>_<set>.fastq[.gz]): {}",
                path.to_string_lossy()
            ))
        };
        if !matches!(RecordShape::from_path(path), Ok(RecordShape::FourLine)) {
            return Err(invalid());
        }
        let captures = INPUT_FASTQ_REGEX.captures(&file_name).ok_or_else(invalid)?;
        let field = |i: usize| captures.get(i).map_or("", |m| m.as_str());
        let number = |i: usize| field(i).parse::<usize>().map_err(|_| invalid());

        Ok(InputFastq {
            path: path.to_path_buf(),
            sample_name: field(1).to_string(),
            barcode: field(2).to_string(),
            lane: number(3)?,
            read_number: number(4)?,
            set_number: number(5)?,
        })
    }

    /// Identifies the Illumina FASTQs in `dir` itself and in each of its immediate
    /// subdirectories (one per sample), grouped by directory.  Groups are sorted by directory
    /// name and FASTQs by path within each group; directories without FASTQs are omitted.
    pub fn slurp<P: AsRef<Path>>(dir: P) -> Result<Vec<SampleFastqs>, DemuxError> {
        let dir = dir.as_ref();
        let mut groups = vec![];

        let top_level = Self::fastqs_in(dir)?;
        if !top_level.is_empty() {
            groups.push(SampleFastqs::new(dir, top_level));
        }

        let mut subdirs = vec![];
        for entry in std::fs::read_dir(dir).map_err(|e| DemuxError::io(dir, e))? {
            let path = entry.map_err(|e| DemuxError::io(dir, e))?.path();
            if path.is_dir() {
                subdirs.push(path);
            }
        }
        subdirs.sort();
        for subdir in subdirs {
            let fastqs = Self::fastqs_in(&subdir)?;
            if !fastqs.is_empty() {
                groups.push(SampleFastqs::new(&subdir, fastqs));
            }
        }
        Ok(groups)
    }

    /// The Illumina FASTQs directly inside `dir`, sorted by path.
    fn fastqs_in(dir: &Path) -> Result<Vec<InputFastq>, DemuxError> {
        let mut fastqs = vec![];
        for entry in std::fs::read_dir(dir).map_err(|e| DemuxError::io(dir, e))? {
            let path = entry.map_err(|e| DemuxError::io(dir, e))?.path();
            if !path.is_file() {
                continue;
            }
            match InputFastq::new(&path) {
                Ok(fastq) => fastqs.push(fastq),
                Err(_) => debug!("Skipping {}", path.to_string_lossy()),
            }
        }
        fastqs.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(fastqs)
    }
}

/// The FASTQs found in a single sample directory.
#[derive(Debug, Clone)]
pub struct SampleFastqs {
    pub name: String,
    pub dir: PathBuf,
    pub fastqs: Vec<InputFastq>,
}

impl SampleFastqs {
    fn new(dir: &Path, fastqs: Vec<InputFastq>) -> Self {
        let name = dir.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
        Self { name, dir: dir.to_path_buf(), fastqs }
    }
}

/// Determine the output file name for the reads matching `barcode` in the given FASTQ.
pub fn filename(barcode: &Barcode, fastq: &InputFastq) -> String {
    format!(
        "{}_{}_L{:03}_R{}_{:03}.fastq",
        barcode.name, barcode.sequence, fastq.lane, fastq.read_number, fastq.set_number
    )
}

/// Determine the output file name for the reads in the given FASTQ matching no barcode.
pub fn unbinned_filename(fastq: &InputFastq) -> String {
    format!(
        "{}_L{:03}_R{}_{:03}.fastq",
        UNBINNED_NAME, fastq.lane, fastq.read_number, fastq.set_number
    )
}

/// Determine the output paths for the given FASTQ: one per barcode in order, then the
/// unbinned output last.
pub fn filenames<P: AsRef<Path>>(
    barcodes: &[Barcode],
    fastq: &InputFastq,
    output_dir: P,
) -> Vec<PathBuf> {
    let output_dir = output_dir.as_ref();
    barcodes
        .iter()
        .map(|barcode| output_dir.join(filename(barcode, fastq)))
        .chain(std::iter::once(output_dir.join(unbinned_filename(fastq))))
        .collect()
}

#[cfg(not(tarpaulin_include))]
#[cfg(test)]
pub mod test_commons {
    //! Common utility methods for testing reading and demultiplexing.

    use std::{
        fs::File,
        io::{BufWriter, Write},
        path::Path,
    };

    use bgzf::CompressionLevel;
    use bstr::BString;

    use crate::reads::{Record, RecordReader};

    pub const EXAMPLE_FASTQ: &str = "@K00311:43:HL3LWBBXX:8:1101:21440:1121 1:N:0:CNATGT
GCCNGACAGCAGAAAT
+
AAF#FJJJJJJJJJJJ
@K00311:43:HL3LWBBXX:8:1101:21460:1121 1:N:0:CNATGT
GGGNGTCATTGATCAT
+
AAF#FJJJJJJJJJJJ
@K00311:43:HL3LWBBXX:8:1101:21805:1121 1:N:0:CNATGT
CCCNACCCTTGCCTAC
+
AAF#FJJJJJJJJJJJ
";

    pub const EXAMPLE_CSFASTA: &str = "# Cwd: /home/pipeline
# Title: solid0127_20121204_FRAG_BC_Run_56_pool_LC_CK
>1_51_38_F3
T3..3.213.12211.01..000..111.0210202221221121011..0
>1_51_301_F3
T0..3.222.21233.00..022..110.0210022323223202211..2
>1_52_339_F3
T1.311202211102.331233332113.23332233002223222312.2
";

    pub const EXAMPLE_QUAL: &str = "# Cwd: /home/pipeline
# Title: solid0127_20121204_FRAG_BC_Run_56_pool_LC_CK
>1_51_38_F3
16 -1 -1 5 -1 24 15 12 -1 21 12 16 22 19 -1 26 13 -1 -1 4 21 4 -1 -1 4 7 9 -1 4 5 4 4 4 4 4 13 4 4 4 5 4 4 10 4 4 4 4 -1 -1 4 
>1_51_301_F3
22 -1 -1 4 -1 24 30 7 -1 4 9 26 6 16 -1 25 25 -1 -1 17 18 13 -1 -1 4 14 24 -1 4 14 17 32 4 7 13 13 22 4 12 19 4 24 6 9 8 4 4 -1 -1 9 
>1_52_339_F3
27 -1 33 24 28 32 29 17 25 27 26 30 30 31 -1 28 33 19 19 13 4 20 21 13 5 4 12 -1 4 23 13 8 4 10 4 6 5 7 4 8 4 8 12 5 12 10 8 7 -1 4
";

    /// Write text to a file.
    ///
    /// If the file extension is `gz` the text will be compressed
    pub fn write_text_to_file(contents: &str, file: impl AsRef<Path>) {
        let mut writer: Box<dyn Write> =
            if file.as_ref().extension().map_or(false, |ext| ext == "gz") {
                Box::new(bgzf::Writer::new(
                    BufWriter::new(File::create(file).unwrap()),
                    CompressionLevel::new(3).unwrap(),
                ))
            } else {
                Box::new(BufWriter::new(File::create(file).unwrap()))
            };
        writer.write_all(contents.as_bytes()).unwrap();
        writer.flush().unwrap();
    }

    /// Split text into records of `lines_per_record` lines after skipping the first
    /// `skip_lines` lines.  Any trailing partial record is dropped.
    pub fn expected_records(contents: &str, skip_lines: usize, lines_per_record: usize) -> Vec<Record> {
        let lines: Vec<&str> = contents.split('\n').skip(skip_lines).collect();
        lines
            .chunks(lines_per_record)
            .filter(|chunk| chunk.len() == lines_per_record)
            .map(|chunk| Record::new(chunk.iter().map(|l| BString::from(*l)).collect()))
            .collect()
    }

    /// Create the text of a FASTQ record whose header carries the given index sequence.
    pub fn fastq_record(name: &str, index: &str) -> String {
        format!(
            "@K00311:43:HL3LWBBXX:1:1101:{}:1121 1:N:0:{}\nACGTACGTACGT\n+\nAAFFFJJJJJJJ\n",
            name, index
        )
    }

    /// Slurp all records out of a file.
    pub fn slurp_records(file: impl AsRef<Path>) -> Vec<Record> {
        RecordReader::from_path(file).unwrap().map(Result::unwrap).collect()
    }
}
