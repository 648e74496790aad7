//! Resolve the shape of the records in a file from its name.

use std::path::Path;

use crate::errors::DemuxError;

/// The suffix appended to a file name when its contents are gzip compressed.
pub const COMPRESSION_SUFFIX: &str = ".gz";

/// The number of lines that make up a single record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordShape {
    /// Header, sequence, separator and quality lines (FASTQ).
    FourLine,
    /// Header and data lines (SOLiD csfasta and qual).
    TwoLine,
}

impl RecordShape {
    /// Resolve the shape from a file name, ignoring any trailing compression suffix.
    ///
    /// # Errors
    ///
    /// - [`DemuxError::UnrecognizedFormat`] if the format suffix is not one of `.fastq`, `.fq`,
    ///   `.csfasta` or `.qual`
    pub fn from_file_name(file_name: &str) -> Result<Self, DemuxError> {
        let name = file_name.strip_suffix(COMPRESSION_SUFFIX).unwrap_or(file_name);
        match name.rsplit_once('.').map(|(_, ext)| ext) {
            Some("fastq" | "fq") => Ok(Self::FourLine),
            Some("csfasta" | "qual") => Ok(Self::TwoLine),
            _ => Err(DemuxError::UnrecognizedFormat { file_name: file_name.to_string() }),
        }
    }

    /// Resolve the shape from the file name component of a path.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, DemuxError> {
        let file_name = path
            .as_ref()
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();
        Self::from_file_name(&file_name)
    }

    /// The number of lines per record.
    pub fn lines_per_record(self) -> usize {
        match self {
            Self::FourLine => 4,
            Self::TwoLine => 2,
        }
    }

    /// True if `#` comment lines may precede the first record.
    ///
    /// Only SOLiD files carry a comment preamble; FASTQ quality lines may themselves start
    /// with `#`.
    pub fn has_comment_preamble(self) -> bool {
        match self {
            Self::FourLine => false,
            Self::TwoLine => true,
        }
    }
}

/// True if the file name carries the compression suffix.
pub fn is_compressed<P: AsRef<Path>>(path: P) -> bool {
    path.as_ref().to_string_lossy().ends_with(COMPRESSION_SUFFIX)
}

#[cfg(test)]
mod test {
    use matches::assert_matches;
    use rstest::rstest;

    use super::{is_compressed, RecordShape};
    use crate::errors::DemuxError;

    #[rstest]
    #[case("test.fastq", RecordShape::FourLine)]
    #[case("test.fastq.gz", RecordShape::FourLine)]
    #[case("test.fq", RecordShape::FourLine)]
    #[case("test.fq.gz", RecordShape::FourLine)]
    #[case("test.csfasta", RecordShape::TwoLine)]
    #[case("test.csfasta.gz", RecordShape::TwoLine)]
    #[case("test.qual", RecordShape::TwoLine)]
    #[case("test.qual.gz", RecordShape::TwoLine)]
    fn test_shape_from_file_name(#[case] file_name: &str, #[case] expected: RecordShape) {
        assert_eq!(RecordShape::from_file_name(file_name).unwrap(), expected);
    }

    #[rstest]
    #[case("test.fastq", 4)]
    #[case("test.fq.gz", 4)]
    #[case("test.csfasta", 2)]
    #[case("test.qual.gz", 2)]
    fn test_lines_per_record(#[case] file_name: &str, #[case] expected: usize) {
        assert_eq!(RecordShape::from_file_name(file_name).unwrap().lines_per_record(), expected);
    }

    #[rstest]
    #[case("test.txt")]
    #[case("test.gz")]
    #[case("test.fastq.bz2")]
    #[case("test.bam")]
    #[case("fastq")]
    #[case("")]
    fn test_unrecognized_format(#[case] file_name: &str) {
        assert_matches!(
            RecordShape::from_file_name(file_name),
            Err(DemuxError::UnrecognizedFormat { .. })
        );
    }

    #[test]
    fn test_shape_from_path_uses_file_name_only() {
        let shape = RecordShape::from_path("/data/run.fastq/lane1_NoIndex_L001_R1_001.qual.gz");
        assert_eq!(shape.unwrap(), RecordShape::TwoLine);
    }

    #[test]
    fn test_is_compressed() {
        assert!(is_compressed("reads.fastq.gz"));
        assert!(!is_compressed("reads.fastq"));
    }
}
