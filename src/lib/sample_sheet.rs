//! Read expected barcodes from a CASAVA-style sample sheet.
//!
//! The sample sheet is a headered CSV file with (at least) the `Lane`, `SampleID` and `Index`
//! columns, e.g.:
//!
//! ```text
//! FCID,Lane,SampleID,SampleRef,Index,Description,Control,Recipe,Operator,SampleProject
//! D190HACXX,1,PB1,PB,ATTAGA,,N,,,PeterBriggs
//! D190HACXX,1,PB2,PB,CGATGT-NNNNNN,,N,,,PeterBriggs
//! ```
//!
//! Lines starting with `#` are ignored.

use std::{fmt::Display, path::Path};

use bstr::BString;
use csv::{ReaderBuilder, Trim};
use fgoxide::io::Io;
use serde::Deserialize;
use thiserror::Error;

use crate::sample_metadata::Barcode;

/// The optional line number from the sample sheet where an error ocurred.
#[derive(Debug)]
pub struct ErrorLine(pub Option<usize>);

impl Display for ErrorLine {
    /// Writes the line number if present, nothing if it is not None.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            Some(number) => write!(f, "Line {}", number),
            None => Ok(()),
        }
    }
}

/// The reason that a barcode has been deemed invalid.
#[derive(Debug)]
#[non_exhaustive]
pub enum ReasonBarcodeInvalid {
    EmptyString,
}

impl Display for ReasonBarcodeInvalid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyString => write!(f, "Barcode is an empty string"),
        }
    }
}

/// The error that may occur when parsing barcode specifications or the [`SampleSheet`].
#[derive(Error, Debug)]
pub enum SampleSheetError {
    #[error("Io error occurred")]
    Io(#[from] std::io::Error),

    #[error("Io error occurred")]
    FgError(#[from] fgoxide::FgError),

    #[error(transparent)]
    Deserialize(#[from] csv::Error),

    #[error("Unable to deserialize line number {line}")]
    DeserializeRecord { source: csv::Error, line: usize },

    #[error("Invalid barcode specification `{spec}` ({reason}), expected <name>:<barcode>:<lane>")]
    InvalidBarcodeSpec { spec: String, reason: String },

    #[error("Invalid barcode sequence for {id} `{barcode}` - {reason}. {line}")]
    InvalidBarcode { barcode: String, id: String, reason: ReasonBarcodeInvalid, line: ErrorLine },

    #[error("The sample sheet must include at least one sample")]
    ZeroSamples,
}

/// A single sample row; all other columns are ignored.
#[derive(Debug, Deserialize)]
struct SampleSheetRow {
    #[serde(alias = "Lane")]
    lane: usize,
    #[serde(alias = "SampleID", alias = "Sample_ID")]
    sample_id: String,
    #[serde(alias = "Index", default)]
    index: String,
}

#[derive(Debug, Clone)]
pub struct SampleSheet {
    /// The barcodes in the order of the rows of the sample sheet.
    pub barcodes: Vec<Barcode>,
}

impl SampleSheet {
    /// Builds a `SampleSheet` from the CSV at the given path, which may be gzipped.
    ///
    /// The index of each sample is sanitized with [`Barcode::sanitize_index`].
    ///
    /// # Errors
    ///
    /// - [`SampleSheetError::FgError`] if the file cannot be opened
    /// - [`SampleSheetError::DeserializeRecord`] if a row is missing a required column
    /// - [`SampleSheetError::InvalidBarcode`] if a sanitized index is empty
    /// - [`SampleSheetError::ZeroSamples`] if there are no samples
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, SampleSheetError> {
        let reader = Io::default().new_reader(&path)?;
        Self::from_reader(reader)
    }

    fn from_reader<R: std::io::Read>(reader: R) -> Result<Self, SampleSheetError> {
        let mut reader = ReaderBuilder::new()
            .delimiter(b',')
            .has_headers(true)
            .comment(Some(b'#'))
            .flexible(true)
            .trim(Trim::All)
            .from_reader(reader);
        let headers = reader.headers()?.clone();

        let mut barcodes = vec![];
        for record in reader.records() {
            let record = record?;
            if record.iter().all(str::is_empty) {
                continue;
            }
            let line = record.position().map_or(0, |p| p.line() as usize);
            let row: SampleSheetRow = record
                .deserialize(Some(&headers))
                .map_err(|source| SampleSheetError::DeserializeRecord { source, line })?;
            let sequence = Barcode::sanitize_index(&row.index);
            Barcode::validate_barcode(sequence.as_bytes(), &row.sample_id, Some(line))?;
            barcodes.push(Barcode {
                name: row.sample_id,
                sequence: BString::from(sequence),
                lane: row.lane,
            });
        }

        if barcodes.is_empty() {
            return Err(SampleSheetError::ZeroSamples);
        }
        Ok(SampleSheet { barcodes })
    }
}

#[cfg(test)]
mod tests {
    use bstr::BString;
    use matches::assert_matches;
    use tempfile::tempdir;

    use super::{ReasonBarcodeInvalid, SampleSheet, SampleSheetError};
    use crate::utils::test_commons::write_text_to_file;

    const HEADER: &str =
        "FCID,Lane,SampleID,SampleRef,Index,Description,Control,Recipe,Operator,SampleProject";

    fn sample_sheet_from(rows: &[&str]) -> Result<SampleSheet, SampleSheetError> {
        let contents = format!("{}\n{}\n", HEADER, rows.join("\n"));
        SampleSheet::from_reader(contents.as_bytes())
    }

    #[test]
    fn test_read_sample_sheet() {
        let sheet = sample_sheet_from(&[
            "D190HACXX,1,PB1,PB,ATTAGA,,N,,,PeterBriggs",
            "D190HACXX,1,PB2,PB,CGATGT-NNNNNN,,N,,,PeterBriggs",
            "D190HACXX,2,PB3,PB,TTAGGCNN,,N,,,PeterBriggs",
        ])
        .unwrap();

        let summary: Vec<(&str, BString, usize)> = sheet
            .barcodes
            .iter()
            .map(|b| (b.name.as_str(), b.sequence.clone(), b.lane))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("PB1", BString::from("ATTAGA"), 1),
                ("PB2", BString::from("CGATGT"), 1),
                ("PB3", BString::from("TTAGGC"), 2),
            ]
        );
    }

    #[test]
    fn test_read_sample_sheet_from_path_with_comments() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("SampleSheet.csv");
        let contents = format!(
            "{}\n# a comment line\nD190HACXX,3,AB1,AB,GCCAAT,,N,,,AnneBroadwell\n",
            HEADER
        );
        write_text_to_file(&contents, &path);

        let sheet = SampleSheet::from_path(&path).unwrap();
        assert_eq!(sheet.barcodes.len(), 1);
        assert_eq!(sheet.barcodes[0].name, "AB1");
        assert_eq!(sheet.barcodes[0].sequence, BString::from("GCCAAT"));
        assert_eq!(sheet.barcodes[0].lane, 3);
    }

    #[test]
    fn test_minimal_columns() {
        let contents = "Lane,SampleID,Index\n4,S1,ACGTAC\n";
        let sheet = SampleSheet::from_reader(contents.as_bytes()).unwrap();
        assert_eq!(sheet.barcodes[0].lane, 4);
    }

    #[test]
    fn test_empty_index() {
        let r = sample_sheet_from(&[
            "D190HACXX,1,PB1,PB,ATTAGA,,N,,,PeterBriggs",
            "D190HACXX,1,PB2,PB,NNNNNN,,N,,,PeterBriggs",
        ]);
        assert_matches!(r, Err(SampleSheetError::InvalidBarcode { .. }));
        if let Err(SampleSheetError::InvalidBarcode { id, reason, line, .. }) = r {
            assert_eq!(id, "PB2");
            assert_eq!(line.0, Some(3));
            assert_matches!(reason, ReasonBarcodeInvalid::EmptyString);
        } else {
            panic!("Wrong error returned");
        }
    }

    #[test]
    fn test_invalid_lane() {
        let r = sample_sheet_from(&["D190HACXX,one,PB1,PB,ATTAGA,,N,,,PeterBriggs"]);
        assert_matches!(r, Err(SampleSheetError::DeserializeRecord { line: 2, .. }));
    }

    #[test]
    fn test_no_samples() {
        assert_matches!(sample_sheet_from(&[]), Err(SampleSheetError::ZeroSamples));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempdir().unwrap();
        let r = SampleSheet::from_path(dir.path().join("missing.csv"));
        assert_matches!(r, Err(SampleSheetError::FgError(_)));
    }
}
