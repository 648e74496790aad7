#![forbid(unsafe_code)]
#![allow(clippy::must_use_candidate)]

use std::{fmt::Display, str::FromStr};

use ahash::AHashSet;
use bstr::{BString, ByteSlice};
use itertools::Itertools;
use log::warn;

use crate::sample_sheet::{ErrorLine, ReasonBarcodeInvalid, SampleSheetError};

/// The delimiter between the fields of a barcode specification, i.e. `<name>:<barcode>:<lane>`.
const SPEC_DELIMITER: char = ':';

/// An expected barcode (index) sequence, the sample it identifies, and the lane it is in.
///
/// Barcodes are held in the order they were given, which is also their match priority.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Barcode {
    /// The name of the sample, used to name its output file.
    pub name: String,
    /// The barcode sequence.
    pub sequence: BString,
    /// The lane the barcode was used in.
    pub lane: usize,
}

impl Barcode {
    /// Create a new [`Barcode`].
    ///
    /// # Errors
    ///
    /// - [`SampleSheetError::InvalidBarcode`] if the sequence is empty
    pub fn new<S: Into<BString>>(
        name: String,
        sequence: S,
        lane: usize,
    ) -> Result<Self, SampleSheetError> {
        let sequence = sequence.into();
        Self::validate_barcode(&sequence, &name, None)?;
        Ok(Self { name, sequence, lane })
    }

    /// Run a set of validations on a barcode to ensure that it is well formed.
    ///
    /// # Errors
    ///
    /// - [`SampleSheetError::InvalidBarcode`] if the barcode is invalid
    pub fn validate_barcode(
        barcode: &[u8],
        id: &str,
        line_number: Option<usize>,
    ) -> Result<(), SampleSheetError> {
        if barcode.is_empty() {
            Err(SampleSheetError::InvalidBarcode {
                id: id.to_owned(),
                barcode: barcode.to_str_lossy().to_string(),
                reason: ReasonBarcodeInvalid::EmptyString,
                line: ErrorLine(line_number),
            })
        } else {
            Ok(())
        }
    }

    /// Sanitize an index from a sample sheet by removing trailing `N`s, then a trailing `-`,
    /// then trailing `N`s again.
    ///
    /// This strips the placeholder second index of a dual-index run, e.g. `ACGTAC-NNNNNN`
    /// becomes `ACGTAC`.
    pub fn sanitize_index(raw_index: &str) -> String {
        raw_index.trim_end_matches('N').trim_end_matches('-').trim_end_matches('N').to_string()
    }
}

impl Display for Barcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.name, self.sequence, self.lane)
    }
}

impl FromStr for Barcode {
    type Err = SampleSheetError;

    /// Parse a barcode from a `<name>:<barcode>:<lane>` specification, e.g. `PB1:ATTAGA:3`.
    fn from_str(spec: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| SampleSheetError::InvalidBarcodeSpec {
            spec: spec.to_string(),
            reason: reason.to_string(),
        };
        let (name, sequence, lane) = spec
            .split(SPEC_DELIMITER)
            .collect_tuple()
            .ok_or_else(|| invalid("expected exactly three ':'-delimited fields"))?;
        if name.is_empty() {
            return Err(invalid("the name is empty"));
        }
        if sequence.is_empty() {
            return Err(invalid("the barcode is empty"));
        }
        let lane = lane.parse::<usize>().map_err(|_| invalid("the lane is not a number"))?;
        Self::new(name.to_string(), sequence, lane)
    }
}

/// Returns the barcodes assigned to `lane`, in their original order.
///
/// Only the first barcode with a given sequence is kept: any later barcode with the same
/// sequence could never be matched first.
pub fn barcodes_for_lane(barcodes: &[Barcode], lane: usize) -> Vec<Barcode> {
    let mut seen = AHashSet::new();
    let mut lane_barcodes = vec![];
    for barcode in barcodes.iter().filter(|b| b.lane == lane) {
        if seen.insert(&barcode.sequence) {
            lane_barcodes.push(barcode.clone());
        } else {
            warn!("Ignoring {}: its barcode is already assigned in lane {}", barcode, lane);
        }
    }
    lane_barcodes
}
