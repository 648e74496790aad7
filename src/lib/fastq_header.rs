#![forbid(unsafe_code)]
#![allow(clippy::must_use_candidate)]
//! Extract the index (sample barcode) sequence from a FASTQ header.
//!
//! The index sequence is the last `:`-delimited field of the header line.  For example, for
//! the Casava 1.8+ style header:
//!
//! ```text
//! @K00311:43:HL3LWBBXX:8:1101:21440:1121 1:N:0:CNATGT
//! ```
//!
//! the index sequence is `CNATGT`.  For dual-indexed reads the whole of the last field (e.g.
//! `GCATAAGCTT+GGCGACGGAA`) is returned.
//!
//! # Usage
//!
//! ```rust
//! use udemux_lib::fastq_header::index_sequence;
//! let header = b"@K00311:43:HL3LWBBXX:8:1101:21440:1121 1:N:0:CNATGT";
//! assert_eq!(index_sequence(header), Some(&b"CNATGT"[..]));
//! ```

/// The delimiter between the fields of a FASTQ header.
pub const FIELD_DELIMITER: u8 = b':';

/// Returns the index sequence following the final field delimiter of `header`.
///
/// Trailing whitespace is ignored.  Returns `None` if the header contains no delimiter or the
/// final field is empty.
pub fn index_sequence(header: &[u8]) -> Option<&[u8]> {
    let end = header.iter().rposition(|b| !b.is_ascii_whitespace()).map_or(0, |i| i + 1);
    let header = &header[..end];
    let start = header.iter().rposition(|&b| b == FIELD_DELIMITER)? + 1;
    let index = &header[start..];
    if index.is_empty() {
        None
    } else {
        Some(index)
    }
}
