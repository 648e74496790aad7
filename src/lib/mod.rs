//! A library of functionality for demultiplexing the undetermined FASTQs of a sequencing run.
//!
//! # Overview
//!
//! The flow of data is as follows:
//!
//! - [`utils::InputFastq::slurp`] finds the Illumina FASTQs to process, one
//!   [`demux::DemultiplexJob`] per FASTQ.
//! - The [`reads::RecordReader`] yields [`reads::Record`]s from each FASTQ, detecting the record
//!   shape from the file name and decompressing gzipped input.
//! - The [`demux::Demultiplexer`] extracts the index from each header with
//!   [`fastq_header::index_sequence`] and asks a [`matcher::Matcher`] for the first barcode it
//!   matches.
//! - The [`sample_writer::SampleWriters`] create every output of a job (or none of them) and
//!   write each record to its output.
#![deny(unsafe_code)]
#![allow(
    clippy::must_use_candidate,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc,
    clippy::module_name_repetitions
)]
pub mod demux;
pub mod errors;
pub mod fastq_header;
pub mod format;
pub mod matcher;
pub mod opts;
pub mod reads;
pub mod run;
pub mod sample_metadata;
pub mod sample_sheet;
pub mod sample_writer;
pub mod utils;
