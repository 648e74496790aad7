//! A small manager struct to create and write to the full set of output files for one job.

use std::{
    fs::{File, OpenOptions},
    io::BufWriter,
    path::{Path, PathBuf},
};

use ahash::AHashSet;
use log::{debug, warn};

use crate::{errors::DemuxError, reads::Record};

/// The buffer size for each output file.
const BUFSIZE: usize = 64 * 1024;

/// True if anything, including a dangling symlink, is present at `path`.
fn occupied(path: &Path) -> bool {
    std::fs::symlink_metadata(path).is_ok()
}

/// Holds the open writers for every output file of a job, one per destination.
#[derive(Debug)]
pub struct SampleWriters {
    paths: Vec<PathBuf>,
    writers: Vec<BufWriter<File>>,
    /// The number of records written to each destination.
    pub records_written: Vec<usize>,
}

impl SampleWriters {
    /// Create every file in `paths`, or none of them.
    ///
    /// All paths are first checked for existence, and nothing is created if any already exists.
    /// Files are then created exclusively; if one cannot be created, those already created are
    /// removed before the error is returned.
    ///
    /// # Errors
    ///
    /// - [`DemuxError::InvalidArgument`] if `paths` is empty or contains duplicates
    /// - [`DemuxError::DestinationCollision`] if any of the paths already exist
    /// - [`DemuxError::Io`] if a file cannot be created
    pub fn create(paths: Vec<PathBuf>) -> Result<Self, DemuxError> {
        if paths.is_empty() {
            return Err(DemuxError::InvalidArgument(String::from(
                "at least one output file must be given",
            )));
        }
        let mut unique = AHashSet::new();
        if let Some(duplicate) = paths.iter().find(|p| !unique.insert(*p)) {
            return Err(DemuxError::InvalidArgument(format!(
                "output file is given more than once: {}",
                duplicate.to_string_lossy()
            )));
        }

        let existing: Vec<PathBuf> = paths.iter().filter(|p| occupied(p)).cloned().collect();
        if !existing.is_empty() {
            return Err(DemuxError::DestinationCollision { paths: existing });
        }

        let mut writers = Vec::with_capacity(paths.len());
        for path in &paths {
            match OpenOptions::new().write(true).create_new(true).open(path) {
                Ok(file) => writers.push(BufWriter::with_capacity(BUFSIZE, file)),
                Err(error) => {
                    let created = writers.len();
                    drop(writers);
                    Self::remove_created(&paths[..created]);
                    return Err(DemuxError::io(path, error));
                }
            }
        }

        let records_written = vec![0; paths.len()];
        Ok(Self { paths, writers, records_written })
    }

    /// Remove the files created by [`Self::create`] before it failed.
    fn remove_created(created: &[PathBuf]) {
        for path in created {
            if let Err(error) = std::fs::remove_file(path) {
                warn!("Unable to remove {}: {}", path.to_string_lossy(), error);
            }
        }
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn len(&self) -> usize {
        self.writers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writers.is_empty()
    }

    /// Write the record to the destination at `index`.
    pub fn write_record(&mut self, index: usize, record: &Record) -> Result<(), DemuxError> {
        let writer = self.writers.get_mut(index).ok_or_else(|| {
            DemuxError::InvalidArgument(format!("no output file with index {}", index))
        })?;
        record.write(writer).map_err(|e| DemuxError::io(&self.paths[index], e))?;
        self.records_written[index] += 1;
        Ok(())
    }

    /// Consumes [`Self`], flushing and closing every writer.  Returns the number of records
    /// written to each destination.
    pub fn finish(self) -> Result<Vec<usize>, DemuxError> {
        for (writer, path) in self.writers.into_iter().zip(self.paths.iter()) {
            writer.into_inner().map_err(|e| DemuxError::io(path, e.into_error()))?;
            debug!("Closed {}", path.to_string_lossy());
        }
        Ok(self.records_written)
    }
}

#[cfg(test)]
mod test {
    use std::fs;

    use bstr::BString;
    use matches::assert_matches;
    use tempfile::tempdir;

    use super::SampleWriters;
    use crate::{errors::DemuxError, reads::Record};

    fn record(name: &str) -> Record {
        Record::new(vec![
            BString::from(format!("@{} 1:N:0:ACGT", name)),
            BString::from("ACGT"),
            BString::from("+"),
            BString::from("IIII"),
        ])
    }

    #[test]
    fn test_sample_writers_simple() {
        let dir = tempdir().unwrap();
        let paths = vec![dir.path().join("s1.fastq"), dir.path().join("unbinned.fastq")];
        let mut writers = SampleWriters::create(paths.clone()).unwrap();
        assert_eq!(writers.len(), 2);

        writers.write_record(0, &record("r1")).unwrap();
        writers.write_record(1, &record("r2")).unwrap();
        writers.write_record(0, &record("r3")).unwrap();
        let counts = writers.finish().unwrap();
        assert_eq!(counts, vec![2, 1]);

        assert_eq!(
            fs::read_to_string(&paths[0]).unwrap(),
            "@r1 1:N:0:ACGT\nACGT\n+\nIIII\n@r3 1:N:0:ACGT\nACGT\n+\nIIII\n"
        );
        assert_eq!(fs::read_to_string(&paths[1]).unwrap(), "@r2 1:N:0:ACGT\nACGT\n+\nIIII\n");
    }

    #[test]
    fn test_collision_creates_nothing() {
        let dir = tempdir().unwrap();
        let paths = vec![
            dir.path().join("s1.fastq"),
            dir.path().join("s2.fastq"),
            dir.path().join("unbinned.fastq"),
        ];
        fs::write(&paths[1], "existing").unwrap();

        let result = SampleWriters::create(paths.clone());
        assert_matches!(result, Err(DemuxError::DestinationCollision { .. }));
        if let Err(DemuxError::DestinationCollision { paths: existing }) = result {
            assert_eq!(existing, vec![paths[1].clone()]);
        }
        assert!(!paths[0].exists());
        assert!(!paths[2].exists());
        assert_eq!(fs::read_to_string(&paths[1]).unwrap(), "existing");
    }

    #[test]
    fn test_failed_creation_removes_created_files() {
        let dir = tempdir().unwrap();
        let paths = vec![
            dir.path().join("s1.fastq"),
            dir.path().join("missing_dir").join("s2.fastq"),
            dir.path().join("unbinned.fastq"),
        ];
        assert_matches!(SampleWriters::create(paths.clone()), Err(DemuxError::Io { .. }));
        assert!(paths.iter().all(|p| !p.exists()));
    }

    #[test]
    fn test_cleanup_leaves_files_it_did_not_create() {
        let dir = tempdir().unwrap();
        let paths = vec![dir.path().join("s1.fastq"), dir.path().join("s2.fastq")];
        // s1 was created by a job that then lost a race for s2
        fs::write(&paths[0], "").unwrap();
        fs::write(&paths[1], "FOREIGN").unwrap();

        SampleWriters::remove_created(&paths[..1]);
        assert!(!paths[0].exists());
        assert_eq!(fs::read_to_string(&paths[1]).unwrap(), "FOREIGN");
    }

    #[cfg(unix)]
    #[test]
    fn test_dangling_symlink_is_a_collision() {
        let dir = tempdir().unwrap();
        let paths = vec![dir.path().join("s1.fastq"), dir.path().join("unbinned.fastq")];
        std::os::unix::fs::symlink(dir.path().join("nowhere"), &paths[1]).unwrap();

        let result = SampleWriters::create(paths.clone());
        assert_matches!(result, Err(DemuxError::DestinationCollision { .. }));
        assert!(!paths[0].exists());
        assert!(fs::symlink_metadata(&paths[1]).unwrap().file_type().is_symlink());
    }

    #[test]
    fn test_duplicate_paths() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("s1.fastq");
        assert_matches!(
            SampleWriters::create(vec![path.clone(), path.clone()]),
            Err(DemuxError::InvalidArgument(_))
        );
        assert!(!path.exists());
    }

    #[test]
    fn test_write_to_unknown_destination() {
        let dir = tempdir().unwrap();
        let mut writers = SampleWriters::create(vec![dir.path().join("s1.fastq")]).unwrap();
        assert_matches!(writers.write_record(3, &record("r1")), Err(DemuxError::InvalidArgument(_)));
    }
}
