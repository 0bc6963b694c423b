//! In-memory read store loaded from FASTQ.
//!
//! Each record's id is the first whitespace-delimited token of its header, parsed as an unsigned
//! integer. Qualities are converted from phred+33.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use ahash::AHashMap;
use anyhow::{Context, Result};
use log::debug;
use seq_io::fastq::{Reader as FastqReader, Record};
use utgcns_abacus::{ReadStore, StoredRead};

use crate::errors::CnsError;

const QUAL_OFFSET: u8 = 33;

/// Reads held in memory, keyed by id.
#[derive(Clone, Debug, Default)]
pub struct InMemoryReadStore {
    reads: AHashMap<u32, StoredRead>,
}

impl InMemoryReadStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads every record of a FASTQ file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, a header does not start with an integer id,
    /// or an id appears twice.
    pub fn from_fastq<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("Failed to open FASTQ file: {}", path.display()))?;
        let store = Self::from_reader(BufReader::new(file), &path.display().to_string())?;
        debug!("Loaded {} reads from {}", store.len(), path.display());
        Ok(store)
    }

    /// Loads every record of a FASTQ stream. `path` is used in error messages only.
    ///
    /// # Errors
    ///
    /// See [`InMemoryReadStore::from_fastq`].
    pub fn from_reader<R: Read>(reader: R, path: &str) -> Result<Self> {
        let mut store = Self::new();
        let mut fastq = FastqReader::new(reader);
        let mut n = 0usize;

        while let Some(record) = fastq.next() {
            n += 1;
            let record = record.with_context(|| format!("Failed to parse FASTQ file: {path}"))?;
            let head = String::from_utf8_lossy(record.head());
            let token = head.split_whitespace().next().unwrap_or("");
            let read_id: u32 = token.parse().map_err(|_| CnsError::InvalidFileFormat {
                file_type: "FASTQ".to_string(),
                path: path.to_string(),
                line: n,
                reason: format!("read name '{token}' is not an integer read id"),
            })?;

            let quals = record
                .qual()
                .iter()
                .map(|&q| {
                    q.checked_sub(QUAL_OFFSET).ok_or_else(|| CnsError::InvalidFileFormat {
                        file_type: "FASTQ".to_string(),
                        path: path.to_string(),
                        line: n,
                        reason: format!("quality character {q} below '!'"),
                    })
                })
                .collect::<std::result::Result<Vec<u8>, CnsError>>()?;

            if store.insert(read_id, record.seq().to_vec(), quals).is_some() {
                return Err(CnsError::DuplicateRead { read_id, path: path.to_string() }.into());
            }
        }
        Ok(store)
    }

    /// Adds a read, returning the read previously stored under `read_id`, if any.
    pub fn insert(
        &mut self,
        read_id: u32,
        sequence: Vec<u8>,
        quality: Vec<u8>,
    ) -> Option<StoredRead> {
        self.reads.insert(read_id, StoredRead { sequence, quality })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.reads.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.reads.is_empty()
    }
}

impl ReadStore for InMemoryReadStore {
    fn read(&self, read_id: u32) -> Option<StoredRead> {
        self.reads.get(&read_id).cloned()
    }

    fn contains(&self, read_id: u32) -> bool {
        self.reads.contains_key(&read_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_from_fastq() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "@1 length=4\nACGT\n+\nIII!\n@22\nGG\n+\n55\n").unwrap();
        let store = InMemoryReadStore::from_fastq(file.path()).unwrap();

        assert_eq!(store.len(), 2);
        let read = store.read(1).unwrap();
        assert_eq!(read.sequence, b"ACGT");
        assert_eq!(read.quality, vec![40, 40, 40, 0]);
        assert!(store.contains(22));
        assert!(!store.contains(3));
        assert_eq!(store.read(3), None);
    }

    #[test]
    fn test_non_integer_name_is_an_error() {
        let err = InMemoryReadStore::from_reader(Cursor::new("@read1\nA\n+\nI\n"), "x.fq")
            .unwrap_err()
            .to_string();
        assert!(err.contains("'read1' is not an integer"), "{err}");
    }

    #[test]
    fn test_duplicate_is_an_error() {
        let err = InMemoryReadStore::from_reader(Cursor::new("@4\nA\n+\nI\n@4\nC\n+\nI\n"), "x.fq")
            .unwrap_err()
            .to_string();
        assert!(err.contains("Read 4 appears more than once"), "{err}");
    }

    #[test]
    fn test_insert() {
        let mut store = InMemoryReadStore::new();
        assert!(store.is_empty());
        assert!(store.insert(9, b"AC".to_vec(), vec![10, 20]).is_none());
        assert!(store.insert(9, b"GT".to_vec(), vec![10, 20]).is_some());
        assert_eq!(store.read(9).unwrap().sequence, b"GT");
    }
}
