//! FASTQ output of tig consensus.
//!
//! Each tig with consensus becomes one record named `tig` plus the zero-padded tig id, holding
//! the ungapped bases and their qualities in Phred+33.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};

use crate::tig::Tig;

/// Record name for a tig.
#[must_use]
pub fn tig_name(tig_id: u32) -> String {
    format!("tig{tig_id:08}")
}

/// Writes consensus sequences to a plain FASTQ file.
pub struct ConsensusFastqWriter {
    writer: BufWriter<File>,
    records: u64,
}

impl ConsensusFastqWriter {
    /// Creates the output file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file =
            File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
        Ok(Self { writer: BufWriter::new(file), records: 0 })
    }

    /// Writes the ungapped consensus of `tig`; tigs without consensus are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_tig(&mut self, tig: &Tig) -> Result<()> {
        if !tig.has_consensus() {
            return Ok(());
        }
        let (bases, quals) = (tig.ungapped_bases(), tig.ungapped_quals());
        write_record_to(&mut self.writer, &tig_name(tig.ident), &bases, &quals)?;
        self.records += 1;
        Ok(())
    }

    /// Records written so far.
    #[must_use]
    pub fn records(&self) -> u64 {
        self.records
    }

    /// Flushes the file.
    ///
    /// # Errors
    ///
    /// Returns an error if flushing fails.
    pub fn finish(mut self) -> Result<()> {
        self.writer.flush().context("Failed to flush consensus FASTQ")
    }
}

/// Writes one FASTQ record; `qual` holds raw Phred scores.
pub fn write_record_to<W: Write>(
    writer: &mut W,
    name: &str,
    seq: &[u8],
    qual: &[u8],
) -> Result<()> {
    writeln!(writer, "@{name}")?;
    writer.write_all(seq)?;
    writeln!(writer)?;
    writeln!(writer, "+")?;
    let encoded: Vec<u8> = qual.iter().map(|&q| q.saturating_add(33).min(126)).collect();
    writer.write_all(&encoded)?;
    writeln!(writer)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_tig_name() {
        assert_eq!(tig_name(7), "tig00000007");
        assert_eq!(tig_name(123_456_789), "tig123456789");
    }

    #[test]
    fn test_write_record_caps_quality() -> Result<()> {
        let mut out = Vec::new();
        write_record_to(&mut out, "r1", b"ACGT", &[0, 30, 93, 120])?;
        assert_eq!(String::from_utf8(out)?, "@r1\nACGT\n+\n!?~~\n");
        Ok(())
    }

    #[test]
    fn test_writes_ungapped_consensus() -> Result<()> {
        let temp = NamedTempFile::new()?;

        let mut with_cns = Tig::new(3);
        with_cns.bases = b"AC-GT".to_vec();
        with_cns.quals = vec![30, 20, 0, 10, 40];
        let without_cns = Tig::new(4);

        let mut writer = ConsensusFastqWriter::new(temp.path())?;
        writer.write_tig(&with_cns)?;
        writer.write_tig(&without_cns)?;
        assert_eq!(writer.records(), 1);
        writer.finish()?;

        let content = std::fs::read_to_string(temp.path())?;
        assert_eq!(content, "@tig00000003\nACGT\n+\n?5+I\n");
        Ok(())
    }
}
