//! The read source the abacus ingests from.

/// Sequence and per-base quality (raw phred, not ASCII-offset) of one read.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StoredRead {
    pub sequence: Vec<u8>,
    pub quality: Vec<u8>,
}

impl StoredRead {
    /// Builds a read, filling in a flat quality when `quality` is empty.
    #[must_use]
    pub fn new(sequence: Vec<u8>, quality: Vec<u8>, default_quality: u8) -> Self {
        let quality =
            if quality.is_empty() { vec![default_quality; sequence.len()] } else { quality };
        Self { sequence, quality }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }
}

/// Read-only lookup of reads by dense integer id.
///
/// Implementations must be safe to share between threads consensing different tigs.
pub trait ReadStore: Sync {
    /// The read with the given id, or `None` if it is not present in this store.
    fn read(&self, read_id: u32) -> Option<StoredRead>;

    /// True if `read_id` is present in this store (or partition of it).
    fn contains(&self, read_id: u32) -> bool {
        self.read(read_id).is_some()
    }
}
