//! Errors raised while loading reads into an abacus.

use thiserror::Error;

/// Result type alias for abacus operations
pub type Result<T> = std::result::Result<T, AbacusError>;

/// Error type for abacus operations
///
/// Only conditions that depend on external input are errors; broken internal linkage panics.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AbacusError {
    /// The read store has no read with this id
    #[error("Read {read_id} not found in read store")]
    MissingRead {
        /// The missing read id
        read_id: u32,
    },

    /// Trimming left nothing to align
    #[error(
        "Read {read_id} of length {length} is empty after skipping {left_skip} + {right_skip} bases"
    )]
    EmptyAfterSkip {
        /// The read id
        read_id: u32,
        /// Untrimmed read length
        length: usize,
        /// Bases skipped at the start
        left_skip: u32,
        /// Bases skipped at the end
        right_skip: u32,
    },

    /// Sequence and quality lengths disagree
    #[error("Read {read_id} has {bases} bases but {quals} qualities")]
    QualityLengthMismatch {
        /// The read id
        read_id: u32,
        /// Number of bases
        bases: usize,
        /// Number of qualities
        quals: usize,
    },
}
