//! Custom error types for utgcns operations.

use thiserror::Error;
use utgcns_abacus::AbacusError;

use crate::tig::ChildKind;

/// Result type alias for utgcns operations
pub type Result<T> = std::result::Result<T, CnsError>;

/// Error type for file and parameter problems
#[derive(Error, Debug)]
pub enum CnsError {
    /// Invalid parameter value provided
    #[error("Invalid parameter '{parameter}': {reason}")]
    InvalidParameter {
        /// The parameter name
        parameter: String,
        /// Explanation of why it's invalid
        reason: String,
    },

    /// Invalid error rate
    #[error("Invalid {parameter}: {value} (must be greater than {min} and at most {max})")]
    InvalidErrorRate {
        /// Which error rate
        parameter: String,
        /// The invalid value
        value: f64,
        /// Exclusive lower bound
        min: f64,
        /// Inclusive upper bound
        max: f64,
    },

    /// File format error
    #[error("Invalid {file_type} file '{path}' at line {line}: {reason}")]
    InvalidFileFormat {
        /// Type of file (e.g., "layout", "FASTQ")
        file_type: String,
        /// Path to the file
        path: String,
        /// 1-based line (or record) number
        line: usize,
        /// Explanation of the problem
        reason: String,
    },

    /// An input file is missing
    #[error("{description} does not exist: {path}")]
    MissingFile {
        /// What the file is for
        description: String,
        /// Path to the file
        path: String,
    },

    /// The same read id appears twice in a read source
    #[error("Read {read_id} appears more than once in '{path}'")]
    DuplicateRead {
        /// The duplicated read id
        read_id: u32,
        /// Path to the file
        path: String,
    },
}

/// Result type alias for per-tig consensus
pub type ConsensusResult<T> = std::result::Result<T, ConsensusError>;

/// Conditions under which a tig cannot be processed at all
///
/// Reads that merely fail to place are not errors; they are reported on the
/// [`TigConsensusReport`](crate::unitig_consensus::TigConsensusReport).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConsensusError {
    /// The tig has no children
    #[error("Tig {tig_id} has no children")]
    EmptyTig {
        /// The tig id
        tig_id: u32,
    },

    /// A child is not a read
    #[error("Tig {tig_id} child {child_id} is a {kind}, only reads are supported")]
    NonReadChild {
        /// The tig id
        tig_id: u32,
        /// The offending child's id
        child_id: u32,
        /// What the child is
        kind: ChildKind,
    },

    /// A read is placed twice
    #[error("Tig {tig_id} contains read {read_id} more than once")]
    DuplicateChild {
        /// The tig id
        tig_id: u32,
        /// The duplicated read id
        read_id: u32,
    },

    /// A read could not be loaded
    #[error("Tig {tig_id}: {source}")]
    Abacus {
        /// The tig id
        tig_id: u32,
        /// The underlying load failure
        #[source]
        source: AbacusError,
    },
}
