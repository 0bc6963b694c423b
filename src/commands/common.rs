//! Option groups shared by commands, composed with `#[command(flatten)]`.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Result, anyhow};
use clap::Args;

use utgcns_lib::unitig_consensus::{
    ConsensusOptions, DEFAULT_ERROR_RATE, DEFAULT_ERROR_RATE_MAX, DEFAULT_MIN_OVERLAP,
};
use utgcns_lib::validation::{validate_files_exist, validate_positive};

/// Reads and layouts to compute consensus from.
#[derive(Debug, Clone, Args)]
pub struct InputOptions {
    /// FASTQ file holding every read referenced by the layouts
    #[arg(short = 'r', long = "reads")]
    pub reads: PathBuf,

    /// Layout file of the tigs to process
    #[arg(short = 't', long = "layouts")]
    pub layouts: PathBuf,
}

impl InputOptions {
    /// Validates that both inputs exist.
    ///
    /// # Errors
    ///
    /// Returns an error for the first missing input.
    pub fn validate(&self) -> Result<()> {
        validate_files_exist(&[(&self.reads, "Read store"), (&self.layouts, "Layout file")])?;
        Ok(())
    }
}

/// Where results go; every output is optional.
#[derive(Debug, Clone, Default, Args)]
pub struct OutputOptions {
    /// Write processed tigs, with consensus and refined positions, to this layout file
    #[arg(short = 'L', long = "layouts-out")]
    pub layouts_out: Option<PathBuf>,

    /// Write consensus sequences to this FASTQ file
    #[arg(short = 'F', long = "fastq-out")]
    pub fastq_out: Option<PathBuf>,

    /// Write per-tig metrics to this TSV file
    #[arg(short = 's', long = "stats")]
    pub stats: Option<PathBuf>,
}

impl OutputOptions {
    /// True if at least one output is requested.
    #[must_use]
    pub fn any(&self) -> bool {
        self.layouts_out.is_some() || self.fastq_out.is_some() || self.stats.is_some()
    }
}

/// How reads are aligned to the growing consensus.
#[derive(Debug, Clone, Args)]
pub struct AlignmentOptions {
    /// Expected error rate of an alignment between a read and the consensus
    #[arg(short = 'e', long = "error-rate", default_value_t = DEFAULT_ERROR_RATE)]
    pub error_rate: f64,

    /// Hard error ceiling for forced alignments and for any 100 column window
    #[arg(long = "error-rate-max", default_value_t = DEFAULT_ERROR_RATE_MAX)]
    pub error_rate_max: f64,

    /// Minimum length of an accepted alignment
    #[arg(short = 'l', long = "min-overlap", default_value_t = DEFAULT_MIN_OVERLAP)]
    pub min_overlap: usize,
}

impl Default for AlignmentOptions {
    fn default() -> Self {
        Self {
            error_rate: DEFAULT_ERROR_RATE,
            error_rate_max: DEFAULT_ERROR_RATE_MAX,
            min_overlap: DEFAULT_MIN_OVERLAP,
        }
    }
}

impl AlignmentOptions {
    /// Builds the driver options; `seed`, `keep_failed` and `show_result` come from the command.
    #[must_use]
    pub fn to_consensus_options(
        &self,
        seed: u64,
        keep_failed: bool,
        show_result: bool,
    ) -> ConsensusOptions {
        ConsensusOptions {
            error_rate: self.error_rate,
            error_rate_max: self.error_rate_max,
            min_overlap: self.min_overlap,
            seed,
            keep_failed,
            show_result,
        }
    }

    /// Validates the error rates and overlap.
    ///
    /// # Errors
    ///
    /// Returns an error if a rate is outside `(0, 1]`, the rates are out of order, or the overlap
    /// is zero.
    pub fn validate(&self) -> Result<()> {
        self.to_consensus_options(0, false, false).validate()?;
        validate_positive(self.min_overlap, "min-overlap")?;
        Ok(())
    }
}

/// Worker threads.
#[derive(Debug, Clone, Args)]
pub struct ThreadingOptions {
    /// Number of tigs processed at once
    #[arg(long = "threads", default_value_t = 1)]
    pub threads: usize,
}

impl Default for ThreadingOptions {
    fn default() -> Self {
        Self { threads: 1 }
    }
}

impl ThreadingOptions {
    /// # Errors
    ///
    /// Returns an error if `threads` is zero.
    pub fn validate(&self) -> Result<()> {
        validate_positive(self.threads, "threads")?;
        Ok(())
    }

    /// Builds the pool tigs are processed in.
    ///
    /// # Errors
    ///
    /// Returns an error if the pool cannot be created.
    pub fn build_pool(&self) -> Result<rayon::ThreadPool> {
        rayon::ThreadPoolBuilder::new()
            .num_threads(self.threads)
            .thread_name(|i| format!("utgcns-worker-{i}"))
            .build()
            .map_err(|e| anyhow!("Failed to build a pool of {} threads: {e}", self.threads))
    }

    #[must_use]
    pub fn log_message(&self) -> String {
        if self.threads == 1 {
            "Single-threaded mode".to_string()
        } else {
            format!("Using {} threads", self.threads)
        }
    }
}

/// An inclusive range of tig ids, written `N` or `N-M`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TigRange {
    pub first: u32,
    pub last: u32,
}

impl TigRange {
    #[must_use]
    pub fn contains(&self, tig_id: u32) -> bool {
        self.first <= tig_id && tig_id <= self.last
    }
}

impl FromStr for TigRange {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let parse = |token: &str| {
            token.trim().parse::<u32>().map_err(|_| format!("invalid tig id '{token}' in '{s}'"))
        };
        let (first, last) = match s.split_once('-') {
            Some((a, b)) => (parse(a)?, parse(b)?),
            None => {
                let id = parse(s)?;
                (id, id)
            }
        };
        if first > last {
            return Err(format!("tig range '{s}' is empty"));
        }
        Ok(Self { first, last })
    }
}

impl fmt::Display for TigRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.first == self.last {
            write!(f, "{}", self.first)
        } else {
            write!(f, "{}-{}", self.first, self.last)
        }
    }
}
