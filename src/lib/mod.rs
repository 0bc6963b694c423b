#![deny(unsafe_code)]
// Clippy lint configuration for CI
// - cast_*: coordinates move between i32 columns, u32 ids and usize indexes
// - missing_*_doc: documentation improvements tracked separately
// - too_many_lines: the placement and alignment routines read best unsplit
#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::cast_lossless,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::needless_pass_by_value,
    clippy::items_after_statements,
    clippy::too_many_lines,
    clippy::struct_excessive_bools,
    clippy::uninlined_format_args
)]

//! # utgcns - consensus for assembled unitigs
//!
//! A tig is an ordered list of reads (its layout) with approximate positions. This library
//! computes the tig's consensus sequence by threading each read onto a multiple alignment held
//! in an [`Abacus`](utgcns_abacus::Abacus), then refining and calling its columns.
//!
//! ### Core
//!
//! - **[`unitig_consensus`]** - the per-tig driver: estimate, align and apply each read
//! - **[`aligner`]** - pairwise overlap alignment used to place reads
//! - **[`utgcns_abacus`]** - the multiple alignment, its refinement and base calling
//!
//! ### Data
//!
//! - **[`tig`]** - tigs and child positions
//! - **[`layout`]** - the layout text format
//! - **[`read_store`]** - reads loaded from FASTQ
//! - **[`stash`]** - leaving out contained reads to cap depth
//!
//! ### Output and utilities
//!
//! - **[`fastq`]** - consensus FASTQ
//! - **[`metrics`]** - per-tig TSV metrics
//! - **[`logging`]**, **[`progress`]** - log formatting and periodic progress
//! - **[`validation`]** - input checks
//!
//! ## Quick Start
//!
//! ```no_run
//! use utgcns_lib::layout::read_layouts;
//! use utgcns_lib::read_store::InMemoryReadStore;
//! use utgcns_lib::unitig_consensus::{ConsensusOptions, UnitigConsensus};
//!
//! # fn main() -> anyhow::Result<()> {
//! let store = InMemoryReadStore::from_fastq("reads.fastq")?;
//! let mut tigs = read_layouts("tigs.layout")?;
//!
//! let mut consensus = UnitigConsensus::new(&store, ConsensusOptions::default());
//! for tig in &mut tigs {
//!     let report = consensus.generate(tig)?;
//!     println!("tig {} placed {} reads", tig.ident, report.num_placed());
//! }
//! # Ok(())
//! # }
//! ```

pub mod aligner;
pub mod errors;
pub mod fastq;
pub mod layout;
pub mod logging;
pub mod metrics;
pub mod progress;
pub mod read_store;
pub mod stash;
pub mod tig;
pub mod unitig_consensus;
pub mod validation;

pub use utgcns_abacus;
