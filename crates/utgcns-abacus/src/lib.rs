#![deny(unsafe_code)]
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss,
    clippy::module_name_repetitions,
    clippy::missing_panics_doc,
    clippy::must_use_candidate
)]

//! Column/bead multiple alignment engine for unitig consensus.
//!
//! This crate provides the "abacus": reads are loaded as rows of beads and threaded onto a
//! shared frame of columns one pairwise alignment at a time.
//! - [`abacus`] - Arenas and the linkage primitives
//! - [`apply_alignment`] - Replaying a pairwise trace into the frame
//! - [`multi_align`] - Consensus, placements and text display of a finished alignment
//! - [`refine`] - Gap re-justification and column merging
//! - [`base_call`] - Quality-weighted column calls

pub mod abacus;
pub mod apply_alignment;
pub mod base_call;
pub mod base_count;
pub mod bead;
pub mod column;
pub mod dna;
pub mod errors;
pub mod ids;
pub mod iterators;
pub mod multi_align;
pub mod phred;
pub mod read_store;
pub mod refine;
pub mod sequence;

// Re-export commonly used types
pub use abacus::Abacus;
pub use apply_alignment::AlignTarget;
pub use base_count::{BaseCount, GAP};
pub use errors::{AbacusError, Result};
pub use ids::{BaseId, BeadId, ColumnId, MultiAlignId, SeqId};
pub use multi_align::MultiAlign;
pub use read_store::{ReadStore, StoredRead};
pub use refine::{MAX_WINDOW_FOR_ABACUS_REFINE, RefineLevel, STABWIDTH};
