//! CLI command implementations for utgcns.
//!
//! - [`consensus`] - compute tig consensus from a read layout

#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::uninlined_format_args
)]

pub mod command;
pub mod common;
pub mod consensus;
