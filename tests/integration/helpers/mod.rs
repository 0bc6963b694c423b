//! Helper utilities for integration tests.

pub mod assertions;
pub mod tig_generator;

pub use assertions::*;
pub use tig_generator::*;
