//! Integration tests for utgcns.
//!
//! These run the built binary end to end on simulated tigs.

mod helpers;
mod test_consensus_command;
