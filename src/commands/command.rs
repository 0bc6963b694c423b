//! The trait every subcommand implements.

use anyhow::Result;
use enum_dispatch::enum_dispatch;

/// A runnable subcommand, dispatched from the `Subcommand` enum in `main.rs`.
#[enum_dispatch]
pub trait Command {
    /// Runs the command; `command_line` is the full invocation, for logging.
    #[allow(clippy::missing_errors_doc)]
    fn execute(&self, command_line: &str) -> Result<()>;
}
