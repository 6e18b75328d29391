//! CLI command handlers.

mod call;
mod commands;

pub use call::{CallArgs, run_call, show_config};
pub use commands::{Cli, Commands};
