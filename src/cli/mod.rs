//! Command-line interface for pageclone
//!
//! - `args`: clap argument definitions
//! - `run`: entry point and command dispatch
//! - `commands`: command implementations and output rendering

pub mod args;
mod commands;
mod run;


pub use args::{Cli, Commands, build_cli};
pub use run::run;
