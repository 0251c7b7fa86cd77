//! CLI module for archsynth
//!
//! - Argument parsing (`args`)
//! - Runtime setup (`setup`)

pub mod args;
pub mod setup;

pub use args::{Cli, Commands, OutputFormat};
pub use setup::{init_logging, verbosity_filter};
