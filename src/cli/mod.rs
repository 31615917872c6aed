//! Command line interface module
//!
//! This module provides argument parsing and the runner that wires the
//! registry browser and the Livy job tailer to the console.

pub mod args;
pub mod runner;

pub use args::{Args, Command};
pub use runner::Runner;
