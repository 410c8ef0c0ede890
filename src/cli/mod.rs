//! Command-line front end; behind the `cli` feature.

pub mod args;
pub mod commands;

pub use args::{Cli, Commands};
