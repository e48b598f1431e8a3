//! Command-line interface for civicmap.

mod commands;
mod icons;

pub use commands::{is_verbose, run};
