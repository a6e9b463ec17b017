//! CLI commands

pub mod cat;
pub mod scan;
