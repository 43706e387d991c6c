//! Subcommand implementations.

pub mod batch;
pub mod hollow;
pub mod info;
pub mod split;
