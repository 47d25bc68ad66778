//! Boundary adapters: CSV and JSON readers and writers used by the CLI.

pub mod csv;
pub mod json;
