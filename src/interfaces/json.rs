use crate::application::import::ImportResult;
use crate::domain::budget::Budget;
use crate::error::Result;
use std::io::{Read, Write};

/// Parses a JSON array of `{category, limit, period?}` objects.
pub fn read_budgets<R: Read>(source: R) -> Result<Vec<Budget>> {
    Ok(serde_json::from_reader(source)?)
}

/// Emits `{"accepted":..,"rejected":..,"errors":[{"index":..,"error":..}]}`
/// on a single line.
pub fn write_import_result<W: Write>(mut sink: W, result: &ImportResult) -> Result<()> {
    serde_json::to_writer(&mut sink, result)?;
    writeln!(sink)?;
    Ok(())
}
