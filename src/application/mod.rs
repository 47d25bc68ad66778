//! Application layer: the ledger service, the bulk import worker pool and
//! the report aggregator, plus the cancellation and background-task
//! primitives they share.

pub mod background;
pub mod context;
pub mod import;
pub mod ledger;
pub mod report;
