//! Domain layer: ledger entities, validation and budget rules, and the
//! ports the application layer talks to.

pub mod budget;
pub mod guard;
pub mod ports;
pub mod report;
pub mod transaction;
pub mod validation;
