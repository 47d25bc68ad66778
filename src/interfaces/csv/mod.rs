pub mod transaction_reader;
pub mod writer;
