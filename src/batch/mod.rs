//! Batch insert engine
//!
//! Writes a slice of records with one prepared insert, executing every
//! record concurrently and collecting one outcome per record.

mod report;
mod writer;

pub use report::{BatchReport, RecordOutcome, RecordStatus};
pub use writer::{BatchWriter, DEFAULT_STATEMENT_CACHE_CAPACITY};
