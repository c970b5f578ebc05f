//! IO utilities for loading raw loan exports.

pub mod loan_csv;

pub use loan_csv::{parse_loan_csv, read_loan_csv, LoanCsv, LoanReaderConfig};
