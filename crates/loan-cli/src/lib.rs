//! Library side of the `loanrisk` command-line tool: configuration loading,
//! the per-grade analysis driver and report output.
pub mod analysis;
pub mod util;
