pub mod input;
pub mod runner;

pub use input::{load_analysis_config, AnalysisConfig};
pub use runner::{analyze_table, run_analysis, write_analysis_report, AnalysisOutcome};
