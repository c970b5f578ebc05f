//! loan-classifiers: cleaning, per-grade feature selection and default-risk
//! classifiers for peer-to-peer loan records.
//!
//! The crate turns a raw loan CSV into a typed, cleaned [`data_handling::LoanTable`],
//! selects a feature subset per loan grade, and fits and evaluates a set of
//! binary classifiers (logistic regression, random forest, gradient boosting,
//! SVM and, behind the default `nnet` feature, a small neural network) with
//! "bad" as the positive class. The `report` module renders the results as
//! text and as a standalone HTML page.
pub mod cleaning;
pub mod config;
pub mod data_handling;
pub mod error;
pub mod evaluation;
pub mod feature_selection;
pub mod io;
pub mod models;
pub mod parsing;
pub mod preprocessing;
pub mod report;
pub mod stats;
