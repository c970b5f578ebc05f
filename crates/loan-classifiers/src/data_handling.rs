//! Data structures and helpers for holding and filtering loan records.
//!
//! This module defines the column-oriented `LoanTable`, the binary `Status`
//! outcome, and the table-level operations of the cleaning pipeline that do
//! not involve type conversion: dropping empty fields, the maturity window,
//! deriving the outcome and description flags, and the stratified
//! train/test split. Every operation returns a new table.
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::error::TableError;

/// Raw and derived column names used by the pipeline.
pub mod fields {
    pub const ISSUE_D: &str = "issue_d";
    pub const LAST_PYMNT_D: &str = "last_pymnt_d";
    pub const EARLIEST_CR_LINE: &str = "earliest_cr_line";
    pub const LAST_CREDIT_PULL_D: &str = "last_credit_pull_d";

    pub const TERM: &str = "term";
    pub const GRADE: &str = "grade";
    pub const SUB_GRADE: &str = "sub_grade";
    pub const EMP_LENGTH: &str = "emp_length";
    pub const HOME_OWNERSHIP: &str = "home_ownership";
    pub const VERIFICATION_STATUS: &str = "verification_status";
    pub const PYMNT_PLAN: &str = "pymnt_plan";
    pub const PURPOSE: &str = "purpose";
    pub const ZIP_CODE: &str = "zip_code";
    pub const ADDR_STATE: &str = "addr_state";
    pub const INITIAL_LIST_STATUS: &str = "initial_list_status";

    pub const INT_RATE: &str = "int_rate";
    pub const REVOL_UTIL: &str = "revol_util";
    pub const FICO_RANGE_LOW: &str = "fico_range_low";
    pub const FICO_RANGE_HIGH: &str = "fico_range_high";
    pub const DTI: &str = "dti";
    pub const INQ_LAST_6MTHS: &str = "inq_last_6mths";
    pub const ANNUAL_INC: &str = "annual_inc";
    pub const DELINQ_2YRS: &str = "delinq_2yrs";
    pub const LOAN_AMNT: &str = "loan_amnt";

    pub const LOAN_STATUS: &str = "loan_status";
    pub const DESC: &str = "desc";

    pub const STATUS: &str = "status";
    pub const DESC_EMPTY: &str = "desc_empty";
    pub const CREDIT_HISTORY_MONTHS: &str = "credit_history_months";
}

/// Binary loan outcome. "Bad" is the positive class for every classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Good,
    Bad,
}

impl Status {
    /// Map a raw `loan_status` value onto the binary outcome.
    ///
    /// Only "Current" and "Fully Paid" are good; every other non-empty status
    /// (charged off, default, late, grace period, policy variants) is bad.
    /// Returns `None` for an empty value.
    pub fn from_loan_status(raw: &str) -> Option<Status> {
        match raw.trim() {
            "" => None,
            "Current" | "Fully Paid" => Some(Status::Good),
            _ => Some(Status::Bad),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Good => "good",
            Status::Bad => "bad",
        }
    }

    pub fn is_bad(&self) -> bool {
        matches!(self, Status::Bad)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One typed column. `None` marks a missing value.
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    Text(Vec<Option<String>>),
    Categorical {
        values: Vec<Option<String>>,
        levels: Vec<String>,
    },
    Numeric(Vec<Option<f64>>),
    Date(Vec<Option<NaiveDate>>),
    Flag(Vec<Option<bool>>),
    Label(Vec<Status>),
}

impl Column {
    /// Build a categorical column whose levels are the distinct non-missing values.
    pub fn categorical(values: Vec<Option<String>>) -> Column {
        let levels = distinct_levels(&values);
        Column::Categorical { values, levels }
    }

    pub fn len(&self) -> usize {
        match self {
            Column::Text(v) => v.len(),
            Column::Categorical { values, .. } => values.len(),
            Column::Numeric(v) => v.len(),
            Column::Date(v) => v.len(),
            Column::Flag(v) => v.len(),
            Column::Label(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_missing(&self, row: usize) -> bool {
        match self {
            Column::Text(v) => v[row].is_none(),
            Column::Categorical { values, .. } => values[row].is_none(),
            Column::Numeric(v) => v[row].is_none(),
            Column::Date(v) => v[row].is_none(),
            Column::Flag(v) => v[row].is_none(),
            Column::Label(_) => false,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Column::Text(_) => "text",
            Column::Categorical { .. } => "categorical",
            Column::Numeric(_) => "numeric",
            Column::Date(_) => "date",
            Column::Flag(_) => "flag",
            Column::Label(_) => "label",
        }
    }

    /// String form of a value, used for grouping and grade matching.
    pub fn value_key(&self, row: usize) -> Option<String> {
        match self {
            Column::Text(v) => v[row].clone(),
            Column::Categorical { values, .. } => values[row].clone(),
            Column::Numeric(v) => v[row].map(|x| x.to_string()),
            Column::Date(v) => v[row].map(|d| d.to_string()),
            Column::Flag(v) => v[row].map(|b| b.to_string()),
            Column::Label(v) => Some(v[row].as_str().to_string()),
        }
    }

    /// Gather rows by index. Categorical levels are carried over unchanged.
    pub fn select(&self, indices: &[usize]) -> Column {
        fn pick<T: Clone>(values: &[T], indices: &[usize]) -> Vec<T> {
            indices.iter().map(|&i| values[i].clone()).collect()
        }
        match self {
            Column::Text(v) => Column::Text(pick(v, indices)),
            Column::Categorical { values, levels } => Column::Categorical {
                values: pick(values, indices),
                levels: levels.clone(),
            },
            Column::Numeric(v) => Column::Numeric(pick(v, indices)),
            Column::Date(v) => Column::Date(pick(v, indices)),
            Column::Flag(v) => Column::Flag(pick(v, indices)),
            Column::Label(v) => Column::Label(pick(v, indices)),
        }
    }
}

fn distinct_levels(values: &[Option<String>]) -> Vec<String> {
    values
        .iter()
        .flatten()
        .cloned()
        .collect::<BTreeSet<String>>()
        .into_iter()
        .collect()
}

/// Column-oriented table of loan records. All columns share one row count.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoanTable {
    names: Vec<String>,
    columns: Vec<Column>,
    n_rows: usize,
}

impl LoanTable {
    /// Build a table from named columns, checking that all lengths agree.
    pub fn from_columns(columns: Vec<(String, Column)>) -> Result<Self, TableError> {
        let n_rows = columns.first().map(|(_, c)| c.len()).unwrap_or(0);
        let mut table = LoanTable {
            names: Vec::with_capacity(columns.len()),
            columns: Vec::with_capacity(columns.len()),
            n_rows,
        };
        for (name, column) in columns {
            table = table.with_column(&name, column)?;
        }
        Ok(table)
    }

    pub fn nrows(&self) -> usize {
        self.n_rows
    }

    pub fn ncols(&self) -> usize {
        self.columns.len()
    }

    pub fn column_names(&self) -> &[String] {
        &self.names
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    pub fn column(&self, name: &str) -> Result<&Column, TableError> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|idx| &self.columns[idx])
            .ok_or_else(|| TableError::MissingColumn(name.to_string()))
    }

    pub fn text(&self, name: &str) -> Result<&[Option<String>], TableError> {
        match self.column(name)? {
            Column::Text(v) => Ok(v),
            Column::Categorical { values, .. } => Ok(values),
            _ => Err(type_error(name, "text")),
        }
    }

    pub fn categorical(&self, name: &str) -> Result<(&[Option<String>], &[String]), TableError> {
        match self.column(name)? {
            Column::Categorical { values, levels } => Ok((values, levels)),
            _ => Err(type_error(name, "categorical")),
        }
    }

    pub fn numeric(&self, name: &str) -> Result<&[Option<f64>], TableError> {
        match self.column(name)? {
            Column::Numeric(v) => Ok(v),
            _ => Err(type_error(name, "numeric")),
        }
    }

    pub fn date(&self, name: &str) -> Result<&[Option<NaiveDate>], TableError> {
        match self.column(name)? {
            Column::Date(v) => Ok(v),
            _ => Err(type_error(name, "date")),
        }
    }

    pub fn flag(&self, name: &str) -> Result<&[Option<bool>], TableError> {
        match self.column(name)? {
            Column::Flag(v) => Ok(v),
            _ => Err(type_error(name, "flag")),
        }
    }

    /// The derived outcome column.
    pub fn status(&self) -> Result<&[Status], TableError> {
        match self.column(fields::STATUS)? {
            Column::Label(v) => Ok(v),
            _ => Err(type_error(fields::STATUS, "label")),
        }
    }

    /// Return a new table with `column` added, or replacing a column of the same name.
    pub fn with_column(mut self, name: &str, column: Column) -> Result<Self, TableError> {
        if !self.columns.is_empty() && column.len() != self.n_rows {
            return Err(TableError::LengthMismatch {
                column: name.to_string(),
                expected: self.n_rows,
                found: column.len(),
            });
        }
        if self.columns.is_empty() {
            self.n_rows = column.len();
        }
        match self.names.iter().position(|n| n == name) {
            Some(idx) => self.columns[idx] = column,
            None => {
                self.names.push(name.to_string());
                self.columns.push(column);
            }
        }
        Ok(self)
    }

    /// Keep the rows where `mask[i]` is true.
    pub fn filter(&self, mask: &[bool]) -> LoanTable {
        let selected_indices: Vec<usize> = mask
            .iter()
            .enumerate()
            .filter_map(|(i, &m)| if m { Some(i) } else { None })
            .collect();
        self.select_rows(&selected_indices)
    }

    pub fn select_rows(&self, indices: &[usize]) -> LoanTable {
        LoanTable {
            names: self.names.clone(),
            columns: self.columns.iter().map(|c| c.select(indices)).collect(),
            n_rows: indices.len(),
        }
    }

    /// Keep only the named columns, in the order given.
    pub fn project(&self, names: &[String]) -> Result<LoanTable, TableError> {
        let mut columns = Vec::with_capacity(names.len());
        for name in names {
            columns.push(self.column(name)?.clone());
        }
        Ok(LoanTable {
            names: names.to_vec(),
            columns,
            n_rows: self.n_rows,
        })
    }

    /// Drop every row that has a missing value in any column.
    pub fn drop_incomplete_rows(&self) -> LoanTable {
        let mask: Vec<bool> = (0..self.n_rows)
            .map(|row| self.columns.iter().all(|c| !c.is_missing(row)))
            .collect();
        self.filter(&mask)
    }

    /// Recompute the level set of every categorical column from its current values.
    pub fn refresh_levels(&self) -> LoanTable {
        let columns = self
            .columns
            .iter()
            .map(|c| match c {
                Column::Categorical { values, .. } => Column::categorical(values.clone()),
                other => other.clone(),
            })
            .collect();
        LoanTable {
            names: self.names.clone(),
            columns,
            n_rows: self.n_rows,
        }
    }

    /// Count of (good, bad) rows, when the outcome has been derived.
    pub fn status_counts(&self) -> Option<(usize, usize)> {
        let status = self.status().ok()?;
        let bad = status.iter().filter(|s| s.is_bad()).count();
        Some((status.len() - bad, bad))
    }

    pub fn log_input_data_summary(&self) {
        println!("----- Loan Data Summary -----");
        match self.status_counts() {
            Some((good, bad)) => println!("Info: {} good loans and {} bad loans", good, bad),
            None => println!("Info: {} loans (outcome not derived)", self.n_rows),
        }
        println!("Info: {} fields (columns)", self.ncols());
        println!("-----------------------------");
    }
}

fn type_error(name: &str, expected: &'static str) -> TableError {
    TableError::ColumnType {
        column: name.to_string(),
        expected,
    }
}

/// Remove rows where `field` is missing. Levels of a categorical column are kept.
pub fn drop_empty(table: &LoanTable, field: &str) -> Result<LoanTable, TableError> {
    let column = table.column(field)?;
    let mask: Vec<bool> = (0..table.nrows()).map(|row| !column.is_missing(row)).collect();
    Ok(table.filter(&mask))
}

/// Remove rows where the categorical `field` is empty, then re-derive its
/// levels from the remaining values so unused labels are not retained.
pub fn drop_empty_categorical(table: &LoanTable, field: &str) -> Result<LoanTable, TableError> {
    let filtered = drop_empty(table, field)?;
    let values = filtered.text(field)?.to_vec();
    filtered.with_column(field, Column::categorical(values))
}

/// Keep loans issued on or before `cutoff` (inclusive).
///
/// Younger loans have not had the full observation period to default, so
/// keeping them would bias the outcome towards "good".
pub fn apply_maturity_window(table: &LoanTable, cutoff: NaiveDate) -> Result<LoanTable, TableError> {
    let issued = table.date(fields::ISSUE_D)?;
    let mask: Vec<bool> = issued
        .iter()
        .map(|d| matches!(d, Some(date) if *date <= cutoff))
        .collect();
    Ok(table.filter(&mask))
}

/// Add the binary `status` column derived from `loan_status`.
///
/// Rows with an empty `loan_status` cannot be labelled and are dropped.
pub fn derive_status(table: &LoanTable) -> Result<LoanTable, TableError> {
    let raw = table.text(fields::LOAN_STATUS)?;
    let derived: Vec<Option<Status>> = raw
        .iter()
        .map(|v| v.as_deref().and_then(Status::from_loan_status))
        .collect();

    let unlabeled = derived.iter().filter(|s| s.is_none()).count();
    if unlabeled > 0 {
        log::warn!("Dropping {} loans with an empty loan_status", unlabeled);
    }

    let mask: Vec<bool> = derived.iter().map(|s| s.is_some()).collect();
    let status: Vec<Status> = derived.into_iter().flatten().collect();
    table.filter(&mask).with_column(fields::STATUS, Column::Label(status))
}

/// Add the boolean `desc_empty` column: true iff no description was provided.
pub fn derive_desc_empty(table: &LoanTable) -> Result<LoanTable, TableError> {
    let desc = table.text(fields::DESC)?;
    let flags = desc.iter().map(|d| Some(d.is_none())).collect();
    table.clone().with_column(fields::DESC_EMPTY, Column::Flag(flags))
}

/// Partition rows into (train, test) preserving the distribution of `label_field`.
///
/// Within each label class the row indices are shuffled with a generator
/// seeded from `seed`, and `round(class_size * train_fraction)` of them go to
/// the training table. Both outputs keep the input row order. Every row
/// must carry a label.
pub fn stratified_split(
    table: &LoanTable,
    train_fraction: f64,
    label_field: &str,
    seed: u64,
) -> Result<(LoanTable, LoanTable), TableError> {
    if !(0.0..=1.0).contains(&train_fraction) {
        return Err(TableError::InvalidFraction(train_fraction));
    }
    let labels = table.column(label_field)?;

    let mut classes: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for row in 0..table.nrows() {
        let key = labels.value_key(row).ok_or_else(|| TableError::MissingLabel {
            column: label_field.to_string(),
            row,
        })?;
        classes.entry(key).or_default().push(row);
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut train_indices = Vec::new();
    let mut test_indices = Vec::new();
    for indices in classes.values_mut() {
        indices.shuffle(&mut rng);
        let n_train = (indices.len() as f64 * train_fraction).round() as usize;
        train_indices.extend_from_slice(&indices[..n_train]);
        test_indices.extend_from_slice(&indices[n_train..]);
    }
    train_indices.sort_unstable();
    test_indices.sort_unstable();

    log::debug!(
        "Stratified split on '{}': {} train rows, {} test rows",
        label_field,
        train_indices.len(),
        test_indices.len()
    );

    Ok((table.select_rows(&train_indices), table.select_rows(&test_indices)))
}
