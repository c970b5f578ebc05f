//! The loan cleaning pipeline.
//!
//! Turns a raw, all-text `LoanTable` into a typed table ready for per-grade
//! feature selection. Steps run in a fixed order and each one is recorded in
//! a `CleaningReport`:
//!
//! 1. drop rows with an empty required date or categorical field
//! 2. parse the month-year dates (unparseable rows are dropped)
//! 3. apply the maturity window
//! 4. parse percentage and numeric fields (malformed values drop the row,
//!    empty values stay missing)
//! 5. derive `status`, `desc_empty` and `credit_history_months`
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::data_handling::{
    apply_maturity_window, derive_desc_empty, derive_status, drop_empty, drop_empty_categorical,
    fields, Column, LoanTable,
};
use crate::error::{ParseError, TableError};
use crate::parsing::{months_between, parse_date, parse_number, parse_percent};

/// Which raw fields are required, how they are typed, and the maturity cutoff.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CleaningConfig {
    /// Loans issued after this date are excluded (inclusive bound).
    pub cutoff_date: NaiveDate,
    pub required_dates: Vec<String>,
    pub required_categorical: Vec<String>,
    pub percent_fields: Vec<String>,
    pub numeric_fields: Vec<String>,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        let names = |list: &[&str]| list.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        Self {
            cutoff_date: NaiveDate::from_ymd_opt(2011, 2, 1).unwrap_or_default(),
            required_dates: names(&[
                fields::ISSUE_D,
                fields::LAST_PYMNT_D,
                fields::EARLIEST_CR_LINE,
                fields::LAST_CREDIT_PULL_D,
            ]),
            required_categorical: names(&[
                fields::TERM,
                fields::GRADE,
                fields::SUB_GRADE,
                fields::EMP_LENGTH,
                fields::HOME_OWNERSHIP,
                fields::VERIFICATION_STATUS,
                fields::PYMNT_PLAN,
                fields::PURPOSE,
                fields::ZIP_CODE,
                fields::ADDR_STATE,
                fields::INITIAL_LIST_STATUS,
            ]),
            percent_fields: names(&[fields::INT_RATE, fields::REVOL_UTIL]),
            numeric_fields: names(&[
                fields::FICO_RANGE_LOW,
                fields::FICO_RANGE_HIGH,
                fields::DTI,
                fields::INQ_LAST_6MTHS,
                fields::ANNUAL_INC,
                fields::DELINQ_2YRS,
                fields::LOAN_AMNT,
            ]),
        }
    }
}

impl CleaningConfig {
    /// Every raw column the pipeline reads.
    pub fn raw_columns(&self) -> Vec<String> {
        let mut columns: Vec<String> = Vec::new();
        let all = self
            .required_dates
            .iter()
            .chain(&self.required_categorical)
            .chain(&self.percent_fields)
            .chain(&self.numeric_fields)
            .map(String::as_str)
            .chain([fields::LOAN_STATUS, fields::DESC]);
        for name in all {
            if !columns.iter().any(|c| c == name) {
                columns.push(name.to_string());
            }
        }
        columns
    }
}

/// Row counts before and after one pipeline step.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CleaningStep {
    pub step: String,
    pub rows_before: usize,
    pub rows_after: usize,
}

impl CleaningStep {
    pub fn dropped(&self) -> usize {
        self.rows_before - self.rows_after
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct CleaningReport {
    pub steps: Vec<CleaningStep>,
    /// Rows dropped because a present value could not be parsed.
    pub parse_failures: usize,
}

impl CleaningReport {
    fn record(&mut self, step: impl Into<String>, rows_before: usize, rows_after: usize) {
        let step = step.into();
        log::debug!("{}: {} -> {} rows", step, rows_before, rows_after);
        self.steps.push(CleaningStep {
            step,
            rows_before,
            rows_after,
        });
    }

    pub fn rows_in(&self) -> usize {
        self.steps.first().map(|s| s.rows_before).unwrap_or(0)
    }

    pub fn rows_out(&self) -> usize {
        self.steps.last().map(|s| s.rows_after).unwrap_or(0)
    }

    pub fn print_summary(&self) {
        println!("----- Cleaning Summary -----");
        for step in self.steps.iter().filter(|s| s.dropped() > 0) {
            println!("Info: {:<40} dropped {:>7} rows", step.step, step.dropped());
        }
        println!(
            "Info: {} of {} loans retained ({} unparseable values)",
            self.rows_out(),
            self.rows_in(),
            self.parse_failures
        );
        println!("----------------------------");
    }
}

/// Run the full cleaning pipeline over a raw loan table.
pub fn clean_loans(
    raw: &LoanTable,
    config: &CleaningConfig,
) -> Result<(LoanTable, CleaningReport), TableError> {
    let mut report = CleaningReport::default();
    let mut table = raw.clone();

    for field in &config.required_dates {
        let before = table.nrows();
        table = drop_empty(&table, field)?;
        report.record(format!("empty {}", field), before, table.nrows());
    }

    for field in &config.required_categorical {
        let before = table.nrows();
        table = drop_empty_categorical(&table, field)?;
        report.record(format!("empty {}", field), before, table.nrows());
    }

    for field in &config.required_dates {
        let before = table.nrows();
        let (parsed, failures) = parse_date_column(&table, field)?;
        table = parsed;
        report.parse_failures += failures;
        report.record(format!("unparseable {}", field), before, table.nrows());
    }

    let before = table.nrows();
    table = apply_maturity_window(&table, config.cutoff_date)?;
    report.record(
        format!("issued after {}", config.cutoff_date),
        before,
        table.nrows(),
    );

    for field in &config.percent_fields {
        let before = table.nrows();
        let (parsed, failures) = parse_percent_column(&table, field)?;
        table = parsed;
        report.parse_failures += failures;
        report.record(format!("unparseable {}", field), before, table.nrows());
    }

    for field in &config.numeric_fields {
        let before = table.nrows();
        let (parsed, failures) = parse_numeric_column(&table, field)?;
        table = parsed;
        report.parse_failures += failures;
        report.record(format!("unparseable {}", field), before, table.nrows());
    }

    let before = table.nrows();
    table = derive_status(&table)?;
    report.record("empty loan_status", before, table.nrows());

    table = derive_desc_empty(&table)?;
    table = derive_credit_history_months(&table)?;

    log::info!(
        "Cleaning retained {} of {} loans",
        table.nrows(),
        report.rows_in()
    );

    Ok((table, report))
}

/// Convert a text column to dates, dropping rows whose value does not parse.
pub fn parse_date_column(table: &LoanTable, field: &str) -> Result<(LoanTable, usize), TableError> {
    convert_text_column(table, field, parse_date, Column::Date)
}

/// Convert a text column of percentage strings, dropping malformed rows.
pub fn parse_percent_column(
    table: &LoanTable,
    field: &str,
) -> Result<(LoanTable, usize), TableError> {
    convert_text_column(table, field, parse_percent, Column::Numeric)
}

/// Convert a text column of plain numbers, dropping malformed rows.
pub fn parse_numeric_column(
    table: &LoanTable,
    field: &str,
) -> Result<(LoanTable, usize), TableError> {
    convert_text_column(table, field, parse_number, Column::Numeric)
}

fn convert_text_column<T>(
    table: &LoanTable,
    field: &str,
    parse: fn(&str) -> Result<T, ParseError>,
    wrap: fn(Vec<Option<T>>) -> Column,
) -> Result<(LoanTable, usize), TableError> {
    let raw = table.text(field)?;

    let mut keep = Vec::with_capacity(raw.len());
    let mut converted = Vec::with_capacity(raw.len());
    let mut failures = 0;
    for value in raw {
        match value.as_deref().map(parse) {
            None => {
                keep.push(true);
                converted.push(None);
            }
            Some(Ok(v)) => {
                keep.push(true);
                converted.push(Some(v));
            }
            Some(Err(e)) => {
                if failures < 5 {
                    log::debug!("{}: {}", field, e);
                }
                failures += 1;
                keep.push(false);
            }
        }
    }

    if failures > 0 {
        log::warn!("Dropping {} loans with an unparseable '{}'", failures, field);
    }

    let table = table.filter(&keep).with_column(field, wrap(converted))?;
    Ok((table, failures))
}

/// Add `credit_history_months`: whole months from the earliest credit line to issuance.
pub fn derive_credit_history_months(table: &LoanTable) -> Result<LoanTable, TableError> {
    let earliest = table.date(fields::EARLIEST_CR_LINE)?;
    let issued = table.date(fields::ISSUE_D)?;
    let months = earliest
        .iter()
        .zip(issued)
        .map(|(start, end)| match (start, end) {
            (Some(s), Some(e)) => Some(months_between(*s, *e) as f64),
            _ => None,
        })
        .collect();
    table
        .clone()
        .with_column(fields::CREDIT_HISTORY_MONTHS, Column::Numeric(months))
}
