//! Loan export CSV reader.
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use csv::StringRecord;

use crate::cleaning::CleaningConfig;
use crate::data_handling::{fields, Column, LoanTable};

/// Raw loan table plus bookkeeping about the lines that were not loan rows.
#[derive(Debug)]
pub struct LoanCsv {
    pub table: LoanTable,
    /// Lines before the header row (e.g. a "Notes offered by Prospectus" banner).
    pub preamble_lines: usize,
    /// Rows whose field count did not match the header (section markers, totals).
    pub skipped_rows: usize,
}

/// Configuration for reading a loan export.
#[derive(Debug, Clone)]
pub struct LoanReaderConfig {
    /// Columns to load, in order. Every one must be present in the header.
    pub columns: Vec<String>,
    /// Values (after trimming) treated as missing.
    pub na_tokens: Vec<String>,
    /// A column name that identifies the header line.
    pub header_marker: String,
    pub delimiter: u8,
}

impl Default for LoanReaderConfig {
    fn default() -> Self {
        Self::for_cleaning(&CleaningConfig::default())
    }
}

impl LoanReaderConfig {
    /// Load exactly the raw columns the cleaning pipeline needs.
    pub fn for_cleaning(config: &CleaningConfig) -> Self {
        Self {
            columns: config.raw_columns(),
            na_tokens: vec!["".to_string(), "NA".to_string(), "NULL".to_string()],
            header_marker: fields::LOAN_STATUS.to_string(),
            delimiter: b',',
        }
    }
}

/// Read a loan export from disk.
pub fn read_loan_csv<P: AsRef<Path>>(path: P, config: &LoanReaderConfig) -> Result<LoanCsv> {
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to open loan file: {}", path.as_ref().display()))?;
    let loans = parse_loan_csv(&content, config)
        .with_context(|| format!("Failed to parse loan file: {}", path.as_ref().display()))?;

    log::info!(
        "Loaded {} loan rows from {} ({} non-loan rows skipped)",
        loans.table.nrows(),
        path.as_ref().display(),
        loans.skipped_rows
    );
    Ok(loans)
}

/// Parse loan export text into an all-text `LoanTable`.
pub fn parse_loan_csv(content: &str, config: &LoanReaderConfig) -> Result<LoanCsv> {
    let (preamble_lines, body) = strip_preamble(content, &config.header_marker)
        .ok_or_else(|| anyhow!("No header line containing '{}' found", config.header_marker))?;

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(config.delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(body.as_bytes());

    let headers = reader
        .headers()
        .context("Failed to read loan header row")?
        .clone();

    let mut indices = Vec::with_capacity(config.columns.len());
    for name in &config.columns {
        let idx = find_column(&headers, name)
            .ok_or_else(|| anyhow!("Missing loan column '{}'", name))?;
        indices.push(idx);
    }

    let mut values: Vec<Vec<Option<String>>> = vec![Vec::new(); config.columns.len()];
    let mut skipped_rows = 0;

    for (row_idx, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("Failed to read row {}", row_idx + 1))?;
        if record.len() != headers.len() {
            skipped_rows += 1;
            continue;
        }
        for (column, &idx) in values.iter_mut().zip(&indices) {
            let value = record.get(idx).unwrap_or_default().trim();
            if config.na_tokens.iter().any(|na| na == value) {
                column.push(None);
            } else {
                column.push(Some(value.to_string()));
            }
        }
    }

    if skipped_rows > 0 {
        log::warn!(
            "Skipped {} rows whose field count does not match the header",
            skipped_rows
        );
    }

    let columns = config
        .columns
        .iter()
        .cloned()
        .zip(values.into_iter().map(Column::Text))
        .collect();
    let table = LoanTable::from_columns(columns)?;

    Ok(LoanCsv {
        table,
        preamble_lines,
        skipped_rows,
    })
}

fn find_column(headers: &StringRecord, name: &str) -> Option<usize> {
    headers
        .iter()
        .position(|header| header.trim().eq_ignore_ascii_case(name))
}

/// Skip everything before the first line that mentions `marker`.
fn strip_preamble<'a>(content: &'a str, marker: &str) -> Option<(usize, &'a str)> {
    let mut offset = 0;
    for (line_idx, line) in content.split_inclusive('\n').enumerate() {
        if line.contains(marker) {
            return Some((line_idx, &content[offset..]));
        }
        offset += line.len();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(columns: &[&str]) -> LoanReaderConfig {
        LoanReaderConfig {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            ..LoanReaderConfig::default()
        }
    }

    #[test]
    fn test_skips_preamble_and_footer() {
        let content = "Notes offered by Prospectus (https://www.lendingclub.com/info/prospectus.action)\n\
                       id,grade,loan_status,int_rate\n\
                       1,A,Fully Paid, 10.65%\n\
                       2,B,Charged Off,NA\n\
                       \n\
                       Total amount funded in policy code 1: 460296150\n";
        let loans = parse_loan_csv(content, &config(&["grade", "loan_status", "int_rate"])).unwrap();
        assert_eq!(loans.preamble_lines, 1);
        assert_eq!(loans.skipped_rows, 1);
        assert_eq!(loans.table.nrows(), 2);
        assert_eq!(
            loans.table.text("int_rate").unwrap(),
            [Some("10.65%".to_string()), None]
        );
    }

    #[test]
    fn test_missing_column_is_an_error() {
        let content = "id,loan_status\n1,Current\n";
        let err = parse_loan_csv(content, &config(&["loan_status", "grade"])).unwrap_err();
        assert!(err.to_string().contains("grade"));
    }

    #[test]
    fn test_no_header_is_an_error() {
        assert!(parse_loan_csv("a,b\n1,2\n", &config(&["a"])).is_err());
    }
}
