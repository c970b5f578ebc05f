use std::error::Error;
use std::fmt;

/// A required field could not be converted to its target type.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    Empty,
    InvalidDate(String),
    InvalidPercent(String),
    InvalidNumber(String),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ParseError::Empty => write!(f, "Value is empty"),
            ParseError::InvalidDate(raw) => {
                write!(f, "Invalid month-year date '{}', expected e.g. 'Jun-2007'", raw)
            }
            ParseError::InvalidPercent(raw) => write!(f, "Invalid percentage '{}'", raw),
            ParseError::InvalidNumber(raw) => write!(f, "Invalid number '{}'", raw),
        }
    }
}

impl Error for ParseError {}

/// Structural problems with a loan table that cannot be resolved by dropping rows.
#[derive(Debug, Clone, PartialEq)]
pub enum TableError {
    MissingColumn(String),
    ColumnType { column: String, expected: &'static str },
    LengthMismatch { column: String, expected: usize, found: usize },
    Empty,
    SingleClass(String),
    UnknownGrade(String),
    UnknownFeature(String),
    MissingLabel { column: String, row: usize },
    InvalidFraction(f64),
}

impl fmt::Display for TableError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TableError::MissingColumn(name) => write!(f, "Column '{}' not found in loan table", name),
            TableError::ColumnType { column, expected } => {
                write!(f, "Column '{}' is not a {} column", column, expected)
            }
            TableError::LengthMismatch { column, expected, found } => write!(
                f,
                "Column '{}' has {} rows but the table has {}",
                column, found, expected
            ),
            TableError::Empty => write!(f, "Loan table has no rows"),
            TableError::SingleClass(context) => {
                write!(f, "Only one outcome class present in {}", context)
            }
            TableError::UnknownGrade(grade) => write!(f, "No loans with grade '{}'", grade),
            TableError::UnknownFeature(name) => {
                write!(f, "Feature '{}' is not a column of the cleaned table", name)
            }
            TableError::MissingLabel { column, row } => {
                write!(f, "Row {} has no value in label column '{}'", row, column)
            }
            TableError::InvalidFraction(fraction) => {
                write!(f, "Train fraction must be within [0, 1], got {}", fraction)
            }
        }
    }
}

impl Error for TableError {}
