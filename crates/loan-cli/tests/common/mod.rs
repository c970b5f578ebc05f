//! A small deterministic loan export for driving the CLI.
#![allow(dead_code)]

use std::path::{Path, PathBuf};

use loan_classifiers::cleaning::CleaningConfig;

const GRADES: [&str; 2] = ["B", "C"];
const PURPOSES: [&str; 3] = ["car", "credit_card", "other"];

fn field(name: &str, i: usize) -> String {
    let level = (i * 7) % 50;
    let risky = level >= 30;
    match name {
        "issue_d" => format!("{}-2009", ["Jan", "Apr", "Jul", "Oct"][i % 4]),
        "last_pymnt_d" => "Jan-2012".to_string(),
        "earliest_cr_line" => format!("Mar-{}", 1990 + i % 15),
        "last_credit_pull_d" => "Feb-2012".to_string(),
        "term" => (if i % 3 == 0 { " 60 months" } else { " 36 months" }).to_string(),
        "grade" => GRADES[i % 2].to_string(),
        "sub_grade" => format!("{}{}", GRADES[i % 2], 1 + i % 5),
        "emp_length" => format!("{} years", 1 + i % 9),
        "home_ownership" => ["RENT", "MORTGAGE"][i % 2].to_string(),
        "verification_status" => ["Verified", "Not Verified"][(i / 2) % 2].to_string(),
        "pymnt_plan" => "n".to_string(),
        "purpose" => PURPOSES[i % 3].to_string(),
        "zip_code" => format!("{}xx", 900 + i % 50),
        "addr_state" => "NY".to_string(),
        "initial_list_status" => "f".to_string(),
        "int_rate" => format!("{:.2}%", 10.0 + level as f64 / 10.0),
        "revol_util" => format!("{}%", (i * 13) % 90),
        "fico_range_low" => format!("{}", 720 - level + (i % 5) * 6),
        "fico_range_high" => format!("{}", 724 - level + (i % 5) * 6),
        "dti" => format!("{:.1}", ((i * 3) % 25) as f64),
        "inq_last_6mths" => format!("{}", i % 4),
        "annual_inc" => format!("{}", 30_000 + (i * 997) % 90_000),
        "delinq_2yrs" => format!("{}", usize::from(i % 17 == 0)),
        "loan_amnt" => format!("{}", 5_000 + (i * 250) % 20_000),
        "loan_status" => {
            let bad = if risky { i % 3 != 0 } else { i % 11 == 0 };
            let status = if bad { "Charged Off" } else { "Fully Paid" };
            status.to_string()
        }
        "desc" => if i % 4 == 0 { String::new() } else { format!("loan {}", i) },
        _ => String::new(),
    }
}

/// Loan export CSV text with `n` rows across grades B and C.
pub fn loan_export(n: usize) -> String {
    let header = CleaningConfig::default().raw_columns();
    let mut lines = vec![
        "Notes offered by Prospectus".to_string(),
        header.join(","),
    ];
    for i in 0..n {
        let row: Vec<String> = header.iter().map(|h| field(h, i)).collect();
        lines.push(row.join(","));
    }
    lines.push("Total amount funded: 1".to_string());
    lines.join("\n")
}

/// Write the export into `dir` and return its path.
pub fn write_loan_export(dir: &Path, n: usize) -> PathBuf {
    let path = dir.join("loans.csv");
    std::fs::write(&path, loan_export(n)).unwrap();
    path
}
