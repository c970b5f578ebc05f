//! Synthetic loan exports shared by the integration tests.
#![allow(dead_code)]

use std::collections::BTreeMap;

use loan_classifiers::cleaning::CleaningConfig;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub type Record = BTreeMap<String, String>;

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];
const GRADES: [&str; 4] = ["A", "B", "C", "D"];
const PURPOSES: [&str; 4] = ["credit_card", "debt_consolidation", "car", "other"];
const HOME: [&str; 3] = ["RENT", "OWN", "MORTGAGE"];
const VERIFICATION: [&str; 2] = ["Verified", "Not Verified"];

fn month_year(months_since_2000: usize) -> String {
    format!(
        "{}-{}",
        MONTHS[months_since_2000 % 12],
        2000 + months_since_2000 / 12
    )
}

/// One plausible loan. The chance of a bad outcome rises with the interest
/// rate, which in turn rises with the grade.
pub fn loan_record(i: usize, rng: &mut StdRng) -> Record {
    let grade_idx = i % GRADES.len();
    let int_rate = 7.0 + grade_idx as f64 * 3.0 + rng.gen_range(0.0..4.0);
    let p_bad = 1.0 / (1.0 + (-(int_rate - 13.0)).exp());
    let status = if rng.gen::<f64>() < p_bad {
        "Charged Off"
    } else {
        "Fully Paid"
    };
    let fico_low = 760.0 - grade_idx as f64 * 30.0 - rng.gen_range(0.0..30.0);
    let issue = 96 + rng.gen_range(0..36); // Jan-2008 .. Dec-2010

    let mut record = Record::new();
    let mut set = |k: &str, v: String| {
        record.insert(k.to_string(), v);
    };
    set("issue_d", month_year(issue));
    set("last_pymnt_d", month_year(issue + 24));
    set("earliest_cr_line", month_year(issue - 36 - rng.gen_range(0..60)));
    set("last_credit_pull_d", month_year(issue + 30));
    set(
        "term",
        if rng.gen_bool(0.7) { " 36 months" } else { " 60 months" }.to_string(),
    );
    set("grade", GRADES[grade_idx].to_string());
    set("sub_grade", format!("{}{}", GRADES[grade_idx], 1 + i % 5));
    set("emp_length", format!("{} years", rng.gen_range(2..10)));
    set("home_ownership", HOME[i % HOME.len()].to_string());
    set(
        "verification_status",
        VERIFICATION[rng.gen_range(0..VERIFICATION.len())].to_string(),
    );
    set("pymnt_plan", "n".to_string());
    set("purpose", PURPOSES[rng.gen_range(0..PURPOSES.len())].to_string());
    set("zip_code", format!("{}xx", 100 + i % 800));
    set("addr_state", "CA".to_string());
    set("initial_list_status", "f".to_string());
    set("int_rate", format!("{:.2}%", int_rate));
    set("revol_util", format!("{:.1}%", rng.gen_range(0.0..95.0)));
    set("fico_range_low", format!("{}", fico_low.round()));
    set("fico_range_high", format!("{}", fico_low.round() + 4.0));
    set("dti", format!("{:.2}", rng.gen_range(0.0..30.0)));
    set("inq_last_6mths", format!("{}", rng.gen_range(0..5)));
    set("annual_inc", format!("{}", rng.gen_range(20_000..150_000)));
    set("delinq_2yrs", format!("{}", rng.gen_range(0..2)));
    set("loan_amnt", format!("{}", rng.gen_range(1..35) * 1000));
    set("loan_status", status.to_string());
    let desc = if rng.gen_bool(0.5) {
        "Borrower added on 01/01/10 > Consolidating cards, thanks".to_string()
    } else {
        String::new()
    };
    set("desc", desc);
    record
}

pub fn loan_records(n: usize, seed: u64) -> Vec<Record> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n).map(|i| loan_record(i, &mut rng)).collect()
}

/// Render records as a loan export with a banner line before the header and
/// a totals line after the last row.
pub fn to_export_csv(records: &[Record]) -> String {
    let header = CleaningConfig::default().raw_columns();
    let mut writer = csv::WriterBuilder::new().from_writer(Vec::new());
    writer.write_record(&header).unwrap();
    for record in records {
        let row: Vec<&str> = header
            .iter()
            .map(|h| record.get(h).map(String::as_str).unwrap_or(""))
            .collect();
        writer.write_record(&row).unwrap();
    }
    let body = String::from_utf8(writer.into_inner().unwrap()).unwrap();
    format!(
        "Notes offered by Prospectus (https://www.lendingclub.com/info/prospectus.action)\n{}\nTotal amount funded in policy code 1: 123456\n",
        body.trim_end()
    )
}
