use anyhow::Result;
use clap::{Arg, ArgAction, ArgMatches, Command, ValueHint};
use log::LevelFilter;
use std::path::PathBuf;

use loan_cli::analysis::{run_analysis, write_analysis_report, AnalysisConfig};
use loan_classifiers::report::text::{print_auc_summary, print_grade_report};

fn main() -> Result<()> {
    env_logger::Builder::default()
        .filter_level(LevelFilter::Error)
        .parse_env(env_logger::Env::default().filter_or("LOANRISK_LOG", "error,loan=info"))
        .init();

    let matches = Command::new("loanrisk")
        .version(clap::crate_version!())
        .author("Justin Sing <justincsing@gmail.com>")
        .about("Loan default risk analysis: cleaning, per-grade feature selection and classifier comparison")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("analyze")
                .about("Clean a loan export, fit every model per grade and report test performance")
                .arg(
                    Arg::new("data")
                        .help("Path to the loan export (*.csv). Overrides data_file in the configuration file.")
                        .required(true)
                        .value_parser(clap::builder::NonEmptyStringValueParser::new())
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("config")
                        .short('c')
                        .long("config")
                        .help("Path to an analysis JSON configuration file")
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("output_file")
                        .short('o')
                        .long("output")
                        .help("File path the HTML report is written to.")
                        .value_parser(clap::builder::NonEmptyStringValueParser::new())
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("grades")
                        .short('g')
                        .long("grades")
                        .help("Comma separated grades to analyse, e.g. A,B")
                        .value_parser(clap::builder::NonEmptyStringValueParser::new())
                        .value_hint(ValueHint::Other),
                )
                .arg(
                    Arg::new("models")
                        .short('m')
                        .long("models")
                        .help("Comma separated models to fit: logistic, rf, gbm, svm, nnet")
                        .value_parser(clap::builder::NonEmptyStringValueParser::new())
                        .value_hint(ValueHint::Other),
                )
                .arg(
                    Arg::new("seed")
                        .long("seed")
                        .help("Seed for splitting, resampling and model fitting")
                        .value_parser(clap::value_parser!(u64)),
                )
                .arg(
                    Arg::new("distribution_plots")
                        .long("distribution-plots")
                        .help("Add per-grade histograms of every numeric feature by status to the report.")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("importance_plots")
                        .long("importance-plots")
                        .help("Add variable importance bar charts to the report.")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("no_report")
                        .long("no-report")
                        .help("Disable HTML report generation.")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("default-config")
                .about("Print the default analysis configuration as JSON"),
        )
        .help_template(
            "{usage-heading} {usage}\n\n\
             {about-with-newline}\n\
             Written by {author-with-newline}Version {version}\n\n\
             {all-args}{after-help}",
        )
        .get_matches();

    match matches.subcommand() {
        Some(("analyze", sub_m)) => handle_analyze(sub_m),
        Some(("default-config", _)) => {
            println!("{}", serde_json::to_string_pretty(&AnalysisConfig::default())?);
            Ok(())
        }
        _ => unreachable!("Subcommand is required by CLI configuration"),
    }
}

fn handle_analyze(matches: &ArgMatches) -> Result<()> {
    let config = AnalysisConfig::from_arguments(matches)?;
    log::info!(
        "[loanrisk] Analysing {} for grades {}",
        config.data_file,
        config.grades.join(", ")
    );

    let outcome = match run_analysis(&config) {
        Ok(outcome) => outcome,
        Err(e) => {
            log::error!("Analysis failed: {:#}", e);
            std::process::exit(1)
        }
    };

    outcome.cleaning.print_summary();
    for grade in &outcome.grades {
        print_grade_report(grade);
    }
    print_auc_summary(&outcome.grades);

    if config.write_report {
        let path = PathBuf::from(&config.output_file);
        write_analysis_report(&outcome, &config, &path)?;
        eprintln!("[loanrisk] Report written to {}", path.display());
    }
    Ok(())
}
