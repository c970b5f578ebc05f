use std::path::Path;
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use clap::ArgMatches;
use serde::{Deserialize, Serialize};

use loan_classifiers::cleaning::CleaningConfig;
use loan_classifiers::config::{ModelConfig, ModelType};
use loan_classifiers::evaluation::Thresholds;
use loan_classifiers::feature_selection::FeatureSelectionConfig;
use loan_classifiers::report::ReportOptions;

use crate::util::{parse_list, validate_csv_file};

/// Everything one `loanrisk analyze` run needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub data_file: String,
    pub output_file: String,
    pub cleaning: CleaningConfig,
    pub features: FeatureSelectionConfig,
    /// Grades to analyse, in report order.
    pub grades: Vec<String>,
    pub models: Vec<ModelConfig>,
    pub train_fraction: f64,
    pub seed: u64,
    pub thresholds: Thresholds,
    pub report: ReportOptions,
    /// |r| at or above which two numeric features are reported as collinear.
    pub collinearity_threshold: f64,
    /// Shuffles per feature for permutation importance; 0 disables it.
    pub importance_repeats: usize,
    pub write_report: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        let features = FeatureSelectionConfig::default();
        AnalysisConfig {
            data_file: String::new(),
            output_file: String::from("loanrisk_report.html"),
            cleaning: CleaningConfig::default(),
            grades: features.grade_names(),
            features,
            models: ModelConfig::all_methods(),
            train_fraction: 0.75,
            seed: 42,
            thresholds: Thresholds::default(),
            report: ReportOptions::default(),
            collinearity_threshold: 0.9,
            importance_repeats: 5,
            write_report: true,
        }
    }
}

/// Load an analysis configuration from a JSON file. Missing keys take their defaults.
pub fn load_analysis_config<P: AsRef<Path>>(path: P) -> Result<AnalysisConfig> {
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config: {}", path.as_ref().display()))?;
    let config: AnalysisConfig = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse config: {}", path.as_ref().display()))?;
    Ok(config)
}

impl AnalysisConfig {
    /// Start from the config file (or defaults) and apply command-line overrides.
    pub fn from_arguments(matches: &ArgMatches) -> Result<Self> {
        let mut config = match matches.get_one::<std::path::PathBuf>("config") {
            Some(path) => {
                log::info!("Using config: {}", path.display());
                load_analysis_config(path)?
            }
            None => AnalysisConfig::default(),
        };

        if let Some(data) = matches.get_one::<String>("data") {
            config.data_file = data.clone();
        }
        validate_csv_file(&config.data_file)?;

        if let Some(output_file) = matches.get_one::<String>("output_file") {
            config.output_file = output_file.clone();
        }

        if let Some(grades) = matches.get_one::<String>("grades") {
            config.grades = parse_list(grades);
        }

        if let Some(models) = matches.get_one::<String>("models") {
            config.models = config.select_models(&parse_list(models))?;
        }

        if let Some(seed) = matches.get_one::<u64>("seed") {
            config.seed = *seed;
        }

        if matches.get_flag("distribution_plots") {
            config.report.distribution_plots = true;
        }
        if matches.get_flag("importance_plots") {
            config.report.importance_plots = true;
        }
        if matches.get_flag("no_report") {
            config.write_report = false;
        }

        config.validate()?;
        Ok(config)
    }

    /// Resolve short model names, reusing a configured entry of the same
    /// method when there is one so its hyper-parameters are kept.
    pub fn select_models(&self, names: &[String]) -> Result<Vec<ModelConfig>> {
        names
            .iter()
            .map(|name| {
                let model_type = ModelType::from_str(name).map_err(anyhow::Error::msg)?;
                let configured = self
                    .models
                    .iter()
                    .find(|m| m.model_type.short_name() == model_type.short_name());
                Ok(match configured {
                    Some(m) => m.clone(),
                    None => ModelConfig::new(model_type),
                })
            })
            .collect()
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.train_fraction > 0.0 && self.train_fraction < 1.0) {
            return Err(anyhow!(
                "train_fraction must be between 0 and 1 (exclusive), got {}",
                self.train_fraction
            ));
        }
        if self.grades.is_empty() {
            return Err(anyhow!("No grades selected"));
        }
        for grade in &self.grades {
            if self.features.features_for(grade).is_none() {
                return Err(anyhow!(
                    "No feature list configured for grade '{}' (configured: {})",
                    grade,
                    self.features.grade_names().join(", ")
                ));
            }
        }
        if self.models.is_empty() {
            return Err(anyhow!("No models selected"));
        }
        Ok(())
    }
}
