use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{DiagonalFill, Error, SelectionConfig, Significance, HISTOGRAM_BINS};

/// Environment variable holding the config path when none is given on the command line.
pub const CONFIG_ENV: &str = "PAINSTATS_CONFIG";

/// File names of everything a run writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputFiles {
    pub cleaned_csv: String,
    pub wilcoxon_bars: String,
    pub combined_heatmap: String,
    pub baseline_heatmap: String,
    pub after_heatmap: String,
    pub missing_map: String,
    pub histograms: String,
    pub boxplots: String,
    pub correlation_heatmap: String,
    pub pairplot: String,
    pub results: String,
}

impl Default for OutputFiles {
    fn default() -> Self {
        Self {
            cleaned_csv: "cleaned_processed_pain_data.csv".to_string(),
            wilcoxon_bars: "comparison_wilcoxon_bar_plot.svg".to_string(),
            combined_heatmap: "combined_correlation_heatmap.svg".to_string(),
            baseline_heatmap: "correlation_heatmap_baseline.svg".to_string(),
            after_heatmap: "correlation_heatmap_after_education.svg".to_string(),
            missing_map: "missing_values_heatmap.svg".to_string(),
            histograms: "numeric_histograms.svg".to_string(),
            boxplots: "numeric_boxplots.svg".to_string(),
            correlation_heatmap: "correlation_heatmap.svg".to_string(),
            pairplot: "baseline_pairplot.svg".to_string(),
            results: "results.json".to_string(),
        }
    }
}

/// Run configuration, read from JSON. Every field is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub input: PathBuf,
    /// Where figures are written first.
    pub output_dir: PathBuf,
    /// Where figures are moved after being written, if anywhere.
    pub destination_dir: Option<PathBuf>,
    pub outputs: OutputFiles,
    pub selection: SelectionConfig,
    pub significance: Significance,
    /// Diagonal of the pairwise correlation matrices.
    pub diagonal: DiagonalFill,
    pub histogram_bins: usize,
    pub pairplot_columns: usize,
    /// Fail at startup on any selection issue instead of logging it.
    pub strict: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input: PathBuf::from("Nick_Paper_Education_Exercise_Study_Data_for_Correlation.csv"),
            output_dir: PathBuf::from("."),
            destination_dir: None,
            outputs: OutputFiles::default(),
            selection: SelectionConfig::default(),
            significance: Significance::default(),
            diagonal: DiagonalFill::default(),
            histogram_bins: HISTOGRAM_BINS,
            pairplot_columns: 4,
            strict: true,
        }
    }
}

impl Config {
    #[tracing::instrument]
    pub fn load(path: &Path) -> Result<Self, Error> {
        let text = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&text)?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// The config at `path`, or at `PAINSTATS_CONFIG` when no path is given, or the defaults.
    pub fn resolve(path: Option<&Path>) -> Result<Self, Error> {
        match path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from))
        {
            Some(path) => Self::load(&path),
            None => {
                debug!("No config given, using defaults");
                Ok(Self::default())
            },
        }
    }

    /// Where an output named `name` is first written.
    pub fn staged(&self, name: &str) -> PathBuf {
        self.output_dir.join(name)
    }

    /// Where an output named `name` ends up, if it is moved.
    pub fn destination(&self, name: &str) -> Option<PathBuf> {
        self.destination_dir.as_ref().map(|d| d.join(name))
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn test_empty_json_is_default() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config, Config::default());
        assert!(config.strict);
        assert_eq!(config.diagonal, DiagonalFill::Zero);
        assert_eq!(config.selection.denylist, &["PainProblems1", "PainProblems5"]);
    }

    #[test]
    fn test_partial_override() {
        let config: Config = serde_json::from_str(
            r#"{
                "input": "data/survey.csv.gz",
                "destination_dir": "out/final",
                "diagonal": "one",
                "significance": { "weak": 0.1 },
                "selection": { "denylist": [] }
            }"#,
        )
        .unwrap();
        assert_eq!(config.input, PathBuf::from("data/survey.csv.gz"));
        assert_eq!(config.diagonal, DiagonalFill::One);
        assert_eq!(config.significance.weak, 0.1);
        assert_eq!(config.significance.strong, 0.01);
        assert!(config.selection.denylist.is_empty());
        assert_eq!(config.selection.name_mapping.len(), 20);
        assert_eq!(
            config.destination("results.json"),
            Some(PathBuf::from("out/final/results.json"))
        );
    }

    #[test]
    fn test_invalid_diagonal() {
        assert!(serde_json::from_str::<Config>(r#"{ "diagonal": "two" }"#).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join("painstats_config_test.json");
        std::fs::write(&path, r#"{ "strict": false, "pairplot_columns": 3 }"#).unwrap();
        let config = Config::load(&path).unwrap();
        assert!(!config.strict);
        assert_eq!(config.pairplot_columns, 3);
        assert_eq!(config.staged("a.svg"), PathBuf::from("./a.svg"));
        assert_eq!(config.destination("a.svg"), None);
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_load_missing_file() {
        assert!(matches!(
            Config::load(Path::new("/definitely/not/here.json")),
            Err(Error::Io(_))
        ));
    }
}
