use std::{
    collections::BTreeMap,
    fmt,
    io::Write,
    path::{Path, PathBuf},
    str::FromStr,
};

use plotters::prelude::*;
use serde::Serialize;
use tracing::{error, info};

use crate::{
    compare_pairs, correlation_matrix, draw_boxplots, draw_comparison_bars,
    draw_histograms, draw_missing_map, draw_pairplot, draw_stacked, frequency_tables, relocate,
    render_svg, select, Config, CorrMatrix, CorrelationKind, CorrelationMethod, Describe,
    DiagonalFill, Error, File, FileType, Frame, Heatmap, Overview, PairedComparison, Pairing,
    Selection,
};

const BASELINE_TITLE: &str = "Spearman Rho Correlation Matrix: Baseline";
const AFTER_TITLE: &str = "Spearman Rho Correlation Matrix: After Education";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Report {
    Eda,
    Wilcoxon,
    CombinedHeatmap,
    SeparateHeatmaps,
}

impl Report {
    pub const ALL: [Report; 4] = [
        Report::Eda,
        Report::Wilcoxon,
        Report::CombinedHeatmap,
        Report::SeparateHeatmaps,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Report::Eda => "eda",
            Report::Wilcoxon => "wilcoxon",
            Report::CombinedHeatmap => "combined-heatmap",
            Report::SeparateHeatmaps => "separate-heatmaps",
        }
    }

    /// Loads the input, runs this report and writes its figures and `results.json`. Console output
    /// goes to `out`.
    #[tracing::instrument(skip(config, out))]
    pub fn run(self, config: &Config, out: &mut impl Write) -> Result<Results, Error> {
        let prepared = prepare(config)?;
        let mut results = Results {
            report: self.name().to_string(),
            ..Default::default()
        };
        match self {
            Report::Eda => eda(config, &prepared, &mut results, out)?,
            Report::Wilcoxon => wilcoxon(config, &prepared, &mut results, out)?,
            Report::CombinedHeatmap => combined_heatmap(config, &prepared, &mut results, out)?,
            Report::SeparateHeatmaps => separate_heatmaps(config, &prepared, &mut results, out)?,
        }
        write_results(config, &results)?;
        info!("Finished {} report", self.name());
        Ok(results)
    }
}

impl fmt::Display for Report {
    #[cfg_attr(coverage_nightly, coverage(off))]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Report {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Report::ALL
            .into_iter()
            .find(|r| r.name() == s)
            .ok_or_else(|| Error::UnknownReport(s.to_string()))
    }
}

/// Structured output of a run, written as `results.json`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Results {
    pub report: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overview: Option<Overview>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub describe: Option<Describe>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pairing: Option<Pairing>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub comparisons: Vec<PairedComparison>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub correlations: BTreeMap<String, CorrMatrix>,
    pub figures: Vec<PathBuf>,
}

/// The loaded table and its baseline/after-education selection.
#[derive(Debug, Clone)]
pub struct Prepared {
    pub frame: Frame,
    pub selection: Selection,
}

#[tracing::instrument(skip(config), fields(input = %config.input.display()))]
pub fn prepare(config: &Config) -> Result<Prepared, Error> {
    let frame = File::from_path(&config.input)?.read()?;
    let selection = select(&frame, &config.selection, config.strict)?;
    Ok(Prepared { frame, selection })
}

/// Moves a staged output to the destination directory. A failed move is reported on `out` and
/// logged but does not fail the run, the file then stays where it was written.
fn deliver(config: &Config, name: &str, out: &mut impl Write) -> Result<PathBuf, Error> {
    let staged = config.staged(name);
    let Some(destination) = config.destination(name) else {
        return Ok(staged);
    };
    match relocate(&staged, &destination) {
        Ok(()) => {
            writeln!(out, "Moved {} to {}", staged.display(), destination.display())?;
            Ok(destination)
        },
        Err(e) => {
            error!("Failed to move {}: {}", staged.display(), e);
            writeln!(out, "Error: could not move {}: {}", staged.display(), e)?;
            Ok(staged)
        },
    }
}

fn figure<F>(
    config: &Config,
    name: &str,
    size: (u32, u32),
    results: &mut Results,
    out: &mut impl Write,
    draw: F,
) -> Result<(), Error>
where
    F: FnOnce(&DrawingArea<SVGBackend<'_>, plotters::coord::Shift>) -> Result<(), Error>,
{
    render_svg(&config.staged(name), size, draw)?;
    let path = deliver(config, name, out)?;
    results.figures.push(path);
    Ok(())
}

fn print_p_values(out: &mut impl Write, comparisons: &[PairedComparison]) -> Result<(), Error> {
    writeln!(out, "P-values for each comparison:")?;
    let w = comparisons
        .iter()
        .map(|c| c.label.len())
        .max()
        .unwrap_or(0);
    for c in comparisons {
        writeln!(out, "{:<w$}    {:.6}", c.label, c.p_value(), w = w)?;
    }
    Ok(())
}

fn spearman_pair(
    selection: &Selection,
    method: CorrelationMethod,
    diagonal: DiagonalFill,
) -> Result<(CorrMatrix, CorrMatrix), Error> {
    let baseline = correlation_matrix(
        &selection.baseline,
        CorrelationKind::Spearman,
        method,
        diagonal,
    )?;
    let after = correlation_matrix(
        &selection.after,
        CorrelationKind::Spearman,
        method,
        diagonal,
    )?;
    Ok((baseline, after))
}

fn eda(
    config: &Config,
    prepared: &Prepared,
    results: &mut Results,
    out: &mut impl Write,
) -> Result<(), Error> {
    let Prepared { frame, selection } = prepared;
    let overview = Overview::new(frame);
    writeln!(out, "{}", overview)?;
    let describe = Describe::new(frame);
    writeln!(out, "Summary Statistics for Numerical Data:")?;
    writeln!(out, "{}", describe)?;
    let tables = frequency_tables(frame);
    if !tables.is_empty() {
        writeln!(out, "Frequency Counts for Categorical Data:")?;
        for table in &tables {
            writeln!(out, "{}", table)?;
        }
    }

    let outputs = &config.outputs;
    figure(config, &outputs.missing_map, (1000, 600), results, out, |root| {
        draw_missing_map(root, frame)
    })?;
    writeln!(out, "Generating histograms for numerical data...")?;
    figure(config, &outputs.histograms, (1200, 1000), results, out, |root| {
        draw_histograms(root, &selection.numeric, config.histogram_bins)
    })?;
    figure(config, &outputs.boxplots, (1200, 800), results, out, |root| {
        draw_boxplots(root, &selection.numeric)
    })?;

    writeln!(out, "Correlation Analysis:")?;
    let pearson = correlation_matrix(
        &selection.numeric,
        CorrelationKind::Pearson,
        CorrelationMethod::Pairwise,
        DiagonalFill::One,
    )?;
    figure(config, &outputs.correlation_heatmap, (1000, 800), results, out, |root| {
        Heatmap::pearson(&pearson, "Correlation Heatmap").draw(root)
    })?;
    results.correlations.insert("pearson".to_string(), pearson);

    let pairplot = selection.baseline.head_columns(config.pairplot_columns);
    if pairplot.ncols() > 1 {
        writeln!(out, "Generating pairplot for selected data...")?;
        figure(config, &outputs.pairplot, (900, 900), results, out, |root| {
            draw_pairplot(root, &pairplot)
        })?;
    }

    let comparisons = compare_pairs(&selection.numeric, &selection.pairing)?;
    writeln!(out)?;
    print_p_values(out, &comparisons)?;

    let cleaned = config.staged(&outputs.cleaned_csv);
    File::new(&cleaned, FileType::Csv, false).write(frame)?;
    writeln!(out, "\nCleaned data saved to: {}", cleaned.display())?;

    results.overview = Some(overview);
    results.describe = Some(describe);
    results.pairing = Some(selection.pairing.clone());
    results.comparisons = comparisons;
    Ok(())
}

fn wilcoxon(
    config: &Config,
    prepared: &Prepared,
    results: &mut Results,
    out: &mut impl Write,
) -> Result<(), Error> {
    let selection = &prepared.selection;
    let comparisons = compare_pairs(&selection.numeric, &selection.pairing)?;
    print_p_values(out, &comparisons)?;
    figure(config, &config.outputs.wilcoxon_bars, (1200, 800), results, out, |root| {
        draw_comparison_bars(root, &comparisons, &config.significance)
    })?;
    results.pairing = Some(selection.pairing.clone());
    results.comparisons = comparisons;
    Ok(())
}

fn combined_heatmap(
    config: &Config,
    prepared: &Prepared,
    results: &mut Results,
    out: &mut impl Write,
) -> Result<(), Error> {
    let (baseline, after) = spearman_pair(
        &prepared.selection,
        CorrelationMethod::Matrix,
        config.diagonal,
    )?;
    let maps = [
        Heatmap::spearman(&baseline, BASELINE_TITLE, config.significance),
        Heatmap::spearman(&after, AFTER_TITLE, config.significance),
    ];
    figure(config, &config.outputs.combined_heatmap, (800, 1200), results, out, |root| {
        draw_stacked(root, &maps)
    })?;
    results.correlations.insert("baseline".to_string(), baseline);
    results.correlations.insert("after".to_string(), after);
    Ok(())
}

fn separate_heatmaps(
    config: &Config,
    prepared: &Prepared,
    results: &mut Results,
    out: &mut impl Write,
) -> Result<(), Error> {
    let (baseline, after) = spearman_pair(
        &prepared.selection,
        CorrelationMethod::Pairwise,
        config.diagonal,
    )?;
    let outputs = &config.outputs;
    for (matrix, title, name) in [
        (&baseline, BASELINE_TITLE, &outputs.baseline_heatmap),
        (&after, AFTER_TITLE, &outputs.after_heatmap),
    ] {
        figure(config, name, (800, 500), results, out, |root| {
            Heatmap::spearman(matrix, title, config.significance).draw(root)
        })?;
    }
    results.correlations.insert("baseline".to_string(), baseline);
    results.correlations.insert("after".to_string(), after);
    Ok(())
}

fn write_results(config: &Config, results: &Results) -> Result<(), Error> {
    let path = config.staged(&config.outputs.results);
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let writer = std::io::BufWriter::new(std::fs::File::create(&path)?);
    serde_json::to_writer_pretty(writer, results)?;
    info!("Wrote {}", path.display());
    Ok(())
}

/// Reads a `results.json` back as untyped JSON.
pub fn read_results(path: &Path) -> Result<serde_json::Value, Error> {
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    const SURVEY: &str = "\
ID,Sex,PainDays1,PainDays5,PainProblems1,PainProblems5,Scale1PSA1,Scale1PSA2,Scale5SA1,Scale5SA2
1,F,3,3,1,0,2.5,2.0,4,5
2,M,5,5,0,0,3.0,2.5,3,3
3,F,2,2,1,1,4.5,3.0,5,6
4,F,7,7,1,0,1.0,1.5,2,4
5,M,4,4,0,0,3.5,2.0,,5
6,F,6,6,1,1,2.0,1.0,4,4
7,M,1,1,0,0,5.0,3.5,3,5
8,F,0,0,1,0,4.0,2.5,5,6
";

    fn setup(name: &str) -> Config {
        let dir = std::env::temp_dir().join("painstats_report_test").join(name);
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        let input = dir.join("survey.csv");
        std::fs::write(&input, SURVEY).unwrap();
        Config {
            input,
            output_dir: dir.join("staging"),
            destination_dir: Some(dir.join("drive")),
            strict: false,
            ..Default::default()
        }
    }

    #[test]
    fn test_report_names() {
        for r in Report::ALL {
            assert_eq!(r.name().parse::<Report>().unwrap(), r);
        }
        assert!(matches!(
            "heatmap".parse::<Report>(),
            Err(Error::UnknownReport(_))
        ));
    }

    #[test]
    fn test_wilcoxon_report() {
        let config = setup("wilcoxon");
        let mut out = Vec::new();
        let results = Report::Wilcoxon.run(&config, &mut out).unwrap();
        let out = String::from_utf8(out).unwrap();
        assert!(out.contains("P-values for each comparison:"));
        assert!(out.contains("Days Manageable Pain    1.000000"));
        assert!(!out.contains("PainProblems"));
        let labels = results
            .comparisons
            .iter()
            .map(|c| c.label.as_str())
            .collect::<Vec<_>>();
        assert_eq!(labels, &["Days Manageable Pain", "Pain Severity", "Support"]);
        let bars = config.destination(&config.outputs.wilcoxon_bars).unwrap();
        assert!(bars.exists());
        assert!(!config.staged(&config.outputs.wilcoxon_bars).exists());
        let json = read_results(&config.staged(&config.outputs.results)).unwrap();
        assert_eq!(json["report"], "wilcoxon");
        assert_eq!(json["comparisons"][0]["test"]["p_value"], 1.0);
    }

    #[test]
    fn test_relocation_failure_is_not_fatal() {
        let mut config = setup("relocation");
        let blocker = config.output_dir.parent().unwrap().join("blocker");
        std::fs::write(&blocker, "not a directory").unwrap();
        config.destination_dir = Some(blocker.join("drive"));
        let mut out = Vec::new();
        let results = Report::Wilcoxon.run(&config, &mut out).unwrap();
        let out = String::from_utf8(out).unwrap();
        assert!(out.contains("Error: could not move"));
        assert_eq!(
            results.figures,
            vec![config.staged(&config.outputs.wilcoxon_bars)]
        );
        assert!(results.figures[0].exists());
    }

    #[test]
    fn test_combined_heatmap_report() {
        let config = setup("combined");
        let results = Report::CombinedHeatmap.run(&config, &mut std::io::sink()).unwrap();
        let baseline = &results.correlations["baseline"];
        assert_eq!(
            baseline.names(),
            &["Days Manageable Pain", "Pain Severity", "Support"]
        );
        assert!(baseline.is_symmetric());
        assert_eq!(baseline.coefficient(1, 1), 1.0);
        let svg = std::fs::read_to_string(&results.figures[0]).unwrap();
        assert!(svg.contains(BASELINE_TITLE));
        assert!(svg.contains(AFTER_TITLE));
    }

    #[test]
    fn test_separate_heatmaps_report() {
        let config = setup("separate");
        let results = Report::SeparateHeatmaps.run(&config, &mut std::io::sink()).unwrap();
        assert_eq!(results.figures.len(), 2);
        let after = &results.correlations["after"];
        for i in 0..after.len() {
            assert_eq!(after.coefficient(i, i), 1.0);
            assert_eq!(after.p_value(i, i), 0.0);
        }
        let svg = std::fs::read_to_string(&results.figures[0]).unwrap();
        assert!(svg.contains(BASELINE_TITLE));
        // the three diagonal cells
        assert_eq!(svg.matches("1.00").count() - svg.matches("-1.00").count(), 3);
        assert!(config
            .destination(&config.outputs.after_heatmap)
            .unwrap()
            .exists());
    }

    #[test]
    fn test_eda_report() {
        let config = setup("eda");
        let mut out = Vec::new();
        let results = Report::Eda.run(&config, &mut out).unwrap();
        let out = String::from_utf8(out).unwrap();
        assert!(out.contains("Shape of the dataset: (8, 10)"));
        assert!(out
            .lines()
            .any(|l| l.starts_with("Sex ") && l.ends_with("object")));
        assert!(out.contains("Frequency Counts for Categorical Data:"));
        assert!(out.contains("Cleaned data saved to:"));
        assert_eq!(results.figures.len(), 5);
        assert_eq!(results.correlations["pearson"].coefficient(0, 0), 1.0);
        let cleaned = File::from_path(config.staged(&config.outputs.cleaned_csv))
            .unwrap()
            .read()
            .unwrap();
        assert_eq!(cleaned.shape(), (8, 10));
    }

    #[test]
    fn test_missing_input() {
        let mut config = setup("missing");
        config.input = config.output_dir.join("nope.csv");
        let err = Report::Eda.run(&config, &mut std::io::sink()).unwrap_err();
        assert!(matches!(err, Error::InputNotFound(_)));
        assert!(err.is_load_error());
        assert!(err.to_string().contains("Please check the file path."));
    }

    #[test]
    fn test_eda_pairs_by_name_not_position() {
        let mut config = setup("eda_order");
        std::fs::write(
            &config.input,
            "PainDays1,Mood5,Mood1,PainDays5,PainProblems1,PainProblems5\n\
             3,2,5,3,1,0\n\
             5,1,4,5,0,0\n\
             2,3,6,2,1,1\n\
             7,2,7,7,1,0\n\
             4,1,3,4,0,0\n\
             6,2,8,6,1,1\n\
             1,1,5,1,0,0\n\
             0,3,6,0,1,0\n",
        )
        .unwrap();
        config.strict = true;
        let results = Report::Eda.run(&config, &mut std::io::sink()).unwrap();
        let pairs = results
            .comparisons
            .iter()
            .map(|c| (c.label.as_str(), c.baseline.as_str(), c.after.as_str()))
            .collect::<Vec<_>>();
        assert_eq!(
            pairs,
            &[
                ("Days Manageable Pain", "PainDays1", "PainDays5"),
                ("Mood", "Mood1", "Mood5"),
            ]
        );
        assert_eq!(results.comparisons[0].p_value(), 1.0);
        assert!(results.comparisons[1].p_value() < 0.05);
    }

    #[test]
    fn test_strict_selection_fails_at_startup() {
        let mut config = setup("strict");
        config.strict = true;
        config.selection.denylist.push("Gone1".to_string());
        assert!(matches!(
            Report::Wilcoxon.run(&config, &mut std::io::sink()),
            Err(Error::InvalidSelection(_))
        ));
    }
}
