use std::collections::{HashMap, HashSet};

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{Error, Frame};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Baseline,
    After,
}

/// One matched baseline/after-education variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairSpec {
    pub baseline: String,
    pub after: String,
    pub label: String,
}

/// How the wide survey table is split into matched baseline and after-education columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    /// Suffixes marking a baseline column, e.g. `PainDays1` or `Scale1PSA1`.
    pub baseline_suffixes: Vec<String>,
    /// Suffixes marking an after-education column, e.g. `PainDays5` or `Scale1PSA2`.
    pub after_suffixes: Vec<String>,
    /// Columns dropped from both sub-tables.
    pub denylist: Vec<String>,
    /// Raw column name to display label.
    pub name_mapping: HashMap<String, String>,
    /// Explicit pairing table, derived from the suffixes when absent.
    pub pairs: Option<Vec<PairSpec>>,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        let mapping = [
            ("PainDays", "Days Manageable Pain"),
            ("InterfereActive", "Interference Activity"),
            ("InterfereMood", "Interference Mood"),
            ("InterfereSleep", "Interference Sleep"),
            ("HowHard", "Hard to Deal"),
        ]
        .into_iter()
        .flat_map(|(base, label)| {
            [
                (format!("{}1", base), label.to_string()),
                (format!("{}5", base), label.to_string()),
            ]
        })
        .chain(
            [
                ("Scale1PS", "Pain Severity"),
                ("Scale2LI", "Life Interference"),
                ("Scale3LC", "Life Control"),
                ("Scale4AD", "Affective Distress"),
                ("Scale5S", "Support"),
            ]
            .into_iter()
            .flat_map(|(base, label)| {
                [
                    (format!("{}A1", base), label.to_string()),
                    (format!("{}A2", base), label.to_string()),
                ]
            }),
        )
        .collect();
        Self {
            baseline_suffixes: vec!["A1".to_string(), "1".to_string()],
            after_suffixes: vec!["A2".to_string(), "5".to_string()],
            denylist: vec!["PainProblems1".to_string(), "PainProblems5".to_string()],
            name_mapping: mapping,
            pairs: None,
        }
    }
}

impl SelectionConfig {
    fn suffixes(&self, phase: Phase) -> &[String] {
        match phase {
            Phase::Baseline => &self.baseline_suffixes,
            Phase::After => &self.after_suffixes,
        }
    }

    /// The column-name pattern of a phase, `1$|A1$` style.
    pub fn suffix_regex(&self, phase: Phase) -> Result<Regex, Error> {
        let pattern = self
            .suffixes(phase)
            .iter()
            .map(|s| format!("{}$", regex::escape(s)))
            .collect::<Vec<_>>()
            .join("|");
        Ok(Regex::new(&pattern)?)
    }

    /// Every base name `name` can have in `phase`, longest suffix stripped first.
    pub fn base_names<'a>(&self, name: &'a str, phase: Phase) -> Vec<&'a str> {
        let mut suffixes = self.suffixes(phase).iter().collect::<Vec<_>>();
        suffixes.sort_by_key(|s| std::cmp::Reverse(s.len()));
        suffixes
            .into_iter()
            .filter_map(|s| name.strip_suffix(s.as_str()))
            .filter(|b| !b.is_empty())
            .collect()
    }

    /// Display label of a raw column name, the name itself when unmapped.
    pub fn label<'a>(&'a self, name: &'a str) -> &'a str {
        self.name_mapping
            .get(name)
            .map(|x| x.as_str())
            .unwrap_or(name)
    }

    /// Every denylisted or paired column that never appears in `frame`, plus the columns the
    /// suffix convention could not pair.
    ///
    /// A mapped column is only an issue when another column mapped to the same label appears, so
    /// the mapping can cover variables a given table does not have.
    #[tracing::instrument(skip(self, frame))]
    pub fn validate(&self, frame: &Frame) -> Result<Vec<String>, Error> {
        let mut issues = vec![];
        for name in &self.denylist {
            if !frame.has_column(name) {
                issues.push(format!("denylisted column {} never appears", name));
            }
        }
        let mut mapped = self.name_mapping.iter().collect::<Vec<_>>();
        mapped.sort();
        let mut unused = 0;
        for (name, label) in mapped {
            if frame.has_column(name) {
                continue;
            }
            let counterpart = self
                .name_mapping
                .iter()
                .find(|(other, l)| *l == label && frame.has_column(other));
            match counterpart {
                Some((other, _)) => issues.push(format!(
                    "mapped column {} never appears but {} ({}) does",
                    name, other, label
                )),
                None => unused += 1,
            }
        }
        debug!("{} mapped columns are not in this table", unused);
        let pairing = Pairing::from_config(&frame.select_numeric(), self)?;
        for pair in pairing.pairs() {
            for name in [&pair.baseline, &pair.after] {
                if !frame.has_column(name) {
                    issues.push(format!(
                        "paired column {} ({}) never appears",
                        name, pair.label
                    ));
                }
            }
        }
        for name in pairing.unmatched_baseline() {
            issues.push(format!("baseline column {} has no after-education match", name));
        }
        for name in pairing.unmatched_after() {
            issues.push(format!("after-education column {} has no baseline match", name));
        }
        debug!("{} selection issues", issues.len());
        Ok(issues)
    }
}

/// The explicit table of matched variables that the comparator runs over.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Pairing {
    pairs: Vec<PairSpec>,
    unmatched_baseline: Vec<String>,
    unmatched_after: Vec<String>,
}

impl Pairing {
    pub fn new(pairs: Vec<PairSpec>) -> Self {
        Self {
            pairs,
            ..Default::default()
        }
    }

    #[inline]
    pub fn pairs(&self) -> &[PairSpec] {
        &self.pairs
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    #[inline]
    pub fn unmatched_baseline(&self) -> &[String] {
        &self.unmatched_baseline
    }

    #[inline]
    pub fn unmatched_after(&self) -> &[String] {
        &self.unmatched_after
    }

    /// The configured pairing table, or the one derived from the suffixes.
    pub fn from_config(numeric: &Frame, config: &SelectionConfig) -> Result<Self, Error> {
        match &config.pairs {
            Some(pairs) => Ok(Self::new(pairs.clone())),
            None => Self::from_suffixes(numeric, config),
        }
    }

    /// Matches baseline and after-education columns of `numeric` by their name without the
    /// phase suffix. Denylisted columns take no part. Columns without a counterpart are kept
    /// aside in [`Pairing::unmatched_baseline`] and [`Pairing::unmatched_after`].
    #[tracing::instrument(skip(numeric, config))]
    pub fn from_suffixes(numeric: &Frame, config: &SelectionConfig) -> Result<Self, Error> {
        let denied = config
            .denylist
            .iter()
            .map(|x| x.as_str())
            .collect::<HashSet<_>>();
        let baseline = phase_columns(numeric, config, &denied, Phase::Baseline)?;
        let after = phase_columns(numeric, config, &denied, Phase::After)?;

        let mut used = vec![false; after.len()];
        let mut pairing = Pairing::default();
        for b in baseline {
            let bases = config.base_names(b, Phase::Baseline);
            let found = after.iter().enumerate().find_map(|(i, a)| {
                if used[i] {
                    return None;
                }
                let a_bases = config.base_names(a, Phase::After);
                bases
                    .iter()
                    .find(|base| a_bases.contains(base))
                    .map(|base| (i, *base))
            });
            match found {
                Some((i, base)) => {
                    used[i] = true;
                    let label = config
                        .name_mapping
                        .get(b)
                        .cloned()
                        .unwrap_or_else(|| base.to_string());
                    pairing.pairs.push(PairSpec {
                        baseline: b.to_string(),
                        after: after[i].to_string(),
                        label,
                    });
                },
                None => pairing.unmatched_baseline.push(b.to_string()),
            }
        }
        pairing.unmatched_after = after
            .iter()
            .zip(used)
            .filter(|(_, used)| !used)
            .map(|(a, _)| a.to_string())
            .collect();
        info!("Paired {} variables", pairing.pairs.len());
        Ok(pairing)
    }
}

fn phase_columns<'a>(
    numeric: &'a Frame,
    config: &SelectionConfig,
    denied: &HashSet<&str>,
    phase: Phase,
) -> Result<Vec<&'a str>, Error> {
    let re = config.suffix_regex(phase)?;
    Ok(numeric
        .colnames()
        .into_iter()
        .filter(|x| re.is_match(x) && !denied.contains(x))
        .collect())
}

/// Reduces `numeric` to the columns matching `pattern`, drops the denylisted columns (absent ones
/// are ignored) and renames what remains through `mapping`.
#[tracing::instrument(skip(numeric, denylist, mapping))]
pub fn select_columns<S: AsRef<str>>(
    numeric: &Frame,
    pattern: &Regex,
    denylist: &[S],
    mapping: &HashMap<String, String>,
) -> Result<Frame, Error> {
    let mut frame = numeric.filter_columns_by_regex(pattern);
    frame.remove_columns_by_name(denylist)?;
    frame.rename_columns(mapping);
    Ok(frame)
}

/// The numeric table split into its baseline and after-education halves.
#[derive(Debug, Clone)]
pub struct Selection {
    pub numeric: Frame,
    pub baseline: Frame,
    pub after: Frame,
    pub pairing: Pairing,
}

/// Runs the column selector for both phases.
///
/// With `strict`, any issue found by [`SelectionConfig::validate`] fails the selection, otherwise
/// the issues are logged and the selection proceeds.
#[tracing::instrument(skip(frame, config))]
pub fn select(frame: &Frame, config: &SelectionConfig, strict: bool) -> Result<Selection, Error> {
    let issues = config.validate(frame)?;
    if !issues.is_empty() {
        if strict {
            return Err(Error::InvalidSelection(issues));
        }
        for issue in &issues {
            warn!("{}", issue);
        }
    }
    let numeric = frame.select_numeric();
    let baseline = select_columns(
        &numeric,
        &config.suffix_regex(Phase::Baseline)?,
        &config.denylist,
        &config.name_mapping,
    )?;
    let after = select_columns(
        &numeric,
        &config.suffix_regex(Phase::After)?,
        &config.denylist,
        &config.name_mapping,
    )?;
    let pairing = Pairing::from_config(&numeric, config)?;
    info!(
        "Selected {} baseline and {} after-education columns",
        baseline.ncols(),
        after.ncols()
    );
    Ok(Selection {
        numeric,
        baseline,
        after,
        pairing,
    })
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::Column;

    fn frame() -> Frame {
        Frame::new(vec![
            Column::text("ID", vec![Some("a".to_string()), Some("b".to_string())]),
            Column::int("PainDays1", vec![1, 2]),
            Column::int("PainDays5", vec![2, 3]),
            Column::int("PainProblems1", vec![0, 1]),
            Column::int("PainProblems5", vec![1, 1]),
            Column::float("Scale1PSA1", vec![1.5, 2.5]),
            Column::float("Scale1PSA2", vec![1.0, 2.0]),
            Column::int("Age", vec![40, 50]),
        ])
        .unwrap()
    }

    #[test]
    fn test_suffix_regex() {
        let config = SelectionConfig::default();
        let re = config.suffix_regex(Phase::Baseline).unwrap();
        assert_eq!(re.as_str(), "A1$|1$");
        assert!(re.is_match("Scale5SA1"));
        assert!(!re.is_match("PainDays5"));
        let re = config.suffix_regex(Phase::After).unwrap();
        assert!(re.is_match("Scale5SA2"));
        assert!(re.is_match("HowHard5"));
    }

    #[test]
    fn test_base_names() {
        let config = SelectionConfig::default();
        assert_eq!(
            config.base_names("Scale1PSA1", Phase::Baseline),
            &["Scale1PS", "Scale1PSA"]
        );
        assert_eq!(config.base_names("PainDays5", Phase::After), &["PainDays"]);
        assert!(config.base_names("1", Phase::Baseline).is_empty());
    }

    #[test]
    fn test_default_mapping() {
        let config = SelectionConfig::default();
        assert_eq!(config.name_mapping.len(), 20);
        assert_eq!(config.label("Scale4ADA2"), "Affective Distress");
        assert_eq!(config.label("HowHard1"), "Hard to Deal");
        assert_eq!(config.label("Age"), "Age");
    }

    #[test]
    fn test_select_columns_denylist_absent_is_noop() {
        let numeric = frame().select_numeric();
        let re = Regex::new("1$|A1$").unwrap();
        let selected = select_columns(
            &numeric,
            &re,
            &["PainProblems1", "NotAColumn"],
            &HashMap::new(),
        )
        .unwrap();
        assert_eq!(selected.colnames(), &["PainDays1", "Scale1PSA1"]);
    }

    #[test]
    fn test_select_renames() {
        let sel = select(&frame(), &SelectionConfig::default(), false).unwrap();
        assert_eq!(sel.baseline.colnames(), &["Days Manageable Pain", "Pain Severity"]);
        assert_eq!(sel.after.colnames(), &["Days Manageable Pain", "Pain Severity"]);
        assert_eq!(sel.numeric.ncols(), 7);
    }

    #[test]
    fn test_pairing_from_suffixes() {
        let numeric = frame().select_numeric();
        let pairing = Pairing::from_suffixes(&numeric, &SelectionConfig::default()).unwrap();
        assert_eq!(
            pairing.pairs(),
            &[
                PairSpec {
                    baseline: "PainDays1".to_string(),
                    after: "PainDays5".to_string(),
                    label: "Days Manageable Pain".to_string(),
                },
                PairSpec {
                    baseline: "Scale1PSA1".to_string(),
                    after: "Scale1PSA2".to_string(),
                    label: "Pain Severity".to_string(),
                },
            ]
        );
        assert!(pairing.unmatched_baseline().is_empty());
        assert!(pairing.unmatched_after().is_empty());
    }

    #[test]
    fn test_pairing_reports_unmatched() {
        let f = Frame::new(vec![
            Column::int("PainDays1", vec![1]),
            Column::int("PainDays5", vec![1]),
            Column::int("HowHard5", vec![1]),
            Column::int("Extra1", vec![1]),
        ])
        .unwrap();
        let pairing = Pairing::from_suffixes(&f, &SelectionConfig::default()).unwrap();
        assert_eq!(pairing.len(), 1);
        assert_eq!(pairing.unmatched_baseline(), &["Extra1"]);
        assert_eq!(pairing.unmatched_after(), &["HowHard5"]);
    }

    #[test]
    fn test_pairing_label_falls_back_to_base_name() {
        let f = Frame::new(vec![
            Column::int("Mood1", vec![1]),
            Column::int("Mood5", vec![1]),
        ])
        .unwrap();
        let pairing = Pairing::from_suffixes(&f, &SelectionConfig::default()).unwrap();
        assert_eq!(pairing.pairs()[0].label, "Mood");
    }

    #[test]
    fn test_validate() {
        let config = SelectionConfig {
            denylist: vec!["PainProblems1".to_string(), "Gone5".to_string()],
            name_mapping: [
                ("PainDays1", "Days"),
                ("PainDays9", "Days"),
                ("Missing1", "M"),
                ("Missing5", "M"),
            ]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
            ..Default::default()
        };
        let issues = config.validate(&frame()).unwrap();
        assert_eq!(
            issues,
            vec![
                "denylisted column Gone5 never appears".to_string(),
                "mapped column PainDays9 never appears but PainDays1 (Days) does".to_string(),
                "after-education column PainProblems5 has no baseline match".to_string(),
            ]
        );
    }

    #[test]
    fn test_default_config_accepts_small_table() {
        let frame = Frame::new(vec![
            Column::int("PainDays1", vec![1, 2, 3]),
            Column::int("PainDays5", vec![1, 2, 3]),
            Column::int("PainProblems1", vec![0, 1, 1]),
            Column::int("PainProblems5", vec![0, 0, 1]),
        ])
        .unwrap();
        let config = SelectionConfig::default();
        assert!(config.validate(&frame).unwrap().is_empty());
        let sel = select(&frame, &config, true).unwrap();
        assert_eq!(sel.pairing.len(), 1);
        assert_eq!(sel.pairing.pairs()[0].label, "Days Manageable Pain");
    }

    #[test]
    fn test_select_strict_fails_fast() {
        let config = SelectionConfig {
            denylist: vec!["Gone".to_string()],
            name_mapping: HashMap::new(),
            ..Default::default()
        };
        assert!(matches!(
            select(&frame(), &config, true),
            Err(Error::InvalidSelection(issues)) if issues.len() == 1
        ));
    }

    #[test]
    fn test_explicit_pairs_validated() {
        let config = SelectionConfig {
            name_mapping: HashMap::new(),
            denylist: vec![],
            pairs: Some(vec![PairSpec {
                baseline: "PainDays1".to_string(),
                after: "NotThere5".to_string(),
                label: "Days".to_string(),
            }]),
            ..Default::default()
        };
        let issues = config.validate(&frame()).unwrap();
        assert_eq!(issues, vec!["paired column NotThere5 (Days) never appears".to_string()]);
    }
}
