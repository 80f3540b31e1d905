use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{mean, std_dev, wilcoxon, Error, Frame, Pairing, Wilcoxon};

/// Thresholds for the `**` and `*` significance markers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Significance {
    pub strong: f64,
    pub weak: f64,
}

impl Default for Significance {
    fn default() -> Self {
        Self {
            strong: 0.01,
            weak: 0.05,
        }
    }
}

impl Significance {
    pub fn marker(&self, p: f64) -> Option<&'static str> {
        if p < self.strong {
            Some("**")
        } else if p < self.weak {
            Some("*")
        } else {
            None
        }
    }

    #[inline]
    pub fn is_significant(&self, p: f64) -> bool {
        p < self.weak
    }
}

/// Summary and signed-rank test of one matched variable.
#[derive(Debug, Clone, Serialize)]
pub struct PairedComparison {
    pub label: String,
    pub baseline: String,
    pub after: String,
    pub baseline_mean: f64,
    pub after_mean: f64,
    pub baseline_sd: f64,
    pub after_sd: f64,
    pub test: Wilcoxon,
}

impl PairedComparison {
    #[tracing::instrument(skip(xs, ys))]
    pub fn new(
        label: &str,
        baseline: &str,
        after: &str,
        xs: &[f64],
        ys: &[f64],
    ) -> Result<Self, Error> {
        let test = wilcoxon(xs, ys)?;
        Ok(Self {
            label: label.to_string(),
            baseline: baseline.to_string(),
            after: after.to_string(),
            baseline_mean: mean(xs),
            after_mean: mean(ys),
            baseline_sd: std_dev(xs),
            after_sd: std_dev(ys),
            test,
        })
    }

    #[inline]
    pub fn p_value(&self) -> f64 {
        self.test.p_value()
    }
}

/// Runs the signed-rank test for every pair of `pairing` over the columns of `frame`.
#[tracing::instrument(skip(frame, pairing))]
pub fn compare_pairs(frame: &Frame, pairing: &Pairing) -> Result<Vec<PairedComparison>, Error> {
    info!("Comparing {} pairs", pairing.len());
    pairing
        .pairs()
        .par_iter()
        .map(|pair| {
            PairedComparison::new(
                &pair.label,
                &pair.baseline,
                &pair.after,
                frame.numeric(&pair.baseline)?,
                frame.numeric(&pair.after)?,
            )
        })
        .collect()
}

/// Pairs each column of `baseline` with the column of `after` carrying the same name, so both
/// frames must already be renamed to display labels. Both frames must have the same number of
/// columns and every baseline label must be present in `after`.
#[tracing::instrument(skip(baseline, after))]
pub fn compare_sub_frames(baseline: &Frame, after: &Frame) -> Result<Vec<PairedComparison>, Error> {
    if baseline.ncols() != after.ncols() {
        return Err(Error::ColumnCountMismatch {
            baseline: baseline.ncols(),
            after: after.ncols(),
        });
    }
    info!("Comparing {} labelled pairs", baseline.ncols());
    baseline
        .columns()
        .par_iter()
        .map(|b| {
            let xs = b
                .as_f64()
                .ok_or_else(|| Error::NotNumeric(b.name().to_string()))?;
            let ys = after.numeric(b.name())?;
            PairedComparison::new(b.name(), b.name(), b.name(), xs, ys)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::{select, Column, PairSpec, SelectionConfig};

    macro_rules! assert_float_eq {
        ($a:expr, $b:expr, $tol:expr) => {
            assert!(($a - $b).abs() < $tol, "{:.22} != {:.22}", $a, $b);
        };
    }

    macro_rules! float_eq {
        ($a:expr, $b:expr) => {
            assert_float_eq!($a, $b, 1e-10);
        };
    }

    fn survey() -> Frame {
        let days = vec![3, 5, 2, 7, 4, 6, 1, 0, 5, 3];
        Frame::new(vec![
            Column::int("PainDays1", days.clone()),
            Column::int("PainDays5", days),
            Column::int("PainProblems1", vec![1, 0, 1, 1, 0, 1, 0, 1, 1, 0]),
            Column::int("PainProblems5", vec![0, 0, 1, 0, 0, 1, 0, 0, 1, 0]),
        ])
        .unwrap()
    }

    #[test]
    fn test_marker() {
        let s = Significance::default();
        assert_eq!(s.marker(0.001), Some("**"));
        assert_eq!(s.marker(0.01), Some("*"));
        assert_eq!(s.marker(0.049), Some("*"));
        assert_eq!(s.marker(0.05), None);
        assert_eq!(s.marker(f64::NAN), None);
    }

    #[test]
    fn test_identical_pair_end_to_end() {
        let config = SelectionConfig::default();
        let sel = select(&survey(), &config, false).unwrap();
        assert_eq!(sel.baseline.colnames(), &["Days Manageable Pain"]);
        assert_eq!(sel.after.colnames(), &["Days Manageable Pain"]);
        let results = compare_pairs(&sel.numeric, &sel.pairing).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].label, "Days Manageable Pain");
        assert_eq!(results[0].p_value(), 1.0);
        float_eq!(results[0].baseline_mean, 3.6);
        float_eq!(results[0].baseline_mean, results[0].after_mean);
    }

    #[test]
    fn test_compare_sub_frames_by_label() {
        let baseline = Frame::new(vec![
            Column::float("Support", vec![1.0, 2.0, 3.0, 4.0]),
            Column::float("Pain Severity", vec![5.0, 6.0, 7.0, 8.0]),
        ])
        .unwrap();
        let after = Frame::new(vec![
            Column::float("Pain Severity", vec![5.0, 6.0, 7.0, 8.0]),
            Column::float("Support", vec![2.0, 3.0, 4.0, 5.5]),
        ])
        .unwrap();
        let results = compare_sub_frames(&baseline, &after).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].label, "Support");
        float_eq!(results[0].after_mean, 3.625);
        float_eq!(results[0].baseline_sd, (5.0f64 / 3.0).sqrt());
        assert_eq!(results[1].label, "Pain Severity");
        assert_eq!(results[1].p_value(), 1.0);
    }

    #[test]
    fn test_compare_sub_frames_unknown_label() {
        let baseline = Frame::new(vec![Column::float("Support", vec![1.0, 2.0])]).unwrap();
        let after = Frame::new(vec![Column::float("Support5", vec![1.0, 2.0])]).unwrap();
        assert!(matches!(
            compare_sub_frames(&baseline, &after),
            Err(Error::ColumnNameNotFound(n)) if n == "Support"
        ));
    }

    #[test]
    fn test_compare_sub_frames_column_count_mismatch() {
        let col = |name: &str| Column::float(name, vec![1.0, 2.0, 3.0]);
        let baseline = Frame::new(vec![col("A1"), col("B1")]).unwrap();
        let after = Frame::new(vec![col("A5"), col("B5"), col("C5")]).unwrap();
        assert!(matches!(
            compare_sub_frames(&baseline, &after),
            Err(Error::ColumnCountMismatch {
                baseline: 2,
                after: 3
            })
        ));
    }

    #[test]
    fn test_compare_pairs_missing_column() {
        let pairing = Pairing::new(vec![PairSpec {
            baseline: "PainDays1".to_string(),
            after: "Nope5".to_string(),
            label: "Days".to_string(),
        }]);
        assert!(matches!(
            compare_pairs(&survey(), &pairing),
            Err(Error::ColumnNameNotFound(_))
        ));
    }

    #[test]
    fn test_compare_pairs_skips_missing_rows() {
        let f = Frame::new(vec![
            Column::float("X1", vec![1.0, 2.0, f64::NAN, 4.0, 5.0]),
            Column::float("X5", vec![2.0, 4.0, 1.0, f64::NAN, 9.0]),
        ])
        .unwrap();
        let pairing = Pairing::new(vec![PairSpec {
            baseline: "X1".to_string(),
            after: "X5".to_string(),
            label: "X".to_string(),
        }]);
        let results = compare_pairs(&f, &pairing).unwrap();
        assert_eq!(results[0].test.n(), 3);
        float_eq!(results[0].baseline_mean, 3.0);
    }
}
