use std::fmt;

use rayon::prelude::*;
use serde::Serialize;

use crate::{quantile_sorted, std_dev, sum_count, DType, Frame};

/// Shape, dtypes and missing-value counts of a frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Overview {
    pub shape: (usize, usize),
    pub dtypes: Vec<(String, DType)>,
    pub missing: Vec<(String, usize)>,
}

impl Overview {
    pub fn new(frame: &Frame) -> Self {
        Self {
            shape: frame.shape(),
            dtypes: frame
                .dtypes()
                .into_iter()
                .map(|(n, d)| (n.to_string(), d))
                .collect(),
            missing: frame
                .missing_counts()
                .into_iter()
                .map(|(n, c)| (n.to_string(), c))
                .collect(),
        }
    }

    pub fn total_missing(&self) -> usize {
        self.missing.iter().map(|(_, c)| c).sum()
    }
}

fn name_width<'a>(names: impl Iterator<Item = &'a String>) -> usize {
    names.map(|n| n.len()).max().unwrap_or(0)
}

impl fmt::Display for Overview {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Dataset Overview:")?;
        writeln!(
            f,
            "Shape of the dataset: ({}, {})",
            self.shape.0, self.shape.1
        )?;
        writeln!(f)?;
        writeln!(f, "Column Data Types:")?;
        let w = name_width(self.dtypes.iter().map(|(n, _)| n));
        for (name, dtype) in &self.dtypes {
            writeln!(f, "{:<w$}    {}", name, dtype, w = w)?;
        }
        writeln!(f)?;
        writeln!(f, "Missing Values Count:")?;
        let w = name_width(self.missing.iter().map(|(n, _)| n));
        for (name, count) in &self.missing {
            writeln!(f, "{:<w$}    {}", name, count, w = w)?;
        }
        Ok(())
    }
}

/// Descriptive statistics of one numeric column, NaN-skipping.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSummary {
    pub name: String,
    pub count: usize,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    #[serde(rename = "25%")]
    pub q25: f64,
    #[serde(rename = "50%")]
    pub q50: f64,
    #[serde(rename = "75%")]
    pub q75: f64,
    pub max: f64,
}

impl ColumnSummary {
    pub fn new(name: &str, data: &[f64]) -> Self {
        let mut sorted = data
            .iter()
            .copied()
            .filter(|x| !x.is_nan())
            .collect::<Vec<_>>();
        sorted.sort_by(f64::total_cmp);
        let (sum, count) = sum_count(data);
        Self {
            name: name.to_string(),
            count,
            mean: if count == 0 {
                f64::NAN
            } else {
                sum / count as f64
            },
            std: std_dev(data),
            min: sorted.first().copied().unwrap_or(f64::NAN),
            q25: quantile_sorted(&sorted, 0.25),
            q50: quantile_sorted(&sorted, 0.5),
            q75: quantile_sorted(&sorted, 0.75),
            max: sorted.last().copied().unwrap_or(f64::NAN),
        }
    }

    fn stats(&self) -> [f64; 8] {
        [
            self.count as f64,
            self.mean,
            self.std,
            self.min,
            self.q25,
            self.q50,
            self.q75,
            self.max,
        ]
    }
}

const STAT_NAMES: [&str; 8] = ["count", "mean", "std", "min", "25%", "50%", "75%", "max"];

/// The `describe` table of every numeric column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Describe {
    pub columns: Vec<ColumnSummary>,
}

impl Describe {
    #[tracing::instrument(skip(frame))]
    pub fn new(frame: &Frame) -> Self {
        let columns = frame
            .columns()
            .par_iter()
            .filter_map(|c| c.as_f64().map(|data| ColumnSummary::new(c.name(), data)))
            .collect();
        Self { columns }
    }

    pub fn get(&self, name: &str) -> Option<&ColumnSummary> {
        self.columns.iter().find(|c| c.name == name)
    }
}

fn format_stat(x: f64) -> String {
    if x.is_nan() {
        "NaN".to_string()
    } else {
        format!("{:.6}", x)
    }
}

impl fmt::Display for Describe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cells = self
            .columns
            .iter()
            .map(|c| c.stats().map(format_stat))
            .collect::<Vec<_>>();
        let widths = self
            .columns
            .iter()
            .zip(cells.iter())
            .map(|(c, cells)| {
                cells
                    .iter()
                    .map(|x| x.len())
                    .chain([c.name.len()])
                    .max()
                    .unwrap_or(0)
            })
            .collect::<Vec<_>>();
        write!(f, "{:<5}", "")?;
        for (c, w) in self.columns.iter().zip(widths.iter()) {
            write!(f, "  {:>w$}", c.name, w = w)?;
        }
        writeln!(f)?;
        for (i, stat) in STAT_NAMES.iter().enumerate() {
            write!(f, "{:<5}", stat)?;
            for (cells, w) in cells.iter().zip(widths.iter()) {
                write!(f, "  {:>w$}", cells[i], w = w)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Value counts of one `object` column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrequencyTable {
    pub column: String,
    pub counts: Vec<(String, usize)>,
}

impl fmt::Display for FrequencyTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}:", self.column)?;
        let w = name_width(self.counts.iter().map(|(v, _)| v));
        for (value, count) in &self.counts {
            writeln!(f, "{:<w$}    {}", value, count, w = w)?;
        }
        Ok(())
    }
}

/// Frequency tables of the categorical columns, empty when there are none.
pub fn frequency_tables(frame: &Frame) -> Vec<FrequencyTable> {
    frame
        .columns()
        .iter()
        .filter(|c| c.dtype() == DType::Object)
        .map(|c| FrequencyTable {
            column: c.name().to_string(),
            counts: c.value_counts(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::Column;

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

    fn frame() -> Frame {
        Frame::new(vec![
            Column::text(
                "Sex",
                vec![
                    Some("F".to_string()),
                    Some("M".to_string()),
                    Some("F".to_string()),
                    None,
                    Some("F".to_string()),
                ],
            ),
            Column::int("PainDays1", vec![1, 2, 3, 4, 5]),
            Column::float("Scale1PSA1", vec![2.0, f64::NAN, 4.0, 6.0, 8.0]),
        ])
        .unwrap()
    }

    #[test]
    fn test_overview() {
        let o = Overview::new(&frame());
        assert_eq!(o.shape, (5, 3));
        assert_eq!(o.total_missing(), 2);
        let text = o.to_string();
        assert!(text.contains("Shape of the dataset: (5, 3)"));
        assert!(text.contains("PainDays1     int64"));
        assert!(text.contains("Scale1PSA1    1"));
    }

    #[test]
    fn test_describe() {
        let d = Describe::new(&frame());
        assert_eq!(d.columns.len(), 2);
        let days = d.get("PainDays1").unwrap();
        assert_eq!(days.count, 5);
        float_eq!(days.mean, 3.0);
        float_eq!(days.std, 2.5f64.sqrt());
        assert_eq!((days.min, days.q25, days.q50, days.q75, days.max), (1.0, 2.0, 3.0, 4.0, 5.0));
        let psa = d.get("Scale1PSA1").unwrap();
        assert_eq!(psa.count, 4);
        float_eq!(psa.mean, 5.0);
        float_eq!(psa.q25, 3.5);
    }

    #[test]
    fn test_describe_display() {
        let text = Describe::new(&frame()).to_string();
        let lines = text.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 9);
        assert!(lines[0].contains("PainDays1"));
        assert!(lines[1].starts_with("count"));
        assert!(lines[2].contains("3.000000"));
    }

    #[test]
    fn test_describe_all_missing() {
        let f = Frame::new(vec![Column::float("x", vec![f64::NAN, f64::NAN])]).unwrap();
        let d = Describe::new(&f);
        assert_eq!(d.columns[0].count, 0);
        assert!(d.columns[0].mean.is_nan());
        assert!(d.columns[0].min.is_nan());
    }

    #[test]
    fn test_frequency_tables() {
        let tables = frequency_tables(&frame());
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].column, "Sex");
        assert_eq!(
            tables[0].counts,
            vec![("F".to_string(), 3), ("M".to_string(), 1)]
        );
        assert_eq!(tables[0].to_string(), "Sex:\nF    3\nM    1\n");
    }

    #[test]
    fn test_no_categorical_columns() {
        let f = frame().select_numeric();
        assert!(frequency_tables(&f).is_empty());
    }
}
