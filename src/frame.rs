use std::collections::{BTreeMap, HashMap, HashSet};

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DType {
    Int64,
    Float64,
    Object,
}

impl DType {
    #[inline]
    pub fn is_numeric(self) -> bool {
        matches!(self, DType::Int64 | DType::Float64)
    }
}

impl std::fmt::Display for DType {
    #[cfg_attr(coverage_nightly, coverage(off))]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DType::Int64 => write!(f, "int64"),
            DType::Float64 => write!(f, "float64"),
            DType::Object => write!(f, "object"),
        }
    }
}

#[derive(Debug, Clone)]
pub enum ColumnData {
    /// Missing values are NaN.
    Numeric(Vec<f64>),
    Text(Vec<Option<String>>),
}

#[derive(Debug, Clone)]
pub struct Column {
    pub(crate) name: String,
    pub(crate) dtype: DType,
    pub(crate) data: ColumnData,
}

impl PartialEq for Column {
    #[cfg_attr(coverage_nightly, coverage(off))]
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.dtype == other.dtype
            && match (&self.data, &other.data) {
                (ColumnData::Numeric(a), ColumnData::Numeric(b)) => {
                    a.len() == b.len()
                        && a.iter()
                            .zip(b.iter())
                            .all(|(a, b)| a.to_bits() == b.to_bits())
                },
                (ColumnData::Text(a), ColumnData::Text(b)) => a == b,
                _ => false,
            }
    }
}

impl Column {
    pub fn float(name: impl Into<String>, data: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            dtype: DType::Float64,
            data: ColumnData::Numeric(data),
        }
    }

    pub fn int(name: impl Into<String>, data: Vec<i64>) -> Self {
        Self {
            name: name.into(),
            dtype: DType::Int64,
            data: ColumnData::Numeric(data.into_iter().map(|x| x as f64).collect()),
        }
    }

    pub fn text(name: impl Into<String>, data: Vec<Option<String>>) -> Self {
        Self {
            name: name.into(),
            dtype: DType::Object,
            data: ColumnData::Text(data),
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn dtype(&self) -> DType {
        self.dtype
    }

    #[inline]
    pub fn data(&self) -> &ColumnData {
        &self.data
    }

    pub fn len(&self) -> usize {
        match &self.data {
            ColumnData::Numeric(x) => x.len(),
            ColumnData::Text(x) => x.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn as_f64(&self) -> Option<&[f64]> {
        match &self.data {
            ColumnData::Numeric(x) => Some(x),
            ColumnData::Text(_) => None,
        }
    }

    #[inline]
    pub fn as_text(&self) -> Option<&[Option<String>]> {
        match &self.data {
            ColumnData::Numeric(_) => None,
            ColumnData::Text(x) => Some(x),
        }
    }

    pub fn is_missing(&self, row: usize) -> bool {
        match &self.data {
            ColumnData::Numeric(x) => x[row].is_nan(),
            ColumnData::Text(x) => x[row].is_none(),
        }
    }

    pub fn missing_count(&self) -> usize {
        (0..self.len()).filter(|i| self.is_missing(*i)).count()
    }

    /// The cell rendered the way it is written back to CSV, missing cells are empty.
    pub fn format_cell(&self, row: usize) -> String {
        match &self.data {
            ColumnData::Numeric(x) => {
                let v = x[row];
                if v.is_nan() {
                    String::new()
                } else if self.dtype == DType::Int64 {
                    format!("{}", v as i64)
                } else if v.is_finite() && v.fract() == 0.0 {
                    format!("{:.1}", v)
                } else {
                    v.to_string()
                }
            },
            ColumnData::Text(x) => x[row].clone().unwrap_or_default(),
        }
    }

    /// Frequency of each non-missing text value, most frequent first.
    pub fn value_counts(&self) -> Vec<(String, usize)> {
        let mut counts = BTreeMap::<String, usize>::new();
        for row in 0..self.len() {
            if !self.is_missing(row) {
                *counts.entry(self.format_cell(row)).or_default() += 1;
            }
        }
        let mut counts = counts.into_iter().collect::<Vec<_>>();
        counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        counts
    }
}

/// A column-oriented table with named, typed columns.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Frame {
    pub(crate) nrows: usize,
    pub(crate) columns: Vec<Column>,
}

impl Frame {
    pub fn new(columns: Vec<Column>) -> Result<Self, Error> {
        let nrows = columns.first().map(|c| c.len()).unwrap_or(0);
        if columns.iter().any(|c| c.len() != nrows) {
            return Err(Error::UnequalColumnLengths);
        }
        let mut seen = HashSet::new();
        for c in &columns {
            if !seen.insert(c.name.as_str()) {
                return Err(Error::DuplicateColumnName(c.name.clone()));
            }
        }
        Ok(Self { nrows, columns })
    }

    #[inline]
    pub fn nrows(&self) -> usize {
        self.nrows
    }

    #[inline]
    pub fn ncols(&self) -> usize {
        self.columns.len()
    }

    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        (self.nrows, self.columns.len())
    }

    #[inline]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn colnames(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn dtypes(&self) -> Vec<(&str, DType)> {
        self.columns
            .iter()
            .map(|c| (c.name.as_str(), c.dtype))
            .collect()
    }

    pub fn column_index(&self, name: &str) -> Result<usize, Error> {
        self.columns
            .iter()
            .position(|c| c.name == name)
            .ok_or_else(|| Error::ColumnNameNotFound(name.to_string()))
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    pub fn column_by_name(&self, name: &str) -> Result<&Column, Error> {
        Ok(&self.columns[self.column_index(name)?])
    }

    /// The values of a numeric column, NaN where missing.
    pub fn numeric(&self, name: &str) -> Result<&[f64], Error> {
        self.column_by_name(name)?
            .as_f64()
            .ok_or_else(|| Error::NotNumeric(name.to_string()))
    }

    /// Missing-value count per column, in column order.
    pub fn missing_counts(&self) -> Vec<(&str, usize)> {
        self.columns
            .iter()
            .map(|c| (c.name.as_str(), c.missing_count()))
            .collect()
    }

    /// A new frame with only the `int64` and `float64` columns.
    #[tracing::instrument(skip(self))]
    pub fn select_numeric(&self) -> Frame {
        let columns = self
            .columns
            .iter()
            .filter(|c| c.dtype.is_numeric())
            .cloned()
            .collect::<Vec<_>>();
        debug!("Selected {} numeric columns", columns.len());
        Frame {
            nrows: self.nrows,
            columns,
        }
    }

    /// A new frame with the columns whose names match `re`.
    #[tracing::instrument(skip(self))]
    pub fn filter_columns_by_regex(&self, re: &Regex) -> Frame {
        Frame {
            nrows: self.nrows,
            columns: self
                .columns
                .iter()
                .filter(|c| re.is_match(&c.name))
                .cloned()
                .collect(),
        }
    }

    #[tracing::instrument(skip(self))]
    pub fn remove_columns(&mut self, removing: &HashSet<usize>) -> Result<&mut Self, Error> {
        if let Some(i) = removing.iter().find(|i| **i >= self.columns.len()) {
            return Err(Error::ColumnIndexOutOfBounds(*i));
        }
        let mut i = 0;
        self.columns.retain(|_| {
            let keep = !removing.contains(&i);
            i += 1;
            keep
        });
        Ok(self)
    }

    /// Removes every column in `names` that exists, absent names are ignored.
    #[tracing::instrument(skip(self, names))]
    pub fn remove_columns_by_name<S: AsRef<str>>(
        &mut self,
        names: &[S],
    ) -> Result<&mut Self, Error> {
        let names = names.iter().map(|x| x.as_ref()).collect::<HashSet<_>>();
        let removing = self
            .columns
            .iter()
            .enumerate()
            .filter_map(|(i, c)| names.contains(c.name.as_str()).then_some(i))
            .collect();
        self.remove_columns(&removing)
    }

    /// Renames every column found in `mapping`, names absent from it are kept.
    #[tracing::instrument(skip(self, mapping))]
    pub fn rename_columns(&mut self, mapping: &HashMap<String, String>) -> &mut Self {
        for c in &mut self.columns {
            if let Some(new) = mapping.get(&c.name) {
                c.name.clone_from(new);
            }
        }
        self
    }

    /// Keeps the first `n` columns.
    pub fn head_columns(&self, n: usize) -> Frame {
        Frame {
            nrows: self.nrows,
            columns: self.columns.iter().take(n).cloned().collect(),
        }
    }
}
