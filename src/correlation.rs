use std::collections::HashMap;

use faer::Mat;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, StudentsT};
use tracing::{debug, info};

use crate::{complete_pairs, mean, rank, Error, Frame};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CorrelationKind {
    Pearson,
    Spearman,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CorrelationMethod {
    /// The whole matrix from one product over the rows without missing values. Every cell,
    /// including the diagonal, is computed.
    Matrix,
    /// Each off-diagonal cell from the pairwise-complete observations of its two columns. The
    /// coefficient diagonal is 1, or NaN for a column with no spread. The p-value diagonal is not
    /// computed and is filled with a [`DiagonalFill`].
    Pairwise,
}

/// Value placed on the p-value diagonal by [`CorrelationMethod::Pairwise`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagonalFill {
    #[default]
    Zero,
    One,
    Nan,
}

impl DiagonalFill {
    #[inline]
    pub fn value(self) -> f64 {
        match self {
            DiagonalFill::Zero => 0.0,
            DiagonalFill::One => 1.0,
            DiagonalFill::Nan => f64::NAN,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Correlation {
    coefficient: f64,
    p_value: f64,
    n: usize,
}

impl Correlation {
    #[inline]
    pub fn coefficient(&self) -> f64 {
        self.coefficient
    }

    #[inline]
    pub fn p_value(&self) -> f64 {
        self.p_value
    }

    #[inline]
    pub fn n(&self) -> usize {
        self.n
    }
}

/// Pearson correlation of the pairwise-complete observations, with a two-sided p-value from
/// Student's t on n - 2 degrees of freedom.
pub fn pearson(xs: &[f64], ys: &[f64]) -> Result<Correlation, Error> {
    correlate(xs, ys, CorrelationKind::Pearson)
}

/// Spearman rank correlation of the pairwise-complete observations. Ties get average ranks.
pub fn spearman(xs: &[f64], ys: &[f64]) -> Result<Correlation, Error> {
    correlate(xs, ys, CorrelationKind::Spearman)
}

fn correlate(xs: &[f64], ys: &[f64], kind: CorrelationKind) -> Result<Correlation, Error> {
    if xs.len() != ys.len() {
        return Err(Error::LengthMismatch(xs.len(), ys.len()));
    }
    let (mut xs, mut ys) = complete_pairs(xs, ys);
    if kind == CorrelationKind::Spearman {
        xs = rank(&xs);
        ys = rank(&ys);
    }
    let n = xs.len();
    let coefficient = pearson_r(&xs, &ys);
    Ok(Correlation {
        coefficient,
        p_value: correlation_p_value(coefficient, n)?,
        n,
    })
}

fn pearson_r(xs: &[f64], ys: &[f64]) -> f64 {
    if xs.len() < 2 {
        return f64::NAN;
    }
    let mx = mean(xs);
    let my = mean(ys);
    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (x, y) in xs.iter().zip(ys.iter()) {
        sxy += (x - mx) * (y - my);
        sxx += (x - mx).powi(2);
        syy += (y - my).powi(2);
    }
    if sxx == 0.0 || syy == 0.0 {
        return f64::NAN;
    }
    (sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0)
}

/// Two-sided p-value of a correlation coefficient `r` estimated from `n` observations.
pub fn correlation_p_value(r: f64, n: usize) -> Result<f64, Error> {
    if r.is_nan() || n < 3 {
        return Ok(f64::NAN);
    }
    if r.abs() >= 1.0 {
        return Ok(0.0);
    }
    let df = (n - 2) as f64;
    let t = r * (df / ((1.0 - r) * (1.0 + r))).sqrt();
    let t_distr = StudentsT::new(0.0, 1.0, df).map_err(|e| Error::Distribution(e.to_string()))?;
    Ok((2.0 * t_distr.sf(t.abs())).clamp(0.0, 1.0))
}

/// A square correlation matrix with the matching p-values, indexed by column name.
#[derive(Debug, Clone)]
pub struct CorrMatrix {
    names: Vec<String>,
    coefficients: Mat<f64>,
    p_values: Mat<f64>,
    kind: CorrelationKind,
    method: CorrelationMethod,
}

impl CorrMatrix {
    #[inline]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    #[inline]
    pub fn coefficient(&self, i: usize, j: usize) -> f64 {
        self.coefficients[(i, j)]
    }

    #[inline]
    pub fn p_value(&self, i: usize, j: usize) -> f64 {
        self.p_values[(i, j)]
    }

    #[inline]
    pub fn kind(&self) -> CorrelationKind {
        self.kind
    }

    #[inline]
    pub fn method(&self) -> CorrelationMethod {
        self.method
    }

    /// Renames rows and columns through `mapping`, names absent from it are kept.
    pub fn rename(&mut self, mapping: &HashMap<String, String>) -> &mut Self {
        for name in &mut self.names {
            if let Some(new) = mapping.get(name) {
                name.clone_from(new);
            }
        }
        self
    }

    /// Whether both matrices are symmetric, treating NaN as equal to NaN.
    pub fn is_symmetric(&self) -> bool {
        let same = |a: f64, b: f64| (a.is_nan() && b.is_nan()) || a == b;
        (0..self.len()).all(|i| {
            (0..i).all(|j| {
                same(self.coefficient(i, j), self.coefficient(j, i))
                    && same(self.p_value(i, j), self.p_value(j, i))
            })
        })
    }

    fn rows(m: &Mat<f64>) -> Vec<Vec<f64>> {
        (0..m.nrows())
            .map(|i| (0..m.ncols()).map(|j| m[(i, j)]).collect())
            .collect()
    }
}

impl Serialize for CorrMatrix {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Rows<'a> {
            kind: CorrelationKind,
            method: CorrelationMethod,
            names: &'a [String],
            coefficients: Vec<Vec<f64>>,
            p_values: Vec<Vec<f64>>,
        }
        Rows {
            kind: self.kind,
            method: self.method,
            names: &self.names,
            coefficients: Self::rows(&self.coefficients),
            p_values: Self::rows(&self.p_values),
        }
        .serialize(serializer)
    }
}

/// Correlation and p-value for every pair of columns of `frame`, which must all be numeric.
#[tracing::instrument(skip(frame))]
pub fn correlation_matrix(
    frame: &Frame,
    kind: CorrelationKind,
    method: CorrelationMethod,
    diagonal: DiagonalFill,
) -> Result<CorrMatrix, Error> {
    let cols = frame
        .columns()
        .iter()
        .map(|c| c.as_f64().ok_or_else(|| Error::NotNumeric(c.name().to_string())))
        .collect::<Result<Vec<_>, _>>()?;
    let names = frame
        .colnames()
        .into_iter()
        .map(|x| x.to_string())
        .collect::<Vec<_>>();
    info!(
        "Computing {:?} correlations for {} columns ({:?})",
        kind,
        cols.len(),
        method
    );
    let (coefficients, p_values) = match method {
        CorrelationMethod::Matrix => matrix_correlation(&cols, frame.nrows(), kind)?,
        CorrelationMethod::Pairwise => pairwise_correlation(&cols, kind, diagonal)?,
    };
    Ok(CorrMatrix {
        names,
        coefficients,
        p_values,
        kind,
        method,
    })
}

fn matrix_correlation(
    cols: &[&[f64]],
    nrows: usize,
    kind: CorrelationKind,
) -> Result<(Mat<f64>, Mat<f64>), Error> {
    let k = cols.len();
    let complete = (0..nrows)
        .filter(|i| cols.iter().all(|c| !c[*i].is_nan()))
        .collect::<Vec<_>>();
    let n = complete.len();
    debug!("{} of {} rows are complete", n, nrows);
    let standardized = cols
        .par_iter()
        .map(|c| {
            let mut v = complete.iter().map(|i| c[*i]).collect::<Vec<_>>();
            if kind == CorrelationKind::Spearman {
                v = rank(&v);
            }
            let m = mean(&v);
            let norm = v.iter().map(|x| (x - m).powi(2)).sum::<f64>().sqrt();
            v.into_iter()
                .map(|x| if norm == 0.0 { f64::NAN } else { (x - m) / norm })
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>();
    let z = Mat::<f64>::from_fn(n, k, |i, j| standardized[j][i]);
    let gram = z.as_ref().transpose() * z.as_ref();
    let coefficients = Mat::<f64>::from_fn(k, k, |i, j| {
        // read the upper triangle only so the result is exactly symmetric
        let r = gram[(i.min(j), i.max(j))];
        if n < 2 {
            f64::NAN
        } else if i == j && !r.is_nan() {
            1.0
        } else {
            r.clamp(-1.0, 1.0)
        }
    });
    let mut p_values = Mat::<f64>::zeros(k, k);
    for i in 0..k {
        for j in 0..k {
            p_values[(i, j)] = correlation_p_value(coefficients[(i, j)], n)?;
        }
    }
    Ok((coefficients, p_values))
}

fn pairwise_correlation(
    cols: &[&[f64]],
    kind: CorrelationKind,
    diagonal: DiagonalFill,
) -> Result<(Mat<f64>, Mat<f64>), Error> {
    let k = cols.len();
    let cells = (0..k)
        .into_par_iter()
        .flat_map(|i| (0..i).into_par_iter().map(move |j| (i, j)))
        .map(|(i, j)| correlate(cols[i], cols[j], kind).map(|c| (i, j, c)))
        .collect::<Result<Vec<_>, _>>()?;
    let mut coefficients = Mat::<f64>::zeros(k, k);
    let mut p_values = Mat::<f64>::zeros(k, k);
    for (i, col) in cols.iter().enumerate() {
        coefficients[(i, i)] = self_correlation(col);
        p_values[(i, i)] = diagonal.value();
    }
    for (i, j, c) in cells {
        coefficients[(i, j)] = c.coefficient;
        coefficients[(j, i)] = c.coefficient;
        p_values[(i, j)] = c.p_value;
        p_values[(j, i)] = c.p_value;
    }
    Ok((coefficients, p_values))
}

/// 1 for a column with at least two distinct observed values, NaN otherwise.
fn self_correlation(col: &[f64]) -> f64 {
    let observed = col.iter().copied().filter(|x| !x.is_nan()).collect::<Vec<_>>();
    if pearson_r(&observed, &observed).is_nan() {
        f64::NAN
    } else {
        1.0
    }
}
