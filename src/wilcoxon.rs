use serde::Serialize;
use statrs::distribution::{ContinuousCDF, Normal};
use tracing::{debug, warn};

use crate::{complete_pairs, rank_with_ties, Error};

/// Largest sample for which the exact null distribution is enumerated.
const EXACT_MAX_N: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WilcoxonMethod {
    Exact,
    Approx,
    /// Every difference was zero, there is nothing to test.
    Degenerate,
}

#[derive(Debug, Clone, Serialize)]
pub struct Wilcoxon {
    statistic: f64,
    p_value: f64,
    z: Option<f64>,
    n: usize,
    n_zero: usize,
    method: WilcoxonMethod,
}

impl Wilcoxon {
    /// The smaller of the positive and negative rank sums.
    #[inline]
    pub fn statistic(&self) -> f64 {
        self.statistic
    }

    #[inline]
    pub fn p_value(&self) -> f64 {
        self.p_value
    }

    #[inline]
    pub fn z(&self) -> Option<f64> {
        self.z
    }

    /// Number of non-zero differences that were ranked.
    #[inline]
    pub fn n(&self) -> usize {
        self.n
    }

    #[inline]
    pub fn n_zero(&self) -> usize {
        self.n_zero
    }

    #[inline]
    pub fn method(&self) -> WilcoxonMethod {
        self.method
    }
}

/// Two-sided Wilcoxon signed-rank test of `xs - ys`.
///
/// Pairs with a NaN on either side are dropped and zero differences are discarded before
/// ranking. The exact null distribution is used for up to 50 differences without ties or zeros,
/// otherwise the normal approximation with a tie-corrected variance. If every difference is zero
/// the samples are identical and the p-value is 1.
#[tracing::instrument(skip(xs, ys))]
pub fn wilcoxon(xs: &[f64], ys: &[f64]) -> Result<Wilcoxon, Error> {
    if xs.len() != ys.len() {
        return Err(Error::LengthMismatch(xs.len(), ys.len()));
    }
    let (xs, ys) = complete_pairs(xs, ys);
    if xs.is_empty() {
        return Err(Error::NotEnoughObservations(0, "a signed-rank test"));
    }
    let diffs = xs
        .iter()
        .zip(ys.iter())
        .map(|(x, y)| x - y)
        .collect::<Vec<_>>();
    let nonzero = diffs
        .iter()
        .copied()
        .filter(|d| *d != 0.0)
        .collect::<Vec<_>>();
    let n_zero = diffs.len() - nonzero.len();
    let n = nonzero.len();
    if n == 0 {
        warn!("all {} differences are zero, reporting p = 1", n_zero);
        return Ok(Wilcoxon {
            statistic: 0.0,
            p_value: 1.0,
            z: None,
            n,
            n_zero,
            method: WilcoxonMethod::Degenerate,
        });
    }

    let abs = nonzero.iter().map(|d| d.abs()).collect::<Vec<_>>();
    let (ranks, ties) = rank_with_ties(&abs);
    let r_plus = nonzero
        .iter()
        .zip(ranks.iter())
        .filter(|(d, _)| **d > 0.0)
        .map(|(_, r)| r)
        .sum::<f64>();
    let r_minus = nonzero
        .iter()
        .zip(ranks.iter())
        .filter(|(d, _)| **d < 0.0)
        .map(|(_, r)| r)
        .sum::<f64>();
    let statistic = r_plus.min(r_minus);
    debug!(n, n_zero, r_plus, r_minus, "ranked differences");

    if n <= EXACT_MAX_N && n_zero == 0 && ties.is_empty() {
        let p_value = exact_p_value(n, r_plus as usize);
        return Ok(Wilcoxon {
            statistic,
            p_value,
            z: None,
            n,
            n_zero,
            method: WilcoxonMethod::Exact,
        });
    }

    let nf = n as f64;
    let mn = nf * (nf + 1.0) * 0.25;
    let tie_correction = 0.5
        * ties
            .iter()
            .map(|t| {
                let t = *t as f64;
                t * (t * t - 1.0)
            })
            .sum::<f64>();
    let se = ((nf * (nf + 1.0) * (2.0 * nf + 1.0) - tie_correction) / 24.0).sqrt();
    let z = (statistic - mn) / se;
    let normal = Normal::new(0.0, 1.0).map_err(|e| Error::Distribution(e.to_string()))?;
    let p_value = (2.0 * normal.sf(z.abs())).clamp(0.0, 1.0);
    Ok(Wilcoxon {
        statistic,
        p_value,
        z: Some(z),
        n,
        n_zero,
        method: WilcoxonMethod::Approx,
    })
}

/// Number of sign assignments of ranks `1..=n` for every possible positive rank sum.
pub fn signed_rank_counts(n: usize) -> Vec<f64> {
    let max = n * (n + 1) / 2;
    let mut counts = vec![0.0; max + 1];
    counts[0] = 1.0;
    for k in 1..=n {
        for s in (k..=max).rev() {
            counts[s] += counts[s - k];
        }
    }
    counts
}

fn exact_p_value(n: usize, r_plus: usize) -> f64 {
    let counts = signed_rank_counts(n);
    if r_plus == (counts.len() - 1) / 2 {
        return 1.0;
    }
    let total = 2f64.powi(n as i32);
    let p_less = counts[..=r_plus].iter().sum::<f64>() / total;
    let p_greater = counts[r_plus..].iter().sum::<f64>() / total;
    (2.0 * p_less.min(p_greater)).min(1.0)
}
