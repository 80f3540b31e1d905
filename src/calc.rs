mod mean;
mod quantile;
mod rank;
mod variance;

pub use mean::*;
pub use quantile::*;
pub use rank::*;
pub use variance::*;

/// The pairs of values where neither `xs` nor `ys` is NaN.
pub fn complete_pairs(xs: &[f64], ys: &[f64]) -> (Vec<f64>, Vec<f64>) {
    xs.iter()
        .zip(ys.iter())
        .filter(|(x, y)| !x.is_nan() && !y.is_nan())
        .map(|(x, y)| (*x, *y))
        .unzip()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complete_pairs() {
        let (x, y) = complete_pairs(&[1.0, f64::NAN, 3.0, 4.0], &[5.0, 6.0, f64::NAN, 8.0]);
        assert_eq!(x, &[1.0, 4.0]);
        assert_eq!(y, &[5.0, 8.0]);
    }
}
