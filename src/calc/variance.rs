#![allow(clippy::needless_range_loop)]

use super::mean::mean;

/// Variance of the non-NaN values with `ddof` delta degrees of freedom. NaN when fewer than
/// `ddof + 1` values remain.
pub fn variance(data: &[f64], ddof: usize) -> f64 {
    let m = mean(data);
    let mut sum = 0.0;
    let mut count = 0;
    for i in 0..data.len() {
        let d = data[i];
        if !d.is_nan() {
            sum += (d - m).powi(2);
            count += 1;
        }
    }
    if count <= ddof {
        f64::NAN
    } else {
        sum / (count - ddof) as f64
    }
}

/// Sample standard deviation (ddof = 1), skipping NaN.
#[inline]
pub fn std_dev(data: &[f64]) -> f64 {
    variance(data, 1).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    macro_rules! assert_float_eq {
        ($a:expr, $b:expr, $tol:expr) => {
            assert!(($a - $b).abs() < $tol, "{:.22} != {:.22}", $a, $b);
        };
    }

    macro_rules! float_eq {
        ($a:expr, $b:expr) => {
            assert_float_eq!($a, $b, 1e-13);
        };
    }

    fn data() -> Vec<f64> {
        [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]
            .iter()
            .cycle()
            .take(8 * 1000 - 1)
            .copied()
            .collect::<Vec<f64>>()
    }
    const VARIANCE: f64 = 5.249124699157198;

    #[test]
    fn test_population_variance() {
        float_eq!(variance(&data(), 0), VARIANCE);
    }

    #[test]
    fn test_sample_std_dev() {
        float_eq!(std_dev(&[1.0, 2.0, 3.0, 4.0]), (5.0f64 / 3.0).sqrt());
    }

    #[test]
    fn test_std_dev_skips_nan() {
        float_eq!(std_dev(&[1.0, f64::NAN, 3.0]), 2.0f64.sqrt());
    }

    #[test]
    fn test_std_dev_single_value() {
        assert!(std_dev(&[4.0]).is_nan());
    }
}
