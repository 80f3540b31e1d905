#![allow(clippy::needless_range_loop)]

/// Mean of the non-NaN values, NaN when there are none.
pub fn mean(data: &[f64]) -> f64 {
    let (sum, count) = sum_count(data);
    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}

/// Sum and count of the non-NaN values.
pub fn sum_count(data: &[f64]) -> (f64, usize) {
    let mut sum = 0.0;
    let mut count = 0;
    for i in 0..data.len() {
        let d = data[i];
        if !d.is_nan() {
            count += 1;
            sum += d;
        }
    }
    (sum, count)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data() -> Vec<f64> {
        [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]
            .iter()
            .cycle()
            .take(8 * 1000 - 1)
            .copied()
            .collect::<Vec<f64>>()
    }

    fn data_nan() -> Vec<f64> {
        [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, f64::NAN, f64::NAN]
            .iter()
            .cycle()
            .take(8 * 1000 - 1)
            .copied()
            .collect::<Vec<f64>>()
    }

    const MEAN: f64 = (36000.0 - 8.0) / 7999.0;
    const MEAN_NAN: f64 = 21000.0 / 6000.0;

    #[test]
    fn test_mean() {
        assert_eq!(mean(&data()), MEAN);
    }

    #[test]
    fn test_mean_nan() {
        assert_eq!(mean(&data_nan()), MEAN_NAN);
    }

    #[test]
    fn test_mean_all_nan() {
        assert!(mean(&[f64::NAN, f64::NAN]).is_nan());
        assert!(mean(&[]).is_nan());
    }

    #[test]
    fn test_sum_count() {
        assert_eq!(sum_count(&[1.0, f64::NAN, 2.0]), (3.0, 2));
    }
}
