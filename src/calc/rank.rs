/// Ranks of `data` starting at 1, ties share the average of the ranks they span. NaN must be
/// removed beforehand.
pub fn rank(data: &[f64]) -> Vec<f64> {
    rank_with_ties(data).0
}

/// Average ranks together with the size of every tie group larger than one.
pub fn rank_with_ties(data: &[f64]) -> (Vec<f64>, Vec<usize>) {
    let mut order = (0..data.len()).collect::<Vec<_>>();
    order.sort_by(|a, b| data[*a].total_cmp(&data[*b]));
    let mut ranks = vec![0.0; data.len()];
    let mut ties = vec![];
    let mut i = 0;
    while i < order.len() {
        let mut j = i + 1;
        while j < order.len() && data[order[j]] == data[order[i]] {
            j += 1;
        }
        let avg = (i + 1 + j) as f64 / 2.0;
        for k in &order[i..j] {
            ranks[*k] = avg;
        }
        if j - i > 1 {
            ties.push(j - i);
        }
        i = j;
    }
    (ranks, ties)
}
