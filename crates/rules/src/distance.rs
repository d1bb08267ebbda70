//! Vector distance and nearest-neighbour ranking.

/// Euclidean (L2) distance between two vectors of equal length.
///
/// Callers check lengths first; extra components of the longer vector are ignored.
pub fn l2_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = f64::from(*x) - f64::from(*y);
            d * d
        })
        .sum::<f64>()
        .sqrt() as f32
}

/// Indices of the `k` vectors nearest to `query`, with their distances.
///
/// Ordered by ascending distance; ties keep storage order.
pub fn nearest<'a>(
    query: &[f32],
    vectors: impl IntoIterator<Item = &'a [f32]>,
    k: usize,
) -> Vec<(usize, f32)> {
    if k == 0 {
        return Vec::new();
    }

    let mut scored: Vec<(usize, f32)> = vectors
        .into_iter()
        .enumerate()
        .map(|(i, v)| (i, l2_distance(query, v)))
        .collect();

    // Stable sort, so equal distances stay in storage order.
    scored.sort_by(|a, b| a.1.total_cmp(&b.1));
    scored.truncate(k);
    scored
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_vectors_have_zero_distance() {
        let v = [0.6, 0.8];
        assert!(l2_distance(&v, &v).abs() < 1e-6);
    }

    #[test]
    fn known_distance() {
        assert!((l2_distance(&[0.0, 0.0], &[3.0, 4.0]) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn nearest_orders_ascending() {
        let vectors = [vec![0.0, 1.0], vec![1.0, 0.0], vec![0.7, 0.7]];
        let hits = nearest(&[1.0, 0.0], vectors.iter().map(Vec::as_slice), 10);
        let order: Vec<usize> = hits.iter().map(|(i, _)| *i).collect();
        assert_eq!(order, vec![1, 2, 0]);
        assert!(hits.windows(2).all(|w| w[0].1 <= w[1].1));
    }

    #[test]
    fn ties_keep_storage_order() {
        let vectors = [vec![0.0, 1.0], vec![0.0, -1.0], vec![0.0, 1.0]];
        let hits = nearest(&[0.0, 0.0], vectors.iter().map(Vec::as_slice), 3);
        let order: Vec<usize> = hits.iter().map(|(i, _)| *i).collect();
        assert_eq!(order, vec![0, 1, 2]);
    }

    #[test]
    fn nearest_truncates_and_handles_zero_k() {
        let vectors = [vec![1.0], vec![2.0], vec![3.0]];
        assert_eq!(nearest(&[0.0], vectors.iter().map(Vec::as_slice), 2).len(), 2);
        assert!(nearest(&[0.0], vectors.iter().map(Vec::as_slice), 0).is_empty());
        assert!(nearest(&[0.0], std::iter::empty(), 5).is_empty());
    }
}
