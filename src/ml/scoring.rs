// ============================================================
// Layer 5 — Score Helpers
// ============================================================
// Small numeric helpers over raw model scores.

/// Positions of the `n_best` highest scores, highest first.
/// Equal scores keep ascending position order.
pub fn best_indexes(logits: &[f32], n_best: usize) -> Vec<usize> {
    let mut index_and_score: Vec<(usize, f32)> = logits.iter().copied().enumerate().collect();
    index_and_score.sort_by(|a, b| b.1.total_cmp(&a.1));
    index_and_score.into_iter().take(n_best).map(|(i, _)| i).collect()
}

/// Numerically stable softmax (max subtracted before exponentiating).
/// An empty input gives an empty output.
pub fn compute_softmax(scores: &[f32]) -> Vec<f32> {
    let Some(max_score) = scores.iter().copied().reduce(f32::max) else {
        return Vec::new();
    };

    let exp_scores: Vec<f64> = scores
        .iter()
        .map(|&s| (f64::from(s) - f64::from(max_score)).exp())
        .collect();
    let total: f64 = exp_scores.iter().sum();

    exp_scores.iter().map(|&e| (e / total) as f32).collect()
}
