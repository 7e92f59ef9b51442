//! Similarity ranking of candidate clips against narration text.

/// Cosine similarity between two embedding vectors.
///
/// Returns 0.0 for zero-norm or mismatched-length inputs so degenerate
/// embeddings sort last rather than poisoning the ordering.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Order candidate clips by embedding similarity to the narration text.
///
/// Returns `(clip_index, similarity)` pairs, most similar first. Ties keep
/// their original upload order.
pub fn rank_clips(text_embedding: &[f32], clip_embeddings: &[Vec<f32>]) -> Vec<(usize, f32)> {
    let mut ranked: Vec<(usize, f32)> = clip_embeddings
        .iter()
        .enumerate()
        .map(|(i, emb)| (i, cosine_similarity(text_embedding, emb)))
        .collect();
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_identity() {
        let v = vec![0.5, 0.5, 0.7];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_orthogonal() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
    }

    #[test]
    fn test_cosine_opposite() {
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_degenerate_inputs() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
    }

    #[test]
    fn test_rank_clips_orders_by_similarity() {
        let text = vec![1.0, 0.0];
        let clips = vec![
            vec![0.0, 1.0],  // orthogonal
            vec![1.0, 0.0],  // identical
            vec![0.7, 0.7],  // in between
        ];
        let ranked = rank_clips(&text, &clips);
        assert_eq!(ranked[0].0, 1);
        assert_eq!(ranked[1].0, 2);
        assert_eq!(ranked[2].0, 0);
    }

    #[test]
    fn test_rank_clips_stable_on_ties() {
        let text = vec![1.0, 0.0];
        let clips = vec![vec![0.0, 1.0], vec![0.0, 2.0]];
        let ranked = rank_clips(&text, &clips);
        assert_eq!(ranked[0].0, 0);
        assert_eq!(ranked[1].0, 1);
    }
}
