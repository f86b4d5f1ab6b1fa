//! Vector similarity helpers for the chunk index
//!
//! Norms are passed in so the query norm is computed once per search.

/// Euclidean length of a vector
pub fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Cosine similarity given precomputed norms; 0.0 if either vector is zero
pub fn cosine_similarity(a: &[f32], b: &[f32], a_norm: f32, b_norm: f32) -> f32 {
    if a_norm == 0.0 || b_norm == 0.0 {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    dot / (a_norm * b_norm)
}

/// Map cosine similarity (-1..=1) onto a 0..=1 relevance score
pub fn relevance_score(cosine: f32) -> f32 {
    // cosine distance = 1 - cosine, in 0..=2
    let distance = 1.0 - cosine;
    (1.0 - distance.clamp(0.0, 2.0) / 2.0).clamp(0.0, 1.0)
}
