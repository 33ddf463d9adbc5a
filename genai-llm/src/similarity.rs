use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimilarityError {
    #[error("vectors have different lengths: {left} != {right}")]
    LengthMismatch { left: usize, right: usize },
    #[error("cosine similarity is undefined for a zero vector")]
    ZeroVector,
}

/// Cosine of the angle between `x` and `y`: dot(x, y) / (|x| * |y|).
///
/// Vectors must have the same length and a non-zero norm. The result lies in [-1, 1].
pub fn cosine_similarity(x: &[f32], y: &[f32]) -> Result<f32, SimilarityError> {
    if x.len() != y.len() {
        return Err(SimilarityError::LengthMismatch { left: x.len(), right: y.len() });
    }

    // accumulate in f64, embeddings have hundreds of dimensions
    let (mut dot, mut norm_x, mut norm_y) = (0f64, 0f64, 0f64);
    for (a, b) in x.iter().zip(y) {
        let (a, b) = (*a as f64, *b as f64);
        dot += a * b;
        norm_x += a * a;
        norm_y += b * b;
    }

    if norm_x == 0.0 || norm_y == 0.0 {
        return Err(SimilarityError::ZeroVector);
    }

    let similarity = dot / (norm_x.sqrt() * norm_y.sqrt());
    Ok(similarity.clamp(-1.0, 1.0) as f32)
}
