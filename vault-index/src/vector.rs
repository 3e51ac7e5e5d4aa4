//! Embedding vectors: blob codec and cosine similarity.

/// Output dimensionality requested from the embedding API and enforced by the index.
pub const EMBEDDING_DIMENSIONS: usize = 768;

/// Encode a vector as little-endian `f32` bytes.
pub fn encode_embedding(v: &[f32]) -> Vec<u8> {
    v.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Decode a blob written by [`encode_embedding`].
///
/// Returns `None` for an empty blob, a length that is not a multiple of 4,
/// or a vector that is not [`EMBEDDING_DIMENSIONS`] long. Corrupt blobs
/// read as "no embedding" so lexical search keeps working.
pub fn decode_embedding(bytes: &[u8]) -> Option<Vec<f32>> {
    if bytes.is_empty() || bytes.len() % 4 != 0 || bytes.len() / 4 != EMBEDDING_DIMENSIONS {
        return None;
    }
    Some(
        bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect(),
    )
}

/// Cosine similarity in [-1, 1].
///
/// Exactly 0 when the lengths differ, either vector is empty, or either
/// has zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

#[cfg(test)]
pub(crate) mod testing {
    use super::EMBEDDING_DIMENSIONS;

    /// A full-width vector with the given (index, value) components set
    pub fn vector(components: &[(usize, f32)]) -> Vec<f32> {
        let mut v = vec![0.0; EMBEDDING_DIMENSIONS];
        for &(i, value) in components {
            v[i] = value;
        }
        v
    }

    /// Unit vector along `axis`
    pub fn axis(axis: usize) -> Vec<f32> {
        vector(&[(axis, 1.0)])
    }
}
