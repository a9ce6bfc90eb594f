use ragpipe_core::{Chunk, EmbeddedChunk, Error, Result};

/// Ephemeral in-memory nearest-neighbor index over one run's chunks.
///
/// Bulk-loaded once, read-only afterwards, dropped with the run. Similarity
/// is cosine; ranking is stable: score descending, then insertion order.
#[derive(Debug, Clone)]
pub struct ChunkIndex {
    chunks: Vec<Chunk>,
    vectors: Vec<Vec<f32>>,
    dim: usize,
}

impl ChunkIndex {
    pub fn build(embedded: Vec<EmbeddedChunk>) -> Result<Self> {
        let Some(first) = embedded.first() else {
            return Err(Error::EmptyIndex);
        };
        let dim = first.vector.len();
        if dim == 0 {
            return Err(Error::Index("zero-dimensional embedding".to_string()));
        }

        let mut chunks = Vec::with_capacity(embedded.len());
        let mut vectors = Vec::with_capacity(embedded.len());
        for (i, e) in embedded.into_iter().enumerate() {
            if e.vector.len() != dim {
                return Err(Error::Index(format!(
                    "embedding dimension mismatch at chunk {i}: expected {dim}, got {}",
                    e.vector.len()
                )));
            }
            chunks.push(e.chunk);
            vectors.push(e.vector);
        }

        Ok(Self {
            chunks,
            vectors,
            dim,
        })
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Nearest neighbors of `vector`, at most `k` of them.
    pub fn query(&self, vector: &[f32], k: usize) -> Result<Vec<(Chunk, f32)>> {
        if vector.len() != self.dim {
            return Err(Error::Index(format!(
                "query dimension mismatch: index has {}, query has {}",
                self.dim,
                vector.len()
            )));
        }

        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(i, v)| (i, cosine_similarity(vector, v)))
            .collect();

        // Stable: score desc, then first-inserted wins.
        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(i, score)| (self.chunks[i].clone(), score))
            .collect())
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut na = 0.0f32;
    let mut nb = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        na += x * x;
        nb += y * y;
    }
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    dot / (na.sqrt() * nb.sqrt())
}
