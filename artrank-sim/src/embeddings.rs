use ndarray::{Array2, ArrayView1};

use crate::error::{SimError, SimResult};
use crate::math::l2_normalize_rows;
use crate::ItemIndex;

/// Item embeddings indexed by dense item index.
///
/// Rows are L2-normalized once at construction, so the cosine similarity of
/// two items is the dot product of their rows. The matrix is immutable after
/// construction and is shared through `Arc` by the similarity cache.
#[derive(Clone, Debug)]
pub struct EmbeddingIndex {
    vectors: Array2<f64>,
}

impl EmbeddingIndex {
    /// Wrap an `(items, dimensions)` matrix, normalizing every row. NaN or
    /// infinite components are rejected.
    pub fn new(mut vectors: Array2<f64>) -> SimResult<Self> {
        if vectors.nrows() == 0 || vectors.ncols() == 0 {
            return Err(SimError::EmptyEmbeddings);
        }
        if let Some(index) = vectors
            .rows()
            .into_iter()
            .position(|row| row.iter().any(|x| !x.is_finite()))
        {
            return Err(SimError::NonFinite { index });
        }
        l2_normalize_rows(&mut vectors);
        Ok(Self { vectors })
    }

    /// Build from one vector per item. Every row must have the same length.
    pub fn from_rows(rows: &[Vec<f64>]) -> SimResult<Self> {
        let dimensions = rows.first().map(Vec::len).ok_or(SimError::EmptyEmbeddings)?;
        let mut flat = Vec::with_capacity(rows.len() * dimensions);
        for (index, row) in rows.iter().enumerate() {
            if row.len() != dimensions {
                return Err(SimError::DimensionMismatch {
                    index,
                    expected: dimensions,
                    found: row.len(),
                });
            }
            flat.extend_from_slice(row);
        }
        let vectors = Array2::from_shape_vec((rows.len(), dimensions), flat).map_err(|_| {
            SimError::DimensionMismatch {
                index: 0,
                expected: dimensions,
                found: 0,
            }
        })?;
        Self::new(vectors)
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.vectors.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dimensions(&self) -> usize {
        self.vectors.ncols()
    }

    /// Normalized embedding of `item`. Panics if `item` is out of range.
    pub fn row(&self, item: ItemIndex) -> ArrayView1<'_, f64> {
        self.vectors.row(item)
    }

    /// Cosine similarity of two items, clamped to [-1, 1] to absorb rounding.
    pub fn cosine(&self, i: ItemIndex, j: ItemIndex) -> f64 {
        self.row(i).dot(&self.row(j)).clamp(-1.0, 1.0)
    }
}
