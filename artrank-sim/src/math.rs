//! Shared numeric and hashing helpers.

use ndarray::{Array1, Array2};
use rand::Rng;

use crate::thresholds::ZERO_NORM_EPSILON;

/// FNV-1a 64-bit offset basis.
pub const FNV_OFFSET_BASIS: u64 = 14695981039346656037;
const FNV_PRIME: u64 = 1099511628211;

/// FNV-1a hash of a byte slice.
pub fn fnv1a_hash(data: &[u8]) -> u64 {
    fnv1a_extend(FNV_OFFSET_BASIS, data)
}

/// Continue an FNV-1a hash with more bytes. Lets callers hash structured
/// values field by field without building an intermediate buffer.
pub fn fnv1a_extend(mut hash: u64, data: &[u8]) -> u64 {
    for &byte in data {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Order-sensitive fingerprint of a sequence of item indices.
///
/// The length is mixed in first so that `[]` and `[0]` never collide by
/// construction.
pub fn fingerprint_indices(items: &[usize]) -> u64 {
    let mut hash = fnv1a_extend(FNV_OFFSET_BASIS, &(items.len() as u64).to_le_bytes());
    for &item in items {
        hash = fnv1a_extend(hash, &(item as u64).to_le_bytes());
    }
    hash
}

/// Scale every row of `matrix` to unit L2 norm in place.
///
/// Rows with a norm below `ZERO_NORM_EPSILON` are left untouched, so they
/// keep a similarity of 0 against every other row.
pub fn l2_normalize_rows(matrix: &mut Array2<f64>) {
    for mut row in matrix.rows_mut() {
        let norm = row.dot(&row).sqrt();
        if norm >= ZERO_NORM_EPSILON {
            row.mapv_inplace(|x| x / norm);
        }
    }
}

/// Random unit vector with components drawn uniformly from [-1, 1) before
/// normalization. Used for synthetic catalogs in tests and benchmarks.
pub fn random_unit_vector<R: Rng>(dimensions: usize, rng: &mut R) -> Array1<f64> {
    let mut v = Array1::from_iter((0..dimensions).map(|_| rng.gen_range(-1.0f64..1.0)));
    let norm = v.dot(&v).sqrt();
    if norm >= ZERO_NORM_EPSILON {
        v.mapv_inplace(|x| x / norm);
    }
    v
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn fnv1a_is_deterministic() {
        assert_eq!(fnv1a_hash(b"triple"), fnv1a_hash(b"triple"));
        assert_ne!(fnv1a_hash(b"triple"), fnv1a_hash(b"tripla"));
    }

    #[test]
    fn extend_matches_single_pass() {
        let split = fnv1a_extend(fnv1a_hash(b"abc"), b"def");
        assert_eq!(split, fnv1a_hash(b"abcdef"));
    }

    #[test]
    fn fingerprint_is_order_sensitive() {
        assert_ne!(fingerprint_indices(&[1, 2]), fingerprint_indices(&[2, 1]));
        assert_ne!(fingerprint_indices(&[]), fingerprint_indices(&[0]));
        assert_eq!(fingerprint_indices(&[4, 8, 15]), fingerprint_indices(&[4, 8, 15]));
    }

    #[test]
    fn rows_have_unit_norm_after_normalization() {
        let mut m = array![[3.0, 4.0], [0.0, 2.0], [1.0, 1.0]];
        l2_normalize_rows(&mut m);
        for row in m.rows() {
            assert!((row.dot(&row) - 1.0).abs() < 1e-12);
        }
        assert!((m[[0, 0]] - 0.6).abs() < 1e-12);
    }

    #[test]
    fn zero_rows_stay_zero() {
        let mut m = array![[0.0, 0.0], [1.0, 0.0]];
        l2_normalize_rows(&mut m);
        assert_eq!(m[[0, 0]], 0.0);
        assert_eq!(m[[0, 1]], 0.0);
    }

    #[test]
    fn random_unit_vector_is_normalized_and_seeded() {
        let mut a = StdRng::seed_from_u64(7);
        let mut b = StdRng::seed_from_u64(7);
        let v1 = random_unit_vector(32, &mut a);
        let v2 = random_unit_vector(32, &mut b);
        assert_eq!(v1, v2);
        assert!((v1.dot(&v1) - 1.0).abs() < 1e-12);
    }
}
