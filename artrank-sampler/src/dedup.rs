use std::collections::HashSet;

use artrank_sim::math::{fingerprint_indices, fnv1a_extend, fnv1a_hash};

use crate::types::{ItemIndex, UserId};

/// 64-bit identity of a triple. Distinct triples collide with probability
/// around 2^-64 per pair, which the registry accepts.
pub type HashKey = u64;

/// What a triple's key is anchored on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TripleAnchor<'a> {
    /// The profile sequence, hashed element by element.
    Profile(&'a [ItemIndex]),
    /// A real user id.
    User(UserId),
}

/// Deterministic key for `(anchor, positive, negative)`.
///
/// Profile and user anchors hash under different tags, so a profile `[u]`
/// and a user `u` never produce the same key.
pub fn triple_key(anchor: TripleAnchor<'_>, positive: ItemIndex, negative: ItemIndex) -> HashKey {
    let hash = match anchor {
        TripleAnchor::Profile(profile) => {
            fnv1a_extend(fnv1a_hash(b"p"), &fingerprint_indices(profile).to_le_bytes())
        }
        TripleAnchor::User(user) => fnv1a_extend(fnv1a_hash(b"u"), &user.to_le_bytes()),
    };
    let hash = fnv1a_extend(hash, &(positive as u64).to_le_bytes());
    fnv1a_extend(hash, &(negative as u64).to_le_bytes())
}

/// Set of triple keys already emitted.
///
/// Shared across strategy runs so that no two emitted triples carry the same
/// key.
pub trait DedupRegistry {
    /// Record `key`. Returns true if it was new.
    fn enroll(&mut self, key: HashKey) -> bool;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Default)]
pub struct InMemoryRegistry {
    keys: HashSet<HashKey>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            keys: HashSet::with_capacity(capacity),
        }
    }

    pub fn contains(&self, key: HashKey) -> bool {
        self.keys.contains(&key)
    }
}

impl DedupRegistry for InMemoryRegistry {
    fn enroll(&mut self, key: HashKey) -> bool {
        self.keys.insert(key)
    }

    fn len(&self) -> usize {
        self.keys.len()
    }
}
