use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{SamplerError, SamplerResult};
use crate::types::{ArtistId, ClusterId, ItemIndex};

/// Per-item cluster and artist assignment plus the derived membership
/// indices the draws sample from.
///
/// Built once and never mutated. Construction guarantees that every cluster
/// id in `0..cluster_count()` has at least one member and every known artist
/// has at least one item, so no reachable bucket is empty.
#[derive(Debug)]
pub struct Catalog {
    clusters: Arc<[ClusterId]>,
    artists: Arc<[Option<ArtistId>]>,
    cluster_members: Vec<Vec<ItemIndex>>,
    artist_members: HashMap<ArtistId, Vec<ItemIndex>>,
}

impl Catalog {
    pub fn new(clusters: Vec<ClusterId>, artists: Vec<Option<ArtistId>>) -> SamplerResult<Self> {
        if clusters.is_empty() {
            return Err(SamplerError::EmptyCatalog);
        }
        if artists.len() != clusters.len() {
            return Err(SamplerError::LengthMismatch {
                what: "artist assignment",
                expected: clusters.len(),
                found: artists.len(),
            });
        }

        let cluster_count = clusters.iter().copied().max().map_or(0, |c| c + 1);
        let mut cluster_members: Vec<Vec<ItemIndex>> = vec![Vec::new(); cluster_count];
        for (item, &cluster) in clusters.iter().enumerate() {
            cluster_members[cluster].push(item);
        }
        if let Some(empty) = cluster_members.iter().position(Vec::is_empty) {
            return Err(SamplerError::EmptyCluster(empty));
        }

        let mut artist_members: HashMap<ArtistId, Vec<ItemIndex>> = HashMap::new();
        for (item, artist) in artists.iter().enumerate() {
            if let Some(artist) = artist {
                artist_members.entry(*artist).or_default().push(item);
            }
        }

        log::debug!(
            "catalog: {} items, {} clusters, {} artists",
            clusters.len(),
            cluster_count,
            artist_members.len()
        );

        Ok(Self {
            clusters: Arc::from(clusters),
            artists: Arc::from(artists),
            cluster_members,
            artist_members,
        })
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    pub fn cluster_count(&self) -> usize {
        self.cluster_members.len()
    }

    pub fn artist_count(&self) -> usize {
        self.artist_members.len()
    }

    pub fn cluster_of(&self, item: ItemIndex) -> ClusterId {
        self.clusters[item]
    }

    pub fn artist_of(&self, item: ItemIndex) -> Option<ArtistId> {
        self.artists[item]
    }

    /// Items in `cluster`, in index order. Empty for an unknown id.
    pub fn cluster_members(&self, cluster: ClusterId) -> &[ItemIndex] {
        self.cluster_members
            .get(cluster)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Items by `artist`, in index order. Empty for an unknown id.
    pub fn artist_members(&self, artist: ArtistId) -> &[ItemIndex] {
        self.artist_members
            .get(&artist)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Shared per-item cluster assignment.
    pub fn clusters(&self) -> Arc<[ClusterId]> {
        Arc::clone(&self.clusters)
    }

    /// Shared per-item artist assignment.
    pub fn artists(&self) -> Arc<[Option<ArtistId>]> {
        Arc::clone(&self.artists)
    }
}
