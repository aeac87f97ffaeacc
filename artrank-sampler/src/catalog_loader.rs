//! Item metadata and embedding ingestion.
//!
//! Items CSV columns:
//!   item_id, cluster, artist
//! An empty artist or `-1` means the artist is unknown.
//!
//! Embeddings CSV has no header; each row is a file name followed by the
//! vector components. The item id is the file stem.

use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::io::Read;
use std::path::Path;

use artrank_sim::EmbeddingIndex;

use crate::catalog::Catalog;
use crate::error::{SamplerError, SamplerResult};
use crate::types::{ArtistId, ClusterId, ItemIndex};

/// One row of the item metadata file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ItemRecord {
    pub item_id: String,
    pub cluster: ClusterId,
    #[serde(deserialize_with = "deserialize_artist")]
    pub artist: Option<ArtistId>,
}

/// Load item metadata from a CSV reader.
pub fn load_items<R: Read>(reader: R) -> SamplerResult<Vec<ItemRecord>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut records = Vec::new();
    for (line_num, result) in csv_reader.deserialize().enumerate() {
        let record: ItemRecord = result.map_err(|source| SamplerError::Csv {
            line: line_num + 2,
            source,
        })?;
        records.push(record);
    }

    Ok(records)
}

/// Load item metadata from a CSV file path.
pub fn load_items_file(path: &str) -> SamplerResult<Vec<ItemRecord>> {
    let file = std::fs::File::open(path).map_err(|source| SamplerError::Open {
        path: path.to_string(),
        source,
    })?;
    load_items(file)
}

/// Embeddings keyed by item id, in file order.
#[derive(Debug)]
pub struct NamedEmbeddings {
    pub embeddings: EmbeddingIndex,
    pub id_to_index: HashMap<String, ItemIndex>,
    pub index_to_id: Vec<String>,
    pub index_to_file: Vec<String>,
}

/// Load embeddings from a headerless CSV reader.
///
/// A row whose id or file name was already seen is skipped with a warning;
/// the first occurrence wins.
pub fn load_embeddings<R: Read>(reader: R) -> SamplerResult<NamedEmbeddings> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut rows: Vec<Vec<f64>> = Vec::new();
    let mut id_to_index = HashMap::new();
    let mut index_to_id = Vec::new();
    let mut index_to_file = Vec::new();
    let mut files: HashSet<String> = HashSet::new();

    for (line_num, result) in csv_reader.records().enumerate() {
        let line = line_num + 1;
        let record = result.map_err(|source| SamplerError::Csv { line, source })?;

        let file = record.get(0).unwrap_or_default().to_string();
        if file.is_empty() {
            return Err(SamplerError::MalformedRow {
                line,
                reason: "missing file name".into(),
            });
        }
        let id = file_stem(&file);

        if id_to_index.contains_key(&id) || files.contains(&file) {
            log::warn!("duplicated id or filename (id={}, fn={}), skipping", id, file);
            continue;
        }

        let vector = record
            .iter()
            .skip(1)
            .map(|field| match field.parse::<f64>() {
                Ok(x) if x.is_finite() => Ok(x),
                _ => Err(SamplerError::MalformedRow {
                    line,
                    reason: format!("'{}' is not a finite number", field),
                }),
            })
            .collect::<SamplerResult<Vec<f64>>>()?;
        if let Some(first) = rows.first() {
            if vector.len() != first.len() {
                return Err(SamplerError::MalformedRow {
                    line,
                    reason: format!("expected {} components, found {}", first.len(), vector.len()),
                });
            }
        }

        id_to_index.insert(id.clone(), rows.len());
        index_to_id.push(id);
        index_to_file.push(file.clone());
        files.insert(file);
        rows.push(vector);
    }

    let embeddings = EmbeddingIndex::from_rows(&rows)?;
    log::info!(
        "loaded {} embeddings of dimension {}",
        embeddings.len(),
        embeddings.dimensions()
    );

    Ok(NamedEmbeddings {
        embeddings,
        id_to_index,
        index_to_id,
        index_to_file,
    })
}

/// Load embeddings from a CSV file path.
pub fn load_embeddings_file(path: &str) -> SamplerResult<NamedEmbeddings> {
    let file = std::fs::File::open(path).map_err(|source| SamplerError::Open {
        path: path.to_string(),
        source,
    })?;
    load_embeddings(file)
}

/// Build a catalog aligned with the embedding order.
///
/// Every embedded item needs a metadata row. Rows for items without an
/// embedding are ignored; a repeated row keeps the first assignment.
pub fn build_catalog(records: &[ItemRecord], named: &NamedEmbeddings) -> SamplerResult<Catalog> {
    let n = named.index_to_id.len();
    let mut assigned: Vec<Option<(ClusterId, Option<ArtistId>)>> = vec![None; n];
    let mut unused = 0usize;

    for record in records {
        match named.id_to_index.get(&record.item_id) {
            Some(&index) => {
                if assigned[index].is_none() {
                    assigned[index] = Some((record.cluster, record.artist));
                } else {
                    log::warn!("repeated metadata row for item {}, keeping the first", record.item_id);
                }
            }
            None => unused += 1,
        }
    }
    if unused > 0 {
        log::debug!("{} metadata rows have no embedding", unused);
    }

    let mut clusters = Vec::with_capacity(n);
    let mut artists = Vec::with_capacity(n);
    for (index, slot) in assigned.into_iter().enumerate() {
        let (cluster, artist) =
            slot.ok_or_else(|| SamplerError::MissingMetadata(named.index_to_id[index].clone()))?;
        clusters.push(cluster);
        artists.push(artist);
    }

    Catalog::new(clusters, artists)
}

fn file_stem(file: &str) -> String {
    Path::new(file)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| file.to_string())
}

fn deserialize_artist<'de, D>(deserializer: D) -> Result<Option<ArtistId>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    match s.trim() {
        "" | "-1" => Ok(None),
        other => other.parse::<ArtistId>().map(Some).map_err(|_| {
            serde::de::Error::custom(format!("expected artist id, got '{}'", other))
        }),
    }
}
