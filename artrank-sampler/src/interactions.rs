//! Interaction log ingestion and holdout splitting.
//!
//! Parses interaction CSV files into `InteractionRecord`s and groups them
//! into per-user histories over catalog item indices.
//! Expected CSV columns:
//!   user_id, item_id, timestamp

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::io::Read;

use crate::error::{SamplerError, SamplerResult};
use crate::types::{ItemIndex, UserId};

/// One row of the interaction log. `item_id` is the external catalog id.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct InteractionRecord {
    pub user_id: UserId,
    pub item_id: String,
    pub timestamp: i64,
}

/// Load interaction records from a CSV reader.
pub fn load_interactions<R: Read>(reader: R) -> SamplerResult<Vec<InteractionRecord>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut records = Vec::new();
    for (line_num, result) in csv_reader.deserialize().enumerate() {
        let record: InteractionRecord = result.map_err(|source| SamplerError::Csv {
            line: line_num + 2,
            source,
        })?;
        records.push(record);
    }

    Ok(records)
}

/// Load interaction records from a CSV file path.
pub fn load_interactions_file(path: &str) -> SamplerResult<Vec<InteractionRecord>> {
    let file = std::fs::File::open(path).map_err(|source| SamplerError::Open {
        path: path.to_string(),
        source,
    })?;
    load_interactions(file)
}

// ---------------------------------------------------------------------------
// Holdout split
// ---------------------------------------------------------------------------

/// An interaction tagged for training or evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkedInteraction {
    pub record: InteractionRecord,
    pub evaluation: bool,
}

/// One evaluation query: everything the user saw in training, and the item
/// to predict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HoldoutRow {
    pub timestamp: i64,
    pub profile: Vec<String>,
    pub predict: String,
    pub user_id: UserId,
}

/// Mark the last `threshold` interactions (default 1) of every user for
/// evaluation.
///
/// "Last" follows input order, so a log that is not time sorted marks the
/// rows its producer wrote last. Users with `threshold` or fewer
/// interactions keep all of them for training. The result is then ordered
/// by timestamp; ties keep input order.
pub fn mark_evaluation_rows(
    records: &[InteractionRecord],
    threshold: Option<usize>,
) -> Vec<MarkedInteraction> {
    let threshold = threshold.unwrap_or(1);

    let mut per_user: HashMap<UserId, usize> = HashMap::new();
    for r in records {
        *per_user.entry(r.user_id).or_insert(0) += 1;
    }

    let mut seen: HashMap<UserId, usize> = HashMap::new();
    let mut marked: Vec<MarkedInteraction> = records
        .iter()
        .map(|r| {
            let total = per_user[&r.user_id];
            let position = seen.entry(r.user_id).or_insert(0);
            *position += 1;
            let evaluation = total > threshold && *position > total - threshold;
            MarkedInteraction {
                record: r.clone(),
                evaluation,
            }
        })
        .collect();

    marked.sort_by_key(|m| m.record.timestamp);
    marked
}

/// Split marked interactions into evaluation queries and training records.
///
/// Every evaluation row of a user is scored against the same training
/// profile. Both outputs are ordered by timestamp.
pub fn holdout(marked: &[MarkedInteraction]) -> (Vec<HoldoutRow>, Vec<InteractionRecord>) {
    let mut groups: BTreeMap<UserId, Vec<&MarkedInteraction>> = BTreeMap::new();
    for m in marked {
        groups.entry(m.record.user_id).or_default().push(m);
    }

    let mut rows = Vec::new();
    for (user_id, group) in &groups {
        let profile: Vec<String> = group
            .iter()
            .filter(|m| !m.evaluation)
            .map(|m| m.record.item_id.clone())
            .collect();
        for m in group.iter().filter(|m| m.evaluation) {
            rows.push(HoldoutRow {
                timestamp: m.record.timestamp,
                profile: profile.clone(),
                predict: m.record.item_id.clone(),
                user_id: *user_id,
            });
        }
    }
    rows.sort_by_key(|r| r.timestamp);

    let mut training: Vec<InteractionRecord> = marked
        .iter()
        .filter(|m| !m.evaluation)
        .map(|m| m.record.clone())
        .collect();
    training.sort_by_key(|r| r.timestamp);

    (rows, training)
}

// ---------------------------------------------------------------------------
// Per-user histories
// ---------------------------------------------------------------------------

/// Per-user item histories in temporal order, iterated by ascending user id.
///
/// Every history is non-empty.
#[derive(Debug, Clone, Default)]
pub struct InteractionLog {
    histories: BTreeMap<UserId, Vec<ItemIndex>>,
}

impl InteractionLog {
    /// Wrap pre-grouped histories. An empty history is rejected.
    pub fn from_histories(histories: BTreeMap<UserId, Vec<ItemIndex>>) -> SamplerResult<Self> {
        if let Some((user, _)) = histories.iter().find(|(_, h)| h.is_empty()) {
            return Err(SamplerError::EmptyHistory(*user));
        }
        Ok(Self { histories })
    }

    /// Group records by user in timestamp order, mapping external item ids
    /// to catalog indices.
    ///
    /// Records whose item id is not in `ids` are dropped with a warning;
    /// a user left with nothing is dropped too.
    pub fn from_records(
        records: &[InteractionRecord],
        ids: &HashMap<String, ItemIndex>,
    ) -> SamplerResult<Self> {
        let mut ordered: Vec<&InteractionRecord> = records.iter().collect();
        ordered.sort_by_key(|r| r.timestamp);

        let mut histories: BTreeMap<UserId, Vec<ItemIndex>> = BTreeMap::new();
        let mut dropped = 0usize;
        for r in ordered {
            match ids.get(&r.item_id) {
                Some(&index) => histories.entry(r.user_id).or_default().push(index),
                None => dropped += 1,
            }
        }
        if dropped > 0 {
            log::warn!(
                "dropped {} of {} interactions referencing unknown items",
                dropped,
                records.len()
            );
        }
        Self::from_histories(histories)
    }

    /// Fail if any history references an item outside `0..catalog_len`.
    pub fn validate_items(&self, catalog_len: usize) -> SamplerResult<()> {
        for (user, history) in &self.histories {
            if let Some(&item) = history.iter().find(|&&i| i >= catalog_len) {
                return Err(SamplerError::ItemOutOfRange {
                    user: *user,
                    item,
                    catalog_len,
                });
            }
        }
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = (UserId, &[ItemIndex])> {
        self.histories.iter().map(|(u, h)| (*u, h.as_slice()))
    }

    pub fn history(&self, user: UserId) -> Option<&[ItemIndex]> {
        self.histories.get(&user).map(Vec::as_slice)
    }

    /// Number of users.
    pub fn len(&self) -> usize {
        self.histories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.histories.is_empty()
    }

    pub fn total_interactions(&self) -> usize {
        self.histories.values().map(Vec::len).sum()
    }
}
