//! Merging freshly fetched seasons into stored ones.
//!
//! The merge is monotonic: a stored season is never removed, only updated
//! when the incoming set carries the same fingerprint. Callers fetching a
//! filtered season list (e.g. only seasons featuring one actor) therefore
//! cannot shrink what is stored.

use crate::domain::SeasonKey;
use crate::models::SeasonSet;

/// Which fingerprints a merge touched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeSummary {
    pub updated: Vec<SeasonKey>,
    pub inserted: Vec<SeasonKey>,
    pub retained: Vec<SeasonKey>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SeasonReconciler;

impl SeasonReconciler {
    #[must_use]
    pub fn merge(existing: SeasonSet, incoming: SeasonSet) -> SeasonSet {
        Self::merge_with_summary(existing, incoming).0
    }

    #[must_use]
    pub fn merge_with_summary(existing: SeasonSet, incoming: SeasonSet) -> (SeasonSet, MergeSummary) {
        let mut merged = existing;
        let mut summary = MergeSummary::default();

        let incoming_keys: Vec<SeasonKey> = incoming.keys().copied().collect();
        summary.retained = merged
            .keys()
            .filter(|key| !incoming_keys.contains(key))
            .copied()
            .collect();

        for record in incoming {
            let key = record.key();
            if let Some(stored) = merged.get_mut(&key) {
                stored.update_from(record);
                summary.updated.push(key);
            } else {
                merged.upsert(record);
                summary.inserted.push(key);
            }
        }

        (merged, summary)
    }
}
