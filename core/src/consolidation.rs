//! Consolidator: inner join of subject rows with predictions.
//!
//! Output order is prediction order. A prediction whose subject is not in
//! the record source is dropped without error; `join_diagnostics` counts
//! those drops for callers that want visibility into join loss.

use crate::{
    record::{ConsolidatedRecord, Prediction, SubjectRecord},
    types::SubjectId,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Subject lookup keyed by id. Later rows overwrite earlier ones.
pub fn index_subjects(rows: Vec<SubjectRecord>) -> HashMap<SubjectId, SubjectRecord> {
    let mut index = HashMap::with_capacity(rows.len());
    for row in rows {
        index.insert(row.subject_id, row);
    }
    index
}

pub fn consolidate(
    subjects: &HashMap<SubjectId, SubjectRecord>,
    predictions: &[Prediction],
) -> Vec<ConsolidatedRecord> {
    predictions
        .iter()
        .filter_map(|p| {
            subjects
                .get(&p.subject_id)
                .map(|subject| ConsolidatedRecord::join(subject, p))
        })
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinDiagnostics {
    pub predictions: usize,
    pub matched: usize,
    pub unmatched: usize,
    /// Distinct subject ids that had predictions but no record.
    pub unmatched_subjects: BTreeSet<SubjectId>,
}

pub fn join_diagnostics(
    subjects: &HashMap<SubjectId, SubjectRecord>,
    predictions: &[Prediction],
) -> JoinDiagnostics {
    let mut diag = JoinDiagnostics {
        predictions: predictions.len(),
        ..Default::default()
    };
    for p in predictions {
        if subjects.contains_key(&p.subject_id) {
            diag.matched += 1;
        } else {
            diag.unmatched += 1;
            diag.unmatched_subjects.insert(p.subject_id);
        }
    }
    diag
}
