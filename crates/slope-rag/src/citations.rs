use std::collections::HashSet;

use slope_core::types::Chunk;

use crate::answer::{AnswerPayload, Citation, PageRef};

/// Keep only citations whose `(doc_id, page)` matches a shortlisted chunk.
///
/// Pages are coerced to integers first; a page that does not coerce drops the
/// citation. Survivors are rewritten with an integer page. Never adds entries.
pub fn validate(payload: &mut AnswerPayload, shortlist: &[Chunk]) {
    let valid: HashSet<(&str, i64)> = shortlist.iter().map(|c| (c.doc_id.as_str(), i64::from(c.page))).collect();
    let before = payload.citations.len();
    let kept: Vec<Citation> = payload
        .citations
        .drain(..)
        .filter_map(|c| {
            let page = c.page.as_int()?;
            valid.contains(&(c.doc_id.as_str(), page)).then(|| Citation { doc_id: c.doc_id, page: PageRef::Int(page) })
        })
        .collect();
    if kept.len() < before {
        tracing::info!(claimed = before, kept = kept.len(), "Dropped citations not backed by evidence");
    }
    payload.citations = kept;
}
