//! Ranker - threshold cutoff, filtering and truncation with early exit

use std::cmp::Ordering;

use tracing::{debug, warn};

use super::cancel::CancellationToken;
use super::filter;
use super::settings::{QueryOutcome, QuerySettings};
use super::types::{ScoredCandidate, ScoredChunk};

/// Rank candidates into at most `settings.max_chunks` results.
///
/// Results are never backfilled: if the pool runs out the list is shorter.
pub fn rank(candidates: Vec<ScoredCandidate>, settings: &QuerySettings) -> Vec<ScoredChunk> {
    rank_until(candidates, settings, || false).unwrap_or_default()
}

/// Like [`rank`], but checks `cancel` before each candidate and discards any
/// partial accumulation when it fires.
pub fn rank_with_cancel(
    candidates: Vec<ScoredCandidate>,
    settings: &QuerySettings,
    cancel: &CancellationToken,
) -> QueryOutcome {
    match rank_until(candidates, settings, || cancel.is_cancelled()) {
        Some(results) => QueryOutcome::Ranked(results),
        None => QueryOutcome::Cancelled,
    }
}

fn rank_until<F>(
    mut candidates: Vec<ScoredCandidate>,
    settings: &QuerySettings,
    is_cancelled: F,
) -> Option<Vec<ScoredChunk>>
where
    F: Fn() -> bool,
{
    let before = candidates.len();
    candidates.retain(|c| !c.score.is_nan());
    if candidates.len() < before {
        warn!("Dropped {} candidates with NaN score", before - candidates.len());
    }

    // Early exit below relies on strictly non-increasing scores
    if !is_descending(&candidates) {
        debug!("Candidate pool not in descending order, sorting");
        candidates.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    }

    let mut results = Vec::with_capacity(settings.max_chunks.min(candidates.len()));

    for candidate in candidates {
        if is_cancelled() {
            return None;
        }

        if candidate.score < settings.similarity_threshold {
            // Everything after this is lower still
            break;
        }

        let snapshot = &candidate.chunk.snapshot;
        if !filter::passes(snapshot, &settings.tag_filter, &settings.metadata_filter) {
            continue;
        }

        results.push(ScoredChunk {
            tags: snapshot.tags.clone(),
            metadata: snapshot.metadata.clone(),
            chunk: candidate.chunk,
            score: candidate.score,
        });

        if results.len() >= settings.max_chunks {
            break;
        }
    }

    Some(results)
}

fn is_descending(candidates: &[ScoredCandidate]) -> bool {
    candidates.windows(2).all(|w| w[0].score >= w[1].score)
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::sync::Arc;

    use super::*;
    use crate::retrieval::types::{Chunk, ChunkId, ChunkSnapshot, DocumentId, Metadata, TagSet};

    fn candidate(score: f32, tags: &[&str]) -> ScoredCandidate {
        let document_id = DocumentId::new();
        let snapshot = Arc::new(ChunkSnapshot::new(
            document_id,
            "doc.txt",
            tags.iter().map(|t| t.to_string()).collect::<TagSet>(),
            Metadata::new(),
        ));
        ScoredCandidate {
            chunk: Arc::new(Chunk {
                id: ChunkId::new(document_id, 0),
                document_id,
                index: 0,
                text: format!("chunk scored {}", score),
                snapshot,
            }),
            score,
        }
    }

    fn scores(results: &[ScoredChunk]) -> Vec<f32> {
        results.iter().map(|r| r.score).collect()
    }

    #[test]
    fn test_truncates_to_max_chunks() {
        let pool = vec![candidate(0.9, &[]), candidate(0.8, &[]), candidate(0.7, &[])];
        let results = rank(pool, &QuerySettings::new(2, 0.0));
        assert_eq!(scores(&results), vec![0.9, 0.8]);
    }

    #[test]
    fn test_threshold_stops_loop() {
        let pool = vec![
            candidate(0.6, &[]),
            candidate(0.55, &[]),
            candidate(0.4, &[]),
            candidate(0.3, &[]),
        ];
        let results = rank(pool, &QuerySettings::new(5, 0.5));
        assert_eq!(scores(&results), vec![0.6, 0.55]);
    }

    #[test]
    fn test_filter_rejection_does_not_stop_loop() {
        let pool = vec![
            candidate(0.9, &["biz"]),
            candidate(0.8, &["biz"]),
            candidate(0.7, &["research"]),
        ];
        let settings = QuerySettings::new(2, 0.0).with_tags(["research"]);
        let results = rank(pool, &settings);
        assert_eq!(scores(&results), vec![0.7]);
        assert!(results[0].tags.contains("research"));
    }

    #[test]
    fn test_unsorted_input_is_sorted() {
        let pool = vec![candidate(0.4, &[]), candidate(0.9, &[]), candidate(0.6, &[])];
        let results = rank(pool, &QuerySettings::new(5, 0.5));
        assert_eq!(scores(&results), vec![0.9, 0.6]);
    }

    #[test]
    fn test_nan_scores_dropped() {
        let pool = vec![candidate(f32::NAN, &[]), candidate(0.7, &[])];
        let results = rank(pool, &QuerySettings::new(5, 0.0));
        assert_eq!(scores(&results), vec![0.7]);
    }

    #[test]
    fn test_empty_pool() {
        assert!(rank(Vec::new(), &QuerySettings::new(3, 0.0)).is_empty());
    }

    #[test]
    fn test_cancelled_discards_partial() {
        let pool = vec![candidate(0.9, &[]), candidate(0.8, &[])];
        let token = CancellationToken::new();
        token.cancel();

        let outcome = rank_with_cancel(pool, &QuerySettings::new(2, 0.0), &token);
        assert!(outcome.is_cancelled());
        assert!(outcome.into_results().is_none());
    }

    #[test]
    fn test_cancel_after_first_push_discards_results() {
        let pool = vec![candidate(0.9, &[]), candidate(0.8, &[]), candidate(0.7, &[])];
        let checks = Cell::new(0);

        // First check lets one candidate through, the second fires
        let ranked = rank_until(pool, &QuerySettings::new(3, 0.0), || {
            checks.set(checks.get() + 1);
            checks.get() >= 2
        });

        assert!(ranked.is_none());
        assert_eq!(checks.get(), 2);
    }

    #[test]
    fn test_not_cancelled_ranks() {
        let pool = vec![candidate(0.9, &[])];
        let token = CancellationToken::new();
        let outcome = rank_with_cancel(pool, &QuerySettings::new(2, 0.0), &token);
        assert_eq!(outcome.into_results().unwrap().len(), 1);
    }
}
