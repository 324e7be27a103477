//! Retrieval planner - how many candidates to pull from the index

use super::settings::QuerySettings;

/// Hard cap on the candidate pool, bounding similarity-search latency
pub const MAX_FETCH_WIDTH: usize = 20;

/// Pool multiplier applied when filters may discard candidates
pub const FILTERED_FETCH_MULTIPLIER: usize = 2;

/// Number of nearest neighbours to request (`k_fetch`).
///
/// Unfiltered queries fetch exactly `max_chunks`; filtered queries fetch
/// twice as many, capped at [`MAX_FETCH_WIDTH`].
pub fn plan_fetch_width(settings: &QuerySettings) -> usize {
    if settings.has_filters() {
        (settings.max_chunks * FILTERED_FETCH_MULTIPLIER).min(MAX_FETCH_WIDTH)
    } else {
        settings.max_chunks
    }
}
