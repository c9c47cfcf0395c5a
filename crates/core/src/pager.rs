//! # Sampling pager
//!
//! Exact counts over a large collection are expensive, so hospital search asks
//! storage for a random sample of `page_size + 1` matches. Only `page_size` are
//! shown; the presence of the extra one tells the client that more exist.
//!
//! `total_count` is therefore the number of records sampled, not the size of
//! the matching corpus. Repeating a request may return a different subset.

use moonlight_store::Stage;

/// One page cut from a sampled candidate list.
#[derive(Debug, Clone, PartialEq)]
pub struct SampledPage<T> {
    pub visible: Vec<T>,
    pub sampled: usize,
}

impl<T> SampledPage<T> {
    pub fn has_more(&self) -> bool {
        self.sampled > self.visible.len()
    }

    /// Records actually sampled. Exceeds `pageable_count` exactly when more exist.
    pub fn total_count(&self) -> usize {
        self.sampled
    }

    pub fn pageable_count(&self) -> usize {
        self.visible.len()
    }
}

/// The stage that fetches one record beyond the page.
pub fn sample_stage(page_size: usize) -> Stage {
    Stage::Sample {
        size: page_size.saturating_add(1),
    }
}

/// Keeps the first `page_size` candidates and remembers how many were offered.
pub fn page<T>(mut candidates: Vec<T>, page_size: usize) -> SampledPage<T> {
    let sampled = candidates.len();
    candidates.truncate(page_size);
    SampledPage {
        visible: candidates,
        sampled,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_extra_candidate_signals_more() {
        let p = page((0..16).collect::<Vec<_>>(), 15);
        assert_eq!(p.visible, (0..15).collect::<Vec<_>>());
        assert!(p.has_more());
        assert_eq!((p.total_count(), p.pageable_count()), (16, 15));
    }

    #[test]
    fn exactly_a_page_has_no_more() {
        let p = page((0..15).collect::<Vec<_>>(), 15);
        assert_eq!(p.visible.len(), 15);
        assert!(!p.has_more());
        assert_eq!(p.total_count(), p.pageable_count());
    }

    #[test]
    fn nothing_sampled_is_an_empty_page() {
        let p: SampledPage<u8> = page(Vec::new(), 15);
        assert!(p.visible.is_empty());
        assert!(!p.has_more());
        assert_eq!(p.total_count(), 0);
    }

    #[test]
    fn sample_stage_asks_for_one_more() {
        assert_eq!(sample_stage(15), Stage::Sample { size: 16 });
    }
}
