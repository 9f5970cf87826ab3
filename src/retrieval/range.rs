//! Which articles to ask a source for.

use log::{info, warn};

use crate::domain::article::{ArticleNumber, ArticleRange};

/// Range to request from `source_id`, given what it advertises and what we
/// processed last time. Pure: the caller persists the new watermark only
/// after the range has been fully handled.
///
/// - a watermark inside the advertised window resumes just after it;
/// - a zero watermark, or one the server has expired past, takes everything
///   still retained;
/// - more than `fetch_limit` articles beyond the start are cut down to the
///   newest `fetch_limit`, silently apart from a log line.
///
/// The result is empty (`first > last`) when there is nothing new.
pub fn next_range(
    source_id: &str,
    advertised_first: ArticleNumber,
    advertised_last: ArticleNumber,
    stored_watermark: ArticleNumber,
    fetch_limit: u64,
) -> ArticleRange {
    let mut first = advertised_first;
    if stored_watermark != 0
        && stored_watermark >= advertised_first
        && stored_watermark <= advertised_last
    {
        first = stored_watermark + 1;
    } else if stored_watermark > advertised_last && advertised_first <= advertised_last {
        warn!(
            "{source_id}: watermark {stored_watermark} is beyond the advertised high {advertised_last}, \
             server renumbered? rereading from {advertised_first}"
        );
    }

    let span = advertised_last.saturating_sub(first);
    if first <= advertised_last && span > fetch_limit {
        let truncated = advertised_last - fetch_limit;
        info!(
            "{source_id}: {span} articles pending, limiting to the newest {fetch_limit} \
             (skipping {first}..{truncated})"
        );
        first = truncated;
    }

    ArticleRange::new(first, advertised_last)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_poll_is_truncated_to_limit() {
        let r = next_range("s", 1, 1200, 0, 500);
        assert_eq!(r, ArticleRange::new(700, 1200));
        assert_eq!(r.span(), 500);
    }

    #[test]
    fn watermark_one_below_last() {
        let r = next_range("s", 1, 1200, 1199, 500);
        assert_eq!((r.first, r.last), (1200, 1200));
        assert_eq!(r.span(), 0);
        assert_eq!(r.len(), 1);
    }

    #[test]
    fn caught_up_is_empty() {
        let r = next_range("s", 1, 1200, 1200, 500);
        assert!(r.is_empty());
        assert_eq!(r.first, 1201);
        assert_eq!(r.len(), 0);
    }

    #[test]
    fn resumes_after_watermark() {
        assert_eq!(next_range("s", 100, 300, 250, 500), ArticleRange::new(251, 300));
    }

    #[test]
    fn watermark_below_retention_takes_everything() {
        assert_eq!(next_range("s", 100, 300, 40, 500), ArticleRange::new(100, 300));
        assert_eq!(next_range("s", 100, 300, 0, 500), ArticleRange::new(100, 300));
    }

    #[test]
    fn watermark_beyond_last_rereads() {
        assert_eq!(next_range("s", 1, 50, 900, 500), ArticleRange::new(1, 50));
    }

    #[test]
    fn exact_limit_is_not_truncated() {
        assert_eq!(next_range("s", 1, 501, 0, 500), ArticleRange::new(1, 501));
        assert_eq!(next_range("s", 1, 502, 0, 500), ArticleRange::new(2, 502));
    }

    #[test]
    fn empty_group() {
        assert!(next_range("s", 1, 0, 0, 500).is_empty());
        assert!(next_range("s", 1, 0, 77, 500).is_empty());
    }

    #[test]
    fn idempotent_and_bounded() {
        for (first, last, mark, limit) in [
            (1, 1200, 0, 500),
            (1, 1200, 1199, 500),
            (1, 1200, 1200, 500),
            (10, 20, 5, 3),
            (10, 20, 30, 3),
            (5, 4, 0, 1),
        ] {
            let a = next_range("s", first, last, mark, limit);
            let b = next_range("s", first, last, mark, limit);
            assert_eq!(a, b);
            assert!(a.first <= last + 1);
            assert!(a.span() <= limit);
        }
    }
}
