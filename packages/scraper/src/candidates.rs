//! First-success candidate iteration.
//!
//! Scraped report sources cannot always determine the correct target URL in
//! advance (which month's report is published?). They build a short ordered
//! list of guesses and try each until one yields data. This module holds the
//! one generic combinator shared by those adapters.

use std::fmt::Display;
use std::future::Future;

/// Tries `candidates` in order, returning the first successful result.
///
/// The `attempt` closure distinguishes three outcomes per candidate:
/// - `Ok(Some(value))` — success, iteration stops;
/// - `Ok(None)` — the candidate was reachable but yielded nothing usable
///   (e.g., a page with no extractable data), try the next one;
/// - `Err(e)` — the candidate failed (404, transport, parse), logged and
///   skipped.
///
/// Returns `None` when every candidate is exhausted. Candidate failures are
/// never fatal here; the caller decides whether an empty overall result is
/// an error.
pub async fn first_success<C, T, E, F, Fut>(
    label: &str,
    candidates: &[C],
    mut attempt: F,
) -> Option<T>
where
    C: Display,
    E: Display,
    F: FnMut(&C) -> Fut,
    Fut: Future<Output = Result<Option<T>, E>>,
{
    for candidate in candidates {
        log::debug!("{label}: trying candidate {candidate}");
        match attempt(candidate).await {
            Ok(Some(value)) => {
                log::info!("{label}: candidate {candidate} succeeded");
                return Some(value);
            }
            Ok(None) => {
                log::info!("{label}: candidate {candidate} yielded no data, trying next");
            }
            Err(e) => {
                log::warn!("{label}: candidate {candidate} failed: {e}");
            }
        }
    }

    log::warn!("{label}: all {} candidates exhausted", candidates.len());
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returns_first_successful_candidate() {
        let candidates = ["a", "b", "c"];
        let result = first_success("test", &candidates, |c| {
            let c = (*c).to_owned();
            async move {
                if c == "b" {
                    Ok(Some(c))
                } else {
                    Err::<Option<String>, _>("nope".to_owned())
                }
            }
        })
        .await;
        assert_eq!(result.as_deref(), Some("b"));
    }

    #[test]
    fn stops_at_first_success() {
        let candidates = [1u32, 2, 3];
        let mut attempts = 0u32;
        let result = futures_executor(first_success("test", &candidates, |c| {
            attempts += 1;
            let c = *c;
            async move { Ok::<_, String>(Some(c)) }
        }));
        assert_eq!(result, Some(1));
        assert_eq!(attempts, 1);
    }

    #[test]
    fn empty_and_failed_candidates_yield_none() {
        let candidates = ["x", "y"];
        let result: Option<u32> = futures_executor(first_success("test", &candidates, |c| {
            let miss = *c == "x";
            async move {
                if miss {
                    Ok(None)
                } else {
                    Err("down".to_owned())
                }
            }
        }));
        assert_eq!(result, None);
    }

    /// Minimal single-future executor so non-async tests can drive the
    /// combinator without a runtime.
    fn futures_executor<F: Future>(fut: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap()
            .block_on(fut)
    }
}
