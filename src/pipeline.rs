use tracing::{debug, warn};

use crate::error::ScrapeError;
use crate::extract::{ExtractedPage, PageExtractor};
use crate::fetcher::{fetch_checked, Fetched, PageFetcher, RetryPolicy};
use crate::normalize::normalize_review;
use crate::sink::ReviewSink;

/// How a single listing page ended. A robot wall is not an outcome, it is
/// `Err(ScrapeError::AntiAutomation)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageOutcome {
    /// No review section on the page; nothing written.
    NoData,
    Done {
        emitted: usize,
        /// Absent entries in the review list.
        empty: usize,
        /// Reviews dropped because their date could not be normalized.
        skipped: usize,
    },
}

/// Fetch one listing page, extract its reviews and stream them to `sink`.
pub async fn scrape_page(
    fetcher: &mut dyn PageFetcher,
    extractor: &dyn PageExtractor,
    sink: &mut dyn ReviewSink,
    url: &str,
    retry: &RetryPolicy,
) -> Result<PageOutcome, ScrapeError> {
    let html = match fetch_checked(fetcher, url, retry).await? {
        Fetched::Page(html) => html,
        Fetched::Challenge => {
            return Err(ScrapeError::AntiAutomation {
                url: url.to_string(),
            })
        }
    };

    emit_page(extractor.extract(&html), url, sink)
}

/// Normalize every present review of an extracted page and write it out.
pub fn emit_page(
    page: Option<ExtractedPage>,
    url: &str,
    sink: &mut dyn ReviewSink,
) -> Result<PageOutcome, ScrapeError> {
    let Some(page) = page else {
        debug!("No review section at {}", url);
        return Ok(PageOutcome::NoData);
    };

    let (mut emitted, mut empty, mut skipped) = (0, 0, 0);
    for (i, raw) in page.reviews.into_iter().enumerate() {
        let Some(raw) = raw else {
            empty += 1;
            continue;
        };
        match normalize_review(raw, &page.product_title, url) {
            Ok(review) => {
                sink.write(&review)?;
                emitted += 1;
            }
            Err(e) => {
                warn!("Skipping review #{} on {}: {}", i + 1, url, e);
                skipped += 1;
            }
        }
    }

    Ok(PageOutcome::Done {
        emitted,
        empty,
        skipped,
    })
}


#[cfg(test)]
mod tests {
    use super::test_support::VecSink;
    use super::*;
    use crate::extract::{HtmlExtractor, RawReview};
    use crate::fetcher::fake::FakeFetcher;
    use crate::fetcher::CHALLENGE_MARKER;
    use crate::normalize::{format_date, Verified};

    const URL: &str = "https://www.amazon.com/dp/product-reviews/B07XJ8C8F5?pageNumber=1";

    fn raw(author: &str) -> RawReview {
        RawReview {
            author: Some(author.into()),
            date: Some("Reviewed in the United States on May 2, 2024".into()),
            rating: Some("4.0 out of 5 stars".into()),
            ..Default::default()
        }
    }

    #[test]
    fn null_entries_are_skipped() {
        let page = ExtractedPage {
            product_title: "Bottle".into(),
            reviews: vec![Some(raw("a")), None, Some(raw("b"))],
        };
        let mut sink = VecSink::default();
        let outcome = emit_page(Some(page), URL, &mut sink).unwrap();
        assert_eq!(
            outcome,
            PageOutcome::Done {
                emitted: 2,
                empty: 1,
                skipped: 0
            }
        );
        assert_eq!(sink.0.len(), 2);
        assert!(sink.0.iter().all(|r| r.product == "Bottle" && r.url == URL));
        assert_eq!(sink.0[1].author, "b");
    }

    #[test]
    fn bad_date_skips_only_that_review() {
        let mut undated = raw("x");
        undated.date = None;
        let mut garbled = raw("y");
        garbled.date = Some("sometime".into());
        let page = ExtractedPage {
            product_title: "Bottle".into(),
            reviews: vec![Some(undated), Some(raw("a")), Some(garbled)],
        };
        let mut sink = VecSink::default();
        let outcome = emit_page(Some(page), URL, &mut sink).unwrap();
        assert_eq!(
            outcome,
            PageOutcome::Done {
                emitted: 1,
                empty: 0,
                skipped: 2
            }
        );
        assert_eq!(sink.0[0].author, "a");
    }

    #[test]
    fn no_data_writes_nothing() {
        let mut sink = VecSink::default();
        assert_eq!(emit_page(None, URL, &mut sink).unwrap(), PageOutcome::NoData);
        assert!(sink.0.is_empty());
    }

    #[tokio::test]
    async fn fixture_page() {
        let html = std::fs::read_to_string("tests/fixtures/reviews_page.html").unwrap();
        let mut fetcher = FakeFetcher::default().with_page(URL, &html);
        let mut sink = VecSink::default();
        let outcome = scrape_page(
            &mut fetcher,
            &HtmlExtractor,
            &mut sink,
            URL,
            &RetryPolicy::none(),
        )
        .await
        .unwrap();

        // Fourth review has no date.
        assert_eq!(
            outcome,
            PageOutcome::Done {
                emitted: 2,
                empty: 1,
                skipped: 1
            }
        );
        let first = &sink.0[0];
        assert_eq!(first.product, "Acme Stainless Steel Water Bottle, 32oz");
        assert_eq!(format_date(first.date), "04 Mar 2023");
        assert_eq!(first.rating.as_deref(), Some("5.0"));
        assert_eq!(first.verified, Verified::Yes);
        assert_eq!(first.images.lines().count(), 2);
        assert_eq!(sink.0[1].verified, Verified::No);
        assert_eq!(format_date(sink.0[1].date), "18 Dec 2022");
    }

    #[tokio::test]
    async fn challenge_aborts_without_rows() {
        let content = format!("<html>{}<div data-hook=\"review\"></div></html>", CHALLENGE_MARKER);
        let mut fetcher = FakeFetcher::default().with_page(URL, &content);
        let mut sink = VecSink::default();
        let err = scrape_page(
            &mut fetcher,
            &HtmlExtractor,
            &mut sink,
            URL,
            &RetryPolicy::none(),
        )
        .await
        .unwrap_err();
        assert!(err.is_anti_automation());
        assert!(sink.0.is_empty());
    }
}
