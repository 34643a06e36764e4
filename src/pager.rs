use tracing::info;

use crate::error::ScrapeError;
use crate::extract::PageExtractor;
use crate::fetcher::{fetch_checked, Fetched, PageFetcher, RetryPolicy};

/// Reviews rendered per listing page.
pub const PAGE_SIZE: u64 = 10;

/// Position of the total in "Showing 1-10 of 1,234 reviews".
const COUNT_TOKEN: usize = 3;

/// Inclusive page range for one product.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRange {
    pub start: u64,
    pub end: u64,
}

impl PageRange {
    /// Clamp a requested end page to the number of pages that exist.
    pub fn resolve(start: u64, requested_end: Option<u64>, total_pages: u64) -> Self {
        let end = match requested_end {
            Some(end) => end.min(total_pages),
            None => total_pages,
        };
        Self { start, end }
    }

    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }

    pub fn len(&self) -> u64 {
        if self.is_empty() {
            0
        } else {
            self.end - self.start + 1
        }
    }

    pub fn pages(&self) -> impl Iterator<Item = u64> {
        self.start..=self.end
    }
}

/// Pull the total review count out of the indicator label.
pub fn parse_review_count(text: &str) -> Result<u64, String> {
    let token = text
        .split_whitespace()
        .nth(COUNT_TOKEN)
        .ok_or_else(|| format!("review count label has too few words: {:?}", text))?;
    token
        .replace(',', "")
        .parse::<u64>()
        .map_err(|_| format!("review count token {:?} is not a number in {:?}", token, text))
}

pub fn pages_for(total_reviews: u64) -> u64 {
    total_reviews.div_ceil(PAGE_SIZE)
}

/// Fetch page 1 and work out how many review pages the product has.
pub async fn total_pages(
    fetcher: &mut dyn PageFetcher,
    extractor: &dyn PageExtractor,
    first_page_url: &str,
    retry: &RetryPolicy,
) -> Result<u64, ScrapeError> {
    let html = match fetch_checked(fetcher, first_page_url, retry).await? {
        Fetched::Page(html) => html,
        Fetched::Challenge => {
            return Err(ScrapeError::AntiAutomation {
                url: first_page_url.to_string(),
            })
        }
    };

    let layout_mismatch = |reason: String| ScrapeError::LayoutMismatch {
        url: first_page_url.to_string(),
        reason,
    };
    let label = extractor
        .review_count_text(&html)
        .ok_or_else(|| layout_mismatch("review count label not found".into()))?;
    let total_reviews = parse_review_count(&label).map_err(layout_mismatch)?;

    info!("Total reviews (all pages): {}", total_reviews);
    Ok(pages_for(total_reviews))
}
