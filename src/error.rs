use thiserror::Error;

/// Transport-level failure from a [`crate::fetcher::PageFetcher`].
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected status {status} for {url}")]
    Status { url: String, status: u16 },
    #[error("render service error: {0}")]
    Render(String),
}

#[derive(Debug, Error)]
pub enum ScrapeError {
    /// The site answered with an anti-automation challenge. Never retried.
    #[error("CAPTCHA is not bypassed: anti-automation challenge at {url}")]
    AntiAutomation { url: String },

    /// The review-count indicator on page 1 is missing or unreadable.
    #[error("layout mismatch at {url}: {reason}")]
    LayoutMismatch { url: String, reason: String },

    #[error("fetch failed for {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: FetchError,
    },

    #[error("csv output: {0}")]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ScrapeError {
    /// Fatal for the current product: the rest of its page range is abandoned.
    pub fn is_anti_automation(&self) -> bool {
        matches!(self, ScrapeError::AntiAutomation { .. })
    }
}

/// Why a single review was dropped during normalization.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("review has no date")]
    MissingDate,
    #[error("unparsable review date {0:?}")]
    BadDate(String),
}
