use std::path::PathBuf;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};

use crate::error::ScrapeError;
use crate::extract::PageExtractor;
use crate::fetcher::{PageFetcher, RetryPolicy};
use crate::pager::{self, PageRange};
use crate::pipeline::{self, PageOutcome};
use crate::sink::CsvSink;

pub const DEFAULT_SITE: &str = "www.amazon.com";

#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    /// Host name of the store, e.g. `www.amazon.com`.
    pub site: String,
    /// Pause between consecutive requests.
    pub delay: Duration,
    pub start_page: u64,
    /// Last page to fetch; defaults to every page the product has.
    pub end_page: Option<u64>,
    pub out_dir: PathBuf,
    pub retry: RetryPolicy,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            site: DEFAULT_SITE.to_string(),
            delay: Duration::from_secs(1),
            start_page: 1,
            end_page: None,
            out_dir: PathBuf::from("."),
            retry: RetryPolicy::default(),
        }
    }
}

pub fn review_page_url(site: &str, product_id: &str, page: u64) -> String {
    format!(
        "https://{}/dp/product-reviews/{}?pageNumber={}",
        site, product_id, page
    )
}

/// Result of one finished product.
#[derive(Debug, Clone)]
pub struct ProductReport {
    pub product_id: String,
    pub range: PageRange,
    pub rows: usize,
    pub skipped: usize,
    pub path: PathBuf,
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub succeeded: Vec<ProductReport>,
    pub failed: Vec<(String, ScrapeError)>,
}

impl BatchReport {
    pub fn rows(&self) -> usize {
        self.succeeded.iter().map(|r| r.rows).sum()
    }
}

/// Keeps at least `delay` between consecutive requests of a run.
struct Throttle {
    delay: Duration,
    primed: bool,
}

impl Throttle {
    async fn wait(&mut self) {
        if self.primed && !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.primed = true;
    }
}

/// Drives the page loop for one product at a time over a single session.
pub struct Scraper<'a> {
    fetcher: &'a mut dyn PageFetcher,
    extractor: &'a dyn PageExtractor,
    config: ScrapeConfig,
    throttle: Throttle,
}

impl<'a> Scraper<'a> {
    pub fn new(
        fetcher: &'a mut dyn PageFetcher,
        extractor: &'a dyn PageExtractor,
        config: ScrapeConfig,
    ) -> Self {
        let throttle = Throttle {
            delay: config.delay,
            primed: false,
        };
        Self {
            fetcher,
            extractor,
            config,
            throttle,
        }
    }

    /// Scrape every requested review page of `product_id` into
    /// `<out_dir>/<product_id>.csv`.
    pub async fn scrape_product(&mut self, product_id: &str) -> Result<ProductReport, ScrapeError> {
        let site = self.config.site.clone();
        let retry = self.config.retry;

        self.throttle.wait().await;
        let first_url = review_page_url(&site, product_id, 1);
        let total =
            pager::total_pages(&mut *self.fetcher, self.extractor, &first_url, &retry).await?;
        let range = PageRange::resolve(self.config.start_page, self.config.end_page, total);

        info!(
            "{}: {} pages to scrape (start {}, end {}, {} available)",
            product_id,
            range.len(),
            range.start,
            range.end,
            total
        );

        let path = self.config.out_dir.join(format!("{}.csv", product_id));
        let mut sink = CsvSink::create(&path)?;

        let pb = ProgressBar::new(range.len());
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40} {pos}/{len} pages ({per_sec}, eta {eta})")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );

        let mut skipped = 0;
        for page in range.pages() {
            self.throttle.wait().await;
            let url = review_page_url(&site, product_id, page);
            let outcome = pipeline::scrape_page(
                &mut *self.fetcher,
                self.extractor,
                &mut sink,
                &url,
                &retry,
            )
            .await;

            match outcome {
                Ok(PageOutcome::Done {
                    emitted,
                    empty,
                    skipped: s,
                }) => {
                    debug!(
                        "{} page {}: {} rows, {} empty entries, {} skipped",
                        product_id, page, emitted, empty, s
                    );
                    skipped += s;
                }
                Ok(PageOutcome::NoData) => debug!("{} page {}: no reviews", product_id, page),
                Err(e) => {
                    pb.abandon();
                    if e.is_anti_automation() {
                        warn!("{}: robot check at page {}, abandoning remaining pages", product_id, page);
                    }
                    warn!(
                        "{}: stopped at page {} with {} rows written to {}",
                        product_id,
                        page,
                        sink.rows(),
                        path.display()
                    );
                    return Err(e);
                }
            }
            pb.inc(1);
        }
        pb.finish_and_clear();

        let rows = sink.rows();
        sink.finish()?;
        info!("Completed scraping for product {}: {} rows", product_id, rows);

        Ok(ProductReport {
            product_id: product_id.to_string(),
            range,
            rows,
            skipped,
            path,
        })
    }

    /// Scrape products one after another. A failed product is recorded and
    /// the batch moves on to the next identifier.
    pub async fn scrape_batch(&mut self, product_ids: &[String]) -> BatchReport {
        let mut report = BatchReport::default();
        for (i, id) in product_ids.iter().enumerate() {
            info!("Product {}/{}: {}", i + 1, product_ids.len(), id);
            match self.scrape_product(id).await {
                Ok(done) => report.succeeded.push(done),
                Err(e) => {
                    warn!("Product {} failed: {}", id, e);
                    report.failed.push((id.clone(), e));
                }
            }
        }
        report
    }
}

/// Scrape one product over `fetcher`, then release the session whatever
/// the outcome.
pub async fn run_product(
    fetcher: &mut dyn PageFetcher,
    extractor: &dyn PageExtractor,
    config: ScrapeConfig,
    product_id: &str,
) -> Result<ProductReport, ScrapeError> {
    let outcome = Scraper::new(&mut *fetcher, extractor, config)
        .scrape_product(product_id)
        .await;
    fetcher.close().await;
    outcome
}

/// Scrape a list of products over one session, then release it.
pub async fn run_batch(
    fetcher: &mut dyn PageFetcher,
    extractor: &dyn PageExtractor,
    config: ScrapeConfig,
    product_ids: &[String],
) -> BatchReport {
    let report = Scraper::new(&mut *fetcher, extractor, config)
        .scrape_batch(product_ids)
        .await;
    fetcher.close().await;
    report
}
