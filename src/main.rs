mod error;
mod extract;
mod fetcher;
mod normalize;
mod pager;
mod pipeline;
mod products;
mod scrape;
mod sink;

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand, ValueEnum};

use extract::HtmlExtractor;
use fetcher::{HttpFetcher, PageFetcher, RetryPolicy, SpiderFetcher};
use scrape::{BatchReport, ProductReport, ScrapeConfig, DEFAULT_SITE};

#[derive(Parser)]
#[command(name = "review_scraper", about = "Product review listing scraper")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape the review pages of one product into <PRODUCT_ID>.csv
    Scrape {
        /// Product identifier (ASIN)
        product_id: String,
        #[command(flatten)]
        run: RunArgs,
    },
    /// Scrape every product listed in a file, one identifier per line
    Batch {
        /// Newline-delimited list of product identifiers
        #[arg(short, long, default_value = "products.txt")]
        products: PathBuf,
        #[command(flatten)]
        run: RunArgs,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum FetcherKind {
    /// Plain HTTP requests
    Http,
    /// Rendered pages through spider.cloud
    Spider,
}

#[derive(Args)]
struct RunArgs {
    /// Store host name
    #[arg(long, default_value = DEFAULT_SITE)]
    site: String,
    /// Seconds to wait between requests
    #[arg(short, long, default_value = "1")]
    delay: f64,
    /// First review page to scrape
    #[arg(long, default_value = "1")]
    start_page: u64,
    /// Last review page to scrape (default: all pages)
    #[arg(long)]
    end_page: Option<u64>,
    /// Directory for the CSV files
    #[arg(short, long, default_value = ".")]
    out_dir: PathBuf,
    #[arg(long, value_enum, default_value = "http")]
    fetcher: FetcherKind,
    /// API key for the spider fetcher
    #[arg(long)]
    spider_api_key: Option<String>,
    /// Per-request timeout in seconds
    #[arg(long, default_value = "30")]
    timeout: u64,
    /// Retries for failed requests (robot checks are never retried)
    #[arg(long, default_value = "2", value_parser = clap::value_parser!(u32).range(..=10))]
    retries: u32,
}

impl RunArgs {
    fn config(&self) -> anyhow::Result<ScrapeConfig> {
        if !self.delay.is_finite() || self.delay < 0.0 {
            bail!("--delay must be a non-negative number of seconds");
        }
        if self.start_page == 0 {
            bail!("--start-page starts at 1");
        }
        Ok(ScrapeConfig {
            site: self.site.clone(),
            delay: Duration::from_secs_f64(self.delay),
            start_page: self.start_page,
            end_page: self.end_page,
            out_dir: self.out_dir.clone(),
            retry: match self.retries {
                0 => RetryPolicy::none(),
                n => RetryPolicy {
                    max_retries: n,
                    ..RetryPolicy::default()
                },
            },
        })
    }

    fn open_fetcher(&self) -> anyhow::Result<Box<dyn PageFetcher>> {
        Ok(match self.fetcher {
            FetcherKind::Http => Box::new(HttpFetcher::new(Duration::from_secs(self.timeout))?),
            FetcherKind::Spider => {
                let key = self
                    .spider_api_key
                    .clone()
                    .context("--spider-api-key is required with --fetcher spider")?;
                Box::new(SpiderFetcher::new(key)?)
            }
        })
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Scrape { product_id, run } => {
            products::check_product_id(&product_id).map_err(anyhow::Error::msg)?;
            let config = run.config()?;
            std::fs::create_dir_all(&config.out_dir)?;
            let mut fetcher = run.open_fetcher()?;

            scrape::run_product(fetcher.as_mut(), &HtmlExtractor, config, &product_id)
                .await
                .map(|report| print_product(&report))
                .with_context(|| format!("Scrape failed for product {}", product_id))
        }
        Commands::Batch { products, run } => {
            let config = run.config()?;
            let ids = products::load_product_ids(&products)?;
            if ids.is_empty() {
                println!("No product identifiers in {}.", products.display());
                return Ok(());
            }
            std::fs::create_dir_all(&config.out_dir)?;
            let mut fetcher = run.open_fetcher()?;

            println!("Scraping {} products...", ids.len());
            let report = scrape::run_batch(fetcher.as_mut(), &HtmlExtractor, config, &ids).await;

            print_batch(&report);
            if report.failed.is_empty() {
                Ok(())
            } else {
                Err(anyhow::anyhow!(
                    "{} of {} products failed",
                    report.failed.len(),
                    ids.len()
                ))
            }
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn print_product(r: &ProductReport) {
    println!(
        "{}: {} rows from pages {}-{} -> {}",
        r.product_id,
        r.rows,
        r.range.start,
        r.range.end,
        r.path.display()
    );
    if r.skipped > 0 {
        println!("  {} reviews skipped (no usable date)", r.skipped);
    }
}

fn print_batch(report: &BatchReport) {
    for r in &report.succeeded {
        print_product(r);
    }
    for (id, e) in &report.failed {
        println!("{}: FAILED: {}", id, e);
    }
    println!(
        "Saved {} rows for {} products ({} failed).",
        report.rows(),
        report.succeeded.len(),
        report.failed.len()
    );
}

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
