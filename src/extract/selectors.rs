//! CSS selectors for the review listing markup.
//!
//! Everything the extractor knows about the page layout lives here.

use std::sync::LazyLock;

use scraper::Selector;

fn sel(css: &str) -> Selector {
    Selector::parse(css).unwrap()
}

pub static PRODUCT_TITLE: LazyLock<Selector> =
    LazyLock::new(|| sel(r#"a[data-hook="product-link"]"#));

/// Present on every listing page, even when the product has no reviews.
pub static REVIEW_LIST: LazyLock<Selector> = LazyLock::new(|| sel("#cm_cr-review_list"));

pub static REVIEW: LazyLock<Selector> = LazyLock::new(|| sel(r#"div[data-hook="review"]"#));

pub static TITLE: LazyLock<Selector> = LazyLock::new(|| sel(r#"[data-hook="review-title"]"#));

pub static CONTENT: LazyLock<Selector> = LazyLock::new(|| sel(r#"[data-hook="review-body"]"#));

pub static DATE: LazyLock<Selector> = LazyLock::new(|| sel(r#"[data-hook="review-date"]"#));

pub static VARIANT: LazyLock<Selector> = LazyLock::new(|| sel(r#"[data-hook="format-strip"]"#));

pub static IMAGES: LazyLock<Selector> = LazyLock::new(|| sel("img.review-image-tile"));

pub static VERIFIED: LazyLock<Selector> = LazyLock::new(|| sel(r#"[data-hook="avp-badge"]"#));

pub static AUTHOR: LazyLock<Selector> = LazyLock::new(|| sel(".a-profile-name"));

pub static RATING: LazyLock<Selector> = LazyLock::new(|| {
    sel(r#"[data-hook="review-star-rating"], [data-hook="cmps-review-star-rating"]"#)
});

/// Label of the form "Showing 1-10 of 1,234 reviews".
pub static REVIEW_COUNT: LazyLock<Selector> =
    LazyLock::new(|| sel(r#"div[data-hook="cr-filter-info-review-rating-count"] span"#));
