pub mod selectors;

use scraper::{ElementRef, Html, Selector};

/// Fields of one review as found in the markup. `None` means the field was
/// not on the page at all, which is different from an empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawReview {
    pub title: Option<String>,
    pub content: Option<String>,
    pub date: Option<String>,
    pub variant: Option<String>,
    pub images: Option<Vec<String>>,
    pub verified: Option<String>,
    pub author: Option<String>,
    pub rating: Option<String>,
}

impl RawReview {
    fn is_blank(&self) -> bool {
        *self == RawReview::default()
    }
}

/// Everything pulled out of one listing page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedPage {
    pub product_title: String,
    /// In page order. Containers that matched nothing are kept as `None`.
    pub reviews: Vec<Option<RawReview>>,
}

/// Turns rendered page content into raw review field-sets.
pub trait PageExtractor {
    /// `None` when the page has no review section at all.
    fn extract(&self, html: &str) -> Option<ExtractedPage>;

    /// Text of the total-review-count label, if the page has one.
    fn review_count_text(&self, html: &str) -> Option<String>;
}

/// Selector-driven extractor for the review listing markup.
#[derive(Debug, Default, Clone, Copy)]
pub struct HtmlExtractor;

impl PageExtractor for HtmlExtractor {
    fn extract(&self, html: &str) -> Option<ExtractedPage> {
        let doc = Html::parse_document(html);
        let containers: Vec<ElementRef> = doc.select(&selectors::REVIEW).collect();
        if containers.is_empty() && doc.select(&selectors::REVIEW_LIST).next().is_none() {
            return None;
        }

        let product_title = doc
            .select(&selectors::PRODUCT_TITLE)
            .find_map(text_of)
            .unwrap_or_default();

        let reviews = containers
            .into_iter()
            .map(extract_review)
            .map(|r| (!r.is_blank()).then_some(r))
            .collect();

        Some(ExtractedPage {
            product_title,
            reviews,
        })
    }

    fn review_count_text(&self, html: &str) -> Option<String> {
        let doc = Html::parse_document(html);
        let label = doc.select(&selectors::REVIEW_COUNT).next()?;
        text_of(label)
    }
}

fn extract_review(el: ElementRef) -> RawReview {
    let images: Vec<String> = el
        .select(&selectors::IMAGES)
        .filter_map(|img| img.value().attr("src"))
        .map(|src| src.trim().to_string())
        .filter(|src| !src.is_empty())
        .collect();

    RawReview {
        title: first_text(el, &selectors::TITLE),
        content: first_text(el, &selectors::CONTENT),
        date: first_text(el, &selectors::DATE),
        variant: first_text(el, &selectors::VARIANT),
        images: (!images.is_empty()).then_some(images),
        verified: first_text(el, &selectors::VERIFIED),
        author: first_text(el, &selectors::AUTHOR),
        rating: first_text(el, &selectors::RATING),
    }
}

fn first_text(el: ElementRef, selector: &Selector) -> Option<String> {
    el.select(selector).find_map(text_of)
}

/// Whitespace-collapsed text content; empty text counts as absent.
fn text_of(el: ElementRef) -> Option<String> {
    let text = el.text().flat_map(str::split_whitespace).collect::<Vec<_>>().join(" ");
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}
