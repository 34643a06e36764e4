use std::fmt;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::{Serialize, Serializer};

use crate::error::NormalizeError;
use crate::extract::RawReview;

const VERIFIED_MARKER: &str = "Verified Purchase";
const DATE_OUTPUT: &str = "%d %b %Y";

/// Formats tried in order once the date phrase has been isolated.
const DATE_FORMATS: &[&str] = &[
    "%B %d, %Y",
    "%b %d, %Y",
    "%B %d %Y",
    "%d %B %Y",
    "%d %b %Y",
    "%d %B, %Y",
    "%Y-%m-%d",
    "%m/%d/%Y",
    "%d.%m.%Y",
];

static ORDINAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{1,2})(?:st|nd|rd|th)\b").unwrap());
static ABBREV_DOT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"([A-Za-z])\.").unwrap());
static SPACES_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static WEEKDAY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?:mon|tue|wed|thu|fri|sat|sun)[a-z]*,?\s+").unwrap());
static SEPT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bsept\b").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Verified {
    Yes,
    No,
}

impl fmt::Display for Verified {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verified::Yes => f.write_str("Yes"),
            Verified::No => f.write_str("No"),
        }
    }
}

/// One output row. Field order is the column order of the CSV schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedReview {
    pub title: String,
    pub content: String,
    #[serde(serialize_with = "serialize_date")]
    pub date: NaiveDate,
    pub variant: String,
    pub images: String,
    pub verified: Verified,
    pub author: String,
    /// Absent on the page stays absent; written as an empty cell.
    pub rating: Option<String>,
    pub product: String,
    pub url: String,
}

fn serialize_date<S: Serializer>(date: &NaiveDate, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&format_date(*date))
}

/// Turn one raw review into an output row, stamping the page-level product
/// title and the exact URL the page was fetched from.
pub fn normalize_review(
    raw: RawReview,
    product: &str,
    url: &str,
) -> Result<NormalizedReview, NormalizeError> {
    let date = match raw.date.as_deref() {
        Some(d) => normalize_date(d)?,
        None => return Err(NormalizeError::MissingDate),
    };

    Ok(NormalizedReview {
        title: raw.title.unwrap_or_default(),
        content: raw.content.unwrap_or_default(),
        date,
        variant: raw.variant.unwrap_or_default(),
        images: normalize_images(raw.images.as_deref()),
        verified: normalize_verified(raw.verified.as_deref()),
        author: raw.author.unwrap_or_default(),
        rating: normalize_rating(raw.rating.as_deref()),
        product: product.to_string(),
        url: url.to_string(),
    })
}

pub fn normalize_verified(raw: Option<&str>) -> Verified {
    match raw {
        Some(v) if v.contains(VERIFIED_MARKER) || v.trim() == "Yes" => Verified::Yes,
        _ => Verified::No,
    }
}

/// `"4.0 out of 5 stars"` -> `"4.0"`.
pub fn normalize_rating(raw: Option<&str>) -> Option<String> {
    raw.map(|r| r.split(" out of").next().unwrap_or(r).trim().to_string())
}

pub fn normalize_images(raw: Option<&[String]>) -> String {
    raw.map(|urls| urls.join("\n")).unwrap_or_default()
}

/// Keep only the phrase after the last `"on "` and parse it as a calendar date.
pub fn normalize_date(raw: &str) -> Result<NaiveDate, NormalizeError> {
    let phrase = match raw.rfind("on ") {
        Some(i) => &raw[i + 3..],
        None => raw,
    };
    let cleaned = ORDINAL_RE.replace_all(phrase, "$1");
    let cleaned = ABBREV_DOT_RE.replace_all(&cleaned, "$1");
    let cleaned = SPACES_RE.replace_all(&cleaned, " ");
    let cleaned = WEEKDAY_RE.replace(cleaned.trim(), "");
    let cleaned = SEPT_RE.replace(&cleaned, "Sep");
    let cleaned = cleaned.trim().trim_end_matches(['.', ',']);

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(cleaned, fmt).ok())
        .ok_or_else(|| NormalizeError::BadDate(raw.to_string()))
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_OUTPUT).to_string()
}
