use std::fs::File;
use std::io::Write;
use std::path::Path;

use csv::{QuoteStyle, WriterBuilder};

use crate::error::ScrapeError;
use crate::normalize::NormalizedReview;

/// Output columns, in order.
pub const COLUMNS: [&str; 10] = [
    "title", "content", "date", "variant", "images", "verified", "author", "rating", "product",
    "url",
];

/// Destination for normalized rows. Rows are written as they are produced.
pub trait ReviewSink {
    fn write(&mut self, review: &NormalizedReview) -> Result<(), ScrapeError>;
}

/// Fully quoted CSV with a header row, flushed after every row so an abort
/// leaves everything written so far on disk.
pub struct CsvSink<W: Write> {
    writer: csv::Writer<W>,
    rows: usize,
}

impl CsvSink<File> {
    pub fn create(path: &Path) -> Result<Self, ScrapeError> {
        let file = File::create(path)?;
        Self::new(file)
    }
}

impl<W: Write> CsvSink<W> {
    pub fn new(inner: W) -> Result<Self, ScrapeError> {
        let mut writer = WriterBuilder::new()
            .quote_style(QuoteStyle::Always)
            .has_headers(false)
            .from_writer(inner);
        writer.write_record(COLUMNS)?;
        writer.flush()?;
        Ok(Self { writer, rows: 0 })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn finish(mut self) -> Result<W, ScrapeError> {
        self.writer.flush()?;
        self.writer
            .into_inner()
            .map_err(|e| ScrapeError::Io(std::io::Error::new(e.error().kind(), e.error().to_string())))
    }
}

impl<W: Write> ReviewSink for CsvSink<W> {
    fn write(&mut self, review: &NormalizedReview) -> Result<(), ScrapeError> {
        self.writer.serialize(review)?;
        self.writer.flush()?;
        self.rows += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::normalize::Verified;

    fn review() -> NormalizedReview {
        NormalizedReview {
            title: "Solid, \"really\" solid".into(),
            content: "Line one\nLine two".into(),
            date: NaiveDate::from_ymd_opt(2023, 1, 5).unwrap(),
            variant: String::new(),
            images: "https://a.jpg\nhttps://b.jpg".into(),
            verified: Verified::Yes,
            author: "Kim".into(),
            rating: None,
            product: "Bottle".into(),
            url: "https://www.amazon.com/dp/product-reviews/B0?pageNumber=1".into(),
        }
    }

    #[test]
    fn header_only() {
        let sink = CsvSink::new(Vec::new()).unwrap();
        let out = String::from_utf8(sink.finish().unwrap()).unwrap();
        assert!(out.starts_with(
            "\"title\",\"content\",\"date\",\"variant\",\"images\",\"verified\",\"author\",\"rating\",\"product\",\"url\""
        ));
        assert_eq!(out.lines().count(), 1);
    }

    #[test]
    fn row_is_fully_quoted() {
        let mut sink = CsvSink::new(Vec::new()).unwrap();
        sink.write(&review()).unwrap();
        assert_eq!(sink.rows(), 1);
        let out = String::from_utf8(sink.finish().unwrap()).unwrap();

        let mut rdr = csv::Reader::from_reader(out.as_bytes());
        let headers = rdr.headers().unwrap().clone();
        assert_eq!(headers.iter().collect::<Vec<_>>(), COLUMNS.to_vec());
        let rows: Vec<csv::StringRecord> = rdr.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(&row[0], "Solid, \"really\" solid");
        assert_eq!(&row[1], "Line one\nLine two");
        assert_eq!(&row[2], "05 Jan 2023");
        assert_eq!(&row[3], "");
        assert_eq!(&row[5], "Yes");
        assert_eq!(&row[7], "");
        assert!(out.contains("\"05 Jan 2023\",\"\",\""));
    }
}
