//! PDF text-layer extraction.
//!
//! Text is pulled page by page from the PDF text layer and joined with form
//! feeds, the native page-break marker. Pages are then recovered by splitting
//! on form feeds; when that yields a single block (one-page export, or a
//! producer that flattens everything), runs of 3+ newlines are treated as page
//! boundaries instead. Blank pages are dropped and survivors renumbered from 1.
use std::sync::LazyLock;

use lopdf::Document;
use regex::Regex;
use tracing::{debug, warn};

use super::DocumentParser;
use crate::error::AnalysisError;
use crate::model::Slide;

const PAGE_BREAK: char = '\u{000C}';

static PAGE_GAP_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

pub struct PdfParser;

impl DocumentParser for PdfParser {
    fn format_name(&self) -> &'static str {
        "pdf"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["pdf"]
    }

    fn parse(&self, bytes: &[u8]) -> Result<Vec<Slide>, AnalysisError> {
        let text = extract_text(bytes)?;
        let slides: Vec<Slide> = split_pages(&text)
            .iter()
            .enumerate()
            .map(|(i, page)| Slide::new(i + 1, page))
            .collect();
        debug!(slides = slides.len(), "pdf pages extracted");
        Ok(slides)
    }
}

/// Full text of the document with pages separated by form feeds.
///
/// A page whose text cannot be decoded contributes an empty page rather than
/// failing the whole document; it is dropped later like any blank page.
fn extract_text(bytes: &[u8]) -> Result<String, AnalysisError> {
    let doc = Document::load_mem(bytes)
        .map_err(|e| AnalysisError::InvalidDocument(format!("failed to load PDF: {e}")))?;

    let page_numbers: Vec<u32> = doc.get_pages().keys().copied().collect();
    let mut pages = Vec::with_capacity(page_numbers.len());
    for page in page_numbers {
        match doc.extract_text(&[page]) {
            Ok(text) => pages.push(text),
            Err(e) => {
                warn!(page, error = %e, "failed to extract text from PDF page");
                pages.push(String::new());
            }
        }
    }

    let mut out = String::new();
    for (i, page) in pages.iter().enumerate() {
        if i > 0 {
            out.push(PAGE_BREAK);
        }
        out.push_str(page);
    }
    Ok(out)
}

/// Split extracted text into trimmed, non-empty pages.
pub fn split_pages(text: &str) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    let mut pages: Vec<&str> = text
        .split(PAGE_BREAK)
        .filter(|p| !p.trim().is_empty())
        .collect();

    if pages.len() <= 1 {
        pages = PAGE_GAP_RE
            .split(text)
            .filter(|p| !p.trim().is_empty())
            .collect();
    }

    pages.into_iter().map(|p| p.trim().to_string()).collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Object, Stream};

    /// Build an in-memory PDF with one page per entry; `None` produces a page
    /// with no text operators at all (like a scanned image page).
    pub(crate) fn build_pdf(pages: &[Option<&str>]) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
            "Encoding" => "WinAnsiEncoding",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! {
                "F1" => font_id,
            },
        });

        let mut kids: Vec<Object> = Vec::new();
        for page in pages {
            let operations = match page {
                Some(text) => vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 12.into()]),
                    Operation::new("Td", vec![72.into(), 700.into()]),
                    Operation::new("Tj", vec![Object::string_literal(*text)]),
                    Operation::new("ET", vec![]),
                ],
                None => vec![],
            };
            let content = Content { operations };
            let content_id = doc.add_object(Stream::new(
                dictionary! {},
                content.encode().expect("encode content"),
            ));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "Resources" => resources_id,
                "MediaBox" => vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(612),
                    Object::Integer(792),
                ],
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut out = Vec::new();
        doc.save_to(&mut out).expect("save pdf");
        out
    }

    #[test]
    fn splits_on_form_feeds() {
        let text = "Cover page\u{c}Problem slide text\u{c}Solution slide";
        assert_eq!(
            split_pages(text),
            vec!["Cover page", "Problem slide text", "Solution slide"]
        );
    }

    #[test]
    fn drops_blank_pages_and_renumbers() {
        let text = "First\u{c}   \n \u{c}Third";
        assert_eq!(split_pages(text), vec!["First", "Third"]);
    }

    #[test]
    fn falls_back_to_newline_runs_for_single_block() {
        let text = "Slide one\nstill one\n\n\nSlide two\n\n\n\n\nSlide three";
        assert_eq!(
            split_pages(text),
            vec!["Slide one\nstill one", "Slide two", "Slide three"]
        );
    }

    #[test]
    fn double_newlines_do_not_split() {
        assert_eq!(split_pages("para one\n\npara two"), vec!["para one\n\npara two"]);
    }

    #[test]
    fn whitespace_only_text_yields_no_pages() {
        assert!(split_pages(" \n\u{c}\n ").is_empty());
        assert!(split_pages("").is_empty());
    }

    #[test]
    fn parses_generated_pdf_in_page_order() {
        let bytes = build_pdf(&[
            Some("Acme Robotics seed deck"),
            Some("The problem is warehouse downtime"),
            Some("Our solution is predictive maintenance"),
        ]);
        let slides = PdfParser.parse(&bytes).unwrap();
        assert_eq!(slides.len(), 3);
        for (i, slide) in slides.iter().enumerate() {
            assert_eq!(slide.slide_number, i + 1);
        }
        assert!(slides[0].raw_text.contains("Acme Robotics"));
        assert!(slides[1].raw_text.contains("warehouse downtime"));
        assert!(slides[2].raw_text.contains("predictive maintenance"));
    }

    #[test]
    fn textless_pages_are_dropped_from_numbering() {
        let bytes = build_pdf(&[Some("Cover"), None, Some("Team slide")]);
        let slides = PdfParser.parse(&bytes).unwrap();
        assert_eq!(slides.len(), 2);
        assert_eq!(slides[1].slide_number, 2);
        assert!(slides[1].raw_text.contains("Team slide"));
    }

    #[test]
    fn image_only_pdf_yields_no_slides() {
        let bytes = build_pdf(&[None, None]);
        assert!(PdfParser.parse(&bytes).unwrap().is_empty());
    }

    #[test]
    fn garbage_bytes_are_an_invalid_document() {
        let err = PdfParser.parse(b"%PDF-nonsense").unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidDocument(_)));
    }
}
