//! PPTX slide extraction.
//!
//! A PPTX file is a zip archive with one `ppt/slides/slideN.xml` entry per slide.
//! Entries are ordered by `N` (not by archive order, which is arbitrary) and the
//! text of every `<a:t>` run is joined with single spaces.

use std::io::{Cursor, Read};
use std::sync::LazyLock;

use quick_xml::events::Event;
use quick_xml::Reader;
use regex::Regex;
use tracing::debug;
use zip::ZipArchive;

use super::DocumentParser;
use crate::error::AnalysisError;
use crate::model::Slide;

static SLIDE_ENTRY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^ppt/slides/slide(\d+)\.xml$").expect("valid regex"));

const TEXT_RUN_TAG: &[u8] = b"a:t";

/// Decompressed size cap for a single slide XML entry.
pub const MAX_SLIDE_XML_BYTES: u64 = 8 * 1024 * 1024;
/// Decompressed size cap across all slide XML entries of one deck.
pub const MAX_TOTAL_SLIDE_XML_BYTES: u64 = 64 * 1024 * 1024;

pub struct PptxParser;

impl DocumentParser for PptxParser {
    fn format_name(&self) -> &'static str {
        "pptx"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["pptx"]
    }

    fn parse(&self, bytes: &[u8]) -> Result<Vec<Slide>, AnalysisError> {
        let mut archive = ZipArchive::new(Cursor::new(bytes)).map_err(|e| {
            AnalysisError::InvalidDocument(format!("failed to open PPTX archive: {e}"))
        })?;

        let entries = slide_entries(archive.file_names());
        let mut slides = Vec::with_capacity(entries.len());

        let mut remaining = MAX_TOTAL_SLIDE_XML_BYTES;
        for (index, (_, name)) in entries.iter().enumerate() {
            let entry = archive
                .by_name(name)
                .map_err(|e| AnalysisError::InvalidDocument(format!("failed to open {name}: {e}")))?;
            let limit = MAX_SLIDE_XML_BYTES.min(remaining);
            let xml = read_entry_limited(entry, name, limit)?;
            remaining -= xml.len() as u64;

            let runs = extract_text_runs(&xml)
                .map_err(|e| AnalysisError::InvalidDocument(format!("malformed XML in {name}: {e}")))?;

            let text = runs.join(" ");
            let slide_number = index + 1;
            if text.is_empty() {
                slides.push(Slide::empty(slide_number));
            } else {
                slides.push(Slide::new(slide_number, &text));
            }
        }

        debug!(slides = slides.len(), "pptx slides extracted");
        Ok(slides)
    }
}

/// Read a zip entry as UTF-8, failing once more than `limit` decompressed bytes
/// come out of it. The declared size in the archive is not trusted.
fn read_entry_limited(entry: impl Read, name: &str, limit: u64) -> Result<String, AnalysisError> {
    let mut xml = String::new();
    entry
        .take(limit + 1)
        .read_to_string(&mut xml)
        .map_err(|e| AnalysisError::InvalidDocument(format!("failed to read {name}: {e}")))?;
    if xml.len() as u64 > limit {
        return Err(AnalysisError::InvalidDocument(format!(
            "{name} expands past the {limit}-byte limit"
        )));
    }
    Ok(xml)
}

/// Slide entries as `(N, entry name)`, sorted by `N` ascending.
fn slide_entries<'a>(names: impl Iterator<Item = &'a str>) -> Vec<(u32, String)> {
    let mut entries: Vec<(u32, String)> = names
        .filter_map(|name| {
            let caps = SLIDE_ENTRY_RE.captures(name)?;
            let n = caps[1].parse::<u32>().ok()?;
            Some((n, name.to_string()))
        })
        .collect();
    entries.sort_by_key(|(n, _)| *n);
    entries
}

/// Trimmed, non-empty contents of every `<a:t>` element, in document order.
fn extract_text_runs(xml: &str) -> Result<Vec<String>, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    let mut runs = Vec::new();
    let mut current: Option<String> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) if e.name().as_ref() == TEXT_RUN_TAG => {
                current = Some(String::new());
            }
            Event::Text(t) => {
                if let Some(run) = current.as_mut() {
                    run.push_str(&t.unescape()?);
                }
            }
            Event::CData(c) => {
                if let Some(run) = current.as_mut() {
                    run.push_str(&String::from_utf8_lossy(&c));
                }
            }
            Event::End(e) if e.name().as_ref() == TEXT_RUN_TAG => {
                if let Some(run) = current.take() {
                    let run = run.trim();
                    if !run.is_empty() {
                        runs.push(run.to_string());
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(runs)
}
