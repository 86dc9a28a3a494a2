//! Document parsing: raw deck bytes in, ordered slides out.
//!
//! The format is chosen purely from the file-name extension (case-insensitive)
//! through a [`ParserRegistry`]. Adding a format means registering another
//! [`DocumentParser`]; callers never branch on format themselves.

pub mod pdf;
pub mod pptx;

use tracing::debug;

use crate::error::AnalysisError;
use crate::model::Slide;

pub use pdf::PdfParser;
pub use pptx::PptxParser;

/// Extraction strategy for one document format.
pub trait DocumentParser: Send + Sync {
    /// Human-readable format name used in logs.
    fn format_name(&self) -> &'static str;

    /// Lowercase extensions (without the dot) this parser accepts.
    fn extensions(&self) -> &'static [&'static str];

    /// Extract slides numbered contiguously from 1.
    fn parse(&self, bytes: &[u8]) -> Result<Vec<Slide>, AnalysisError>;
}

pub struct ParserRegistry {
    parsers: Vec<Box<dyn DocumentParser>>,
}

impl Default for ParserRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(PdfParser);
        registry.register(PptxParser);
        registry
    }
}

impl ParserRegistry {
    pub fn empty() -> Self {
        Self {
            parsers: Vec::new(),
        }
    }

    /// Add a parser. Later registrations win for a shared extension.
    pub fn register(&mut self, parser: impl DocumentParser + 'static) {
        self.parsers.insert(0, Box::new(parser));
    }

    pub fn supported_extensions(&self) -> Vec<&'static str> {
        let mut exts: Vec<&'static str> = self
            .parsers
            .iter()
            .flat_map(|p| p.extensions().iter().copied())
            .collect();
        exts.sort_unstable();
        exts.dedup();
        exts
    }

    /// Pick the parser for `file_name`, failing before any bytes are read.
    pub fn parser_for(&self, file_name: &str) -> Result<&dyn DocumentParser, AnalysisError> {
        let ext = file_extension(file_name);
        self.parsers
            .iter()
            .find(|p| p.extensions().contains(&ext.as_str()))
            .map(|p| p.as_ref())
            .ok_or(AnalysisError::UnsupportedFormat(ext))
    }

    pub fn parse(&self, bytes: &[u8], file_name: &str) -> Result<Vec<Slide>, AnalysisError> {
        let parser = self.parser_for(file_name)?;
        debug!(
            file_name,
            format = parser.format_name(),
            bytes = bytes.len(),
            "parsing document"
        );
        parser.parse(bytes)
    }
}

/// Lowercased text after the last `.` of the file name; empty when there is none.
pub fn file_extension(file_name: &str) -> String {
    let base = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(file_name);
    match base.rsplit_once('.') {
        Some((_, ext)) => ext.trim().to_ascii_lowercase(),
        None => String::new(),
    }
}
