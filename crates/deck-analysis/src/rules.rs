//! Deterministic structural checks over parsed slides.
//!
//! No I/O and no AI: every function here is a pure function of its input.
//! Each heuristic is exposed on its own so patterns can be tuned and tested
//! without going through [`run_rule_checks`].

use std::sync::LazyLock;

use regex::Regex;

use crate::model::{RuleCheckResult, Slide};

/// Decks below this many slides are flagged as too sparse.
pub const MIN_SLIDES: usize = 8;
/// Decks above this many slides are flagged as too dense.
pub const MAX_SLIDES: usize = 25;
/// Mean words per slide above this is flagged as text-heavy.
pub const MAX_AVG_WORDS_PER_SLIDE: usize = 150;
/// Slides (other than the cover) under this word count are "thin".
pub const THIN_SLIDE_WORDS: usize = 20;
/// Distinct buzzwords needed to flag overuse.
pub const BUZZWORD_OVERUSE_THRESHOLD: usize = 5;
/// How many offending buzzwords the warning names.
const BUZZWORDS_REPORTED: usize = 5;

pub const BUZZWORDS: [&str; 18] = [
    "synergy",
    "disrupt",
    "revolutionary",
    "game-changing",
    "world-class",
    "best-in-class",
    "paradigm",
    "leverage",
    "scalable",
    "innovative",
    "cutting-edge",
    "next-generation",
    "bleeding-edge",
    "first-mover",
    "unicorn",
    "moonshot",
    "pivot",
    "ecosystem",
];

/// Expected deck sections and the lowercase keywords that indicate each.
pub const SECTION_KEYWORDS: [(&str, &[&str]); 8] = [
    ("Problem", &["problem", "pain", "challenge", "issue", "gap"]),
    (
        "Solution",
        &["solution", "product", "platform", "how it works", "our approach"],
    ),
    (
        "Market Size",
        &["market", "tam", "sam", "som", "addressable", "billion", "trillion"],
    ),
    (
        "Business Model",
        &["business model", "revenue", "pricing", "monetiz", "unit economics"],
    ),
    (
        "Traction",
        &["traction", "metrics", "growth", "users", "revenue", "customers", "mrr", "arr"],
    ),
    (
        "Team",
        &["team", "founder", "co-founder", "ceo", "cto", "experience"],
    ),
    (
        "Competition",
        &["compet", "landscape", "vs", "alternative", "differenti"],
    ),
    (
        "Ask",
        &["ask", "raise", "funding", "investment", "use of funds", "seeking", "round"],
    ),
];

// Phone branch: seven or more digits, at most two separator characters between
// consecutive digits, so "+1 (415) 555-0100" matches and "2019 - 2024" does not.
static CONTACT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)([a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,})|(\+?\(?\d(?:[\s().-]{0,2}\d){6,})|((https?://)?(www\.)?linkedin\.com)",
    )
    .expect("valid regex")
});

static QUANT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\$[\d,.]+[KMBkmb]?)|(\d+%)|(\b\d+[xX]\b)|(\d{1,3}(,\d{3})+)").expect("valid regex")
});

/// Run every check and collect warnings in check order.
pub fn run_rule_checks(slides: &[Slide]) -> RuleCheckResult {
    let mut warnings = Vec::new();
    let slide_count = slides.len();
    let avg_words_per_slide = average_words_per_slide(slides);

    if slide_count < MIN_SLIDES {
        warnings.push(format!(
            "Deck has only {slide_count} slides. Most successful decks have 10-15 slides."
        ));
    } else if slide_count > MAX_SLIDES {
        warnings.push(format!(
            "Deck has {slide_count} slides. Consider trimming to under 20 for better engagement."
        ));
    }

    if avg_words_per_slide > MAX_AVG_WORDS_PER_SLIDE {
        warnings.push(format!(
            "Average of {avg_words_per_slide} words per slide is too high. Aim for under 100 words per slide for readability."
        ));
    }

    let thin_slides = thin_slides(slides);
    if !thin_slides.is_empty() {
        let list = thin_slides
            .iter()
            .map(|n| n.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        warnings.push(format!(
            "Slides {list} have very little text content (<{THIN_SLIDE_WORDS} words). These may be image-heavy or empty."
        ));
    }

    let all_text = full_text(slides);

    let buzzwords = find_buzzwords(&all_text);
    let has_buzzword_overuse = buzzwords.len() >= BUZZWORD_OVERUSE_THRESHOLD;
    if has_buzzword_overuse {
        let named = buzzwords
            .iter()
            .take(BUZZWORDS_REPORTED)
            .copied()
            .collect::<Vec<_>>()
            .join("\", \"");
        warnings.push(format!(
            "High buzzword density detected: \"{named}\". Replace with specific, concrete language."
        ));
    }

    let has_contact_info = has_contact_info(&all_text);
    if !has_contact_info {
        warnings.push(
            "No contact information detected. Include email or LinkedIn on the last slide."
                .to_string(),
        );
    }

    let has_quantitative_data = has_quantitative_data(&all_text);
    if !has_quantitative_data {
        warnings.push(
            "No quantitative data (numbers, percentages, dollar amounts) detected. VCs expect data-driven decks."
                .to_string(),
        );
    }

    let missing_slide_types: Vec<String> = missing_sections(&all_text)
        .into_iter()
        .map(str::to_string)
        .collect();
    if !missing_slide_types.is_empty() {
        warnings.push(format!(
            "Potentially missing sections: {}. These are expected in most investor decks.",
            missing_slide_types.join(", ")
        ));
    }

    RuleCheckResult {
        warnings,
        slide_count,
        avg_words_per_slide,
        thin_slides,
        has_buzzword_overuse,
        has_contact_info,
        has_quantitative_data,
        missing_slide_types,
    }
}

/// Lowercased slide text joined with single spaces.
pub fn full_text(slides: &[Slide]) -> String {
    slides
        .iter()
        .map(|s| s.raw_text.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Mean words per slide, rounded half-up; 0 for an empty deck.
pub fn average_words_per_slide(slides: &[Slide]) -> usize {
    if slides.is_empty() {
        return 0;
    }
    let total: usize = slides.iter().map(|s| s.word_count).sum();
    (total as f64 / slides.len() as f64).round() as usize
}

/// Slide numbers under [`THIN_SLIDE_WORDS`], cover slide exempt.
pub fn thin_slides(slides: &[Slide]) -> Vec<usize> {
    slides
        .iter()
        .filter(|s| s.slide_number > 1 && s.word_count < THIN_SLIDE_WORDS)
        .map(|s| s.slide_number)
        .collect()
}

/// Distinct buzzwords present in `text`, in list order. Expects lowercased input.
pub fn find_buzzwords(text: &str) -> Vec<&'static str> {
    BUZZWORDS
        .iter()
        .copied()
        .filter(|b| text.contains(b))
        .collect()
}

/// An email address, a phone-shaped digit run, or a LinkedIn reference.
pub fn has_contact_info(text: &str) -> bool {
    CONTACT_RE.is_match(text)
}

/// A dollar amount, a percentage, an `Nx` multiplier or a thousands-grouped integer.
pub fn has_quantitative_data(text: &str) -> bool {
    QUANT_RE.is_match(text)
}

/// Section names with no keyword hit in `text`. Expects lowercased input.
pub fn missing_sections(text: &str) -> Vec<&'static str> {
    SECTION_KEYWORDS
        .iter()
        .filter(|(_, keywords)| !keywords.iter().any(|kw| text.contains(kw)))
        .map(|(name, _)| *name)
        .collect()
}
