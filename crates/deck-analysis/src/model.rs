//! Data model for slides, rule checks and the scored analysis.
//!
//! Field names serialize in camelCase; this is the at-rest format for stored
//! analyses, so renames here are breaking changes for persisted records.

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Placeholder text for a slide that carried no extractable text runs.
pub const EMPTY_SLIDE_PLACEHOLDER: &str = "(empty slide)";

/// One logical page or slide of a deck, reduced to plain text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Slide {
    /// 1-based position among the returned slides.
    pub slide_number: usize,
    /// Trimmed plain text of the slide.
    pub raw_text: String,
    /// Whitespace-delimited token count of the extracted text.
    pub word_count: usize,
}

impl Slide {
    pub fn new(slide_number: usize, text: &str) -> Self {
        let raw_text = text.trim().to_string();
        let word_count = count_words(&raw_text);
        Self {
            slide_number,
            raw_text,
            word_count,
        }
    }

    /// A slide with no text runs at all. The word count stays 0 so the
    /// placeholder never counts as content.
    pub fn empty(slide_number: usize) -> Self {
        Self {
            slide_number,
            raw_text: EMPTY_SLIDE_PLACEHOLDER.to_string(),
            word_count: 0,
        }
    }
}

pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

/// The 12 scoring axes, in canonical rubric order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum DimensionKey {
    Problem,
    Solution,
    MarketSize,
    BusinessModel,
    Traction,
    Team,
    Competition,
    GoToMarket,
    Financials,
    Ask,
    Storytelling,
    DesignClarity,
}

impl DimensionKey {
    pub const ALL: [DimensionKey; 12] = [
        DimensionKey::Problem,
        DimensionKey::Solution,
        DimensionKey::MarketSize,
        DimensionKey::BusinessModel,
        DimensionKey::Traction,
        DimensionKey::Team,
        DimensionKey::Competition,
        DimensionKey::GoToMarket,
        DimensionKey::Financials,
        DimensionKey::Ask,
        DimensionKey::Storytelling,
        DimensionKey::DesignClarity,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DimensionKey::Problem => "problem",
            DimensionKey::Solution => "solution",
            DimensionKey::MarketSize => "marketSize",
            DimensionKey::BusinessModel => "businessModel",
            DimensionKey::Traction => "traction",
            DimensionKey::Team => "team",
            DimensionKey::Competition => "competition",
            DimensionKey::GoToMarket => "goToMarket",
            DimensionKey::Financials => "financials",
            DimensionKey::Ask => "ask",
            DimensionKey::Storytelling => "storytelling",
            DimensionKey::DesignClarity => "designClarity",
        }
    }

    /// Case-insensitive lookup by wire name.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(s))
    }

    /// Canonical human-readable label from the rubric table.
    pub fn label(self) -> &'static str {
        crate::rubric::definition(self).label
    }
}

impl fmt::Display for DimensionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DimensionScore {
    pub key: DimensionKey,
    pub label: String,
    /// 0-10 inclusive.
    pub score: u8,
    pub feedback: String,
}

/// Letter grade summarizing `deckQualityScore`, best first.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
pub enum Grade {
    #[serde(rename = "A+")]
    APlus,
    #[serde(rename = "A")]
    A,
    #[serde(rename = "A-")]
    AMinus,
    #[serde(rename = "B+")]
    BPlus,
    #[serde(rename = "B")]
    B,
    #[serde(rename = "B-")]
    BMinus,
    #[serde(rename = "C+")]
    CPlus,
    #[serde(rename = "C")]
    C,
    #[serde(rename = "C-")]
    CMinus,
    #[serde(rename = "D")]
    D,
    #[default]
    #[serde(rename = "F")]
    F,
}

impl Grade {
    pub const ALL: [Grade; 11] = [
        Grade::APlus,
        Grade::A,
        Grade::AMinus,
        Grade::BPlus,
        Grade::B,
        Grade::BMinus,
        Grade::CPlus,
        Grade::C,
        Grade::CMinus,
        Grade::D,
        Grade::F,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Grade::APlus => "A+",
            Grade::A => "A",
            Grade::AMinus => "A-",
            Grade::BPlus => "B+",
            Grade::B => "B",
            Grade::BMinus => "B-",
            Grade::CPlus => "C+",
            Grade::C => "C",
            Grade::CMinus => "C-",
            Grade::D => "D",
            Grade::F => "F",
        }
    }

    /// Lowest `deckQualityScore` that earns this grade.
    pub fn min_score(self) -> u8 {
        match self {
            Grade::APlus => 95,
            Grade::A => 90,
            Grade::AMinus => 85,
            Grade::BPlus => 80,
            Grade::B => 75,
            Grade::BMinus => 70,
            Grade::CPlus => 65,
            Grade::C => 60,
            Grade::CMinus => 55,
            Grade::D => 40,
            Grade::F => 0,
        }
    }

    /// Highest `deckQualityScore` that still maps to this grade.
    pub fn max_score(self) -> u8 {
        match Self::ALL.iter().position(|g| *g == self) {
            Some(0) | None => 100,
            Some(i) => Self::ALL[i - 1].min_score() - 1,
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Grade::APlus => "Exceptional, top 1% of decks",
            Grade::A => "Excellent, investor-ready",
            Grade::AMinus => "Very strong with minor improvements needed",
            Grade::BPlus => "Strong deck, ready for most investors",
            Grade::B => "Good foundation, some areas need work",
            Grade::BMinus => "Above average but notable gaps",
            Grade::CPlus => "Average, significant improvements needed",
            Grade::C => "Below average, major revision needed",
            Grade::CMinus => "Weak, fundamental issues",
            Grade::D => "Poor, needs complete overhaul",
            Grade::F => "Not viable in current form",
        }
    }

    /// Derive a grade from an already-clamped quality score.
    pub fn from_score(score: u8) -> Self {
        Self::ALL
            .into_iter()
            .find(|g| score >= g.min_score())
            .unwrap_or(Grade::F)
    }

    /// Accepts the exact scale symbols, ignoring surrounding whitespace and case.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|g| g.as_str().eq_ignore_ascii_case(s))
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Impact {
    High,
    #[default]
    Medium,
    Low,
}

impl Impact {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Some(Impact::High),
            "medium" => Some(Impact::Medium),
            "low" => Some(Impact::Low),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PriorityImprovement {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub impact: Impact,
}

/// Metrics quoted in the deck. A field is `None` unless the model found it in
/// the source text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct ExtractedMetrics {
    pub revenue: Option<String>,
    pub arr: Option<String>,
    pub growth_rate: Option<String>,
    pub users: Option<String>,
    pub funding_ask: Option<String>,
    pub burn_rate: Option<String>,
    pub cac: Option<String>,
    pub ltv: Option<String>,
    pub team_size: Option<String>,
    pub runway: Option<String>,
}

impl ExtractedMetrics {
    /// Wire names of every metric field, in declaration order.
    pub const FIELDS: [&'static str; 10] = [
        "revenue",
        "arr",
        "growthRate",
        "users",
        "fundingAsk",
        "burnRate",
        "cac",
        "ltv",
        "teamSize",
        "runway",
    ];

    pub fn field_mut(&mut self, name: &str) -> Option<&mut Option<String>> {
        match name {
            "revenue" => Some(&mut self.revenue),
            "arr" => Some(&mut self.arr),
            "growthRate" => Some(&mut self.growth_rate),
            "users" => Some(&mut self.users),
            "fundingAsk" => Some(&mut self.funding_ask),
            "burnRate" => Some(&mut self.burn_rate),
            "cac" => Some(&mut self.cac),
            "ltv" => Some(&mut self.ltv),
            "teamSize" => Some(&mut self.team_size),
            "runway" => Some(&mut self.runway),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SlideBreakdown {
    pub slide_number: usize,
    pub classified_type: String,
    pub summary: String,
}

/// Deterministic structural assessment of a slide list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RuleCheckResult {
    /// One entry per detected issue, in check order. Empty means no issues.
    pub warnings: Vec<String>,
    pub slide_count: usize,
    pub avg_words_per_slide: usize,
    pub thin_slides: Vec<usize>,
    pub has_buzzword_overuse: bool,
    pub has_contact_info: bool,
    pub has_quantitative_data: bool,
    pub missing_slide_types: Vec<String>,
}

/// The model's judgment after validation and repair.
///
/// Deserializing goes through a lenient at-rest shape so that records stored before
/// a rubric change still load: missing fields default, dimensions whose key is
/// no longer in the rubric are dropped, and an unrecognized grade or impact
/// falls back to the derived value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AiAnalysisResponse {
    pub dimensions: Vec<DimensionScore>,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub red_flags: Vec<String>,
    pub priority_improvements: Vec<PriorityImprovement>,
    pub extracted_metrics: ExtractedMetrics,
    pub slide_breakdown: Vec<SlideBreakdown>,
    pub summary: String,
    /// 0-100 inclusive.
    pub deck_quality_score: u8,
    /// 0-100 inclusive, scored independently of `deck_quality_score`.
    pub traction_score: u8,
    pub grade: Grade,
}

/// AI analysis merged with the rule checks; the unit returned and persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FullAnalysisResult {
    #[serde(flatten)]
    pub analysis: AiAnalysisResponse,
    pub rule_checks: RuleCheckResult,
}

/// At-rest shape of [`AiAnalysisResponse`] with the rubric-dependent values
/// left as plain strings.
#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct StoredAnalysis {
    dimensions: Vec<StoredDimension>,
    strengths: Vec<String>,
    weaknesses: Vec<String>,
    red_flags: Vec<String>,
    priority_improvements: Vec<StoredImprovement>,
    extracted_metrics: ExtractedMetrics,
    slide_breakdown: Vec<SlideBreakdown>,
    summary: String,
    deck_quality_score: u64,
    traction_score: u64,
    grade: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredDimension {
    key: String,
    #[serde(default)]
    label: String,
    #[serde(default)]
    score: u64,
    #[serde(default)]
    feedback: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredImprovement {
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    impact: Option<String>,
}

fn bounded(value: u64, max: u8) -> u8 {
    value.min(u64::from(max)) as u8
}

impl From<StoredAnalysis> for AiAnalysisResponse {
    fn from(stored: StoredAnalysis) -> Self {
        let dimensions = stored
            .dimensions
            .into_iter()
            .filter_map(|d| {
                let Some(key) = DimensionKey::parse(&d.key) else {
                    tracing::debug!(key = %d.key, "dropping stored dimension not in the current rubric");
                    return None;
                };
                let label = if d.label.trim().is_empty() {
                    key.label().to_string()
                } else {
                    d.label
                };
                Some(DimensionScore {
                    key,
                    label,
                    score: bounded(d.score, crate::response::MAX_DIMENSION_SCORE),
                    feedback: d.feedback,
                })
            })
            .collect();

        let priority_improvements = stored
            .priority_improvements
            .into_iter()
            .map(|p| PriorityImprovement {
                title: p.title,
                description: p.description,
                impact: p.impact.as_deref().and_then(Impact::parse).unwrap_or_default(),
            })
            .collect();

        let deck_quality_score = bounded(stored.deck_quality_score, crate::response::MAX_QUALITY_SCORE);
        let grade = stored
            .grade
            .as_deref()
            .and_then(Grade::parse)
            .unwrap_or_else(|| Grade::from_score(deck_quality_score));

        Self {
            dimensions,
            strengths: stored.strengths,
            weaknesses: stored.weaknesses,
            red_flags: stored.red_flags,
            priority_improvements,
            extracted_metrics: stored.extracted_metrics,
            slide_breakdown: stored.slide_breakdown,
            summary: stored.summary,
            deck_quality_score,
            traction_score: bounded(stored.traction_score, crate::response::MAX_QUALITY_SCORE),
            grade,
        }
    }
}

impl<'de> Deserialize<'de> for AiAnalysisResponse {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        StoredAnalysis::deserialize(deserializer).map(Self::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slide_new_trims_and_counts_words() {
        let slide = Slide::new(3, "  Our   market is\nhuge  ");
        assert_eq!(slide.slide_number, 3);
        assert_eq!(slide.raw_text, "Our   market is\nhuge");
        assert_eq!(slide.word_count, 4);
    }

    #[test]
    fn empty_slide_uses_placeholder_with_zero_words() {
        let slide = Slide::empty(2);
        assert_eq!(slide.raw_text, EMPTY_SLIDE_PLACEHOLDER);
        assert_eq!(slide.word_count, 0);
    }

    #[test]
    fn grade_thresholds() {
        let cases = [
            (100, Grade::APlus),
            (95, Grade::APlus),
            (94, Grade::A),
            (90, Grade::A),
            (85, Grade::AMinus),
            (80, Grade::BPlus),
            (75, Grade::B),
            (70, Grade::BMinus),
            (65, Grade::CPlus),
            (60, Grade::C),
            (55, Grade::CMinus),
            (54, Grade::D),
            (40, Grade::D),
            (39, Grade::F),
            (0, Grade::F),
        ];
        for (score, grade) in cases {
            assert_eq!(Grade::from_score(score), grade, "score {score}");
        }
    }

    #[test]
    fn grade_bands_are_contiguous() {
        assert_eq!(Grade::APlus.max_score(), 100);
        assert_eq!(Grade::A.max_score(), 94);
        assert_eq!(Grade::D.max_score(), 54);
        assert_eq!(Grade::F.max_score(), 39);
    }

    #[test]
    fn grade_parse_is_lenient_on_case_and_whitespace() {
        assert_eq!(Grade::parse(" b+ "), Some(Grade::BPlus));
        assert_eq!(Grade::parse("A-"), Some(Grade::AMinus));
        assert_eq!(Grade::parse("E"), None);
        assert_eq!(Grade::parse("A++"), None);
    }

    #[test]
    fn grade_serializes_as_symbol() {
        let json = serde_json::to_string(&Grade::CMinus).unwrap();
        assert_eq!(json, "\"C-\"");
        let back: Grade = serde_json::from_str("\"A+\"").unwrap();
        assert_eq!(back, Grade::APlus);
    }

    #[test]
    fn dimension_key_wire_names() {
        assert_eq!(
            serde_json::to_string(&DimensionKey::GoToMarket).unwrap(),
            "\"goToMarket\""
        );
        assert_eq!(DimensionKey::parse("MARKETSIZE"), Some(DimensionKey::MarketSize));
        assert_eq!(DimensionKey::parse("vision"), None);
        assert_eq!(DimensionKey::Ask.label(), "The Ask & Use of Funds");
    }

    #[test]
    fn full_result_flattens_analysis_fields() {
        let result = FullAnalysisResult {
            analysis: AiAnalysisResponse {
                summary: "Solid seed deck.".to_string(),
                deck_quality_score: 72,
                grade: Grade::BMinus,
                ..Default::default()
            },
            rule_checks: RuleCheckResult::default(),
        };
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["deckQualityScore"], 72);
        assert_eq!(value["grade"], "B-");
        assert!(value["ruleChecks"]["warnings"].is_array());
        assert!(value["extractedMetrics"]["fundingAsk"].is_null());

        let back: FullAnalysisResult = serde_json::from_value(value).unwrap();
        assert_eq!(back, result);
    }

    #[test]
    fn old_records_without_newer_fields_still_load() {
        let json = r#"{
            "summary": "Legacy record",
            "deckQualityScore": 50,
            "grade": "D",
            "ruleChecks": {
                "warnings": [],
                "slideCount": 10,
                "avgWordsPerSlide": 40,
                "thinSlides": [],
                "hasBuzzwordOveruse": false,
                "hasContactInfo": true,
                "hasQuantitativeData": true,
                "missingSlideTypes": []
            }
        }"#;
        let record: FullAnalysisResult = serde_json::from_str(json).unwrap();
        assert_eq!(record.analysis.grade, Grade::D);
        assert!(record.analysis.dimensions.is_empty());
        assert_eq!(record.analysis.traction_score, 0);
        assert_eq!(record.rule_checks.slide_count, 10);
    }

    #[test]
    fn records_from_an_older_rubric_still_load() {
        let json = r#"{
            "dimensions": [
                {"key": "problem", "label": "Problem", "score": 7, "feedback": "Clear."},
                {"key": "vision", "label": "Vision", "score": 9, "feedback": "Bold."},
                {"key": "team", "score": 14}
            ],
            "priorityImprovements": [
                {"title": "Show cohorts", "description": "Retention by month.", "impact": "critical"},
                {"title": "Trim", "impact": "low"}
            ],
            "summary": "Stored under the previous rubric.",
            "deckQualityScore": 66,
            "grade": "B/C",
            "ruleChecks": {
                "warnings": [],
                "slideCount": 12,
                "avgWordsPerSlide": 60,
                "thinSlides": [],
                "hasBuzzwordOveruse": false,
                "hasContactInfo": true,
                "hasQuantitativeData": true,
                "missingSlideTypes": []
            }
        }"#;
        let record: FullAnalysisResult = serde_json::from_str(json).unwrap();
        let analysis = &record.analysis;

        let keys: Vec<DimensionKey> = analysis.dimensions.iter().map(|d| d.key).collect();
        assert_eq!(keys, vec![DimensionKey::Problem, DimensionKey::Team]);
        assert_eq!(analysis.dimensions[1].label, DimensionKey::Team.label());
        assert_eq!(analysis.dimensions[1].score, 10);

        assert_eq!(analysis.priority_improvements[0].impact, Impact::Medium);
        assert_eq!(analysis.priority_improvements[1].impact, Impact::Low);
        assert_eq!(analysis.grade, Grade::CPlus);
        assert_eq!(record.rule_checks.slide_count, 12);
    }

    #[test]
    fn missing_grade_is_derived_from_score() {
        let analysis: AiAnalysisResponse =
            serde_json::from_str(r#"{"deckQualityScore": 91}"#).unwrap();
        assert_eq!(analysis.grade, Grade::A);

        let analysis: AiAnalysisResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(analysis, AiAnalysisResponse::default());
    }
}
