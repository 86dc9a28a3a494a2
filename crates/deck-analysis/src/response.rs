//! Turning raw model text into a well-formed [`AiAnalysisResponse`].
//!
//! Two stages. Extraction finds a JSON object in the text and fails hard when
//! there is none. Repair then walks the parsed value field by field and never
//! fails: out-of-range numbers are clamped, bad enums are replaced, and missing
//! pieces get empty defaults. Repair is idempotent, so feeding its serialized
//! output back through it changes nothing.

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::AnalysisError;
use crate::model::{
    AiAnalysisResponse, DimensionKey, DimensionScore, ExtractedMetrics, Grade, Impact,
    PriorityImprovement, SlideBreakdown,
};

pub const MAX_QUALITY_SCORE: u8 = 100;
pub const MAX_DIMENSION_SCORE: u8 = 10;

/// Feedback for rubric dimensions the model skipped.
pub const NOT_ASSESSED: &str = "Not assessed.";

/// The JSON object inside `raw`: optional code fence stripped, then everything
/// from the first `{` to the last `}`.
pub fn extract_json_object(raw: &str) -> Option<&str> {
    let text = strip_code_fence(raw);
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (`json`, `JSON`, ...) on the opening fence line.
    let body = match rest.find('\n') {
        Some(i) => &rest[i + 1..],
        None => rest,
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Extract, parse and repair a model response for a deck of `slide_count` slides.
pub fn parse_ai_response(raw: &str, slide_count: usize) -> Result<AiAnalysisResponse, AnalysisError> {
    let json = extract_json_object(raw).ok_or_else(|| AnalysisError::MalformedAiResponse {
        message: "response contained no JSON object".to_string(),
        raw: raw.to_string(),
    })?;

    let value: Value =
        serde_json::from_str(json).map_err(|e| AnalysisError::MalformedAiResponse {
            message: format!("invalid JSON: {e}"),
            raw: raw.to_string(),
        })?;

    Ok(repair_response(&value, slide_count))
}

/// Coerce any JSON value into a valid response. Never fails.
pub fn repair_response(value: &Value, slide_count: usize) -> AiAnalysisResponse {
    let empty = Map::new();
    let obj = value.as_object().unwrap_or(&empty);
    let field = |name: &str| obj.get(name).filter(|v| !v.is_null());

    let deck_quality_score = clamp_score(field("deckQualityScore"), MAX_QUALITY_SCORE);
    let grade = field("grade")
        .and_then(Value::as_str)
        .and_then(Grade::parse)
        .unwrap_or_else(|| Grade::from_score(deck_quality_score));

    AiAnalysisResponse {
        dimensions: repair_dimensions(field("dimensions")),
        strengths: string_list(field("strengths")),
        weaknesses: string_list(field("weaknesses")),
        red_flags: string_list(field("redFlags")),
        priority_improvements: repair_improvements(field("priorityImprovements")),
        extracted_metrics: repair_metrics(field("extractedMetrics")),
        slide_breakdown: repair_slide_breakdown(field("slideBreakdown"), slide_count),
        summary: field("summary")
            .and_then(Value::as_str)
            .map(|s| s.trim().to_string())
            .unwrap_or_default(),
        deck_quality_score,
        traction_score: clamp_score(field("tractionScore"), MAX_QUALITY_SCORE),
        grade,
    }
}

/// Numbers or numeric strings; everything else reads as 0.
fn number(value: Option<&Value>) -> f64 {
    let n = match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };
    if n.is_finite() {
        n
    } else {
        0.0
    }
}

fn clamp_score(value: Option<&Value>, max: u8) -> u8 {
    number(value).round().clamp(0.0, f64::from(max)) as u8
}

fn trimmed_str(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(|v| trimmed_str(Some(v))).collect())
        .unwrap_or_default()
}

/// Exactly one entry per rubric key, in rubric order.
///
/// Accepts the documented array form and the `{ "<key>": {...} }` map form
/// some models produce.
fn repair_dimensions(value: Option<&Value>) -> Vec<DimensionScore> {
    let mut slots: [Option<(u8, String)>; 12] = Default::default();

    let mut accept = |key: Option<DimensionKey>, entry: &Value| {
        let Some(key) = key else { return };
        let slot = &mut slots[key as usize];
        if slot.is_none() {
            let score = clamp_score(entry.get("score"), MAX_DIMENSION_SCORE);
            let feedback = entry
                .get("feedback")
                .and_then(Value::as_str)
                .map(|s| s.trim().to_string())
                .unwrap_or_default();
            *slot = Some((score, feedback));
        }
    };

    match value {
        Some(Value::Array(items)) => {
            for item in items {
                let key = item.get("key").and_then(Value::as_str).and_then(DimensionKey::parse);
                accept(key, item);
            }
        }
        Some(Value::Object(map)) => {
            for (name, item) in map {
                accept(DimensionKey::parse(name), item);
            }
        }
        _ => {}
    }

    DimensionKey::ALL
        .into_iter()
        .zip(slots)
        .map(|(key, slot)| {
            let (score, feedback) = slot.unwrap_or_else(|| (0, NOT_ASSESSED.to_string()));
            DimensionScore {
                key,
                label: key.label().to_string(),
                score,
                feedback,
            }
        })
        .collect()
}

fn repair_improvements(value: Option<&Value>) -> Vec<PriorityImprovement> {
    let Some(items) = value.and_then(Value::as_array) else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| {
            let title = trimmed_str(item.get("title"))?;
            Some(PriorityImprovement {
                title,
                description: trimmed_str(item.get("description")).unwrap_or_default(),
                impact: item
                    .get("impact")
                    .and_then(Value::as_str)
                    .and_then(Impact::parse)
                    .unwrap_or_default(),
            })
        })
        .collect()
}

fn repair_metrics(value: Option<&Value>) -> ExtractedMetrics {
    let mut metrics = ExtractedMetrics::default();
    let Some(obj) = value.and_then(Value::as_object) else {
        return metrics;
    };
    for name in ExtractedMetrics::FIELDS {
        let repaired = match obj.get(name) {
            Some(Value::String(s)) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        };
        if let Some(slot) = metrics.field_mut(name) {
            *slot = repaired;
        }
    }
    metrics
}

fn repair_slide_breakdown(value: Option<&Value>, slide_count: usize) -> Vec<SlideBreakdown> {
    let Some(items) = value.and_then(Value::as_array) else {
        return Vec::new();
    };

    let mut entries: Vec<SlideBreakdown> = items
        .iter()
        .filter_map(|item| {
            let n = number(item.get("slideNumber")).round();
            if n < 1.0 || n > slide_count as f64 {
                return None;
            }
            Some(SlideBreakdown {
                slide_number: n as usize,
                classified_type: trimmed_str(item.get("classifiedType")).unwrap_or_default(),
                summary: trimmed_str(item.get("summary")).unwrap_or_default(),
            })
        })
        .collect();
    entries.sort_by_key(|e| e.slide_number);

    if entries.len() != slide_count {
        debug!(
            entries = entries.len(),
            slide_count, "slide breakdown does not cover every slide"
        );
    }
    entries
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn extracts_from_code_fence() {
        let raw = "```json\n{\"deckQualityScore\": 72, \"grade\": \"B-\"}\n```";
        assert_eq!(
            extract_json_object(raw),
            Some("{\"deckQualityScore\": 72, \"grade\": \"B-\"}")
        );
        let parsed = parse_ai_response(raw, 10).unwrap();
        assert_eq!(parsed.deck_quality_score, 72);
        assert_eq!(parsed.grade, Grade::BMinus);
    }

    #[test]
    fn extracts_from_surrounding_prose() {
        let raw = "Sure! Here is the analysis:\n{\"summary\": \"ok {nested}\"}\nLet me know.";
        assert_eq!(extract_json_object(raw), Some("{\"summary\": \"ok {nested}\"}"));
        assert_eq!(parse_ai_response(raw, 1).unwrap().summary, "ok {nested}");
    }

    #[test]
    fn missing_braces_is_malformed_and_keeps_raw() {
        let err = parse_ai_response("I cannot analyze this deck.", 3).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedAiResponse);
        match err {
            AnalysisError::MalformedAiResponse { raw, .. } => {
                assert_eq!(raw, "I cannot analyze this deck.")
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert!(extract_json_object("} backwards {").is_none());
    }

    #[test]
    fn unparsable_json_is_malformed() {
        let err = parse_ai_response("{\"deckQualityScore\": 70,}", 3).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedAiResponse);
        assert!(err.to_string().contains("invalid JSON"));
    }

    #[test]
    fn out_of_range_score_is_clamped_and_grade_derived() {
        let parsed = parse_ai_response(r#"{"deckQualityScore": 137}"#, 5).unwrap();
        assert_eq!(parsed.deck_quality_score, 100);
        assert_eq!(parsed.grade, Grade::APlus);
    }

    #[test]
    fn numbers_are_rounded_then_clamped() {
        let repaired = repair_response(
            &json!({
                "deckQualityScore": "84.5",
                "tractionScore": -12,
                "dimensions": [
                    {"key": "problem", "score": 7.6},
                    {"key": "team", "score": 10.5},
                    {"key": "ask", "score": "high"}
                ]
            }),
            3,
        );
        assert_eq!(repaired.deck_quality_score, 85);
        assert_eq!(repaired.grade, Grade::AMinus);
        assert_eq!(repaired.traction_score, 0);
        let score = |k: DimensionKey| repaired.dimensions[k as usize].score;
        assert_eq!(score(DimensionKey::Problem), 8);
        assert_eq!(score(DimensionKey::Team), 10);
        assert_eq!(score(DimensionKey::Ask), 0);
    }

    #[test]
    fn valid_grade_is_kept_and_case_is_normalized() {
        let repaired = repair_response(&json!({"deckQualityScore": 50, "grade": " b+ "}), 1);
        assert_eq!(repaired.grade, Grade::BPlus);

        let repaired = repair_response(&json!({"deckQualityScore": 41, "grade": "E"}), 1);
        assert_eq!(repaired.grade, Grade::D);
    }

    #[test]
    fn dimensions_always_cover_the_rubric_in_order() {
        let repaired = repair_response(
            &json!({
                "dimensions": [
                    {"key": "team", "label": "People", "score": 6, "feedback": " Strong founders "},
                    {"key": "team", "score": 1, "feedback": "duplicate"},
                    {"key": "vibes", "score": 9},
                    {"key": "PROBLEM", "score": 4, "feedback": "Vague"}
                ]
            }),
            1,
        );
        assert_eq!(repaired.dimensions.len(), 12);
        let keys: Vec<DimensionKey> = repaired.dimensions.iter().map(|d| d.key).collect();
        assert_eq!(keys, DimensionKey::ALL.to_vec());

        let team = &repaired.dimensions[DimensionKey::Team as usize];
        assert_eq!(team.score, 6);
        assert_eq!(team.label, DimensionKey::Team.label());
        assert_eq!(team.feedback, "Strong founders");

        let problem = &repaired.dimensions[DimensionKey::Problem as usize];
        assert_eq!((problem.score, problem.feedback.as_str()), (4, "Vague"));

        let financials = &repaired.dimensions[DimensionKey::Financials as usize];
        assert_eq!(financials.score, 0);
        assert_eq!(financials.feedback, NOT_ASSESSED);
    }

    #[test]
    fn dimensions_accept_keyed_object_form() {
        let repaired = repair_response(
            &json!({"dimensions": {"marketSize": {"score": 9, "feedback": "Big"}}}),
            1,
        );
        let market = &repaired.dimensions[DimensionKey::MarketSize as usize];
        assert_eq!((market.score, market.feedback.as_str()), (9, "Big"));
    }

    #[test]
    fn missing_and_null_collections_become_empty() {
        let repaired = repair_response(
            &json!({"strengths": null, "weaknesses": "not a list", "redFlags": [1, " ", "No moat"]}),
            4,
        );
        assert!(repaired.strengths.is_empty());
        assert!(repaired.weaknesses.is_empty());
        assert_eq!(repaired.red_flags, vec!["No moat"]);
        assert!(repaired.priority_improvements.is_empty());
        assert!(repaired.slide_breakdown.is_empty());
        assert_eq!(repaired.extracted_metrics, ExtractedMetrics::default());
        assert_eq!(repaired.summary, "");
    }

    #[test]
    fn non_object_value_repairs_to_defaults() {
        let repaired = repair_response(&json!([1, 2, 3]), 2);
        assert_eq!(repaired.deck_quality_score, 0);
        assert_eq!(repaired.grade, Grade::F);
        assert_eq!(repaired.dimensions.len(), 12);
    }

    #[test]
    fn improvements_repair_impact_and_drop_untitled() {
        let repaired = repair_response(
            &json!({"priorityImprovements": [
                {"title": "Add financials", "description": "3-year plan", "impact": "HIGH"},
                {"title": "Tighten story", "impact": "critical"},
                {"description": "no title"}
            ]}),
            1,
        );
        assert_eq!(repaired.priority_improvements.len(), 2);
        assert_eq!(repaired.priority_improvements[0].impact, Impact::High);
        assert_eq!(repaired.priority_improvements[1].impact, Impact::Medium);
        assert_eq!(repaired.priority_improvements[1].description, "");
    }

    #[test]
    fn metrics_accept_strings_and_numbers() {
        let repaired = repair_response(
            &json!({"extractedMetrics": {
                "revenue": " $1.2M ARR ",
                "teamSize": 12,
                "users": "",
                "cac": true,
                "unknownMetric": "ignored"
            }}),
            1,
        );
        let m = &repaired.extracted_metrics;
        assert_eq!(m.revenue.as_deref(), Some("$1.2M ARR"));
        assert_eq!(m.team_size.as_deref(), Some("12"));
        assert_eq!(m.users, None);
        assert_eq!(m.cac, None);
    }

    #[test]
    fn slide_breakdown_is_bounded_and_sorted() {
        let repaired = repair_response(
            &json!({"slideBreakdown": [
                {"slideNumber": 3, "classifiedType": "team", "summary": "Founders"},
                {"slideNumber": 0, "classifiedType": "bogus"},
                {"slideNumber": 1, "classifiedType": "cover", "summary": "Title"},
                {"slideNumber": 9, "classifiedType": "overflow"}
            ]}),
            3,
        );
        let numbers: Vec<usize> = repaired.slide_breakdown.iter().map(|s| s.slide_number).collect();
        assert_eq!(numbers, vec![1, 3]);
        assert_eq!(repaired.slide_breakdown[0].classified_type, "cover");
    }

    #[test]
    fn repair_is_idempotent() {
        let messy = json!({
            "deckQualityScore": 250,
            "tractionScore": "33.3",
            "grade": "Z",
            "dimensions": [{"key": "solution", "score": 42}, {"key": "nope"}],
            "strengths": ["  Clear problem  ", 5],
            "priorityImprovements": [{"title": "Show traction", "impact": "urgent"}],
            "extractedMetrics": {"arr": 1500000},
            "slideBreakdown": [{"slideNumber": 2.2, "classifiedType": "problem"}],
            "summary": "  Promising.  "
        });
        let once = repair_response(&messy, 4);
        let twice = repair_response(&serde_json::to_value(&once).unwrap(), 4);
        assert_eq!(once, twice);
        assert_eq!(once.deck_quality_score, 100);
        assert_eq!(once.traction_score, 33);
        assert_eq!(once.grade, Grade::APlus);
        assert_eq!(once.slide_breakdown[0].slide_number, 2);
    }
}
