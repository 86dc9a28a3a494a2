//! Request and response shapes shared with tool front-ends.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::model::{Grade, RuleCheckResult, Slide};
use crate::rubric::DIMENSIONS;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AnalyzeDeckParams {
    /// Path to a .pdf or .pptx file readable by the server.
    pub path: String,
    /// Name used for format detection and the stored record. Defaults to the
    /// last component of `path`.
    #[serde(default)]
    pub file_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CheckDeckParams {
    /// Path to a .pdf or .pptx file readable by the server.
    pub path: String,
    #[serde(default)]
    pub file_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeckCheckResponse {
    pub file_name: String,
    pub slides: Vec<Slide>,
    pub rule_checks: RuleCheckResult,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RubricDimension {
    pub key: String,
    pub label: String,
    pub description: String,
    pub criteria: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GradeBand {
    pub grade: Grade,
    pub min_score: u8,
    pub max_score: u8,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RubricResponse {
    pub dimensions: Vec<RubricDimension>,
    pub grades: Vec<GradeBand>,
}

impl RubricResponse {
    pub fn current() -> Self {
        Self {
            dimensions: DIMENSIONS
                .iter()
                .map(|d| RubricDimension {
                    key: d.key.as_str().to_string(),
                    label: d.label.to_string(),
                    description: d.description.to_string(),
                    criteria: d.criteria.to_string(),
                })
                .collect(),
            grades: Grade::ALL
                .into_iter()
                .map(|g| GradeBand {
                    grade: g,
                    min_score: g.min_score(),
                    max_score: g.max_score(),
                    description: g.description().to_string(),
                })
                .collect(),
        }
    }
}

/// `file_name` if given and non-blank, else the last path component of `path`.
pub fn effective_file_name(path: &str, file_name: Option<&str>) -> String {
    match file_name.map(str::trim).filter(|s| !s.is_empty()) {
        Some(name) => name.to_string(),
        None => path
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(path)
            .to_string(),
    }
}
