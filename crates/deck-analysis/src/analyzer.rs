//! End-to-end pipeline: parse, rule-check, prompt, call the model, repair, merge.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{error, info};

use crate::error::AnalysisError;
use crate::model::{FullAnalysisResult, RuleCheckResult, Slide};
use crate::parser::ParserRegistry;
use crate::provider::{AiProvider, ProviderError};
use crate::record::AnalysisRecord;
use crate::response::parse_ai_response;
use crate::rubric::{build_system_prompt, build_user_prompt};
use crate::rules::run_rule_checks;

pub const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(60);

/// The deterministic half of an analysis: slides plus rule checks, no AI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeckInspection {
    pub slides: Vec<Slide>,
    pub rule_checks: RuleCheckResult,
}

/// Parse with `parsers` and run the rule checks. Zero slides is an error.
pub fn inspect_deck(
    parsers: &ParserRegistry,
    bytes: &[u8],
    file_name: &str,
) -> Result<DeckInspection, AnalysisError> {
    let slides = parsers.parse(bytes, file_name)?;
    if slides.is_empty() {
        return Err(AnalysisError::EmptyDocument);
    }
    let rule_checks = run_rule_checks(&slides);
    Ok(DeckInspection {
        slides,
        rule_checks,
    })
}

pub struct DeckAnalyzer<P> {
    provider: P,
    parsers: Arc<ParserRegistry>,
    timeout: Duration,
}

impl<P: AiProvider> DeckAnalyzer<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            parsers: Arc::new(ParserRegistry::default()),
            timeout: DEFAULT_PROVIDER_TIMEOUT,
        }
    }

    /// Upper bound on the provider call; elapsing counts as a provider failure.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Share a registry with other callers, e.g. a provider-free check path.
    pub fn with_parsers(mut self, parsers: Arc<ParserRegistry>) -> Self {
        self.parsers = parsers;
        self
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Parse and rule-check without touching the provider.
    pub fn inspect(&self, bytes: &[u8], file_name: &str) -> Result<DeckInspection, AnalysisError> {
        inspect_deck(&self.parsers, bytes, file_name)
    }

    pub async fn analyze_deck(
        &self,
        bytes: &[u8],
        file_name: &str,
    ) -> Result<FullAnalysisResult, AnalysisError> {
        let DeckInspection {
            slides,
            rule_checks,
        } = self.inspect(bytes, file_name)?;
        self.score(&slides, rule_checks).await
    }

    /// Run everything after parsing for callers that already hold slides.
    pub async fn analyze_slides(&self, slides: &[Slide]) -> Result<FullAnalysisResult, AnalysisError> {
        if slides.is_empty() {
            return Err(AnalysisError::EmptyDocument);
        }
        self.score(slides, run_rule_checks(slides)).await
    }

    /// [`DeckAnalyzer::analyze_deck`] wrapped in a storable envelope.
    pub async fn analyze_record(
        &self,
        bytes: &[u8],
        file_name: &str,
    ) -> Result<AnalysisRecord, AnalysisError> {
        let result = self.analyze_deck(bytes, file_name).await?;
        Ok(AnalysisRecord::new(
            bytes,
            file_name,
            self.provider.name(),
            self.provider.model(),
            result,
        ))
    }

    async fn score(
        &self,
        slides: &[Slide],
        rule_checks: RuleCheckResult,
    ) -> Result<FullAnalysisResult, AnalysisError> {
        let system_prompt = build_system_prompt();
        let user_prompt = build_user_prompt(slides);

        let started = Instant::now();
        let raw = tokio::time::timeout(
            self.timeout,
            self.provider.analyze(&system_prompt, &user_prompt),
        )
        .await
        .map_err(|_| ProviderError::Timeout(self.timeout))??;

        let analysis = parse_ai_response(&raw, slides.len()).inspect_err(|e| {
            if let AnalysisError::MalformedAiResponse { message, raw } = e {
                error!(
                    provider = self.provider.name(),
                    model = self.provider.model(),
                    error = %message,
                    raw = %raw,
                    "unusable model response"
                );
            }
        })?;

        info!(
            provider = self.provider.name(),
            model = self.provider.model(),
            slides = slides.len(),
            score = analysis.deck_quality_score,
            grade = %analysis.grade,
            warnings = rule_checks.warnings.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "deck analyzed"
        );

        Ok(FullAnalysisResult {
            analysis,
            rule_checks,
        })
    }
}
