use std::sync::Arc;

use rmcp::{
    Json, ServerHandler,
    handler::server::router::tool::ToolRouter,
    handler::server::wrapper::Parameters,
    model::*,
    tool, tool_handler, tool_router,
};
use tracing::{info, warn};

use deck_analysis::api::{
    AnalyzeDeckParams, CheckDeckParams, DeckCheckResponse, RubricResponse, effective_file_name,
};
use deck_analysis::parser::ParserRegistry;
use deck_analysis::provider::{AiBackend, AiProvider};
use deck_analysis::record::AnalysisRecord;
use deck_analysis::{DeckAnalyzer, inspect_deck};

use crate::config::Config;
use crate::error::AppError;
use crate::rate_limit::RateLimiter;

#[derive(Clone)]
pub struct DeckServer {
    /// `None` when the AI provider could not be configured at startup.
    analyzer: Option<Arc<DeckAnalyzer<AiBackend>>>,
    parsers: Arc<ParserRegistry>,
    config: Config,
    limiter: Option<RateLimiter>,
    tool_router: ToolRouter<DeckServer>,
}

impl DeckServer {
    pub fn new(analyzer: Option<DeckAnalyzer<AiBackend>>, config: Config) -> Self {
        let limiter = config.rate_limit_per_min.and_then(RateLimiter::new);
        let parsers = Arc::new(ParserRegistry::default());
        Self {
            analyzer: analyzer.map(|a| Arc::new(a.with_parsers(Arc::clone(&parsers)))),
            parsers,
            config,
            limiter,
            tool_router: Self::tool_router(),
        }
    }

    /// Resolve the file name, reject unknown formats before touching the file,
    /// then read it within the size limit.
    async fn load_deck(&self, path: &str, file_name: Option<&str>) -> Result<(String, Vec<u8>), AppError> {
        let path = path.trim();
        if path.is_empty() {
            return Err(AppError::InvalidRequest("path must not be empty".to_string()));
        }
        let file_name = effective_file_name(path, file_name);
        self.parsers.parser_for(&file_name)?;

        let io_err = |source| AppError::Io {
            path: path.to_string(),
            source,
        };
        let size = tokio::fs::metadata(path).await.map_err(io_err)?.len();
        if size > self.config.max_deck_bytes {
            return Err(AppError::TooLarge {
                size,
                limit: self.config.max_deck_bytes,
            });
        }
        let bytes = tokio::fs::read(path).await.map_err(io_err)?;
        Ok((file_name, bytes))
    }
}

fn reject(tool: &str, err: AppError) -> String {
    warn!(tool, error = %err, "tool call failed");
    err.user_message()
}

#[tool_router]
impl DeckServer {
    #[tool(description = "Analyze a pitch deck (.pdf or .pptx) at a server-readable path. Scores 12 rubric dimensions with the configured AI provider, runs structural checks, and returns the full stored analysis record.")]
    async fn analyze_deck(
        &self,
        Parameters(params): Parameters<AnalyzeDeckParams>,
    ) -> Result<Json<AnalysisRecord>, String> {
        let Some(analyzer) = &self.analyzer else {
            return Err("analysis service unavailable".to_string());
        };
        let (file_name, bytes) = self
            .load_deck(&params.path, params.file_name.as_deref())
            .await
            .map_err(|e| reject("analyze_deck", e))?;

        // Only requests that reach the provider spend a token.
        if let Some(limiter) = &self.limiter {
            limiter.check().await?;
        }

        let record = analyzer
            .analyze_record(&bytes, &file_name)
            .await
            .map_err(|e| reject("analyze_deck", e.into()))?;

        info!(
            file_name = %record.file_name,
            sha256 = %record.document_sha256,
            provider = analyzer.provider().name(),
            score = record.result.analysis.deck_quality_score,
            "analysis complete"
        );
        Ok(Json(record))
    }

    #[tool(description = "Extract slides from a pitch deck (.pdf or .pptx) and run the deterministic structural checks only (slide count, text density, buzzwords, contact info, quantitative data, missing sections). No AI call.")]
    async fn check_deck(
        &self,
        Parameters(params): Parameters<CheckDeckParams>,
    ) -> Result<Json<DeckCheckResponse>, String> {
        let (file_name, bytes) = self
            .load_deck(&params.path, params.file_name.as_deref())
            .await
            .map_err(|e| reject("check_deck", e))?;

        let inspection = inspect_deck(&self.parsers, &bytes, &file_name)
            .map_err(|e| reject("check_deck", e.into()))?;

        Ok(Json(DeckCheckResponse {
            file_name,
            slides: inspection.slides,
            rule_checks: inspection.rule_checks,
        }))
    }

    #[tool(description = "Return the scoring rubric: the 12 dimensions with their criteria, and the letter-grade bands for the overall deck quality score.")]
    async fn get_rubric(&self) -> Result<Json<RubricResponse>, String> {
        Ok(Json(RubricResponse::current()))
    }
}

#[tool_handler]
impl ServerHandler for DeckServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_06_18,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "deck-mcp".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                title: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Pitch deck analysis server. Use check_deck for a fast structural review with no \
AI call, analyze_deck for a full rubric-scored analysis, and get_rubric to see how decks are scored."
                    .to_string(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use deck_analysis::provider::ProviderConfig;

    use super::*;

    fn unreachable_analyzer() -> DeckAnalyzer<AiBackend> {
        let config = ProviderConfig::from_vars(|name| match name {
            "GEMINI_API_KEY" => Some("test-key".to_string()),
            "GEMINI_BASE_URL" => Some("http://127.0.0.1:9".to_string()),
            _ => None,
        })
        .expect("provider config");
        DeckAnalyzer::new(AiBackend::from_config(&config).expect("backend"))
    }

    fn server(max_deck_bytes: u64) -> DeckServer {
        DeckServer::new(
            None,
            Config {
                max_deck_bytes,
                rate_limit_per_min: None,
                tcp_listen_addr: None,
            },
        )
    }

    fn temp_file(name: &str, contents: &[u8]) -> PathBuf {
        let path = std::env::temp_dir().join(format!("deck-mcp-{}-{name}", std::process::id()));
        std::fs::write(&path, contents).expect("write temp file");
        path
    }

    fn check_params(path: &str, file_name: Option<&str>) -> Parameters<CheckDeckParams> {
        Parameters(CheckDeckParams {
            path: path.to_string(),
            file_name: file_name.map(str::to_string),
        })
    }

    #[test]
    fn tools_publish_output_schemas() {
        let tools = DeckServer::tool_router().list_all();
        for name in ["analyze_deck", "check_deck", "get_rubric"] {
            let tool = tools
                .iter()
                .find(|t| t.name == name)
                .unwrap_or_else(|| panic!("missing tool: {name}"));
            assert!(
                tool.output_schema.is_some(),
                "tool {name} should publish output_schema"
            );
        }
    }

    #[tokio::test]
    async fn analyze_reports_unavailable_without_provider() {
        let err = server(1024)
            .analyze_deck(Parameters(AnalyzeDeckParams {
                path: "/nonexistent/deck.pdf".to_string(),
                file_name: None,
            }))
            .await
            .err()
            .expect("tool call should fail");
        assert_eq!(err, "analysis service unavailable");
    }

    #[tokio::test]
    async fn unsupported_format_is_rejected_before_reading() {
        let err = server(1024)
            .check_deck(check_params("/nonexistent/notes.txt", None))
            .await
            .err()
            .expect("tool call should fail");
        assert!(err.contains("unsupported file type: .txt"), "{err}");
    }

    #[tokio::test]
    async fn missing_file_is_reported() {
        let err = server(1024)
            .check_deck(check_params("/nonexistent/deck.pdf", None))
            .await
            .err()
            .expect("tool call should fail");
        assert!(err.starts_with("could not read /nonexistent/deck.pdf"), "{err}");
    }

    #[tokio::test]
    async fn oversized_file_is_rejected() {
        let path = temp_file("big.pdf", &[b'%'; 64]);
        let err = server(16)
            .check_deck(check_params(path.to_str().unwrap(), None))
            .await
            .err()
            .expect("tool call should fail");
        let _ = std::fs::remove_file(&path);
        assert_eq!(err, "file is 64 bytes, above the 16-byte limit");
    }

    #[tokio::test]
    async fn file_name_override_drives_format_detection() {
        let path = temp_file("upload.bin", b"not really a pdf");
        let err = server(1024)
            .check_deck(check_params(path.to_str().unwrap(), Some("deck.pdf")))
            .await
            .err()
            .expect("tool call should fail");
        let _ = std::fs::remove_file(&path);
        assert!(err.starts_with("could not read document"), "{err}");
    }

    #[tokio::test]
    async fn rubric_is_available_without_provider() {
        let Json(rubric) = server(1024).get_rubric().await.unwrap();
        assert_eq!(rubric.dimensions.len(), 12);
        assert_eq!(rubric.grades.len(), 11);
    }

    #[tokio::test]
    async fn rejected_requests_do_not_spend_rate_limit_tokens() {
        let server = DeckServer::new(
            Some(unreachable_analyzer()),
            Config {
                max_deck_bytes: 1024,
                rate_limit_per_min: Some(1),
                tcp_listen_addr: None,
            },
        );
        let params = |path: &str| {
            Parameters(AnalyzeDeckParams {
                path: path.to_string(),
                file_name: None,
            })
        };

        for path in ["/nonexistent/notes.txt", "/nonexistent/deck.pdf", "  "] {
            let err = server
                .analyze_deck(params(path))
                .await
                .err()
                .expect("tool call should fail");
            assert!(!err.contains("rate limit"), "{path}: {err}");
        }
        let limiter = server.limiter.as_ref().expect("limiter configured");
        assert!(limiter.check().await.is_ok());
    }

    #[test]
    fn analyzer_and_check_path_share_one_registry() {
        let server = DeckServer::new(Some(unreachable_analyzer()), server(1024).config);
        assert_eq!(Arc::strong_count(&server.parsers), 2);
    }
}
