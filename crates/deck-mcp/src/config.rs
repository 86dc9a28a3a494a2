use crate::error::AppError;

pub const DEFAULT_MAX_DECK_BYTES: u64 = 25 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct Config {
    pub max_deck_bytes: u64,
    pub rate_limit_per_min: Option<u32>,
    pub tcp_listen_addr: Option<String>,
}

impl Config {
    /// Optional:
    /// - `MAX_DECK_BYTES` (default: 25 MiB)
    /// - `ANALYZE_RATE_LIMIT_PER_MIN` (unset or 0: unlimited)
    /// - `MCP_TCP_LISTEN_ADDR` (serve MCP over TCP instead of stdio)
    ///
    /// AI provider settings are read separately by `ProviderConfig::from_env`.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let max_deck_bytes = match var("MAX_DECK_BYTES") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|&n| n > 0)
                .ok_or_else(|| {
                    AppError::Config(format!(
                        "MAX_DECK_BYTES must be a positive integer, got {raw:?}"
                    ))
                })?,
            None => DEFAULT_MAX_DECK_BYTES,
        };

        let rate_limit_per_min = match var("ANALYZE_RATE_LIMIT_PER_MIN") {
            Some(raw) => {
                let n = raw.trim().parse::<u32>().map_err(|_| {
                    AppError::Config(format!(
                        "ANALYZE_RATE_LIMIT_PER_MIN must be a non-negative integer, got {raw:?}"
                    ))
                })?;
                (n > 0).then_some(n)
            }
            None => None,
        };

        Ok(Self {
            max_deck_bytes,
            rate_limit_per_min,
            tcp_listen_addr: var("MCP_TCP_LISTEN_ADDR").filter(|s| !s.trim().is_empty()),
        })
    }
}
