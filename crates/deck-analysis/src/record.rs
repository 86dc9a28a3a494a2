//! Envelope for a stored analysis.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::model::FullAnalysisResult;

/// Bump when the record layout changes incompatibly.
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRecord {
    pub schema_version: u32,
    pub file_name: String,
    /// Lowercase hex SHA-256 of the analyzed bytes.
    pub document_sha256: String,
    /// Unix seconds.
    pub analyzed_at: u64,
    pub provider: String,
    pub model: String,
    pub result: FullAnalysisResult,
}

impl AnalysisRecord {
    pub fn new(
        bytes: &[u8],
        file_name: &str,
        provider: &str,
        model: &str,
        result: FullAnalysisResult,
    ) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            file_name: file_name.to_string(),
            document_sha256: document_digest(bytes),
            analyzed_at: unix_now(),
            provider: provider.to_string(),
            model: model.to_string(),
            result,
        }
    }
}

pub fn document_digest(bytes: &[u8]) -> String {
    let mut h = Sha256::new();
    h.update(bytes);
    hex_lower(&h.finalize())
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_else(|_| Duration::from_secs(0))
        .as_secs()
}

fn hex_lower(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for &b in bytes {
        out.push(HEX[(b >> 4) as usize] as char);
        out.push(HEX[(b & 0x0f) as usize] as char);
    }
    out
}
