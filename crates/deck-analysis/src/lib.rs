pub mod analyzer;
pub mod api;
pub mod error;
pub mod model;
pub mod parser;
pub mod provider;
pub mod record;
pub mod response;
pub mod rubric;
pub mod rules;

pub use analyzer::{inspect_deck, DeckAnalyzer, DeckInspection};
pub use error::{AnalysisError, ErrorKind};
pub use model::{FullAnalysisResult, RuleCheckResult, Slide};
