pub mod config;
pub mod indicators;
pub mod message;
pub mod parser;
pub mod pipeline;
pub mod report;
pub mod scoring;
pub mod urls;

pub use config::{RiskThresholds, RulesConfig, ScoreWeights};
pub use indicators::{AuthResults, IndicatorExtractor, Indicators, UrlDetail};
pub use message::{Attachment, NormalizedMessage};
pub use parser::{MessageNormalizer, ParseError};
pub use pipeline::{TriagePipeline, TriageResult};
pub use scoring::{RiskLevel, RiskScorer, RuleHit, ScoreResult};
