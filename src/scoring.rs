use crate::config::FallbackPolicy;
use crate::errors::ScoringError;
use crate::models::{CreditApplication, CreditStatus, DecisionSource};
use crate::money::round_money;
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::Duration;

pub const MAX_SCORE: i64 = 1000;

/// Decision as reported by a scoring provider, not yet trusted.
#[derive(Debug, Clone, Deserialize)]
pub struct RawDecision {
    pub status: String,
    pub score: i64,
    #[serde(alias = "ai_feedback")]
    pub feedback: String,
    #[serde(alias = "approvedLimit")]
    pub approved_limit: Decimal,
}

/// A validated decision, ready to be recorded.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreDecision {
    pub status: CreditStatus,
    pub score: u16,
    pub feedback: String,
    pub approved_limit: Decimal,
    pub source: DecisionSource,
}

impl RawDecision {
    pub fn validate(self) -> Result<ScoreDecision, ScoringError> {
        let status = CreditStatus::parse(&self.status)
            .ok_or_else(|| ScoringError::Malformed(format!("unknown status {:?}", self.status)))?;

        if !(0..=MAX_SCORE).contains(&self.score) {
            return Err(ScoringError::Malformed(format!("score {} out of range", self.score)));
        }

        if self.approved_limit < Decimal::ZERO {
            return Err(ScoringError::Malformed("negative approved limit".to_string()));
        }

        // Only an approval carries a limit
        let approved_limit = match status {
            CreditStatus::Approved => round_money(self.approved_limit),
            _ => round_money(Decimal::ZERO),
        };

        Ok(ScoreDecision {
            status,
            score: self.score as u16,
            feedback: self.feedback.trim().to_string(),
            approved_limit,
            source: DecisionSource::Scorer,
        })
    }
}

/// External credit-scoring capability. May be slow, down, or wrong.
#[async_trait]
pub trait CreditScorer: Send + Sync {
    async fn score_applicant(
        &self,
        application: &CreditApplication,
    ) -> Result<RawDecision, ScoringError>;
}

/// Used when no provider is configured; every application takes the fallback path.
pub struct OfflineScorer;

#[async_trait]
impl CreditScorer for OfflineScorer {
    async fn score_applicant(&self, _: &CreditApplication) -> Result<RawDecision, ScoringError> {
        Err(ScoringError::Unavailable("no scoring provider configured".to_string()))
    }
}

/// Source of free-text provider answers, e.g. a language-model completion.
#[async_trait]
pub trait PayloadSource: Send + Sync {
    async fn fetch(&self, application: &CreditApplication) -> Result<String, ScoringError>;
}

/// Scorer for providers that answer with a JSON object embedded in text.
pub struct JsonScorer<S> {
    source: S,
}

impl<S: PayloadSource> JsonScorer<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }
}

#[async_trait]
impl<S: PayloadSource> CreditScorer for JsonScorer<S> {
    async fn score_applicant(
        &self,
        application: &CreditApplication,
    ) -> Result<RawDecision, ScoringError> {
        let text = self.source.fetch(application).await?;
        parse_payload(&text)
    }
}

/// Parses a provider answer, tolerating Markdown code fences around the JSON.
pub fn parse_payload(text: &str) -> Result<RawDecision, ScoringError> {
    let cleaned = text.replace("```json", "").replace("```", "");
    serde_json::from_str(cleaned.trim()).map_err(|e| ScoringError::Malformed(e.to_string()))
}

pub fn fallback_decision(policy: &FallbackPolicy, application: &CreditApplication) -> ScoreDecision {
    if application.monthly_income > policy.income_threshold {
        let limit = round_money(application.monthly_income * policy.limit_ratio);
        ScoreDecision {
            status: CreditStatus::Approved,
            score: policy.approved_score,
            feedback: format!("Credit approved based on declared income (offline assessment). Limit: {limit}"),
            approved_limit: limit,
            source: DecisionSource::Fallback,
        }
    } else {
        ScoreDecision {
            status: CreditStatus::Rejected,
            score: policy.rejected_score,
            feedback: "Credit not approved at this time (offline assessment).".to_string(),
            approved_limit: round_money(Decimal::ZERO),
            source: DecisionSource::Fallback,
        }
    }
}

/// Asks the provider, falling back to the local policy on any failure. Always
/// yields a decision.
pub async fn decide(
    scorer: &dyn CreditScorer,
    application: &CreditApplication,
    timeout: Duration,
    policy: &FallbackPolicy,
) -> ScoreDecision {
    let outcome = match tokio::time::timeout(timeout, scorer.score_applicant(application)).await {
        Ok(Ok(raw)) => raw.validate(),
        Ok(Err(e)) => Err(e),
        Err(_) => Err(ScoringError::Timeout),
    };

    match outcome {
        Ok(decision) => decision,
        Err(e) => {
            tracing::warn!(error = %e, "Scoring unavailable, applying fallback policy");
            fallback_decision(policy, application)
        }
    }
}
