use crate::account_store::AccountStore;
use crate::config::{CardPolicy, FallbackPolicy};
use crate::errors::LedgerError;
use crate::journal::LedgerEvent;
use crate::models::{
    AccountId, CardStatus, CreditAnalysis, CreditApplication, CreditCard, CreditStatus,
};
use crate::money::{fit_money, MONEY_SCALE};
use crate::scoring::{decide, CreditScorer};
use chrono::{Datelike, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;

const CARD_VALIDITY_YEARS: i32 = 4;

/// Outcome of a card request. Asking again once a card exists is not an
/// error; the existing card comes back unchanged.
#[derive(Debug, Clone, PartialEq)]
pub enum CardIssuance {
    Issued(CreditCard),
    AlreadyIssued(CreditCard),
}

impl CardIssuance {
    pub fn card(&self) -> &CreditCard {
        match self {
            CardIssuance::Issued(card) | CardIssuance::AlreadyIssued(card) => card,
        }
    }

    pub fn into_card(self) -> CreditCard {
        match self {
            CardIssuance::Issued(card) | CardIssuance::AlreadyIssued(card) => card,
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self, CardIssuance::Issued(_))
    }
}

/// Credit limits from scoring, and card issuance from score plus activity.
#[derive(Clone)]
pub struct CreditEngine {
    store: Arc<AccountStore>,
    scorer: Arc<dyn CreditScorer>,
    card_policy: CardPolicy,
    fallback_policy: FallbackPolicy,
    scoring_timeout: Duration,
}

impl CreditEngine {
    pub fn new(
        store: Arc<AccountStore>,
        scorer: Arc<dyn CreditScorer>,
        card_policy: CardPolicy,
        fallback_policy: FallbackPolicy,
        scoring_timeout: Duration,
    ) -> Self {
        Self {
            store,
            scorer,
            card_policy,
            fallback_policy,
            scoring_timeout,
        }
    }

    /// Scores the application and records the decision. An approval raises
    /// the credit limit to the approved value but never lowers it.
    pub async fn apply_for_credit(
        &self,
        account_id: AccountId,
        application: CreditApplication,
    ) -> Result<CreditAnalysis, LedgerError> {
        validate_application(&application)?;

        // Fail fast on unknown accounts before paying for a provider call
        self.store.account(account_id).await?;

        // No row lock is held while the provider is consulted
        let decision = decide(
            self.scorer.as_ref(),
            &application,
            self.scoring_timeout,
            &self.fallback_policy,
        )
        .await;

        let locks = self.store.lock_account(account_id).await?;
        let current_limit = locks.row(account_id)?.account.credit_limit;

        let analysis = CreditAnalysis {
            id: self.store.next_record_id(),
            account_id,
            application,
            status: decision.status,
            score: decision.score,
            feedback: decision.feedback,
            approved_limit: decision.approved_limit,
            source: decision.source,
            created_at: Utc::now(),
        };

        let mut events = vec![LedgerEvent::CreditAnalysed(analysis.clone())];
        if analysis.status == CreditStatus::Approved && analysis.approved_limit > current_limit {
            events.push(LedgerEvent::CreditLimitRaised {
                account_id,
                credit_limit: analysis.approved_limit,
            });
        }

        self.store.commit(locks, events).await?;

        tracing::info!(
            account_id,
            status = ?analysis.status,
            score = analysis.score,
            source = ?analysis.source,
            "Credit application decided"
        );
        Ok(analysis)
    }

    /// Most recent analysis, if the account ever applied.
    pub async fn credit_status(
        &self,
        account_id: AccountId,
    ) -> Result<Option<CreditAnalysis>, LedgerError> {
        let row = self.store.read_row(account_id).await?;
        Ok(row.latest_analysis().cloned())
    }

    pub async fn request_credit_card(
        &self,
        account_id: AccountId,
    ) -> Result<CardIssuance, LedgerError> {
        let locks = self.store.lock_account(account_id).await?;
        let row = locks.row(account_id)?;

        if let Some(card) = &row.card {
            return Ok(CardIssuance::AlreadyIssued(card.clone()));
        }

        let required = self.card_policy.min_score;
        match row.latest_analysis() {
            None => return Err(LedgerError::ScoreTooLow { score: None, required }),
            Some(analysis) if analysis.score < required => {
                return Err(LedgerError::ScoreTooLow {
                    score: Some(analysis.score),
                    required,
                })
            }
            Some(_) => {}
        }

        let movement = row.movement();
        if movement < self.card_policy.min_movement {
            return Err(LedgerError::InsufficientActivity {
                movement,
                required: self.card_policy.min_movement,
            });
        }

        let movement_limit = movement
            .checked_mul(self.card_policy.movement_limit_ratio)
            .unwrap_or(Decimal::MAX);
        let limit = fit_money(row.account.credit_limit.max(movement_limit))?;

        let card = generate_card(self.store.next_record_id(), account_id, limit);
        self.store
            .commit(locks, vec![LedgerEvent::CardIssued(card.clone())])
            .await?;

        tracing::info!(account_id, card_id = card.id, limit = %card.limit, "Credit card issued");
        Ok(CardIssuance::Issued(card))
    }

    pub async fn card(&self, account_id: AccountId) -> Result<CreditCard, LedgerError> {
        self.store
            .read_row(account_id)
            .await?
            .card
            .ok_or(LedgerError::CardNotFound)
    }

    /// Flips between active and blocked.
    pub async fn toggle_card_block(&self, account_id: AccountId) -> Result<CreditCard, LedgerError> {
        let locks = self.store.lock_account(account_id).await?;

        let mut card = locks
            .row(account_id)?
            .card
            .clone()
            .ok_or(LedgerError::CardNotFound)?;
        card.status = card.status.toggled();

        self.store
            .commit(
                locks,
                vec![LedgerEvent::CardStatusChanged {
                    account_id,
                    status: card.status,
                }],
            )
            .await?;

        tracing::info!(account_id, status = ?card.status, "Card status changed");
        Ok(card)
    }

    pub async fn reveal_cvv(&self, account_id: AccountId) -> Result<String, LedgerError> {
        Ok(self.card(account_id).await?.cvv)
    }
}

fn validate_application(application: &CreditApplication) -> Result<(), LedgerError> {
    let invalid = |reason: &str| -> Result<(), LedgerError> {
        Err(LedgerError::InvalidApplication(reason.to_string()))
    };

    if application.age == 0 {
        return invalid("age must be positive");
    }
    if application.maternal_name.trim().is_empty() {
        return invalid("maternal name is required");
    }
    if application.monthly_income <= Decimal::ZERO
        || application.monthly_income.normalize().scale() > MONEY_SCALE
    {
        return invalid("monthly income must be a positive amount");
    }
    if application.assets_value < Decimal::ZERO
        || application.assets_value.normalize().scale() > MONEY_SCALE
    {
        return invalid("assets value must not be negative");
    }
    Ok(())
}

fn generate_card(id: u64, account_id: AccountId, limit: Decimal) -> CreditCard {
    let mut rng = rand::thread_rng();
    let last_digits: u16 = rng.gen_range(1000..=9999);
    let cvv: u16 = rng.gen_range(0..=999);

    let now = Utc::now();
    let expiry = format!(
        "{:02}/{:02}",
        now.month(),
        (now.year() + CARD_VALIDITY_YEARS) % 100
    );

    CreditCard {
        id,
        account_id,
        number: format!("**** **** **** {last_digits}"),
        cvv: format!("{cvv:03}"),
        expiry,
        limit,
        status: CardStatus::Active,
        created_at: now,
    }
}
