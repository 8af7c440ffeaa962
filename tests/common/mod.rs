#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use banking_ledger::event_store::FileJournal;
use banking_ledger::scoring::RawDecision;
use banking_ledger::{
    Account, AccountId, Bank, CreditApplication, CreditScorer, EngineConfig, Journal, LedgerEvent,
    MemoryJournal, ScoringError, Transaction,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Scorer answering every application with the same decision.
pub struct StubScorer {
    pub status: &'static str,
    pub score: i64,
    pub approved_limit: Decimal,
}

#[async_trait]
impl CreditScorer for StubScorer {
    async fn score_applicant(&self, _: &CreditApplication) -> Result<RawDecision, ScoringError> {
        Ok(RawDecision {
            status: self.status.to_string(),
            score: self.score,
            feedback: "stub decision".to_string(),
            approved_limit: self.approved_limit,
        })
    }
}

pub struct FailingScorer;

#[async_trait]
impl CreditScorer for FailingScorer {
    async fn score_applicant(&self, _: &CreditApplication) -> Result<RawDecision, ScoringError> {
        Err(ScoringError::Unavailable("connection refused".to_string()))
    }
}

pub struct SlowScorer;

#[async_trait]
impl CreditScorer for SlowScorer {
    async fn score_applicant(&self, _: &CreditApplication) -> Result<RawDecision, ScoringError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Err(ScoringError::Timeout)
    }
}

/// Memory journal whose appends can be switched off to simulate a storage outage.
#[derive(Default)]
pub struct FlakyJournal {
    inner: MemoryJournal,
    failing: AtomicBool,
}

impl FlakyJournal {
    pub fn fail(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl Journal for FlakyJournal {
    async fn append(&self, events: &[LedgerEvent]) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            anyhow::bail!("disk full");
        }
        self.inner.append(events).await
    }

    async fn replay(&self) -> Result<Vec<LedgerEvent>> {
        self.inner.replay().await
    }
}

/// File journal that, while failing, leaves the first half of a batch on
/// disk before reporting the error, like a write cut short by a full disk.
pub struct TornJournal {
    inner: FileJournal,
    path: PathBuf,
    failing: AtomicBool,
}

impl TornJournal {
    pub async fn open(path: PathBuf) -> Self {
        Self {
            inner: FileJournal::open(path.clone()).await.unwrap(),
            path,
            failing: AtomicBool::new(false),
        }
    }

    pub fn fail(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl Journal for TornJournal {
    async fn append(&self, events: &[LedgerEvent]) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            let line = serde_json::to_vec(events)?;
            let mut file = std::fs::OpenOptions::new().append(true).open(&self.path)?;
            file.write_all(&line[..line.len() / 2])?;
            anyhow::bail!("no space left on device");
        }
        self.inner.append(events).await
    }

    async fn replay(&self) -> Result<Vec<LedgerEvent>> {
        self.inner.replay().await
    }
}

pub fn bank_with_scorer(scorer: impl CreditScorer + 'static) -> Bank {
    Bank::new(
        &EngineConfig::default(),
        Arc::new(MemoryJournal::new()),
        Arc::new(scorer),
    )
}

pub async fn open(bank: &Bank, number: &str) -> Account {
    bank.open_account(number, &format!("user-{number}"))
        .await
        .unwrap()
}

pub async fn funded(bank: &Bank, number: &str, amount: Decimal) -> AccountId {
    let account = open(bank, number).await;
    bank.ledger()
        .deposit(account.id, amount, "Salário")
        .await
        .unwrap();
    account.id
}

pub fn application(monthly_income: Decimal) -> CreditApplication {
    CreditApplication {
        age: 34,
        maternal_name: "Ana Souza".to_string(),
        monthly_income,
        assets_value: dec!(25000),
    }
}

/// Folds the history oldest-first from zero and checks every snapshot.
pub fn assert_replays(statement: &[Transaction]) {
    let mut balance = Decimal::ZERO;
    for tx in statement.iter().rev() {
        balance += tx.tx_type.signed(tx.amount);
        assert_eq!(balance, tx.balance_after, "replay diverged at tx {}", tx.id);
    }
}
