use crate::models::{
    Account, AccountId, CardStatus, CreditAnalysis, CreditCard, Loan, Transaction,
};
use anyhow::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// A committed change to one account. Applying the full event sequence in
/// order to an empty store reproduces its state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LedgerEvent {
    AccountOpened(Account),
    TransactionRecorded(Transaction),
    LoanIssued(Loan),
    LoanSettled {
        account_id: AccountId,
        loan_id: u64,
    },
    CreditAnalysed(CreditAnalysis),
    CreditLimitRaised {
        account_id: AccountId,
        credit_limit: Decimal,
    },
    CardIssued(CreditCard),
    CardStatusChanged {
        account_id: AccountId,
        status: CardStatus,
    },
}

impl LedgerEvent {
    pub fn account_id(&self) -> AccountId {
        match self {
            LedgerEvent::AccountOpened(account) => account.id,
            LedgerEvent::TransactionRecorded(tx) => tx.account_id,
            LedgerEvent::LoanIssued(loan) => loan.account_id,
            LedgerEvent::LoanSettled { account_id, .. } => *account_id,
            LedgerEvent::CreditAnalysed(analysis) => analysis.account_id,
            LedgerEvent::CreditLimitRaised { account_id, .. } => *account_id,
            LedgerEvent::CardIssued(card) => card.account_id,
            LedgerEvent::CardStatusChanged { account_id, .. } => *account_id,
        }
    }
}

/// Durable, append-only sink for committed events.
///
/// `append` must persist the whole batch or none of it: a batch is one
/// logical operation (a transfer writes both legs in a single batch).
#[async_trait]
pub trait Journal: Send + Sync {
    async fn append(&self, events: &[LedgerEvent]) -> Result<()>;
    async fn replay(&self) -> Result<Vec<LedgerEvent>>;
}

/// Process-local journal, nothing survives a restart.
#[derive(Default)]
pub struct MemoryJournal {
    events: RwLock<Vec<LedgerEvent>>,
}

impl MemoryJournal {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.events.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.events.read().await.is_empty()
    }
}

#[async_trait]
impl Journal for MemoryJournal {
    async fn append(&self, events: &[LedgerEvent]) -> Result<()> {
        let mut log = self.events.write().await;
        log.extend_from_slice(events);
        Ok(())
    }

    async fn replay(&self) -> Result<Vec<LedgerEvent>> {
        Ok(self.events.read().await.clone())
    }
}
