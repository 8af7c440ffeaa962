use crate::account_store::AccountStore;
use crate::config::EngineConfig;
use crate::credit::CreditEngine;
use crate::errors::LedgerError;
use crate::event_store::FileJournal;
use crate::journal::{Journal, MemoryJournal};
use crate::ledger::Ledger;
use crate::loan::LoanEngine;
use crate::models::{Account, AccountId};
use crate::scoring::{CreditScorer, OfflineScorer};
use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;

/// One account store, its journal, and the engines operating on them.
#[derive(Clone)]
pub struct Bank {
    store: Arc<AccountStore>,
    journal: Arc<dyn Journal>,
    ledger: Ledger,
    loans: LoanEngine,
    credit: CreditEngine,
}

impl Bank {
    pub fn new(
        config: &EngineConfig,
        journal: Arc<dyn Journal>,
        scorer: Arc<dyn CreditScorer>,
    ) -> Self {
        let store = Arc::new(AccountStore::new(
            config.num_shards,
            config.lock_timeout(),
            journal.clone(),
        ));

        Self {
            ledger: Ledger::new(store.clone()),
            loans: LoanEngine::new(store.clone(), config.loan.clone()),
            credit: CreditEngine::new(
                store.clone(),
                scorer,
                config.card.clone(),
                config.fallback.clone(),
                config.scoring_timeout(),
            ),
            store,
            journal,
        }
    }

    /// Volatile bank with no scoring provider; credit runs on the fallback policy.
    pub fn in_memory(config: &EngineConfig) -> Self {
        Self::new(config, Arc::new(MemoryJournal::new()), Arc::new(OfflineScorer))
    }

    /// Bank backed by a journal file, with state rebuilt from it.
    pub async fn open(
        config: &EngineConfig,
        journal_path: PathBuf,
        scorer: Arc<dyn CreditScorer>,
    ) -> Result<Self> {
        let journal = Arc::new(FileJournal::open(journal_path).await?);
        let bank = Self::new(config, journal, scorer);
        bank.rebuild_from_events().await?;
        Ok(bank)
    }

    /// Rebuild state from the journal (on startup). Only valid on an empty store.
    pub async fn rebuild_from_events(&self) -> Result<usize> {
        if !self.store.accounts().await?.is_empty() {
            anyhow::bail!("cannot replay the journal into a populated store");
        }

        let events = self.journal.replay().await?;
        let count = self.store.restore(events).await?;
        tracing::info!(events = count, "Rebuilt ledger state from journal");
        Ok(count)
    }

    pub fn store(&self) -> &Arc<AccountStore> {
        &self.store
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn loans(&self) -> &LoanEngine {
        &self.loans
    }

    pub fn credit(&self) -> &CreditEngine {
        &self.credit
    }

    pub async fn open_account(&self, number: &str, owner: &str) -> Result<Account, LedgerError> {
        self.store.open_account(number, owner).await
    }

    pub async fn account(&self, id: AccountId) -> Result<Account, LedgerError> {
        self.store.account(id).await
    }

    pub async fn accounts(&self) -> Result<Vec<Account>, LedgerError> {
        self.store.accounts().await
    }
}
