use crate::errors::LedgerError;
use crate::journal::{Journal, LedgerEvent};
use crate::models::{
    Account, AccountId, CreditAnalysis, CreditCard, Loan, LoanStatus, Transaction,
};
use anyhow::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

/// Everything owned by one account. The whole row sits behind the account's
/// lock, so balance changes and history appends commit together.
#[derive(Debug, Clone)]
pub struct AccountRow {
    pub account: Account,
    pub transactions: Vec<Transaction>,
    pub loans: Vec<Loan>,
    pub analyses: Vec<CreditAnalysis>,
    pub card: Option<CreditCard>,
}

impl AccountRow {
    fn new(account: Account) -> Self {
        Self {
            account,
            transactions: Vec::new(),
            loans: Vec::new(),
            analyses: Vec::new(),
            card: None,
        }
    }

    /// Most recent credit analysis; authoritative for score and limit.
    pub fn latest_analysis(&self) -> Option<&CreditAnalysis> {
        self.analyses.last()
    }

    /// Total volume recorded against the account, regardless of direction.
    /// Saturates instead of overflowing.
    pub fn movement(&self) -> Decimal {
        self.transactions
            .iter()
            .try_fold(Decimal::ZERO, |total, tx| total.checked_add(tx.amount))
            .unwrap_or(Decimal::MAX)
    }

    fn apply(&mut self, event: &LedgerEvent) {
        match event {
            LedgerEvent::AccountOpened(_) => {}
            LedgerEvent::TransactionRecorded(tx) => {
                self.account.balance = tx.balance_after;
                self.transactions.push(tx.clone());
            }
            LedgerEvent::LoanIssued(loan) => self.loans.push(loan.clone()),
            LedgerEvent::LoanSettled { loan_id, .. } => {
                if let Some(loan) = self.loans.iter_mut().find(|l| l.id == *loan_id) {
                    loan.status = LoanStatus::Paid;
                }
            }
            LedgerEvent::CreditAnalysed(analysis) => self.analyses.push(analysis.clone()),
            LedgerEvent::CreditLimitRaised { credit_limit, .. } => {
                self.account.credit_limit = *credit_limit;
            }
            LedgerEvent::CardIssued(card) => self.card = Some(card.clone()),
            LedgerEvent::CardStatusChanged { status, .. } => {
                if let Some(card) = self.card.as_mut() {
                    card.status = *status;
                }
            }
        }
    }
}

type RowHandle = Arc<Mutex<AccountRow>>;

struct Shard {
    rows: HashMap<AccountId, RowHandle>,
}

#[derive(Default)]
struct Directory {
    by_number: HashMap<String, AccountId>,
    by_owner: HashMap<String, AccountId>,
}

/// Maps an authenticated caller to the single account they own.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    async fn resolve(&self, owner: &str) -> Option<AccountId>;
}

/// Row locks held for the duration of one operation. Dropping the value
/// releases every lock, on commit and on early return alike.
pub struct AccountLocks {
    guards: BTreeMap<AccountId, OwnedMutexGuard<AccountRow>>,
}

impl AccountLocks {
    pub fn row(&self, id: AccountId) -> Result<&AccountRow, LedgerError> {
        self.guards
            .get(&id)
            .map(|guard| &**guard)
            .ok_or(LedgerError::AccountNotFound(id))
    }

    /// Locked ids in acquisition order.
    pub fn ids(&self) -> Vec<AccountId> {
        self.guards.keys().copied().collect()
    }
}

/// Sharded account index with per-account row locks.
pub struct AccountStore {
    shards: Arc<[RwLock<Shard>]>,
    directory: Arc<RwLock<Directory>>,
    journal: Arc<dyn Journal>,
    lock_timeout: Duration,
    next_account_id: AtomicU64,
    next_record_id: AtomicU64,
}

impl AccountStore {
    pub fn new(num_shards: usize, lock_timeout: Duration, journal: Arc<dyn Journal>) -> Self {
        let shards = (0..num_shards.max(1))
            .map(|_| {
                RwLock::new(Shard {
                    rows: HashMap::new(),
                })
            })
            .collect();

        Self {
            shards,
            directory: Arc::new(RwLock::new(Directory::default())),
            journal,
            lock_timeout,
            next_account_id: AtomicU64::new(1),
            next_record_id: AtomicU64::new(1),
        }
    }

    async fn handle(&self, id: AccountId) -> Option<RowHandle> {
        shard_for(&self.shards, id).read().await.rows.get(&id).cloned()
    }

    /// Allocates an id for a transaction, loan, analysis or card record.
    pub fn next_record_id(&self) -> u64 {
        self.next_record_id.fetch_add(1, Ordering::Relaxed)
    }

    pub async fn open_account(&self, number: &str, owner: &str) -> Result<Account, LedgerError> {
        // Held across the journal write so two opens cannot claim the same number
        let mut directory = Arc::clone(&self.directory).write_owned().await;

        if directory.by_number.contains_key(number) || directory.by_owner.contains_key(owner) {
            return Err(LedgerError::DuplicateAccount);
        }

        let id = self.next_account_id.fetch_add(1, Ordering::Relaxed);
        let account = Account::new(id, number.to_string(), owner.to_string());

        // Journal write and indexing run to completion even if the caller
        // stops waiting; an opened account is never left out of the index
        let journal = Arc::clone(&self.journal);
        let shards = Arc::clone(&self.shards);
        let opened = account.clone();
        let task = tokio::spawn(async move {
            journal
                .append(&[LedgerEvent::AccountOpened(opened.clone())])
                .await?;
            directory.by_number.insert(opened.number.clone(), opened.id);
            directory.by_owner.insert(opened.owner.clone(), opened.id);
            insert_row(&shards, opened).await;
            anyhow::Ok(())
        });

        if let Err(e) = joined(task.await) {
            tracing::error!(account_id = id, error = ?e, "Failed to journal account opening");
            return Err(LedgerError::Storage);
        }

        tracing::info!(account_id = id, number = %account.number, "Account opened");
        Ok(account)
    }

    /// Unlocked lookup. Only good for routing; never for balance decisions.
    pub async fn resolve_number(&self, number: &str) -> Option<AccountId> {
        self.directory.read().await.by_number.get(number).copied()
    }

    pub async fn account_for_owner(&self, owner: &str) -> Option<AccountId> {
        self.directory.read().await.by_owner.get(owner).copied()
    }

    /// Locks every listed account in ascending id order, whatever order the
    /// caller gave. Fails with `Busy` if any lock is not granted within the
    /// timeout; locks taken so far are released on that path.
    pub async fn lock_accounts(
        &self,
        ids: impl IntoIterator<Item = AccountId>,
    ) -> Result<AccountLocks, LedgerError> {
        let ordered: BTreeSet<AccountId> = ids.into_iter().collect();
        let mut guards = BTreeMap::new();

        for id in ordered {
            let handle = self
                .handle(id)
                .await
                .ok_or(LedgerError::AccountNotFound(id))?;

            let guard = tokio::time::timeout(self.lock_timeout, handle.lock_owned())
                .await
                .map_err(|_| {
                    tracing::warn!(account_id = id, timeout = ?self.lock_timeout, "Row lock wait exceeded");
                    LedgerError::Busy
                })?;

            guards.insert(id, guard);
        }

        Ok(AccountLocks { guards })
    }

    pub async fn lock_account(&self, id: AccountId) -> Result<AccountLocks, LedgerError> {
        self.lock_accounts([id]).await
    }

    /// Persists the batch, then applies it to the locked rows, releasing the
    /// locks afterwards. Nothing is applied if the journal rejects the batch.
    ///
    /// The locks move into a spawned task that owns both steps, so dropping
    /// the returned future cannot leave a journaled batch unapplied.
    pub async fn commit(&self, locks: AccountLocks, events: Vec<LedgerEvent>) -> Result<(), LedgerError> {
        for event in &events {
            let id = event.account_id();
            if !locks.guards.contains_key(&id) {
                return Err(LedgerError::AccountNotFound(id));
            }
        }

        let ids = locks.ids();
        let journal = Arc::clone(&self.journal);
        let AccountLocks { mut guards } = locks;

        let task = tokio::spawn(async move {
            journal.append(&events).await?;
            for event in &events {
                if let Some(row) = guards.get_mut(&event.account_id()) {
                    row.apply(event);
                }
            }
            anyhow::Ok(())
        });

        if let Err(e) = joined(task.await) {
            tracing::error!(accounts = ?ids, error = ?e, "Failed to journal ledger events");
            return Err(LedgerError::Storage);
        }

        Ok(())
    }

    /// Consistent copy of one row, taken under its lock.
    pub async fn read_row(&self, id: AccountId) -> Result<AccountRow, LedgerError> {
        let locks = self.lock_account(id).await?;
        Ok(locks.row(id)?.clone())
    }

    pub async fn account(&self, id: AccountId) -> Result<Account, LedgerError> {
        Ok(self.read_row(id).await?.account)
    }

    /// Snapshot of every account, shards read in parallel. Each row lock is
    /// bounded by the same timeout as any other operation.
    pub async fn accounts(&self) -> Result<Vec<Account>, LedgerError> {
        use futures::future::join_all;

        let lock_timeout = self.lock_timeout;
        let futures: Vec<_> = self
            .shards
            .iter()
            .map(|shard| async move {
                let handles: Vec<(AccountId, RowHandle)> = shard
                    .read()
                    .await
                    .rows
                    .iter()
                    .map(|(id, handle)| (*id, handle.clone()))
                    .collect();

                let mut accounts = Vec::with_capacity(handles.len());
                for (id, handle) in handles {
                    let row = tokio::time::timeout(lock_timeout, handle.lock())
                        .await
                        .map_err(|_| {
                            tracing::warn!(account_id = id, timeout = ?lock_timeout, "Row lock wait exceeded");
                            LedgerError::Busy
                        })?;
                    accounts.push(row.account.clone());
                }
                Ok::<_, LedgerError>(accounts)
            })
            .collect();

        let mut accounts = Vec::new();
        for shard in join_all(futures).await {
            accounts.extend(shard?);
        }
        accounts.sort_by_key(|a| a.id);
        Ok(accounts)
    }

    /// Rebuilds state from journaled events, bypassing the journal itself.
    pub async fn restore(&self, events: Vec<LedgerEvent>) -> Result<usize> {
        let count = events.len();

        for event in events {
            let record_id = match &event {
                LedgerEvent::AccountOpened(account) => {
                    self.next_account_id.fetch_max(account.id + 1, Ordering::Relaxed);
                    let mut directory = self.directory.write().await;
                    directory.by_number.insert(account.number.clone(), account.id);
                    directory.by_owner.insert(account.owner.clone(), account.id);
                    drop(directory);
                    insert_row(&self.shards, account.clone()).await;
                    continue;
                }
                LedgerEvent::TransactionRecorded(tx) => Some(tx.id),
                LedgerEvent::LoanIssued(loan) => Some(loan.id),
                LedgerEvent::CreditAnalysed(analysis) => Some(analysis.id),
                LedgerEvent::CardIssued(card) => Some(card.id),
                _ => None,
            };

            if let Some(id) = record_id {
                self.next_record_id.fetch_max(id + 1, Ordering::Relaxed);
            }

            let id = event.account_id();
            let handle = self
                .handle(id)
                .await
                .ok_or_else(|| anyhow::anyhow!("journal references unknown account {}", id))?;
            handle.lock().await.apply(&event);
        }

        Ok(count)
    }
}

fn shard_for(shards: &[RwLock<Shard>], id: AccountId) -> &RwLock<Shard> {
    &shards[(id as usize) % shards.len()]
}

async fn insert_row(shards: &[RwLock<Shard>], account: Account) {
    let id = account.id;
    let mut shard = shard_for(shards, id).write().await;

    // Double-check: replay and live opens never reuse an id
    if shard.rows.contains_key(&id) {
        return;
    }
    shard.rows.insert(id, Arc::new(Mutex::new(AccountRow::new(account))));
}

/// Outcome of a spawned storage task; a panicked task counts as a failure.
fn joined(outcome: Result<Result<()>, tokio::task::JoinError>) -> Result<()> {
    outcome?
}

#[async_trait]
impl IdentityResolver for AccountStore {
    async fn resolve(&self, owner: &str) -> Option<AccountId> {
        self.account_for_owner(owner).await
    }
}
