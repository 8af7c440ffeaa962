use crate::account_store::{AccountRow, AccountStore};
use crate::errors::LedgerError;
use crate::journal::LedgerEvent;
use crate::models::{AccountId, Transaction, TransactionType};
use crate::money::{add_money, validate_amount};
use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;

pub const DEFAULT_CATEGORY: &str = "Outros";
pub const TRANSFER_CATEGORY: &str = "Transferência";

/// Builds the record for moving `amount` on a locked row. Debits that would
/// take the balance below zero fail with `InsufficientFunds`; credits that
/// would overflow the balance fail with `InvalidAmount`.
pub(crate) fn post(
    store: &AccountStore,
    row: &AccountRow,
    tx_type: TransactionType,
    amount: Decimal,
    category: &str,
) -> Result<Transaction, LedgerError> {
    let balance_after = add_money(row.account.balance, tx_type.signed(amount))?;
    if balance_after < Decimal::ZERO {
        return Err(LedgerError::InsufficientFunds);
    }

    Ok(Transaction {
        id: store.next_record_id(),
        account_id: row.account.id,
        tx_type,
        amount,
        category: category.to_string(),
        balance_after,
        created_at: Utc::now(),
    })
}

/// Deposits, withdrawals and transfers against the account store.
#[derive(Clone)]
pub struct Ledger {
    store: Arc<AccountStore>,
}

impl Ledger {
    pub fn new(store: Arc<AccountStore>) -> Self {
        Self { store }
    }

    pub async fn deposit(
        &self,
        account_id: AccountId,
        amount: Decimal,
        category: &str,
    ) -> Result<Transaction, LedgerError> {
        let amount = validate_amount(amount)?;
        let locks = self.store.lock_account(account_id).await?;

        let tx = post(&self.store, locks.row(account_id)?, TransactionType::Deposit, amount, category)?;
        self.store
            .commit(locks, vec![LedgerEvent::TransactionRecorded(tx.clone())])
            .await?;

        tracing::debug!(account_id, %amount, balance = %tx.balance_after, "Deposit applied");
        Ok(tx)
    }

    pub async fn withdraw(
        &self,
        account_id: AccountId,
        amount: Decimal,
        category: &str,
    ) -> Result<Transaction, LedgerError> {
        let amount = validate_amount(amount)?;
        let locks = self.store.lock_account(account_id).await?;

        let tx = post(&self.store, locks.row(account_id)?, TransactionType::Withdraw, amount, category)?;
        self.store
            .commit(locks, vec![LedgerEvent::TransactionRecorded(tx.clone())])
            .await?;

        tracing::debug!(account_id, %amount, balance = %tx.balance_after, "Withdrawal applied");
        Ok(tx)
    }

    /// Moves money to the account with the given public number. Returns the
    /// source-side record; the destination receives a matching `transfer_in`.
    pub async fn transfer(
        &self,
        source_id: AccountId,
        destination_number: &str,
        amount: Decimal,
        category: &str,
    ) -> Result<Transaction, LedgerError> {
        let amount = validate_amount(amount)?;

        // Routing only: the balances that matter are read after locking
        let destination_id = self
            .store
            .resolve_number(destination_number)
            .await
            .ok_or(LedgerError::DestinationNotFound)?;

        if destination_id == source_id {
            return Err(LedgerError::SelfTransfer);
        }

        let locks = self.store.lock_accounts([source_id, destination_id]).await?;

        let tx_out = post(
            &self.store,
            locks.row(source_id)?,
            TransactionType::TransferOut,
            amount,
            category,
        )?;
        let tx_in = post(
            &self.store,
            locks.row(destination_id)?,
            TransactionType::TransferIn,
            amount,
            category,
        )?;

        self.store
            .commit(
                locks,
                vec![
                    LedgerEvent::TransactionRecorded(tx_out.clone()),
                    LedgerEvent::TransactionRecorded(tx_in),
                ],
            )
            .await?;

        tracing::debug!(source_id, destination_id, %amount, "Transfer applied");
        Ok(tx_out)
    }

    /// Transaction history, newest first.
    pub async fn statement(&self, account_id: AccountId) -> Result<Vec<Transaction>, LedgerError> {
        let row = self.store.read_row(account_id).await?;
        Ok(row.transactions.into_iter().rev().collect())
    }
}
