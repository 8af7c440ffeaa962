use crate::account_store::AccountStore;
use crate::config::LoanPolicy;
use crate::errors::LedgerError;
use crate::journal::LedgerEvent;
use crate::ledger::post;
use crate::models::{AccountId, Loan, LoanStatus, TransactionType};
use crate::money::{fit_money, round_money, validate_amount};
use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;

pub const LOAN_CATEGORY: &str = "Empréstimo";
pub const LOAN_PAYMENT_CATEGORY: &str = "Pagamento de empréstimo";

/// Repayment schedule for a principal. Simple interest, charged once over
/// the whole schedule.
#[derive(Debug, Clone, PartialEq)]
pub struct LoanTerms {
    pub principal: Decimal,
    pub installments: u32,
    pub interest_rate: Decimal,
    pub installment_amount: Decimal,
    pub total_to_pay: Decimal,
}

impl LoanTerms {
    pub fn compute(
        policy: &LoanPolicy,
        principal: Decimal,
        installments: u32,
    ) -> Result<Self, LedgerError> {
        if installments == 0 || installments > policy.max_installments {
            return Err(LedgerError::InvalidInstallments {
                requested: installments,
                max: policy.max_installments,
            });
        }
        let principal = validate_amount(principal)?;

        let n = Decimal::from(installments);
        let interest_rate = round_money(policy.base_rate + policy.rate_per_installment * n);
        let total_to_pay = principal
            .checked_mul(Decimal::ONE + interest_rate * n / dec!(100))
            .ok_or(LedgerError::InvalidAmount)
            .and_then(fit_money)?;
        let installment_amount = round_money(total_to_pay / n);

        Ok(Self {
            principal,
            installments,
            interest_rate,
            installment_amount,
            total_to_pay,
        })
    }
}

#[derive(Clone)]
pub struct LoanEngine {
    store: Arc<AccountStore>,
    policy: LoanPolicy,
}

impl LoanEngine {
    pub fn new(store: Arc<AccountStore>, policy: LoanPolicy) -> Self {
        Self { store, policy }
    }

    /// Terms a request would get, without touching any account.
    pub fn quote(&self, principal: Decimal, installments: u32) -> Result<LoanTerms, LedgerError> {
        LoanTerms::compute(&self.policy, principal, installments)
    }

    /// Disburses the principal into the account and records the loan.
    pub async fn request_loan(
        &self,
        account_id: AccountId,
        principal: Decimal,
        installments: u32,
    ) -> Result<Loan, LedgerError> {
        let terms = self.quote(principal, installments)?;
        let locks = self.store.lock_account(account_id).await?;
        let row = locks.row(account_id)?;

        if terms.principal > row.account.credit_limit {
            return Err(LedgerError::ExceedsCreditLimit {
                limit: row.account.credit_limit,
            });
        }

        let disbursement = post(
            &self.store,
            row,
            TransactionType::Deposit,
            terms.principal,
            LOAN_CATEGORY,
        )?;

        let loan = Loan {
            id: self.store.next_record_id(),
            account_id,
            principal: terms.principal,
            installments: terms.installments,
            interest_rate: terms.interest_rate,
            installment_amount: terms.installment_amount,
            total_to_pay: terms.total_to_pay,
            status: LoanStatus::Active,
            created_at: Utc::now(),
        };

        self.store
            .commit(
                locks,
                vec![
                    LedgerEvent::TransactionRecorded(disbursement),
                    LedgerEvent::LoanIssued(loan.clone()),
                ],
            )
            .await?;

        tracing::info!(
            account_id,
            loan_id = loan.id,
            principal = %loan.principal,
            installments = loan.installments,
            "Loan disbursed"
        );
        Ok(loan)
    }

    /// Newest first.
    pub async fn list_loans(&self, account_id: AccountId) -> Result<Vec<Loan>, LedgerError> {
        let row = self.store.read_row(account_id).await?;
        Ok(row.loans.into_iter().rev().collect())
    }

    /// Pays off the full amount due from the account balance.
    pub async fn settle_loan(&self, account_id: AccountId, loan_id: u64) -> Result<Loan, LedgerError> {
        let locks = self.store.lock_account(account_id).await?;
        let row = locks.row(account_id)?;

        let mut loan = row
            .loans
            .iter()
            .find(|l| l.id == loan_id)
            .cloned()
            .ok_or(LedgerError::LoanNotFound(loan_id))?;

        if loan.status == LoanStatus::Paid {
            return Err(LedgerError::LoanAlreadyPaid(loan_id));
        }

        let payment = post(
            &self.store,
            row,
            TransactionType::Withdraw,
            loan.total_to_pay,
            LOAN_PAYMENT_CATEGORY,
        )?;

        self.store
            .commit(
                locks,
                vec![
                    LedgerEvent::TransactionRecorded(payment),
                    LedgerEvent::LoanSettled { account_id, loan_id },
                ],
            )
            .await?;

        loan.status = LoanStatus::Paid;
        tracing::info!(account_id, loan_id, total = %loan.total_to_pay, "Loan settled");
        Ok(loan)
    }
}
