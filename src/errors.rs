use crate::models::AccountId;
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    #[error("amount must be positive with at most two decimal places")]
    InvalidAmount,
    #[error("installments must be between 1 and {max}, got {requested}")]
    InvalidInstallments { requested: u32, max: u32 },
    #[error("invalid credit application: {0}")]
    InvalidApplication(String),
    #[error("account {0} not found")]
    AccountNotFound(AccountId),
    #[error("account number or owner already registered")]
    DuplicateAccount,
    #[error("destination account not found")]
    DestinationNotFound,
    #[error("cannot transfer to the same account")]
    SelfTransfer,
    #[error("insufficient funds")]
    InsufficientFunds,
    #[error("requested amount exceeds the available credit limit of {limit:.2}")]
    ExceedsCreditLimit { limit: Decimal },
    #[error("credit score is below the required {required} points")]
    ScoreTooLow { score: Option<u16>, required: u16 },
    #[error("account movement of {movement:.2} is below the required {required:.2}")]
    InsufficientActivity { movement: Decimal, required: Decimal },
    #[error("credit card not found")]
    CardNotFound,
    #[error("loan {0} not found")]
    LoanNotFound(u64),
    #[error("loan {0} is already paid")]
    LoanAlreadyPaid(u64),
    #[error("account is busy, retry the operation")]
    Busy,
    #[error("ledger storage unavailable")]
    Storage,
}

impl LedgerError {
    /// Stable machine-readable kind, for boundary layers mapping to transport codes.
    pub fn code(&self) -> &'static str {
        match self {
            LedgerError::InvalidAmount => "invalid_amount",
            LedgerError::InvalidInstallments { .. } => "invalid_installments",
            LedgerError::InvalidApplication(_) => "invalid_application",
            LedgerError::AccountNotFound(_) => "account_not_found",
            LedgerError::DuplicateAccount => "duplicate_account",
            LedgerError::DestinationNotFound => "destination_not_found",
            LedgerError::SelfTransfer => "self_transfer",
            LedgerError::InsufficientFunds => "insufficient_funds",
            LedgerError::ExceedsCreditLimit { .. } => "exceeds_credit_limit",
            LedgerError::ScoreTooLow { .. } => "score_too_low",
            LedgerError::InsufficientActivity { .. } => "insufficient_activity",
            LedgerError::CardNotFound => "card_not_found",
            LedgerError::LoanNotFound(_) => "loan_not_found",
            LedgerError::LoanAlreadyPaid(_) => "loan_already_paid",
            LedgerError::Busy => "busy",
            LedgerError::Storage => "storage",
        }
    }

    /// Whether the caller may retry the whole logical operation.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LedgerError::Busy | LedgerError::Storage)
    }
}

/// Failure of the external scoring collaborator. Recovered by the fallback
/// policy and never returned to callers of the credit engine.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScoringError {
    #[error("scoring provider unavailable: {0}")]
    Unavailable(String),
    #[error("scoring provider timed out")]
    Timeout,
    #[error("malformed scoring payload: {0}")]
    Malformed(String),
}
