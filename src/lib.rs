pub mod account_store;
pub mod bank;
pub mod cli;
pub mod config;
pub mod credit;
pub mod csv_io;
pub mod errors;
pub mod event_store;
pub mod journal;
pub mod ledger;
pub mod loan;
pub mod models;
pub mod money;
pub mod scoring;

pub use account_store::{AccountLocks, AccountRow, AccountStore, IdentityResolver};
pub use bank::Bank;
pub use config::EngineConfig;
pub use credit::{CardIssuance, CreditEngine};
pub use errors::{LedgerError, ScoringError};
pub use journal::{Journal, LedgerEvent, MemoryJournal};
pub use ledger::Ledger;
pub use loan::{LoanEngine, LoanTerms};
pub use models::{
    Account, AccountId, CardStatus, CreditAnalysis, CreditApplication, CreditCard, CreditStatus,
    DecisionSource, Loan, LoanStatus, Transaction, TransactionType,
};
pub use scoring::{CreditScorer, OfflineScorer, RawDecision, ScoreDecision};
