use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub type AccountId = u64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub number: String,
    pub owner: String,
    pub balance: Decimal,
    pub credit_limit: Decimal,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn new(id: AccountId, number: String, owner: String) -> Self {
        Self {
            id,
            number,
            owner,
            balance: Decimal::ZERO,
            credit_limit: Decimal::ZERO,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Deposit,
    Withdraw,
    TransferOut,
    TransferIn,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Deposit => "deposit",
            TransactionType::Withdraw => "withdraw",
            TransactionType::TransferOut => "transfer_out",
            TransactionType::TransferIn => "transfer_in",
        }
    }

    /// Amount as it affects the balance: credits positive, debits negative.
    pub fn signed(&self, amount: Decimal) -> Decimal {
        match self {
            TransactionType::Deposit | TransactionType::TransferIn => amount,
            TransactionType::Withdraw | TransactionType::TransferOut => -amount,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: u64,
    pub account_id: AccountId,
    pub tx_type: TransactionType,
    pub amount: Decimal,
    pub category: String,
    pub balance_after: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoanStatus {
    Active,
    Paid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loan {
    pub id: u64,
    pub account_id: AccountId,
    pub principal: Decimal,
    pub installments: u32,
    /// Percentage per installment, e.g. `3.70` for 3.70%.
    pub interest_rate: Decimal,
    pub installment_amount: Decimal,
    pub total_to_pay: Decimal,
    pub status: LoanStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CreditStatus {
    Approved,
    Rejected,
    Pending,
}

impl CreditStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "approved" => Some(CreditStatus::Approved),
            "rejected" => Some(CreditStatus::Rejected),
            "pending" => Some(CreditStatus::Pending),
            _ => None,
        }
    }
}

/// Which path produced a credit decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionSource {
    Scorer,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditApplication {
    pub age: u32,
    /// Declared maternal name, used as an identity signal only.
    pub maternal_name: String,
    pub monthly_income: Decimal,
    pub assets_value: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditAnalysis {
    pub id: u64,
    pub account_id: AccountId,
    pub application: CreditApplication,
    pub status: CreditStatus,
    pub score: u16,
    pub feedback: String,
    pub approved_limit: Decimal,
    pub source: DecisionSource,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardStatus {
    Active,
    Blocked,
}

impl CardStatus {
    pub fn toggled(self) -> Self {
        match self {
            CardStatus::Active => CardStatus::Blocked,
            CardStatus::Blocked => CardStatus::Active,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditCard {
    pub id: u64,
    pub account_id: AccountId,
    /// Masked, only the last four digits are real.
    pub number: String,
    pub cvv: String,
    /// `MM/YY`
    pub expiry: String,
    pub limit: Decimal,
    pub status: CardStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandType {
    Open,
    Deposit,
    Withdraw,
    Transfer,
    Loan,
    Apply,
    Card,
}

/// One line of a batch command script.
#[derive(Debug, Clone, Deserialize)]
pub struct CommandRow {
    pub op: CommandType,
    pub account: String,
    #[serde(default)]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub installments: Option<u32>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub maternal_name: Option<String>,
    #[serde(default)]
    pub assets: Option<Decimal>,
}

#[derive(Debug)]
pub struct AccountOutput {
    pub number: String,
    pub owner: String,
    pub balance: Decimal,
    pub credit_limit: Decimal,
}

impl From<&Account> for AccountOutput {
    fn from(acc: &Account) -> Self {
        Self {
            number: acc.number.clone(),
            owner: acc.owner.clone(),
            balance: acc.balance,
            credit_limit: acc.credit_limit,
        }
    }
}
