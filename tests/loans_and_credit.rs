mod common;

use banking_ledger::{
    Bank, CardIssuance, CardStatus, CreditStatus, DecisionSource, EngineConfig, LedgerError,
    LoanStatus, MemoryJournal, TransactionType,
};
use common::{
    application, assert_replays, bank_with_scorer, funded, open, FailingScorer, SlowScorer,
    StubScorer,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;

// ============================================================================
// LOANS
// ============================================================================

#[tokio::test]
async fn test_loan_arithmetic() {
    let bank = Bank::in_memory(&EngineConfig::default());

    let terms = bank.loans().quote(dec!(1000), 12).unwrap();
    assert_eq!(terms.interest_rate, dec!(3.70));
    assert_eq!(terms.total_to_pay, dec!(1444.00));
    assert_eq!(terms.installment_amount, dec!(120.33));

    let single = bank.loans().quote(dec!(500), 1).unwrap();
    assert_eq!(single.interest_rate, dec!(2.60));
    assert_eq!(single.total_to_pay, dec!(513.00));
    assert_eq!(single.installment_amount, dec!(513.00));
}

#[tokio::test]
async fn test_installments_bounds() {
    let bank = Bank::in_memory(&EngineConfig::default());

    assert!(bank.loans().quote(dec!(100), 24).is_ok());
    assert_eq!(
        bank.loans().quote(dec!(100), 0),
        Err(LedgerError::InvalidInstallments { requested: 0, max: 24 })
    );
    assert_eq!(
        bank.loans().quote(dec!(100), 25),
        Err(LedgerError::InvalidInstallments { requested: 25, max: 24 })
    );
    assert_eq!(bank.loans().quote(dec!(0), 12), Err(LedgerError::InvalidAmount));
}

#[tokio::test]
async fn test_loan_disburses_through_ledger() {
    let bank = bank_with_scorer(StubScorer {
        status: "approved",
        score: 720,
        approved_limit: dec!(2000),
    });
    let id = funded(&bank, "10001", dec!(50)).await;
    bank.credit().apply_for_credit(id, application(dec!(6000))).await.unwrap();

    let loan = bank.loans().request_loan(id, dec!(1000), 12).await.unwrap();

    assert_eq!(loan.status, LoanStatus::Active);
    assert_eq!(loan.total_to_pay, dec!(1444.00));
    assert_eq!(loan.installment_amount, dec!(120.33));

    let account = bank.account(id).await.unwrap();
    assert_eq!(account.balance, dec!(1050));

    let statement = bank.ledger().statement(id).await.unwrap();
    assert_eq!(statement[0].tx_type, TransactionType::Deposit);
    assert_eq!(statement[0].category, "Empréstimo");
    assert_eq!(statement[0].amount, dec!(1000));
    assert_replays(&statement);
}

#[tokio::test]
async fn test_loan_exceeding_credit_limit() {
    let bank = Bank::in_memory(&EngineConfig::default());
    let id = open(&bank, "10001").await.id;

    let err = bank.loans().request_loan(id, dec!(100), 3).await.unwrap_err();
    assert_eq!(err, LedgerError::ExceedsCreditLimit { limit: Decimal::ZERO });

    assert!(bank.loans().list_loans(id).await.unwrap().is_empty());
    assert!(bank.ledger().statement(id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_list_loans_newest_first_and_settle() {
    let bank = bank_with_scorer(StubScorer {
        status: "approved",
        score: 800,
        approved_limit: dec!(5000),
    });
    let id = open(&bank, "10001").await.id;
    bank.credit().apply_for_credit(id, application(dec!(9000))).await.unwrap();

    let first = bank.loans().request_loan(id, dec!(100), 2).await.unwrap();
    let second = bank.loans().request_loan(id, dec!(200), 6).await.unwrap();

    let loans = bank.loans().list_loans(id).await.unwrap();
    assert_eq!(loans.iter().map(|l| l.id).collect::<Vec<_>>(), vec![second.id, first.id]);

    // 100 * (1 + 2.70 * 2 / 100) = 105.40, balance is 300
    let settled = bank.loans().settle_loan(id, first.id).await.unwrap();
    assert_eq!(settled.status, LoanStatus::Paid);
    assert_eq!(bank.account(id).await.unwrap().balance, dec!(194.60));

    assert_eq!(
        bank.loans().settle_loan(id, first.id).await,
        Err(LedgerError::LoanAlreadyPaid(first.id))
    );
    assert_eq!(
        bank.loans().settle_loan(id, 9999).await,
        Err(LedgerError::LoanNotFound(9999))
    );

    let loans = bank.loans().list_loans(id).await.unwrap();
    assert_eq!(loans[1].status, LoanStatus::Paid);
    assert_eq!(loans[0].status, LoanStatus::Active);
    assert_replays(&bank.ledger().statement(id).await.unwrap());
}

#[tokio::test]
async fn test_settle_requires_funds() {
    let bank = bank_with_scorer(StubScorer {
        status: "approved",
        score: 800,
        approved_limit: dec!(5000),
    });
    let id = open(&bank, "10001").await.id;
    bank.credit().apply_for_credit(id, application(dec!(9000))).await.unwrap();

    let loan = bank.loans().request_loan(id, dec!(1000), 12).await.unwrap();
    assert_eq!(
        bank.loans().settle_loan(id, loan.id).await,
        Err(LedgerError::InsufficientFunds)
    );
    assert_eq!(bank.account(id).await.unwrap().balance, dec!(1000));
}

// ============================================================================
// CREDIT ANALYSIS
// ============================================================================

#[tokio::test]
async fn test_scorer_decision_recorded_and_limit_raised() {
    let bank = bank_with_scorer(StubScorer {
        status: "approved",
        score: 810,
        approved_limit: dec!(1500.555),
    });
    let id = open(&bank, "10001").await.id;

    let analysis = bank.credit().apply_for_credit(id, application(dec!(4000))).await.unwrap();

    assert_eq!(analysis.status, CreditStatus::Approved);
    assert_eq!(analysis.source, DecisionSource::Scorer);
    assert_eq!(analysis.score, 810);
    assert_eq!(analysis.approved_limit, dec!(1500.56));
    assert_eq!(bank.account(id).await.unwrap().credit_limit, dec!(1500.56));

    let status = bank.credit().credit_status(id).await.unwrap().unwrap();
    assert_eq!(status.id, analysis.id);
}

#[tokio::test]
async fn test_failing_scorer_uses_fallback() {
    let bank = bank_with_scorer(FailingScorer);
    let rich = open(&bank, "10001").await.id;
    let poor = open(&bank, "20002").await.id;

    let approved = bank.credit().apply_for_credit(rich, application(dec!(2000))).await.unwrap();
    assert_eq!(approved.status, CreditStatus::Approved);
    assert_eq!(approved.source, DecisionSource::Fallback);
    assert_eq!(approved.score, 750);
    assert_eq!(approved.approved_limit, dec!(600.00));
    assert_eq!(bank.account(rich).await.unwrap().credit_limit, dec!(600.00));

    let rejected = bank.credit().apply_for_credit(poor, application(dec!(1500))).await.unwrap();
    assert_eq!(rejected.status, CreditStatus::Rejected);
    assert_eq!(rejected.score, 300);
    assert_eq!(bank.account(poor).await.unwrap().credit_limit, Decimal::ZERO);
}

#[tokio::test]
async fn test_malformed_scorer_output_uses_fallback() {
    let bank = bank_with_scorer(StubScorer {
        status: "maybe",
        score: 900,
        approved_limit: dec!(99999),
    });
    let id = open(&bank, "10001").await.id;

    let analysis = bank.credit().apply_for_credit(id, application(dec!(3000))).await.unwrap();
    assert_eq!(analysis.source, DecisionSource::Fallback);
    assert_eq!(analysis.approved_limit, dec!(900.00));
}

#[tokio::test]
async fn test_slow_scorer_times_out_to_fallback() {
    let config = EngineConfig {
        scoring_timeout_ms: 20,
        ..EngineConfig::default()
    };
    let bank = Bank::new(&config, Arc::new(MemoryJournal::new()), Arc::new(SlowScorer));
    let id = open(&bank, "10001").await.id;

    let analysis = bank.credit().apply_for_credit(id, application(dec!(1000))).await.unwrap();
    assert_eq!(analysis.source, DecisionSource::Fallback);
    assert_eq!(analysis.status, CreditStatus::Rejected);
}

#[tokio::test]
async fn test_approval_never_lowers_limit() {
    let bank = Bank::in_memory(&EngineConfig::default());
    let id = open(&bank, "10001").await.id;

    bank.credit().apply_for_credit(id, application(dec!(10000))).await.unwrap();
    assert_eq!(bank.account(id).await.unwrap().credit_limit, dec!(3000.00));

    let lower = bank.credit().apply_for_credit(id, application(dec!(2000))).await.unwrap();
    assert_eq!(lower.approved_limit, dec!(600.00));
    assert_eq!(bank.account(id).await.unwrap().credit_limit, dec!(3000.00));

    // Latest analysis is still the authoritative record
    let status = bank.credit().credit_status(id).await.unwrap().unwrap();
    assert_eq!(status.id, lower.id);
}

#[tokio::test]
async fn test_invalid_application_rejected_before_scoring() {
    let bank = Bank::in_memory(&EngineConfig::default());
    let id = open(&bank, "10001").await.id;

    let mut bad = application(dec!(0));
    assert!(matches!(
        bank.credit().apply_for_credit(id, bad.clone()).await,
        Err(LedgerError::InvalidApplication(_))
    ));

    bad.monthly_income = dec!(3000);
    bad.maternal_name = "  ".to_string();
    assert!(matches!(
        bank.credit().apply_for_credit(id, bad).await,
        Err(LedgerError::InvalidApplication(_))
    ));

    assert_eq!(bank.credit().credit_status(id).await.unwrap(), None);
}

// ============================================================================
// CREDIT CARDS
// ============================================================================

async fn scored_account(score: i64, limit: Decimal, movement: Decimal) -> (Bank, u64) {
    let bank = bank_with_scorer(StubScorer {
        status: "approved",
        score,
        approved_limit: limit,
    });
    let id = funded(&bank, "10001", movement).await;
    bank.credit().apply_for_credit(id, application(dec!(3000))).await.unwrap();
    (bank, id)
}

#[tokio::test]
async fn test_card_requires_score() {
    let bank = Bank::in_memory(&EngineConfig::default());
    let id = funded(&bank, "10001", dec!(5000)).await;

    assert_eq!(
        bank.credit().request_credit_card(id).await,
        Err(LedgerError::ScoreTooLow { score: None, required: 600 })
    );

    let (bank, id) = scored_account(599, dec!(50), dec!(1000)).await;
    assert_eq!(
        bank.credit().request_credit_card(id).await,
        Err(LedgerError::ScoreTooLow { score: Some(599), required: 600 })
    );
}

#[tokio::test]
async fn test_card_requires_movement() {
    let (bank, id) = scored_account(600, dec!(50), dec!(999)).await;

    assert_eq!(
        bank.credit().request_credit_card(id).await,
        Err(LedgerError::InsufficientActivity {
            movement: dec!(999),
            required: dec!(1000)
        })
    );
    assert_eq!(bank.credit().card(id).await, Err(LedgerError::CardNotFound));
}

#[tokio::test]
async fn test_card_limit_from_movement() {
    let (bank, id) = scored_account(600, dec!(50), dec!(1000)).await;

    let issuance = bank.credit().request_credit_card(id).await.unwrap();
    assert!(issuance.is_new());

    let card = issuance.card();
    assert_eq!(card.limit, dec!(200.00));
    assert_eq!(card.status, CardStatus::Active);
    assert!(card.number.starts_with("**** **** **** "));
    assert_eq!(card.cvv.len(), 3);
    assert_eq!(card.expiry.len(), 5);
}

#[tokio::test]
async fn test_card_limit_keeps_higher_credit_limit() {
    let (bank, id) = scored_account(700, dec!(900), dec!(1500)).await;

    let card = bank.credit().request_credit_card(id).await.unwrap().into_card();
    assert_eq!(card.limit, dec!(900.00));
}

#[tokio::test]
async fn test_card_request_is_idempotent() {
    let (bank, id) = scored_account(650, dec!(50), dec!(2000)).await;

    let first = bank.credit().request_credit_card(id).await.unwrap();
    let second = bank.credit().request_credit_card(id).await.unwrap();

    assert!(first.is_new());
    assert!(matches!(second, CardIssuance::AlreadyIssued(_)));
    assert_eq!(first.card(), second.card());
    assert_eq!(bank.credit().card(id).await.unwrap(), first.into_card());
}

#[tokio::test]
async fn test_toggle_symmetry_and_cvv() {
    let (bank, id) = scored_account(650, dec!(50), dec!(2000)).await;

    assert_eq!(bank.credit().toggle_card_block(id).await, Err(LedgerError::CardNotFound));
    assert_eq!(bank.credit().reveal_cvv(id).await, Err(LedgerError::CardNotFound));

    let card = bank.credit().request_credit_card(id).await.unwrap().into_card();

    let blocked = bank.credit().toggle_card_block(id).await.unwrap();
    assert_eq!(blocked.status, CardStatus::Blocked);
    let restored = bank.credit().toggle_card_block(id).await.unwrap();
    assert_eq!(restored.status, CardStatus::Active);
    assert_eq!(restored, card);

    assert_eq!(bank.credit().reveal_cvv(id).await.unwrap(), card.cvv);
}
