use crate::bank::Bank;
use crate::config::EngineConfig;
use crate::csv_io::{stream_commands, write_accounts};
use crate::ledger::{DEFAULT_CATEGORY, TRANSFER_CATEGORY};
use crate::models::{AccountOutput, CommandRow, CommandType, CreditApplication};
use crate::scoring::OfflineScorer;
use anyhow::{anyhow, Context, Result};
use futures::StreamExt;
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs::File;
use tokio::io::BufReader;

/// Runs a command script against a bank and prints the final balances.
/// Rejected commands are logged and skipped.
pub async fn run(input_path: PathBuf, config: EngineConfig, journal: Option<PathBuf>) -> Result<()> {
    let bank = match journal {
        Some(path) => Bank::open(&config, path, Arc::new(OfflineScorer)).await?,
        None => Bank::in_memory(&config),
    };

    let file = File::open(&input_path)
        .await
        .with_context(|| format!("failed to open {}", input_path.display()))?;
    let reader = BufReader::new(file);
    let mut stream = stream_commands(reader);

    let mut line = 1usize;
    while let Some(result) = stream.next().await {
        line += 1;
        match result {
            Ok(row) => {
                if let Err(e) = apply_command(&bank, &row).await {
                    tracing::warn!(line, op = ?row.op, account = %row.account, error = %e, "Command rejected");
                }
            }
            Err(e) => {
                tracing::warn!(line, error = %e, "Skipping unparsable command");
            }
        }
    }

    let accounts: Vec<AccountOutput> = bank
        .accounts()
        .await?
        .iter()
        .map(AccountOutput::from)
        .collect();

    write_accounts(tokio::io::stdout(), accounts).await?;

    Ok(())
}

pub async fn apply_command(bank: &Bank, row: &CommandRow) -> Result<()> {
    if row.op == CommandType::Open {
        let owner = format!("owner-{}", row.account);
        bank.open_account(&row.account, &owner).await?;
        return Ok(());
    }

    let account_id = bank
        .store()
        .resolve_number(&row.account)
        .await
        .ok_or_else(|| anyhow!("unknown account {}", row.account))?;

    match row.op {
        CommandType::Open => {}
        CommandType::Deposit => {
            let category = row.category.as_deref().unwrap_or(DEFAULT_CATEGORY);
            bank.ledger()
                .deposit(account_id, required_amount(row)?, category)
                .await?;
        }
        CommandType::Withdraw => {
            let category = row.category.as_deref().unwrap_or(DEFAULT_CATEGORY);
            bank.ledger()
                .withdraw(account_id, required_amount(row)?, category)
                .await?;
        }
        CommandType::Transfer => {
            let destination = row
                .destination
                .as_deref()
                .ok_or_else(|| anyhow!("missing destination"))?;
            let category = row.category.as_deref().unwrap_or(TRANSFER_CATEGORY);
            bank.ledger()
                .transfer(account_id, destination, required_amount(row)?, category)
                .await?;
        }
        CommandType::Loan => {
            let installments = row
                .installments
                .ok_or_else(|| anyhow!("missing installments"))?;
            bank.loans()
                .request_loan(account_id, required_amount(row)?, installments)
                .await?;
        }
        CommandType::Apply => {
            let application = CreditApplication {
                age: row.age.ok_or_else(|| anyhow!("missing age"))?,
                maternal_name: row.maternal_name.clone().unwrap_or_default(),
                monthly_income: required_amount(row)?,
                assets_value: row.assets.unwrap_or(Decimal::ZERO),
            };
            bank.credit().apply_for_credit(account_id, application).await?;
        }
        CommandType::Card => {
            bank.credit().request_credit_card(account_id).await?;
        }
    }

    Ok(())
}

fn required_amount(row: &CommandRow) -> Result<Decimal> {
    row.amount.ok_or_else(|| anyhow!("missing amount"))
}
