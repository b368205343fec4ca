//! Transfer engine operator tool
//!
//! ```text
//! transfer_engine [--env <name>] transfer <sender> <receiver> <amount> <pin> [description...]
//! transfer_engine [--env <name>] history <account_number>
//! transfer_engine [--env <name>] ids
//! ```
//!
//! Runs against the PostgreSQL database named by `postgres_url` in
//! `config/<env>.yaml`.

use anyhow::{Context, bail};

use transfer_engine::account::repository::PgAccountDirectory;
use transfer_engine::config::AppConfig;
use transfer_engine::db::Database;
use transfer_engine::money::{format_money, parse_money};
use transfer_engine::sequence::IdentifierSet;
use transfer_engine::transfer::{TransferEngine, TransferRequest};

const USAGE: &str = "usage: transfer_engine [--env <name>] \
    <transfer <sender> <receiver> <amount> <pin> [description...] | history <account> | ids>";

// ============================================================
// ARGUMENTS
// ============================================================

/// Pull `--env <name>` / `-e <name>` out of the argument list
fn take_env(args: &mut Vec<String>) -> String {
    if let Some(i) = args.iter().position(|a| a == "--env" || a == "-e") {
        if i + 1 < args.len() {
            let env = args.remove(i + 1);
            args.remove(i);
            return env;
        }
    }
    "dev".to_string()
}

// ============================================================
// COMMANDS
// ============================================================

async fn run_transfer(engine: &TransferEngine, args: &[String]) -> anyhow::Result<()> {
    let [sender, receiver, amount, pin, rest @ ..] = args else {
        bail!(USAGE);
    };
    let amount = parse_money(amount).with_context(|| format!("invalid amount '{}'", amount))?;

    let mut request = TransferRequest::new(sender.as_str(), receiver.as_str(), amount, pin.as_str());
    if !rest.is_empty() {
        request = request.with_description(rest.join(" "));
    }

    match engine.submit_transfer(&request).await {
        Ok(receipt) => {
            println!("{} {}", receipt.transaction_id, receipt.state);
            Ok(())
        }
        Err(e) => bail!("[{}] {}", e.code(), e.caller_message()),
    }
}

async fn run_history(engine: &TransferEngine, args: &[String]) -> anyhow::Result<()> {
    let [account] = args else {
        bail!(USAGE);
    };

    let transactions = engine
        .list_transactions_for_account(account)
        .await
        .map_err(|e| anyhow::anyhow!("[{}] {}", e.code(), e.caller_message()))?;

    for t in &transactions {
        println!(
            "{}  {}  {} -> {}  {:>12}  {}",
            t.transaction_id,
            t.created_at.format("%Y-%m-%d %H:%M:%S"),
            t.sender_account_number,
            t.receiver_account_number,
            format_money(t.signed_amount_for(account)),
            t.description.as_deref().unwrap_or("")
        );
    }
    println!("{} transaction(s)", transactions.len());
    Ok(())
}

async fn run_ids(db: &Database, config: &AppConfig) -> anyhow::Result<()> {
    let seed = PgAccountDirectory::new(db.pool().clone());
    let ids = IdentifierSet::bootstrap(&config.sequences, &seed)
        .await
        .context("failed to seed identifier sequences")?;

    for seq in [&ids.accounts, &ids.customers, &ids.users] {
        println!(
            "{:<8} next {}{}",
            seq.kind().as_str(),
            seq.prefix(),
            seq.peek_next()
        );
    }
    Ok(())
}

// ============================================================
// MAIN
// ============================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let env = take_env(&mut args);

    let app_config = AppConfig::load(&env)?;
    let _log_guard = transfer_engine::logging::init_logging(&app_config);

    tracing::info!(
        env = %env,
        git_hash = env!("GIT_HASH"),
        "Starting transfer engine tool"
    );

    let Some((command, rest)) = args.split_first() else {
        bail!(USAGE);
    };

    let url = app_config
        .postgres_url
        .as_deref()
        .context("postgres_url is not configured")?;
    let db = Database::connect(url, &app_config.database)
        .await
        .context("failed to connect to PostgreSQL")?;
    db.health_check().await.context("database health check failed")?;

    match command.as_str() {
        "transfer" => {
            let (engine, worker) = TransferEngine::from_config(&db, &app_config);
            let result = run_transfer(&engine, rest).await;
            // Let queued notices drain before exit
            drop(engine);
            if let Some(worker) = worker {
                let stats = worker.await?;
                tracing::debug!(?stats, "Notification worker finished");
            }
            result
        }
        "history" => {
            let (engine, _) = TransferEngine::from_config(&db, &app_config);
            run_history(&engine, rest).await
        }
        "ids" => run_ids(&db, &app_config).await,
        other => bail!("unknown command '{}'\n{}", other, USAGE),
    }
}
