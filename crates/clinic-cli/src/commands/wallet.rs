use clinic_core::wallet::WalletLedger;

use crate::commands::common::{format_sync_timestamp, format_transaction_lines, print_json, Context};
use crate::error::CliError;

pub fn run_wallet_show(as_json: bool, ctx: &Context) -> Result<(), CliError> {
    let wallet = WalletLedger::new(ctx.open_store()?).balance()?;
    if as_json {
        return print_json(&wallet);
    }

    println!("Balance: {} credit(s)", wallet.balance);
    match wallet.last_synced_at {
        Some(at) => println!("Last synced: {}", format_sync_timestamp(at)),
        None => println!("Last synced: never"),
    }
    Ok(())
}

pub fn run_wallet_recharge(amount: i64, ctx: &Context) -> Result<i64, CliError> {
    let balance = WalletLedger::new(ctx.open_store()?).recharge(amount)?;
    println!("Balance: {balance} credit(s)");
    Ok(balance)
}

pub fn run_wallet_history(limit: usize, as_json: bool, ctx: &Context) -> Result<(), CliError> {
    let entries = WalletLedger::new(ctx.open_store()?).transactions(limit)?;
    if as_json {
        return print_json(&entries);
    }
    if entries.is_empty() {
        println!("No wallet transactions yet.");
    }
    for line in format_transaction_lines(&entries) {
        println!("{line}");
    }
    Ok(())
}

pub async fn run_wallet_refresh(ctx: &Context) -> Result<(), CliError> {
    let engine = ctx.open_engine()?;
    let wallet = engine.refresh_wallet().await?;
    println!("Balance: {} credit(s) (from remote)", wallet.balance);
    Ok(())
}
