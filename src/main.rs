use anyhow::{Context, Result};
use std::env;
use std::sync::Arc;

use vault_ledger::{
    read_snapshot, run_with, Classify, LedgerConfig, RuleEngine, SummaryStats,
    TransactionProcessor, TransactionType, NO_LEDGER_PLACEHOLDER,
};

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let config = LedgerConfig::from_env().context("Failed to resolve directories")?;

    match args.get(1).map(String::as_str) {
        None | Some("summary") => run_summary(&config),
        Some("process") => run_process(&config),
        Some("show") => run_show(&config),
        Some(other) => {
            eprintln!("Unknown command: {}", other);
            eprintln!("Usage: vault-ledger [summary|process|show]");
            std::process::exit(2);
        }
    }
}

fn load_classifier(config: &LedgerConfig) -> Result<Arc<dyn Classify>> {
    let engine = match &config.rules_file {
        Some(path) => RuleEngine::from_file(path)?,
        None => RuleEngine::with_builtin_rules(),
    };
    Ok(Arc::new(engine))
}

fn processor(config: &LedgerConfig) -> Result<TransactionProcessor> {
    let processor = TransactionProcessor::with_classifier(
        config.vault_dir.clone(),
        config.ledger_dir.clone(),
        load_classifier(config)?,
    )?;
    Ok(processor)
}

fn run_summary(config: &LedgerConfig) -> Result<()> {
    let processor = processor(config)?;
    let transactions = processor
        .read_csv_files()
        .context("Failed to read transaction files")?;
    let stats = vault_ledger::calculate_summary(&transactions);

    println!("📂 Vault: {}", config.vault_dir.display());
    print_summary(&stats);
    Ok(())
}

fn run_process(config: &LedgerConfig) -> Result<()> {
    let processor = processor(config)?;
    let path = run_with(&processor).context("Failed to process transactions")?;

    println!("✓ Ledger written: {}", path.display());
    Ok(())
}

fn run_show(config: &LedgerConfig) -> Result<()> {
    let snapshot = read_snapshot(&config.ledger_dir).context("Failed to read ledger")?;
    println!("{}", snapshot.as_deref().unwrap_or(NO_LEDGER_PLACEHOLDER));
    Ok(())
}

fn print_summary(stats: &SummaryStats) {
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    for kind in TransactionType::ALL {
        println!(
            "{:<10} {:>6}  {:>14.2}",
            kind.plural(),
            stats.count_for(kind),
            stats.sum_for(kind)
        );
    }
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("{:<10} {:>6}  {:>14.2}", "Total", stats.total_transactions, stats.net_liquidity);
}
