// Vault Ledger - Web Server

use anyhow::{Context, Result};
use std::sync::Arc;
use vault_ledger::{server, Classify, LedgerConfig, RuleEngine};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let config = LedgerConfig::from_env().context("Failed to resolve directories")?;

    let classifier: Arc<dyn Classify> = match &config.rules_file {
        Some(path) => Arc::new(RuleEngine::from_file(path)?),
        None => Arc::new(RuleEngine::with_builtin_rules()),
    };

    println!("🌐 Vault Ledger - Web Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("   Vault:  {}", config.vault_dir.display());
    println!("   Ledger: {}", config.ledger_dir.display());
    println!("   UI:     http://{}/bookkeeping", config.bind_addr);
    println!("   API:    http://{}/api/bookkeeping", config.bind_addr);

    server::serve(config, classifier).await
}
