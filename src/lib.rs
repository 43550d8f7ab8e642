// Vault Ledger - Core Library
// CSV vault → classified transactions → summary stats → markdown ledger snapshot

pub mod config;
pub mod error;
pub mod transaction;
pub mod parser;
pub mod rules;
pub mod processor;
pub mod summary;
pub mod ledger;
pub mod report;

#[cfg(feature = "server")]
pub mod server;

// Re-export commonly used types
pub use config::LedgerConfig;
pub use error::{LedgerError, Result};
pub use transaction::{Transaction, TransactionType};
pub use parser::{RecordFields, VaultCsvParser};
pub use rules::{Classify, ClassificationRule, RuleEngine};
pub use processor::{
    categorize_transactions, CategorizedTransactions, SourceFile, TransactionProcessor,
    VaultContents,
};
pub use summary::{calculate_summary, parse_amount, AmountError, SummaryStats};
pub use ledger::{read_snapshot, run, run_with, LEDGER_FILE_NAME, NO_LEDGER_PLACEHOLDER};
pub use report::BookkeepingReport;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
