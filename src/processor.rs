// 📂 Ingestion Processor - vault directory → ordered Transaction list
// Files are read in file-name order, rows in file order

use crate::error::{LedgerError, Result};
use crate::parser::VaultCsvParser;
use crate::rules::{Classify, RuleEngine};
use crate::transaction::{Transaction, TransactionType};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Transactions grouped by type. Every type has an entry, possibly empty.
pub type CategorizedTransactions = BTreeMap<TransactionType, Vec<Transaction>>;

/// One CSV file found in the vault
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceFile {
    pub file_name: String,
    pub rows: usize,
    /// SHA-256 of the file bytes, lowercase hex
    pub sha256: String,
}

/// Everything read from the vault in one pass
#[derive(Debug, Clone, Default)]
pub struct VaultContents {
    pub transactions: Vec<Transaction>,
    pub sources: Vec<SourceFile>,
}

pub struct TransactionProcessor {
    vault_dir: PathBuf,
    ledger_dir: PathBuf,
    classifier: Arc<dyn Classify>,
}

impl TransactionProcessor {
    /// Bind a processor to its vault and ledger directories.
    ///
    /// Fails if a path is empty or exists but is not a directory. A vault
    /// that does not exist yet is reported later, by `read_csv_files`.
    pub fn new(vault_dir: impl Into<PathBuf>, ledger_dir: impl Into<PathBuf>) -> Result<Self> {
        Self::with_classifier(vault_dir, ledger_dir, Arc::new(RuleEngine::with_builtin_rules()))
    }

    pub fn with_classifier(
        vault_dir: impl Into<PathBuf>,
        ledger_dir: impl Into<PathBuf>,
        classifier: Arc<dyn Classify>,
    ) -> Result<Self> {
        let vault_dir = vault_dir.into();
        let ledger_dir = ledger_dir.into();

        check_dir("vault", &vault_dir)?;
        check_dir("ledger", &ledger_dir)?;

        Ok(TransactionProcessor {
            vault_dir,
            ledger_dir,
            classifier,
        })
    }

    pub fn vault_dir(&self) -> &Path {
        &self.vault_dir
    }

    pub fn ledger_dir(&self) -> &Path {
        &self.ledger_dir
    }

    /// All transactions of every `*.csv` file in the vault, file order then row order.
    /// An empty vault is an empty list; a missing one is an error.
    pub fn read_csv_files(&self) -> Result<Vec<Transaction>> {
        Ok(self.read_vault()?.transactions)
    }

    /// Transactions plus per-file provenance
    pub fn read_vault(&self) -> Result<VaultContents> {
        let files = self.csv_files()?;
        let parser = VaultCsvParser::new(self.classifier.as_ref());
        let mut contents = VaultContents::default();

        for path in &files {
            let bytes = fs::read(path).map_err(|e| LedgerError::Read {
                path: path.clone(),
                source: e,
            })?;
            let file_name = file_name_of(path);
            let transactions = parser.parse_reader(&file_name, bytes.as_slice())?;

            contents.sources.push(SourceFile {
                file_name,
                rows: transactions.len(),
                sha256: format!("{:x}", Sha256::digest(&bytes)),
            });
            contents.transactions.extend(transactions);
        }

        warn_duplicate_ids(&contents.transactions);
        log::info!(
            "Read {} transactions from {} files in {}",
            contents.transactions.len(),
            contents.sources.len(),
            self.vault_dir.display()
        );

        Ok(contents)
    }

    /// Source files with row counts, in processing order
    pub fn source_files(&self) -> Result<Vec<SourceFile>> {
        Ok(self.read_vault()?.sources)
    }

    /// Group by type, keeping source order inside each group
    pub fn categorize_transactions(&self, transactions: &[Transaction]) -> CategorizedTransactions {
        categorize_transactions(transactions)
    }

    /// `*.csv` files directly inside the vault (case-insensitive extension), sorted by name
    fn csv_files(&self) -> Result<Vec<PathBuf>> {
        let read_err = |e: std::io::Error| LedgerError::Read {
            path: self.vault_dir.clone(),
            source: e,
        };

        let mut files = Vec::new();
        for entry in fs::read_dir(&self.vault_dir).map_err(read_err)? {
            let path = entry.map_err(read_err)?.path();
            let is_csv = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| ext.eq_ignore_ascii_case("csv"))
                .unwrap_or(false);

            if is_csv && path.is_file() {
                files.push(path);
            }
        }

        files.sort_by_key(|p| file_name_of(p));
        Ok(files)
    }
}

/// Group by type, keeping source order inside each group
pub fn categorize_transactions(transactions: &[Transaction]) -> CategorizedTransactions {
    let mut categorized: CategorizedTransactions = TransactionType::ALL
        .iter()
        .map(|kind| (*kind, Vec::new()))
        .collect();

    for tx in transactions {
        categorized.entry(tx.kind()).or_default().push(tx.clone());
    }

    categorized
}

fn check_dir(role: &'static str, path: &Path) -> Result<()> {
    if path.as_os_str().is_empty() {
        return Err(LedgerError::InvalidPath {
            role,
            reason: "path is empty".to_string(),
        });
    }
    if path.exists() && !path.is_dir() {
        return Err(LedgerError::NotADirectory {
            role,
            path: path.to_path_buf(),
        });
    }
    Ok(())
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn warn_duplicate_ids(transactions: &[Transaction]) {
    let mut seen = HashSet::new();
    for tx in transactions {
        if !seen.insert(tx.transaction_id.as_str()) {
            log::warn!(
                "Duplicate transaction id {} ({} line {})",
                tx.transaction_id,
                tx.source_file,
                tx.line_number
            );
        }
    }
}
