// 📒 Ledger Writer - persists the FK_MASTER_LEDGER.md snapshot
// Full document is rendered in memory, written to a temp file, then renamed
// over the target. Output depends only on vault contents (no timestamps).

use crate::error::{LedgerError, Result};
use crate::processor::{categorize_transactions, TransactionProcessor, VaultContents};
use crate::summary::{calculate_summary, SummaryStats};
use crate::transaction::TransactionType;
use std::fmt;
use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};

pub const LEDGER_FILE_NAME: &str = "FK_MASTER_LEDGER.md";

/// Shown by display paths when no snapshot has been written yet
pub const NO_LEDGER_PLACEHOLDER: &str =
    "# No Ledger Available\n\nNo ledger data has been generated yet.";

pub fn snapshot_path(ledger_dir: &Path) -> PathBuf {
    ledger_dir.join(LEDGER_FILE_NAME)
}

// ============================================================================
// RUN
// ============================================================================

/// Full refresh: read the vault, rebuild the snapshot, replace the old one.
/// Returns the snapshot path.
pub fn run(vault_dir: impl Into<PathBuf>, ledger_dir: impl Into<PathBuf>) -> Result<PathBuf> {
    let processor = TransactionProcessor::new(vault_dir, ledger_dir)?;
    run_with(&processor)
}

/// Same as `run`, with an already-configured processor (custom classifier)
pub fn run_with(processor: &TransactionProcessor) -> Result<PathBuf> {
    let contents = processor.read_vault()?;
    let stats = calculate_summary(&contents.transactions);
    let document = render_ledger(&contents, &stats);

    let path = write_snapshot(processor.ledger_dir(), &document)?;
    log::info!(
        "Wrote ledger snapshot {} ({} transactions)",
        path.display(),
        stats.total_transactions
    );
    Ok(path)
}

// ============================================================================
// PERSISTENCE
// ============================================================================

/// Atomically replace `<ledger_dir>/FK_MASTER_LEDGER.md` with `document`.
/// Creates the ledger directory when missing.
pub fn write_snapshot(ledger_dir: &Path, document: &str) -> Result<PathBuf> {
    let target = snapshot_path(ledger_dir);
    let tmp = ledger_dir.join(format!(".{}.{}.tmp", LEDGER_FILE_NAME, std::process::id()));

    let write_err = |path: &Path, e: std::io::Error| LedgerError::Write {
        path: path.to_path_buf(),
        source: e,
    };

    fs::create_dir_all(ledger_dir).map_err(|e| write_err(ledger_dir, e))?;

    let written = fs::File::create(&tmp).and_then(|mut file| {
        file.write_all(document.as_bytes())?;
        file.sync_all()
    });
    if let Err(e) = written {
        let _ = fs::remove_file(&tmp);
        return Err(write_err(&tmp, e));
    }

    if let Err(e) = fs::rename(&tmp, &target) {
        let _ = fs::remove_file(&tmp);
        return Err(write_err(&target, e));
    }

    Ok(target)
}

/// Current snapshot text, or None if none has been written yet.
/// Any other read failure is an error.
pub fn read_snapshot(ledger_dir: &Path) -> Result<Option<String>> {
    let path = snapshot_path(ledger_dir);
    match fs::read_to_string(&path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(LedgerError::Read { path, source: e }),
    }
}

// ============================================================================
// RENDERING
// ============================================================================

/// Render the snapshot markdown. Deterministic for identical input.
pub fn render_ledger(contents: &VaultContents, stats: &SummaryStats) -> String {
    LedgerDocument { contents, stats }.to_string()
}

struct LedgerDocument<'a> {
    contents: &'a VaultContents,
    stats: &'a SummaryStats,
}

impl fmt::Display for LedgerDocument<'_> {
    fn fmt(&self, out: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stats = self.stats;

        writeln!(out, "# FK Master Ledger")?;
        writeln!(out)?;

        writeln!(out, "## Summary")?;
        writeln!(out)?;
        writeln!(out, "| Type | Count | Sum |")?;
        writeln!(out, "|---|---:|---:|")?;
        for kind in TransactionType::ALL {
            writeln!(
                out,
                "| {} | {} | {:.2} |",
                kind.plural(),
                stats.count_for(kind),
                stats.sum_for(kind)
            )?;
        }
        writeln!(out, "| **Total** | {} | {:.2} |", stats.total_transactions, stats.net_liquidity)?;
        writeln!(out)?;
        writeln!(out, "Net liquidity: {:.2}", stats.net_liquidity)?;
        writeln!(out)?;

        writeln!(out, "## Sources")?;
        writeln!(out)?;
        if self.contents.sources.is_empty() {
            writeln!(out, "_No CSV files in vault._")?;
        } else {
            writeln!(out, "| File | Rows | SHA-256 |")?;
            writeln!(out, "|---|---:|---|")?;
            for source in &self.contents.sources {
                writeln!(
                    out,
                    "| {} | {} | `{}` |",
                    cell(&source.file_name),
                    source.rows,
                    source.sha256
                )?;
            }
        }

        let categorized = categorize_transactions(&self.contents.transactions);
        for (kind, transactions) in &categorized {
            writeln!(out)?;
            writeln!(out, "## {}", kind.plural())?;
            writeln!(out)?;
            if transactions.is_empty() {
                writeln!(out, "_None._")?;
                continue;
            }
            writeln!(out, "| ID | Date | Description | Counterparty | Amount | Source |")?;
            writeln!(out, "|---|---|---|---|---:|---|")?;
            for tx in transactions {
                writeln!(
                    out,
                    "| {} | {} | {} | {} | {} | {}:{} |",
                    cell(&tx.transaction_id),
                    cell(&tx.date),
                    cell(&tx.description),
                    cell(&tx.counterparty),
                    cell(tx.amount.trim()),
                    cell(&tx.source_file),
                    tx.line_number
                )?;
            }
        }

        Ok(())
    }
}

/// Make text safe inside a markdown table cell
fn cell(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('|', "\\|")
        .replace("\r\n", " ")
        .replace(['\n', '\r'], " ")
}
