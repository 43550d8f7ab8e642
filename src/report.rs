// 🖥️ Report Views - bookkeeping report data + HTML pages
// Every piece of vault data is HTML-escaped before it reaches markup

use crate::processor::{categorize_transactions, CategorizedTransactions};
use crate::summary::{calculate_summary, SummaryStats};
use crate::transaction::{Transaction, TransactionType};
use chrono::Datelike;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

// ============================================================================
// REPORT DATA
// ============================================================================

/// Data behind both the HTML report and the JSON API
#[derive(Debug, Clone, Serialize)]
pub struct BookkeepingReport {
    /// Keyed "Payments", "Transfers", "Fees"
    pub transactions: BTreeMap<&'static str, Vec<Transaction>>,
    pub summary: SummaryStats,
    pub count: usize,
}

impl BookkeepingReport {
    pub fn build(transactions: &[Transaction]) -> Self {
        let categorized = categorize_transactions(transactions);
        BookkeepingReport {
            transactions: by_label(categorized),
            summary: calculate_summary(transactions),
            count: transactions.len(),
        }
    }

    fn group(&self, kind: TransactionType) -> &[Transaction] {
        self.transactions
            .get(kind.plural())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

fn by_label(categorized: CategorizedTransactions) -> BTreeMap<&'static str, Vec<Transaction>> {
    categorized
        .into_iter()
        .map(|(kind, txs)| (kind.plural(), txs))
        .collect()
}

pub fn current_year() -> i32 {
    chrono::Local::now().year()
}

// ============================================================================
// HTML
// ============================================================================

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

fn page(title: &str, body: &str, year: i32) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n</head>\n<body>\n{body}<footer>&copy; {year}</footer>\n</body>\n</html>\n",
        title = escape_html(title),
        body = body,
        year = year
    )
}

/// Bookkeeping viewer: summary table then one table per transaction type
pub fn render_bookkeeping_page(report: &BookkeepingReport, year: i32) -> String {
    page("Bookkeeping", &BookkeepingBody(report).to_string(), year)
}

struct BookkeepingBody<'a>(&'a BookkeepingReport);

impl fmt::Display for BookkeepingBody<'_> {
    fn fmt(&self, body: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = self.0;
        let s = &report.summary;

        writeln!(body, "<h1>Bookkeeping</h1>")?;
        writeln!(body, "<table class=\"summary\">")?;
        writeln!(body, "<tr><th>Type</th><th>Count</th><th>Sum</th></tr>")?;
        for kind in TransactionType::ALL {
            writeln!(
                body,
                "<tr><td>{}</td><td>{}</td><td>{:.2}</td></tr>",
                kind.plural(),
                s.count_for(kind),
                s.sum_for(kind)
            )?;
        }
        writeln!(
            body,
            "<tr><th>Total</th><td>{}</td><td>{:.2}</td></tr>",
            s.total_transactions, s.net_liquidity
        )?;
        writeln!(body, "</table>")?;
        writeln!(body, "<p>Net liquidity: {:.2}</p>", s.net_liquidity)?;

        for kind in TransactionType::ALL {
            let group = report.group(kind);
            writeln!(body, "<h2>{}</h2>", kind.plural())?;
            if group.is_empty() {
                writeln!(body, "<p class=\"empty\">No {}.</p>", kind.plural().to_lowercase())?;
                continue;
            }
            writeln!(
                body,
                "<table class=\"transactions\">\n<tr><th>ID</th><th>Date</th><th>Description</th><th>Counterparty</th><th>Amount</th></tr>"
            )?;
            for tx in group {
                writeln!(
                    body,
                    "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                    escape_html(&tx.transaction_id),
                    escape_html(&tx.date),
                    escape_html(&tx.description),
                    escape_html(&tx.counterparty),
                    escape_html(&tx.amount)
                )?;
            }
            writeln!(body, "</table>")?;
        }

        Ok(())
    }
}

/// Ledger page: the snapshot markdown, escaped, or the placeholder
pub fn render_ledger_page(snapshot: Option<&str>, year: i32) -> String {
    let content = snapshot.unwrap_or(crate::ledger::NO_LEDGER_PLACEHOLDER);
    let body = format!(
        "<h1>Ledger</h1>\n<div class=\"ledger-content\"><pre>{}</pre></div>\n",
        escape_html(content)
    );
    page("Ledger", &body, year)
}

pub fn render_error_page(message: &str, year: i32) -> String {
    let body = format!(
        "<h1>Error</h1>\n<p class=\"error\">{}</p>\n",
        escape_html(message)
    );
    page("Error", &body, year)
}
