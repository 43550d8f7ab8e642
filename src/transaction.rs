// Transaction - one classified ledger entry read from the vault

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ============================================================================
// TRANSACTION TYPE
// ============================================================================

/// Kind of a transaction. Ordering is the display order: payments, transfers, fees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TransactionType {
    Payment,
    Transfer,
    Fee,
}

impl TransactionType {
    pub const ALL: [TransactionType; 3] = [
        TransactionType::Payment,
        TransactionType::Transfer,
        TransactionType::Fee,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            TransactionType::Payment => "Payment",
            TransactionType::Transfer => "Transfer",
            TransactionType::Fee => "Fee",
        }
    }

    /// Group label used by the report and the JSON API ("Payments", ...)
    pub fn plural(&self) -> &'static str {
        match self {
            TransactionType::Payment => "Payments",
            TransactionType::Transfer => "Transfers",
            TransactionType::Fee => "Fees",
        }
    }

    /// Parse a free-form label such as "payment", "FEES" or " Transfer ".
    /// Returns None for anything unrecognised.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "payment" | "payments" | "pay" => Some(TransactionType::Payment),
            "transfer" | "transfers" | "xfer" => Some(TransactionType::Transfer),
            "fee" | "fees" => Some(TransactionType::Fee),
            _ => None,
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// TRANSACTION
// ============================================================================

/// A transaction as read from a vault CSV row.
///
/// `amount` keeps the source text untouched; it is only parsed when
/// summaries are computed. The kind is fixed at construction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transaction {
    pub transaction_id: String,
    pub amount: String,

    #[serde(rename = "type")]
    kind: TransactionType,

    pub date: String,
    pub description: String,
    pub counterparty: String,
    pub currency: String,

    // Provenance
    pub source_file: String,
    pub line_number: u64,

    /// Columns the pipeline does not interpret, keyed by header text
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

impl Transaction {
    pub fn new(transaction_id: impl Into<String>, amount: impl Into<String>, kind: TransactionType) -> Self {
        Transaction {
            transaction_id: transaction_id.into(),
            amount: amount.into(),
            kind,
            date: String::new(),
            description: String::new(),
            counterparty: String::new(),
            currency: String::new(),
            source_file: String::new(),
            line_number: 0,
            extra: BTreeMap::new(),
        }
    }

    pub fn kind(&self) -> TransactionType {
        self.kind
    }

    /// Builder pattern: add date
    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = date.into();
        self
    }

    /// Builder pattern: add description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Builder pattern: add counterparty
    pub fn with_counterparty(mut self, counterparty: impl Into<String>) -> Self {
        self.counterparty = counterparty.into();
        self
    }

    /// Builder pattern: add currency
    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    /// Builder pattern: record where the row came from
    pub fn with_source(mut self, source_file: impl Into<String>, line_number: u64) -> Self {
        self.source_file = source_file.into();
        self.line_number = line_number;
        self
    }

    /// Builder pattern: carry an uninterpreted column
    pub fn with_extra(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(column.into(), value.into());
        self
    }
}
