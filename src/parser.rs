// 🏗️ Record Parser - vault CSV rows → Transactions
// Structural problems fail the file; amounts are carried as raw text

use crate::error::{LedgerError, Result};
use crate::rules::Classify;
use crate::transaction::Transaction;
use csv::{ReaderBuilder, StringRecord};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

// ============================================================================
// RECORD FIELDS
// ============================================================================

/// One CSV row mapped onto named fields, before classification
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordFields {
    pub transaction_id: String,
    pub amount: String,
    /// Raw value of the type column, when the file has one
    pub type_label: Option<String>,
    pub date: String,
    pub description: String,
    pub counterparty: String,
    pub currency: String,
    pub extra: BTreeMap<String, String>,
}

impl RecordFields {
    fn into_transaction(self, classifier: &dyn Classify, source_file: &str, line: u64) -> Transaction {
        let kind = classifier.classify(&self);

        let mut tx = Transaction::new(self.transaction_id, self.amount, kind)
            .with_date(self.date)
            .with_description(self.description)
            .with_counterparty(self.counterparty)
            .with_currency(self.currency)
            .with_source(source_file, line);
        tx.extra = self.extra;
        tx
    }
}

// ============================================================================
// COLUMN MAPPING
// ============================================================================

const ID_COLUMNS: &[&str] = &["transactionid", "id", "txnid"];
const AMOUNT_COLUMNS: &[&str] = &["amount"];
const TYPE_COLUMNS: &[&str] = &["type", "kind", "transactiontype"];
const DATE_COLUMNS: &[&str] = &["date"];
const DESCRIPTION_COLUMNS: &[&str] = &["description", "memo"];
const COUNTERPARTY_COLUMNS: &[&str] = &["counterparty", "payee", "merchant"];
const CURRENCY_COLUMNS: &[&str] = &["currency"];

/// "Transaction ID", "transaction_id" and "TransactionID" all become "transactionid"
pub fn normalize_header(header: &str) -> String {
    header
        .trim_start_matches('\u{feff}')
        .chars()
        .filter(|c| !matches!(c, '_' | '-' | ' ' | '\t'))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Column indexes resolved from a header row
#[derive(Debug, Clone, PartialEq)]
struct ColumnMap {
    id: usize,
    amount: usize,
    kind: Option<usize>,
    date: Option<usize>,
    description: Option<usize>,
    counterparty: Option<usize>,
    currency: Option<usize>,
    extra: Vec<(usize, String)>,
}

impl ColumnMap {
    fn from_headers(headers: &StringRecord, file: &str) -> Result<Self> {
        let normalized: Vec<String> = headers.iter().map(normalize_header).collect();
        let mut claimed = vec![false; normalized.len()];

        let mut find = |aliases: &[&str]| -> Option<usize> {
            let idx = normalized
                .iter()
                .enumerate()
                .find(|(i, name)| !claimed[*i] && aliases.contains(&name.as_str()))
                .map(|(i, _)| i)?;
            claimed[idx] = true;
            Some(idx)
        };

        let id = find(ID_COLUMNS).ok_or_else(|| LedgerError::MissingColumn {
            file: file.to_string(),
            column: "transaction_id",
        })?;
        let amount = find(AMOUNT_COLUMNS).ok_or_else(|| LedgerError::MissingColumn {
            file: file.to_string(),
            column: "amount",
        })?;
        let kind = find(TYPE_COLUMNS);
        let date = find(DATE_COLUMNS);
        let description = find(DESCRIPTION_COLUMNS);
        let counterparty = find(COUNTERPARTY_COLUMNS);
        let currency = find(CURRENCY_COLUMNS);

        let extra = headers
            .iter()
            .enumerate()
            .filter(|(i, _)| !claimed[*i])
            .map(|(i, h)| (i, h.trim().to_string()))
            .collect();

        Ok(ColumnMap {
            id,
            amount,
            kind,
            date,
            description,
            counterparty,
            currency,
            extra,
        })
    }

    fn fields(&self, record: &StringRecord) -> RecordFields {
        let get = |idx: usize| record.get(idx).unwrap_or("").to_string();
        let opt = |idx: Option<usize>| idx.map(get).unwrap_or_default();

        RecordFields {
            transaction_id: get(self.id).trim().to_string(),
            amount: get(self.amount),
            type_label: self.kind.map(get).filter(|t| !t.trim().is_empty()),
            date: opt(self.date),
            description: opt(self.description),
            counterparty: opt(self.counterparty),
            currency: opt(self.currency),
            extra: self
                .extra
                .iter()
                .map(|(idx, header)| (header.clone(), get(*idx)))
                .collect(),
        }
    }
}

// ============================================================================
// PARSER
// ============================================================================

/// Parses vault CSV files. Fails fast: the first structurally bad row
/// aborts the file with its name and line number.
pub struct VaultCsvParser<'a> {
    classifier: &'a dyn Classify,
}

impl<'a> VaultCsvParser<'a> {
    pub fn new(classifier: &'a dyn Classify) -> Self {
        VaultCsvParser { classifier }
    }

    /// Parse a file on disk
    pub fn parse_file(&self, path: &Path) -> Result<Vec<Transaction>> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown.csv")
            .to_string();

        let file = File::open(path).map_err(|e| LedgerError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;

        self.parse_reader(&file_name, file)
    }

    /// Parse CSV from any reader; `file_name` is used for provenance and errors
    pub fn parse_reader<R: Read>(&self, file_name: &str, reader: R) -> Result<Vec<Transaction>> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(false)
            .from_reader(reader);

        let headers = reader
            .headers()
            .map_err(|e| csv_error(file_name, e))?
            .clone();

        if headers.iter().all(|h| h.trim().is_empty()) {
            log::debug!("{}: no header row, treating as empty", file_name);
            return Ok(Vec::new());
        }

        let columns = ColumnMap::from_headers(&headers, file_name)?;
        let mut transactions = Vec::new();

        for (index, result) in reader.records().enumerate() {
            let record = result.map_err(|e| csv_error(file_name, e))?;
            let line = record
                .position()
                .map(|p| p.line())
                .unwrap_or(index as u64 + 2); // 1-indexed + header row

            let fields = columns.fields(&record);
            if fields.transaction_id.is_empty() {
                return Err(LedgerError::MalformedRow {
                    file: file_name.to_string(),
                    line,
                    message: "empty transaction id".to_string(),
                });
            }

            transactions.push(fields.into_transaction(self.classifier, file_name, line));
        }

        log::debug!("{}: parsed {} rows", file_name, transactions.len());
        Ok(transactions)
    }
}

/// Row-shape errors become MalformedRow with the offending line; the rest stay Csv
fn csv_error(file_name: &str, err: csv::Error) -> LedgerError {
    if let csv::ErrorKind::UnequalLengths {
        pos,
        expected_len,
        len,
    } = err.kind()
    {
        return LedgerError::MalformedRow {
            file: file_name.to_string(),
            line: pos.as_ref().map(|p| p.line()).unwrap_or(0),
            message: format!("expected {} fields, found {}", expected_len, len),
        };
    }

    LedgerError::Csv {
        file: file_name.to_string(),
        source: err,
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::RuleEngine;
    use crate::transaction::TransactionType;

    fn parse(csv: &str) -> Result<Vec<Transaction>> {
        let engine = RuleEngine::with_builtin_rules();
        VaultCsvParser::new(&engine).parse_reader("test.csv", csv.as_bytes())
    }

    #[test]
    fn test_normalize_header() {
        assert_eq!(normalize_header("Transaction ID"), "transactionid");
        assert_eq!(normalize_header("transaction_id"), "transactionid");
        assert_eq!(normalize_header("\u{feff}TransactionID"), "transactionid");
        assert_eq!(normalize_header("Counter-Party"), "counterparty");
    }

    #[test]
    fn test_parse_basic_rows() {
        let txs = parse(
            "transaction_id,type,amount,description\n\
             T1,Payment,100.50,Invoice 42\n\
             T2,Fee,2.00,Monthly fee\n",
        )
        .unwrap();

        assert_eq!(txs.len(), 2, "Should parse 2 transactions");
        assert_eq!(txs[0].transaction_id, "T1");
        assert_eq!(txs[0].amount, "100.50");
        assert_eq!(txs[0].kind(), TransactionType::Payment);
        assert_eq!(txs[0].description, "Invoice 42");
        assert_eq!(txs[0].source_file, "test.csv");
        assert_eq!(txs[0].line_number, 2);
        assert_eq!(txs[1].kind(), TransactionType::Fee);
        assert_eq!(txs[1].line_number, 3);
    }

    #[test]
    fn test_amount_kept_verbatim() {
        let err = parse("id,amount\nT1, $1,200.00 \n").unwrap_err();
        // unquoted comma splits the field: structural error, not a numeric one
        assert!(err.is_parse_error());

        let txs = parse("id,amount\nT1,\" $1,200.00 \"\nT2,oops\n").unwrap();
        assert_eq!(txs[0].amount, " $1,200.00 ");
        assert_eq!(txs[1].amount, "oops");
    }

    #[test]
    fn test_header_aliases_and_extra_columns() {
        let txs = parse(
            "Transaction ID,Amount,Kind,Payee,Memo,Branch\n\
             A-1,5,transfer,Savings,Move to savings,North\n",
        )
        .unwrap();

        let tx = &txs[0];
        assert_eq!(tx.transaction_id, "A-1");
        assert_eq!(tx.kind(), TransactionType::Transfer);
        assert_eq!(tx.counterparty, "Savings");
        assert_eq!(tx.description, "Move to savings");
        assert_eq!(tx.extra.get("Branch"), Some(&"North".to_string()));
        assert_eq!(tx.extra.len(), 1);
    }

    #[test]
    fn test_rows_without_type_column_are_classified_by_rules() {
        let txs = parse(
            "id,amount,description\n\
             T1,10,Outgoing wire\n\
             T2,1,Bank fee\n\
             T3,50,Groceries\n",
        )
        .unwrap();

        let kinds: Vec<_> = txs.iter().map(|t| t.kind()).collect();
        assert_eq!(
            kinds,
            vec![TransactionType::Transfer, TransactionType::Fee, TransactionType::Payment]
        );
    }

    #[test]
    fn test_missing_required_column() {
        let err = parse("id,description\nT1,hello\n").unwrap_err();

        match err {
            LedgerError::MissingColumn { file, column } => {
                assert_eq!(file, "test.csv");
                assert_eq!(column, "amount");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_short_row_reports_line() {
        let err = parse("id,amount,type\nT1,1,Fee\nT2,2\n").unwrap_err();

        match err {
            LedgerError::MalformedRow { file, line, .. } => {
                assert_eq!(file, "test.csv");
                assert_eq!(line, 3);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_transaction_id_is_rejected() {
        let err = parse("id,amount\nT1,1\n  ,2\n").unwrap_err();
        assert!(matches!(err, LedgerError::MalformedRow { line: 3, .. }));
    }

    #[test]
    fn test_empty_input_yields_no_rows() {
        assert!(parse("").unwrap().is_empty());
        assert!(parse("id,amount\n").unwrap().is_empty());
    }

    #[test]
    fn test_parse_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("march.csv");
        std::fs::write(&path, "id,amount,type\nM1,9.99,fee\n").unwrap();

        let engine = RuleEngine::new();
        let txs = VaultCsvParser::new(&engine).parse_file(&path).unwrap();

        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].source_file, "march.csv");
        assert_eq!(txs[0].kind(), TransactionType::Fee);
    }

    #[test]
    fn test_parse_file_missing_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let engine = RuleEngine::new();

        let err = VaultCsvParser::new(&engine)
            .parse_file(&dir.path().join("absent.csv"))
            .unwrap_err();

        assert!(matches!(err, LedgerError::Read { .. }), "got {err}");
        assert!(!err.is_parse_error());
    }
}
