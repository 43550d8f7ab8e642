// 📊 Summary Statistics - counts and sums per transaction type
// Unparsable amounts count as a transaction but contribute 0.0

use crate::transaction::{Transaction, TransactionType};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// AMOUNT PARSING
// ============================================================================

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AmountError {
    #[error("amount is empty")]
    Empty,

    #[error("'{0}' is not a decimal number")]
    NotANumber(String),

    #[error("'{0}' is not a finite number")]
    NotFinite(String),
}

/// Parse a stored amount string.
///
/// Accepts surrounding whitespace, a leading sign, a `$` after the sign,
/// and `,` thousands separators in groups of three ("-$1,234.50").
pub fn parse_amount(raw: &str) -> Result<f64, AmountError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AmountError::Empty);
    }

    let (sign, rest) = match trimmed.as_bytes()[0] {
        b'-' => ("-", &trimmed[1..]),
        b'+' => ("", &trimmed[1..]),
        _ => ("", trimmed),
    };
    let rest = rest.strip_prefix('$').unwrap_or(rest);

    let digits = if rest.contains(',') {
        strip_thousands(rest).ok_or_else(|| AmountError::NotANumber(raw.to_string()))?
    } else {
        rest.to_string()
    };

    // Rust's float grammar allows "inf"/"nan"; those are not amounts
    if digits.is_empty() || !digits.starts_with(|c: char| c.is_ascii_digit() || c == '.') {
        return Err(AmountError::NotANumber(raw.to_string()));
    }

    let value: f64 = format!("{}{}", sign, digits)
        .parse()
        .map_err(|_| AmountError::NotANumber(raw.to_string()))?;

    if !value.is_finite() {
        return Err(AmountError::NotFinite(raw.to_string()));
    }

    Ok(value)
}

/// "1,234,567.89" → "1234567.89"; None if the grouping is wrong
fn strip_thousands(text: &str) -> Option<String> {
    let (int_part, frac_part) = match text.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (text, None),
    };

    let groups: Vec<&str> = int_part.split(',').collect();
    let head_ok = (1..=3).contains(&groups[0].len());
    let tail_ok = groups[1..].iter().all(|g| g.len() == 3);
    let digits_ok = groups.iter().all(|g| g.chars().all(|c| c.is_ascii_digit()));
    if !(head_ok && tail_ok && digits_ok) {
        return None;
    }

    let mut out = groups.concat();
    if let Some(frac) = frac_part {
        out.push('.');
        out.push_str(frac);
    }
    Some(out)
}

// ============================================================================
// SUMMARY STATS
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryStats {
    pub total_transactions: usize,
    pub total_payments: usize,
    pub total_transfers: usize,
    pub total_fees: usize,
    pub payments_sum: f64,
    pub transfers_sum: f64,
    pub fees_sum: f64,
    /// payments_sum + transfers_sum + fees_sum, no sign convention applied
    pub net_liquidity: f64,
}

impl SummaryStats {
    pub fn count_for(&self, kind: TransactionType) -> usize {
        match kind {
            TransactionType::Payment => self.total_payments,
            TransactionType::Transfer => self.total_transfers,
            TransactionType::Fee => self.total_fees,
        }
    }

    pub fn sum_for(&self, kind: TransactionType) -> f64 {
        match kind {
            TransactionType::Payment => self.payments_sum,
            TransactionType::Transfer => self.transfers_sum,
            TransactionType::Fee => self.fees_sum,
        }
    }
}

/// Fold transactions into SummaryStats. Never fails: a bad amount is
/// logged and counted with a zero contribution.
pub fn calculate_summary(transactions: &[Transaction]) -> SummaryStats {
    let mut stats = SummaryStats {
        total_transactions: transactions.len(),
        ..SummaryStats::default()
    };

    for tx in transactions {
        let amount = match parse_amount(&tx.amount) {
            Ok(value) => value,
            Err(e) => {
                log::warn!(
                    "Failed to parse amount '{}' for transaction {} ({}), treating as 0.0",
                    tx.amount,
                    tx.transaction_id,
                    e
                );
                0.0
            }
        };

        match tx.kind() {
            TransactionType::Payment => {
                stats.total_payments += 1;
                stats.payments_sum += amount;
            }
            TransactionType::Transfer => {
                stats.total_transfers += 1;
                stats.transfers_sum += amount;
            }
            TransactionType::Fee => {
                stats.total_fees += 1;
                stats.fees_sum += amount;
            }
        }
    }

    stats.net_liquidity = stats.payments_sum + stats.transfers_sum + stats.fees_sum;
    stats
}
