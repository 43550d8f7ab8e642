// 🏷️ Classification Rules - Rules as Data
// Decides the TransactionType of every parsed row

use crate::parser::RecordFields;
use crate::transaction::TransactionType;
use anyhow::{Context as AnyhowContext, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

// ============================================================================
// CLASSIFIER CAPABILITY
// ============================================================================

/// Row → TransactionType. Implementations must be total: every row gets
/// exactly one kind.
pub trait Classify: Send + Sync {
    fn classify(&self, row: &RecordFields) -> TransactionType;
}

impl<F> Classify for F
where
    F: Fn(&RecordFields) -> TransactionType + Send + Sync,
{
    fn classify(&self, row: &RecordFields) -> TransactionType {
        self(row)
    }
}

// ============================================================================
// RULE DEFINITION
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationRule {
    /// Rule ID for tracking
    pub id: String,

    /// Pattern to match against description and counterparty.
    /// With `*`: wildcard match over the whole text.
    /// Without: whole-word match anywhere in the text.
    pub pattern: String,

    /// Type assigned when the pattern matches
    pub transaction_type: TransactionType,

    /// Description/notes about this rule
    #[serde(default)]
    pub description: Option<String>,

    /// Priority (higher = applied first)
    #[serde(default = "default_priority")]
    pub priority: i32,
}

fn default_priority() -> i32 {
    0
}

impl ClassificationRule {
    pub fn new(id: &str, pattern: &str, transaction_type: TransactionType, priority: i32) -> Self {
        ClassificationRule {
            id: id.to_string(),
            pattern: pattern.to_string(),
            transaction_type,
            description: None,
            priority,
        }
    }

    /// Check if pattern matches the given text (case-insensitive)
    pub fn matches(&self, text: &str) -> bool {
        let pattern_lower = self.pattern.to_lowercase();
        let text_lower = text.to_lowercase();

        if pattern_lower.contains('*') {
            wildcard_match(&pattern_lower, &text_lower)
        } else {
            word_match(&pattern_lower, &text_lower)
        }
    }
}

fn wildcard_match(pattern: &str, text: &str) -> bool {
    let parts: Vec<&str> = pattern.split('*').collect();
    let first = parts[0];
    let last = parts[parts.len() - 1];

    if !text.starts_with(first) {
        return false;
    }
    if text.len() < first.len() + last.len() || !text.ends_with(last) {
        return false;
    }

    // Middle parts appear in order between the anchors
    let end = text.len() - last.len();
    let mut current_pos = first.len();
    for part in &parts[1..parts.len() - 1] {
        if part.is_empty() {
            continue;
        }
        match text[current_pos..end].find(part) {
            Some(pos) => current_pos += pos + part.len(),
            None => return false,
        }
    }

    true
}

fn words(text: &str) -> Vec<&str> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect()
}

fn word_match(pattern: &str, text: &str) -> bool {
    let needle = words(pattern);
    if needle.is_empty() {
        return false;
    }
    words(text).windows(needle.len()).any(|window| window == needle.as_slice())
}

// ============================================================================
// RULE ENGINE
// ============================================================================

/// Default classifier.
///
/// Resolution order:
/// 1. an explicit, recognised `type` column
/// 2. the first matching rule (highest priority first)
/// 3. the engine's default type
pub struct RuleEngine {
    rules: Vec<ClassificationRule>,
    default_type: TransactionType,
}

impl RuleEngine {
    /// Create a new empty rule engine
    pub fn new() -> Self {
        RuleEngine {
            rules: Vec::new(),
            default_type: TransactionType::Payment,
        }
    }

    /// Engine with the stock keyword rules for fees and transfers
    pub fn with_builtin_rules() -> Self {
        RuleEngine::from_rules(builtin_rules())
    }

    /// Load rules from JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read rules file: {:?}", path.as_ref()))?;

        let rules: Vec<ClassificationRule> =
            serde_json::from_str(&content).context("Failed to parse rules JSON")?;

        Ok(RuleEngine::from_rules(rules))
    }

    /// Create engine from a list of rules
    pub fn from_rules(mut rules: Vec<ClassificationRule>) -> Self {
        // Stable sort keeps file order among equal priorities
        rules.sort_by(|a, b| b.priority.cmp(&a.priority));
        RuleEngine {
            rules,
            default_type: TransactionType::Payment,
        }
    }

    /// Type given to rows no rule matches
    pub fn with_default_type(mut self, default_type: TransactionType) -> Self {
        self.default_type = default_type;
        self
    }

    /// Add a single rule
    pub fn add_rule(&mut self, rule: ClassificationRule) {
        self.rules.push(rule);
        self.rules.sort_by(|a, b| b.priority.cmp(&a.priority));
    }

    /// First matching rule, if any
    pub fn matching_rule(&self, row: &RecordFields) -> Option<&ClassificationRule> {
        self.rules
            .iter()
            .find(|rule| rule.matches(&row.description) || rule.matches(&row.counterparty))
    }

    /// Get number of rules loaded
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::with_builtin_rules()
    }
}

impl Classify for RuleEngine {
    fn classify(&self, row: &RecordFields) -> TransactionType {
        if let Some(kind) = row.type_label.as_deref().and_then(TransactionType::from_label) {
            return kind;
        }

        self.matching_rule(row)
            .map(|rule| rule.transaction_type)
            .unwrap_or(self.default_type)
    }
}

fn builtin_rules() -> Vec<ClassificationRule> {
    vec![
        ClassificationRule::new("fee", "fee", TransactionType::Fee, 20),
        ClassificationRule::new("fees", "fees", TransactionType::Fee, 20),
        ClassificationRule::new("charge", "charge", TransactionType::Fee, 20),
        ClassificationRule::new("commission", "commission", TransactionType::Fee, 20),
        ClassificationRule::new("transfer", "transfer", TransactionType::Transfer, 10),
        ClassificationRule::new("wire", "wire", TransactionType::Transfer, 10),
        ClassificationRule::new("xfer", "xfer", TransactionType::Transfer, 10),
    ]
}

// ============================================================================
// TESTS
// ============================================================================
