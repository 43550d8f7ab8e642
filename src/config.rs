// Configuration - resolved once at startup, passed explicitly everywhere else

use crate::error::{LedgerError, Result};
use std::path::{Component, Path, PathBuf};

pub const VAULT_DIR_VAR: &str = "VAULT_DIR";
pub const LEDGER_DIR_VAR: &str = "LEDGER_DIR";
pub const RULES_FILE_VAR: &str = "LEDGER_RULES_FILE";
pub const BIND_ADDR_VAR: &str = "LEDGER_BIND_ADDR";

pub const DEFAULT_VAULT_DIR: &str = "vault";
pub const DEFAULT_LEDGER_DIR: &str = "ledger";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerConfig {
    /// Directory holding the raw CSV files
    pub vault_dir: PathBuf,

    /// Directory receiving FK_MASTER_LEDGER.md
    pub ledger_dir: PathBuf,

    /// Optional JSON classification rules
    pub rules_file: Option<PathBuf>,

    /// Listen address for the HTTP server
    pub bind_addr: String,
}

impl LedgerConfig {
    /// Resolve from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let vault_dir = resolve_dir(
            "vault",
            &get(VAULT_DIR_VAR).unwrap_or_else(|| DEFAULT_VAULT_DIR.to_string()),
        )?;
        let ledger_dir = resolve_dir(
            "ledger",
            &get(LEDGER_DIR_VAR).unwrap_or_else(|| DEFAULT_LEDGER_DIR.to_string()),
        )?;
        let rules_file = get(RULES_FILE_VAR)
            .map(|raw| resolve_dir("rules file", &raw))
            .transpose()?;
        let bind_addr = get(BIND_ADDR_VAR).unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());

        Ok(LedgerConfig {
            vault_dir,
            ledger_dir,
            rules_file,
            bind_addr,
        })
    }

    /// Build a config from already-known directories (tests, embedding)
    pub fn with_dirs(vault_dir: impl Into<PathBuf>, ledger_dir: impl Into<PathBuf>) -> Self {
        LedgerConfig {
            vault_dir: vault_dir.into(),
            ledger_dir: ledger_dir.into(),
            rules_file: None,
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
        }
    }
}

/// Make `raw` absolute against the current directory and clean it lexically
pub fn resolve_dir(role: &'static str, raw: &str) -> Result<PathBuf> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(LedgerError::InvalidPath {
            role,
            reason: "path is empty".to_string(),
        });
    }

    let path = Path::new(raw);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        let cwd = std::env::current_dir().map_err(|e| LedgerError::InvalidPath {
            role,
            reason: format!("cannot determine current directory: {}", e),
        })?;
        cwd.join(path)
    };

    Ok(clean_path(&absolute))
}

/// Lexical cleanup: drops `.` and collapses `..` without touching the disk.
/// `..` never climbs above the root.
pub fn clean_path(path: &Path) -> PathBuf {
    let mut cleaned = PathBuf::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let at_root = matches!(
                    cleaned.components().next_back(),
                    None | Some(Component::RootDir) | Some(Component::Prefix(_))
                );
                if !at_root {
                    cleaned.pop();
                }
            }
            other => cleaned.push(other.as_os_str()),
        }
    }

    cleaned
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_are_absolute() {
        let config = LedgerConfig::from_lookup(|_| None).unwrap();

        assert!(config.vault_dir.is_absolute());
        assert!(config.vault_dir.ends_with("vault"));
        assert!(config.ledger_dir.ends_with("ledger"));
        assert_eq!(config.rules_file, None);
        assert_eq!(config.bind_addr, DEFAULT_BIND_ADDR);
    }

    #[test]
    fn test_overrides_are_cleaned() {
        let config = LedgerConfig::from_lookup(lookup_from(&[
            (VAULT_DIR_VAR, "/srv/data/./vault/../csv"),
            (LEDGER_DIR_VAR, "/srv/out"),
            (BIND_ADDR_VAR, "127.0.0.1:8080"),
        ]))
        .unwrap();

        assert_eq!(config.vault_dir, PathBuf::from("/srv/data/csv"));
        assert_eq!(config.ledger_dir, PathBuf::from("/srv/out"));
        assert_eq!(config.bind_addr, "127.0.0.1:8080");
    }

    #[test]
    fn test_empty_value_falls_back_to_default() {
        let config = LedgerConfig::from_lookup(lookup_from(&[(VAULT_DIR_VAR, "   ")])).unwrap();
        assert!(config.vault_dir.ends_with(DEFAULT_VAULT_DIR));
    }

    #[test]
    fn test_parent_dir_stops_at_root() {
        assert_eq!(clean_path(Path::new("/../../etc")), PathBuf::from("/etc"));
    }

    #[test]
    fn test_resolve_dir_rejects_empty() {
        let err = resolve_dir("vault", "").unwrap_err();
        assert!(err.is_path_error());
    }
}
