//! Ledger configuration.
//!
//! Loaded from TOML, with `LEDGER_*` environment variables taking precedence.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

use register_ledger_payload::PayloadCodecConfig;

use crate::error::{LedgerError, Result};

/// Ledger configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Verify signature and structure of every transaction before storing it.
    pub verify_on_store: bool,

    /// Installation-wide cap on the number of registers.
    pub max_registers: usize,

    /// Payload codec settings.
    pub payload: PayloadCodecConfig,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            verify_on_store: true,
            max_registers: 25,
            payload: PayloadCodecConfig::default(),
        }
    }
}

impl LedgerConfig {
    /// Load from a TOML file. Missing keys take their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| LedgerError::Config(format!("failed to read {}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    /// Parse from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| LedgerError::Config(format!("failed to parse config: {e}")))
    }

    /// Defaults overridden by the process environment.
    pub fn from_env() -> Result<Self> {
        Self::default().with_env_overrides(|key| std::env::var(key).ok())
    }

    /// Apply `LEDGER_*` overrides read through `lookup`.
    ///
    /// Recognised keys: `LEDGER_VERIFY_ON_STORE`, `LEDGER_MAX_REGISTERS`,
    /// `LEDGER_PAYLOAD_COMPRESS`, `LEDGER_PAYLOAD_COMPRESSION_LEVEL` and
    /// `LEDGER_PAYLOAD_MIN_COMPRESS_SIZE`.
    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(v) = parse_var(&lookup, "LEDGER_VERIFY_ON_STORE")? {
            self.verify_on_store = v;
        }
        if let Some(v) = parse_var(&lookup, "LEDGER_MAX_REGISTERS")? {
            self.max_registers = v;
        }
        if let Some(v) = parse_var(&lookup, "LEDGER_PAYLOAD_COMPRESS")? {
            self.payload.compress = v;
        }
        if let Some(v) = parse_var(&lookup, "LEDGER_PAYLOAD_COMPRESSION_LEVEL")? {
            self.payload.compression_level = v;
        }
        if let Some(v) = parse_var(&lookup, "LEDGER_PAYLOAD_MIN_COMPRESS_SIZE")? {
            self.payload.min_compress_size = v;
        }
        Ok(self)
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| LedgerError::Config(format!("{key}={raw:?}: {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = LedgerConfig::default();
        assert!(config.verify_on_store);
        assert_eq!(config.max_registers, 25);
        assert!(config.payload.compress);
        assert_eq!(config.payload.compression_level, 3);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = LedgerConfig::from_toml_str(
            r#"
            max_registers = 5

            [payload]
            compress = false
            "#,
        )
        .unwrap();
        assert_eq!(config.max_registers, 5);
        assert!(config.verify_on_store);
        assert!(!config.payload.compress);
        assert_eq!(config.payload.min_compress_size, 64);
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "verify_on_store = false").unwrap();

        let config = LedgerConfig::from_file(file.path()).unwrap();
        assert!(!config.verify_on_store);
    }

    #[test]
    fn test_bad_toml_is_config_error() {
        assert!(matches!(
            LedgerConfig::from_toml_str("max_registers = \"many\""),
            Err(LedgerError::Config(_))
        ));
        assert!(matches!(
            LedgerConfig::from_file("/definitely/not/here.toml"),
            Err(LedgerError::Config(_))
        ));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("LEDGER_MAX_REGISTERS", "3"),
            ("LEDGER_PAYLOAD_COMPRESSION_LEVEL", "9"),
        ]
        .into_iter()
        .collect();

        let config = LedgerConfig::default()
            .with_env_overrides(|k| vars.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.max_registers, 3);
        assert_eq!(config.payload.compression_level, 9);
        assert!(config.verify_on_store);
    }

    #[test]
    fn test_bad_env_value() {
        let result = LedgerConfig::default().with_env_overrides(|k| {
            (k == "LEDGER_VERIFY_ON_STORE").then(|| "perhaps".to_string())
        });
        assert!(matches!(result, Err(LedgerError::Config(_))));
    }
}
