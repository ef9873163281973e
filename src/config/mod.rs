//! Persistent host settings backed by SQLite.
//!
//! Only settings live here. Engines and identifiers are never written to
//! disk; the registry is rebuilt on every process start.

use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use rusqlite::Connection;

use crate::consts::DEFAULT_DISPATCH_TIMEOUT;
use crate::engine::EngineConfig;
use crate::entry::EntryPointRef;

/// Entry point the startup hook binds to.
pub const ENTRY_POINT_KEY: &str = "engine.entry_point";

/// Per-dispatch timeout in whole seconds.
pub const DISPATCH_TIMEOUT_KEY: &str = "engine.dispatch_timeout_secs";

/// Keys `set` accepts.
pub const KNOWN_KEYS: &[&str] = &[ENTRY_POINT_KEY, DISPATCH_TIMEOUT_KEY];

/// Persistent key-value configuration store.
pub struct Config {
    conn: Mutex<Connection>,
}

impl Config {
    /// Open or create the config table in the given database.
    /// Use `":memory:"` for tests.
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path).context("failed to open config database")?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS config (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
        )
        .context("failed to create config table")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("config connection lock poisoned"))
    }

    /// Get a config value by key.
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT value FROM config WHERE key = ?1")?;
        let mut rows = stmt.query([key])?;
        match rows.next()? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }

    /// Set a known config value (upsert). Values are checked before writing.
    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        match key {
            ENTRY_POINT_KEY => {
                if value.trim().is_empty() {
                    bail!("{key} must not be empty");
                }
            }
            DISPATCH_TIMEOUT_KEY => {
                parse_timeout(value)?;
            }
            _ => bail!("unknown config key: {key} (known: {})", KNOWN_KEYS.join(", ")),
        }

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO config (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            [key, value],
        )?;
        Ok(())
    }

    /// Remove a config key.
    pub fn remove(&self, key: &str) -> Result<()> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM config WHERE key = ?1", [key])?;
        Ok(())
    }

    /// The configured entry point, or the default one.
    pub fn entry_point(&self) -> Result<EntryPointRef> {
        Ok(self
            .get(ENTRY_POINT_KEY)?
            .map(EntryPointRef::new)
            .unwrap_or_default())
    }

    /// The configured dispatch timeout, or the default one.
    pub fn dispatch_timeout(&self) -> Result<Duration> {
        match self.get(DISPATCH_TIMEOUT_KEY)? {
            Some(value) => parse_timeout(&value),
            None => Ok(DEFAULT_DISPATCH_TIMEOUT),
        }
    }

    pub fn engine_config(&self) -> Result<EngineConfig> {
        Ok(EngineConfig {
            dispatch_timeout: self.dispatch_timeout()?,
        })
    }
}

fn parse_timeout(value: &str) -> Result<Duration> {
    let secs: u64 = value
        .trim()
        .parse()
        .with_context(|| format!("{DISPATCH_TIMEOUT_KEY} must be whole seconds, got {value:?}"))?;
    if secs == 0 {
        bail!("{DISPATCH_TIMEOUT_KEY} must be at least 1 second");
    }
    Ok(Duration::from_secs(secs))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mem_config() -> Config {
        Config::open(":memory:").unwrap()
    }

    #[test]
    fn get_returns_none_for_missing_key() {
        let config = mem_config();
        assert!(config.get(ENTRY_POINT_KEY).unwrap().is_none());
    }

    #[test]
    fn set_overwrites_existing() {
        let config = mem_config();
        config.set(ENTRY_POINT_KEY, "old").unwrap();
        config.set(ENTRY_POINT_KEY, "new").unwrap();
        assert_eq!(config.get(ENTRY_POINT_KEY).unwrap().unwrap(), "new");
    }

    #[test]
    fn set_rejects_unknown_key() {
        let config = mem_config();
        let err = config.set("theme", "dark").unwrap_err();
        assert!(err.to_string().contains("unknown config key"));
    }

    #[test]
    fn set_rejects_bad_values() {
        let config = mem_config();
        assert!(config.set(ENTRY_POINT_KEY, "  ").is_err());
        assert!(config.set(DISPATCH_TIMEOUT_KEY, "soon").is_err());
        assert!(config.set(DISPATCH_TIMEOUT_KEY, "0").is_err());
        assert!(config.get(DISPATCH_TIMEOUT_KEY).unwrap().is_none());
    }

    #[test]
    fn remove_deletes_key() {
        let config = mem_config();
        config.set(ENTRY_POINT_KEY, "nightly").unwrap();
        config.remove(ENTRY_POINT_KEY).unwrap();
        assert!(config.get(ENTRY_POINT_KEY).unwrap().is_none());
    }

    #[test]
    fn remove_nonexistent_is_ok() {
        let config = mem_config();
        config.remove(DISPATCH_TIMEOUT_KEY).unwrap();
    }

    #[test]
    fn typed_accessors_fall_back_to_defaults() {
        let config = mem_config();
        assert_eq!(config.entry_point().unwrap(), EntryPointRef::default());
        assert_eq!(config.engine_config().unwrap(), EngineConfig::default());
    }

    #[test]
    fn typed_accessors_read_stored_values() {
        let config = mem_config();
        config.set(ENTRY_POINT_KEY, "nightly").unwrap();
        config.set(DISPATCH_TIMEOUT_KEY, "5").unwrap();
        assert_eq!(config.entry_point().unwrap().name(), "nightly");
        assert_eq!(config.dispatch_timeout().unwrap(), Duration::from_secs(5));
    }

    #[test]
    fn persists_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config-test.db");
        let path_str = path.to_str().unwrap();

        {
            let config = Config::open(path_str).unwrap();
            config.set(DISPATCH_TIMEOUT_KEY, "12").unwrap();
        }

        {
            let config = Config::open(path_str).unwrap();
            assert_eq!(config.dispatch_timeout().unwrap(), Duration::from_secs(12));
        }
    }
}
