//! Project-wide constants.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

pub const AUTHOR: &str = env!("CARGO_PKG_AUTHORS");
pub const HOMEPAGE: &str = env!("CARGO_PKG_HOMEPAGE");
pub const REPO: &str = env!("CARGO_PKG_REPOSITORY");

/// Registry identifier under which the startup hook caches the engine.
pub const BACKGROUND_ENGINE_ID: &str = "background_engine";

/// Entry point bound when no other is configured.
pub const DEFAULT_ENTRY_POINT: &str = "main";

/// Upper bound on a single dispatch into the background engine.
pub const DEFAULT_DISPATCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Environment variable holding the log filter.
pub const LOG_ENV: &str = "MEDTRACK_LOG";

/// Default settings database path: `~/.medtrack/medtrack.db`.
pub fn default_db_path() -> Result<PathBuf> {
    let home = dirs::home_dir().context("cannot determine home directory")?;
    Ok(home.join(".medtrack").join("medtrack.db"))
}

/// Format a number with comma separators (e.g. 1,234,567).
pub fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    for (i, c) in s.chars().enumerate() {
        if i > 0 && (s.len() - i).is_multiple_of(3) {
            result.push(',');
        }
        result.push(c);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consts_are_non_empty() {
        assert!(!AUTHOR.is_empty());
        assert!(!HOMEPAGE.is_empty());
        assert!(!REPO.is_empty());
        assert!(!BACKGROUND_ENGINE_ID.is_empty());
        assert!(!DEFAULT_ENTRY_POINT.is_empty());
    }

    #[test]
    fn repo_points_at_medtrack() {
        assert!(REPO.ends_with("/medtrack"));
    }

    #[test]
    fn default_db_path_lives_under_dot_dir() {
        if let Ok(path) = default_db_path() {
            assert!(path.ends_with(".medtrack/medtrack.db"));
        }
    }

    #[test]
    fn format_number_small() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
    }

    #[test]
    fn format_number_thousands() {
        assert_eq!(format_number(1_000), "1,000");
        assert_eq!(format_number(123_456), "123,456");
        assert_eq!(format_number(1_234_567), "1,234,567");
    }
}
