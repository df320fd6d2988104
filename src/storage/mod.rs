//! Persistence of crash histories.
//!
//! Histories are kept as pretty-printed JSON arrays in the same shape the
//! Stake API returns, so a file exported from the browser console loads
//! directly.

use anyhow::{Context, Result};
use std::path::Path;
use tracing::{debug, info};

use crate::types::CrashRecord;

/// Default export file name for a given date, e.g.
/// `stake_crash_bets_2025-06-02.json`.
pub fn export_file_name(date: chrono::NaiveDate) -> String {
    format!("stake_crash_bets_{}.json", date.format("%Y-%m-%d"))
}

/// Save a history to a JSON file.
pub fn save_records(records: &[CrashRecord], path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(records).context("Failed to serialise crash history")?;

    std::fs::write(path, &json)
        .with_context(|| format!("Failed to write history to {}", path.display()))?;

    debug!(path = %path.display(), count = records.len(), "History saved");
    Ok(())
}

/// Load a history from a JSON file.
pub fn load_records(path: &Path) -> Result<Vec<CrashRecord>> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read history from {}", path.display()))?;

    let records: Vec<CrashRecord> = serde_json::from_str(&json)
        .with_context(|| format!("Invalid crash history JSON in {}", path.display()))?;

    info!(path = %path.display(), count = records.len(), "History loaded from disk");
    Ok(records)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn temp_path() -> PathBuf {
        let mut p = std::env::temp_dir();
        p.push(format!("crash_history_test_{}.json", uuid::Uuid::new_v4()));
        p
    }

    #[test]
    fn test_save_and_load() {
        let path = temp_path();
        let records = vec![
            CrashRecord::from_crashpoint(1.23),
            CrashRecord::from_crashpoint(45.6),
        ];
        save_records(&records, &path).unwrap();

        let loaded = load_records(&path).unwrap();
        assert_eq!(loaded, records);

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_load_console_export() {
        let path = temp_path();
        std::fs::write(
            &path,
            r#"[
  {
    "id": "2f4a",
    "startTime": "Mon, 02 Jun 2025 10:00:00 GMT",
    "crashpoint": 1.07,
    "hash": { "id": "9c1", "hash": "e3b0c442", "__typename": "CrashGameHash" },
    "__typename": "MultiplayerCrash"
  }
]"#,
        )
        .unwrap();

        let loaded = load_records(&path).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].crashpoint, 1.07);
        assert_eq!(loaded[0].hash.hash, "e3b0c442");

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_records(Path::new("/tmp/crash_history_does_not_exist_xyz.json")).unwrap_err();
        assert!(err.to_string().contains("Failed to read history"));
    }

    #[test]
    fn test_load_invalid_json() {
        let path = temp_path();
        std::fs::write(&path, r#"{"not": "a list"}"#).unwrap();
        let err = load_records(&path).unwrap_err();
        assert!(err.to_string().contains("Invalid crash history JSON"));
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_export_file_name() {
        let date = chrono::NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
        assert_eq!(export_file_name(date), "stake_crash_bets_2025-06-02.json");
    }
}
