//! File-based store for sealed credentials with atomic writes.
//!
//! Stores one record under `dirs::data_dir()/<namespace>/credentials.json`.
//! Only sealed values ever reach the disk, and on Unix the record is
//! readable by its owner alone.

use crate::clock::Clock;
use crate::codec::credentials::SealedCredentials;
use crate::KeywardError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

const RECORD_FILE: &str = "credentials.json";
const RECORD_VERSION: u32 = 1;

/// On-disk record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRecord {
    /// Format version.
    pub version: u32,
    /// When the record was written.
    pub saved_at: DateTime<Utc>,
    /// The sealed pair.
    pub credentials: SealedCredentials,
}

impl CredentialRecord {
    /// Wrap sealed credentials, stamping the current time.
    pub fn new(credentials: SealedCredentials, clock: &dyn Clock) -> Self {
        Self {
            version: RECORD_VERSION,
            saved_at: clock.now_utc(),
            credentials,
        }
    }

    /// Serialize the record to JSON.
    pub fn to_json(&self) -> Result<String, KeywardError> {
        serde_json::to_string_pretty(self).map_err(|e| {
            KeywardError::CredentialStore(format!("Failed to serialize record: {}", e))
        })
    }

    /// Deserialize a record from JSON.
    pub fn from_json(json: &str) -> Result<Self, KeywardError> {
        let record: Self = serde_json::from_str(json).map_err(|e| {
            KeywardError::CredentialStore(format!("Failed to deserialize record: {}", e))
        })?;
        if record.version != RECORD_VERSION {
            return Err(KeywardError::CredentialStore(format!(
                "Unsupported record version {}",
                record.version
            )));
        }
        Ok(record)
    }
}

/// File-based credential store.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    dir: PathBuf,
}

impl CredentialStore {
    /// Create a store under `dirs::data_dir()/<namespace>/`.
    pub fn new(namespace: &str) -> Result<Self, KeywardError> {
        let base_dir = dirs::data_dir().ok_or_else(|| {
            KeywardError::CredentialStore("Could not find data directory".to_string())
        })?;
        Self::with_path(base_dir.join(namespace))
    }

    /// Create a store at a specific directory.
    pub fn with_path(dir: PathBuf) -> Result<Self, KeywardError> {
        fs::create_dir_all(&dir).map_err(|e| {
            KeywardError::CredentialStore(format!("Failed to create store dir: {}", e))
        })?;
        Ok(Self { dir })
    }

    fn record_path(&self) -> PathBuf {
        self.dir.join(RECORD_FILE)
    }

    /// Save a record atomically (temp file + rename).
    pub fn save(&self, record: &CredentialRecord) -> Result<(), KeywardError> {
        let target_path = self.record_path();
        let temp_path = self.dir.join(format!("{}.tmp", RECORD_FILE));

        let json = record.to_json()?;

        write_private(&temp_path, json.as_bytes()).map_err(|e| {
            KeywardError::CredentialStore(format!("Failed to write temp file: {}", e))
        })?;

        fs::rename(&temp_path, &target_path).map_err(|e| {
            KeywardError::CredentialStore(format!("Failed to rename record file: {}", e))
        })?;

        tracing::debug!(path = %target_path.display(), "saved sealed credentials");
        Ok(())
    }

    /// Load the record, if one exists.
    pub fn load(&self) -> Result<Option<CredentialRecord>, KeywardError> {
        let path = self.record_path();
        if !path.exists() {
            return Ok(None);
        }

        let json = fs::read_to_string(&path).map_err(|e| {
            KeywardError::CredentialStore(format!("Failed to read record file: {}", e))
        })?;

        CredentialRecord::from_json(&json).map(Some)
    }

    /// Delete the record.
    pub fn delete(&self) -> Result<(), KeywardError> {
        let path = self.record_path();
        if path.exists() {
            fs::remove_file(&path).map_err(|e| {
                KeywardError::CredentialStore(format!("Failed to delete record: {}", e))
            })?;
        }
        Ok(())
    }
}

/// Write `contents` to a fresh file readable only by the owner (0600 on Unix).
fn write_private(path: &Path, contents: &[u8]) -> io::Result<()> {
    // The mode only applies on creation, so a leftover temp file must go.
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }

    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path)?;
    file.write_all(contents)?;
    file.sync_all()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::MockClock;
    use crate::codec::obfuscate::derive_key;
    use tempfile::TempDir;

    fn record(clock: &MockClock) -> CredentialRecord {
        let key = derive_key("UUID:test|203.0.113.7");
        let sealed = SealedCredentials::seal("acct-1", "tok-1", &key).unwrap();
        CredentialRecord::new(sealed, clock)
    }

    #[test]
    fn save_then_load() {
        let temp_dir = TempDir::new().unwrap();
        let store = CredentialStore::with_path(temp_dir.path().to_path_buf()).unwrap();
        let clock = MockClock::from_rfc3339("2025-01-15T12:00:00Z");
        let rec = record(&clock);

        store.save(&rec).unwrap();

        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded, rec);
        assert_eq!(loaded.saved_at.to_rfc3339(), "2025-01-15T12:00:00+00:00");
    }

    #[test]
    fn file_holds_no_plaintext() {
        let temp_dir = TempDir::new().unwrap();
        let store = CredentialStore::with_path(temp_dir.path().to_path_buf()).unwrap();
        let clock = MockClock::from_rfc3339("2025-01-15T12:00:00Z");
        store.save(&record(&clock)).unwrap();

        let raw = fs::read_to_string(temp_dir.path().join(RECORD_FILE)).unwrap();
        assert!(!raw.contains("acct-1"));
        assert!(!raw.contains("tok-1"));
        assert!(!temp_dir.path().join("credentials.json.tmp").exists());
    }

    #[cfg(unix)]
    #[test]
    fn record_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let store = CredentialStore::with_path(temp_dir.path().to_path_buf()).unwrap();
        let clock = MockClock::from_rfc3339("2025-01-15T12:00:00Z");

        // A stale temp file with loose permissions must not leak its mode.
        fs::write(temp_dir.path().join("credentials.json.tmp"), "stale").unwrap();
        fs::set_permissions(
            temp_dir.path().join("credentials.json.tmp"),
            fs::Permissions::from_mode(0o644),
        )
        .unwrap();

        store.save(&record(&clock)).unwrap();
        let mode = fs::metadata(temp_dir.path().join(RECORD_FILE))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn save_overwrites_previous_record() {
        let temp_dir = TempDir::new().unwrap();
        let store = CredentialStore::with_path(temp_dir.path().to_path_buf()).unwrap();
        let first = MockClock::from_rfc3339("2025-01-15T12:00:00Z");
        let second = MockClock::from_rfc3339("2025-01-16T12:00:00Z");

        store.save(&record(&first)).unwrap();
        store.save(&record(&second)).unwrap();
        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.saved_at.to_rfc3339(), "2025-01-16T12:00:00+00:00");
    }

    #[test]
    fn load_missing_is_none() {
        let temp_dir = TempDir::new().unwrap();
        let store = CredentialStore::with_path(temp_dir.path().to_path_buf()).unwrap();
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn delete_removes_record() {
        let temp_dir = TempDir::new().unwrap();
        let store = CredentialStore::with_path(temp_dir.path().to_path_buf()).unwrap();
        let clock = MockClock::from_rfc3339("2025-01-15T12:00:00Z");
        store.save(&record(&clock)).unwrap();

        store.delete().unwrap();
        assert!(store.load().unwrap().is_none());
        store.delete().unwrap();
    }

    #[test]
    fn corrupt_record_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let store = CredentialStore::with_path(temp_dir.path().to_path_buf()).unwrap();
        fs::write(temp_dir.path().join(RECORD_FILE), "not json").unwrap();
        assert!(matches!(store.load(), Err(KeywardError::CredentialStore(_))));
    }

    #[test]
    fn unknown_version_rejected() {
        let clock = MockClock::from_rfc3339("2025-01-15T12:00:00Z");
        let mut rec = record(&clock);
        rec.version = 99;
        let json = rec.to_json().unwrap();
        assert!(CredentialRecord::from_json(&json).is_err());
    }
}
