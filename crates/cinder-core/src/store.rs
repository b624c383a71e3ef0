//! Session-scoped encrypted secret storage
//!
//! Each session owns an exclusive directory under the OS temp dir; each
//! secret is one `<name>.enc` file of AEAD ciphertext. The store never
//! sees plaintext and has no lifecycle of its own: it is created by
//! `SessionManager::start` and destroyed wholesale during burn.

use std::fs::{self, File, Permissions};
use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// File extension for stored ciphertext.
const SECRET_EXT: &str = "enc";

/// An isolated, session-scoped storage area.
#[derive(Debug)]
pub struct SecretStore {
    root: PathBuf,
}

impl SecretStore {
    /// Create a fresh, exclusive storage area for one session.
    ///
    /// `tag` is a session-unique fragment (an id prefix); creation fails
    /// rather than reuse a directory that already exists, so areas are
    /// never shared across sessions.
    pub fn create(tag: &str) -> Result<Self> {
        let root = std::env::temp_dir().join(format!("cinder-{}", tag));

        fs::create_dir(&root).map_err(|e| {
            Error::Storage(format!("create area {}: {}", root.display(), e))
        })?;
        fs::set_permissions(&root, Permissions::from_mode(0o700))?;

        Ok(Self { root })
    }

    /// The on-disk location of this area.
    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Validate a secret name: non-empty, ASCII, filesystem-safe.
    fn validate_name(name: &str) -> Result<()> {
        if name.is_empty() {
            return Err(Error::InvalidName("name cannot be empty".to_string()));
        }
        if name.contains("..") {
            return Err(Error::InvalidName(format!("invalid name format: {}", name)));
        }
        for c in name.chars() {
            if !c.is_ascii_alphanumeric() && c != '_' && c != '-' && c != '.' {
                return Err(Error::InvalidName(format!(
                    "invalid character '{}' in name",
                    c
                )));
            }
        }
        Ok(())
    }

    fn secret_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{}.{}", name, SECRET_EXT))
    }

    /// Write (or overwrite) a ciphertext blob under `name`.
    pub fn put(&self, name: &str, blob: &[u8]) -> Result<()> {
        Self::validate_name(name)?;

        let path = self.secret_path(name);
        let mut file = File::create(&path)
            .map_err(|e| Error::Storage(format!("write {}: {}", path.display(), e)))?;
        file.write_all(blob)
            .map_err(|e| Error::Storage(format!("write {}: {}", path.display(), e)))?;
        fs::set_permissions(&path, Permissions::from_mode(0o600))?;

        Ok(())
    }

    /// Read the ciphertext stored under `name`, or `None` if absent.
    pub fn get(&self, name: &str) -> Result<Option<Vec<u8>>> {
        Self::validate_name(name)?;

        let path = self.secret_path(name);
        if !path.exists() {
            return Ok(None);
        }

        fs::read(&path)
            .map(Some)
            .map_err(|e| Error::Storage(format!("read {}: {}", path.display(), e)))
    }

    /// List stored secret names, sorted for deterministic output.
    pub fn list(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();

        let entries = fs::read_dir(&self.root)
            .map_err(|e| Error::Storage(format!("list {}: {}", self.root.display(), e)))?;
        for entry in entries {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();
            if let Some(stem) = name.strip_suffix(&format!(".{}", SECRET_EXT)) {
                names.push(stem.to_string());
            }
        }

        names.sort();
        Ok(names)
    }

    /// Irrecoverably remove every secret and the area itself.
    ///
    /// Removal is bottom-up: entries first, then the directory. If
    /// anything survives, that is reported as an error so the caller can
    /// warn the operator - never as silent success.
    pub fn destroy_all(self) -> Result<()> {
        if !self.root.exists() {
            // Nothing to remove; the area never existed or is already gone.
            return Ok(());
        }

        let mut residual = 0usize;
        match fs::read_dir(&self.root) {
            Ok(entries) => {
                for entry in entries.flatten() {
                    if fs::remove_file(entry.path()).is_err() {
                        residual += 1;
                    }
                }
            }
            Err(_) => residual += 1,
        }

        if residual == 0 && fs::remove_dir(&self.root).is_ok() && !self.root.exists() {
            return Ok(());
        }

        Err(Error::Storage(format!(
            "residual entries in {} after destroy",
            self.root.display()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    static TEST_COUNTER: AtomicU64 = AtomicU64::new(0);

    fn temp_store() -> SecretStore {
        let id = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
        let tag = format!("storetest-{}-{}", std::process::id(), id);
        let _ = fs::remove_dir_all(std::env::temp_dir().join(format!("cinder-{}", tag)));
        SecretStore::create(&tag).unwrap()
    }

    #[test]
    fn test_put_get_roundtrip() {
        let store = temp_store();
        store.put("token", b"\x01\x02\x03").unwrap();
        assert_eq!(store.get("token").unwrap(), Some(vec![1, 2, 3]));
        store.destroy_all().unwrap();
    }

    #[test]
    fn test_put_overwrites() {
        let store = temp_store();
        store.put("token", b"old").unwrap();
        store.put("token", b"new").unwrap();
        assert_eq!(store.get("token").unwrap(), Some(b"new".to_vec()));
        store.destroy_all().unwrap();
    }

    #[test]
    fn test_get_missing_is_none_not_error() {
        let store = temp_store();
        assert_eq!(store.get("ghost").unwrap(), None);
        store.destroy_all().unwrap();
    }

    #[test]
    fn test_list_sorted() {
        let store = temp_store();
        store.put("zeta", b"z").unwrap();
        store.put("alpha", b"a").unwrap();
        store.put("mid", b"m").unwrap();
        assert_eq!(store.list().unwrap(), vec!["alpha", "mid", "zeta"]);
        store.destroy_all().unwrap();
    }

    #[test]
    fn test_invalid_names_rejected() {
        let store = temp_store();
        assert!(matches!(store.put("", b"x"), Err(Error::InvalidName(_))));
        assert!(matches!(
            store.put("../escape", b"x"),
            Err(Error::InvalidName(_))
        ));
        assert!(matches!(
            store.put("a/b", b"x"),
            Err(Error::InvalidName(_))
        ));
        assert!(matches!(
            store.put("with space", b"x"),
            Err(Error::InvalidName(_))
        ));
        store.destroy_all().unwrap();
    }

    #[test]
    fn test_non_ascii_names_rejected() {
        let store = temp_store();
        // Names are ASCII-only, not merely Unicode-alphanumeric
        assert!(matches!(
            store.put("héllo", b"x"),
            Err(Error::InvalidName(_))
        ));
        assert!(matches!(
            store.put("名前", b"x"),
            Err(Error::InvalidName(_))
        ));
        store.destroy_all().unwrap();
    }

    #[test]
    fn test_destroy_all_removes_everything() {
        let store = temp_store();
        let root = store.path().to_path_buf();
        store.put("one", b"1").unwrap();
        store.put("two", b"2").unwrap();

        store.destroy_all().unwrap();
        assert!(!root.exists());
    }

    #[test]
    fn test_destroy_all_tolerates_missing_area() {
        let store = temp_store();
        fs::remove_dir_all(store.path()).unwrap();
        // Already gone means nothing residual
        assert!(store.destroy_all().is_ok());
    }

    #[test]
    fn test_areas_are_exclusive() {
        let id = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
        let tag = format!("excl-{}-{}", std::process::id(), id);
        let first = SecretStore::create(&tag).unwrap();
        // Same tag cannot be claimed twice
        assert!(SecretStore::create(&tag).is_err());
        first.destroy_all().unwrap();
    }
}
