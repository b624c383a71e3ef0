//! Session lifecycle
//!
//! `SessionManager` is the sole authority over the live session: an
//! opaque identity, a derived key, and an isolated storage area that
//! exist together or not at all. All state transitions and all key or
//! storage accesses serialize on one mutex, so a burn in progress is
//! never interleaved with a read or write - once `burn` returns, every
//! later operation on any thread observes the dead session.

use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use tracing::{debug, warn};
use zeroize::{Zeroize, Zeroizing};

use crate::error::{Error, Result};
use crate::keyvault;
use crate::store::SecretStore;

/// Salt length for session identity derivation.
const SALT_LEN: usize = 16;

/// Fresh OS entropy mixed into each session identity.
const ENTROPY_LEN: usize = 32;

/// Length of the identity fragment exposed to drivers.
const ID_PREFIX_LEN: usize = 8;

/// The live session. Exists only between `start` and `burn`; its key
/// and identity are zeroized before the value is dropped.
struct Session {
    id: Zeroizing<String>,
    key: Zeroizing<[u8; keyvault::KEY_LEN]>,
    store: SecretStore,
    started_at: DateTime<Utc>,
}

/// Driver-facing view of the session state. Never carries key material,
/// only a truncated display fragment of the identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStatus {
    pub active: bool,
    pub id_prefix: Option<String>,
}

/// Outcome of a burn. The in-memory teardown is unconditional; a
/// residual error means physical cleanup partially failed and the
/// operator should be warned about leftover ciphertext on disk.
#[derive(Debug)]
pub struct BurnReport {
    pub was_active: bool,
    pub residual: Option<Error>,
}

/// Orchestrates key derivation, secret storage and destructive
/// teardown for the single live session.
pub struct SessionManager {
    inner: Mutex<Option<Session>>,
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionManager {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(None),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<Session>> {
        self.inner.lock().expect("session state lock poisoned")
    }

    /// Start a new session.
    ///
    /// Fails with [`Error::AlreadyActive`] if one is live - Cinder
    /// mandates an explicit burn first, never an implicit restart.
    pub fn start(&self) -> Result<()> {
        let mut slot = self.lock();
        Self::start_locked(&mut slot)
    }

    fn start_locked(slot: &mut Option<Session>) -> Result<()> {
        if slot.is_some() {
            return Err(Error::AlreadyActive);
        }

        let mut salt = [0u8; SALT_LEN];
        OsRng.fill_bytes(&mut salt);

        let started_at = Utc::now();
        let mut entropy = Zeroizing::new([0u8; ENTROPY_LEN + 16]);
        OsRng.fill_bytes(&mut entropy[..ENTROPY_LEN]);
        entropy[ENTROPY_LEN..].copy_from_slice(
            &(started_at.timestamp_nanos_opt().unwrap_or_default() as i128).to_le_bytes(),
        );

        let id = Zeroizing::new(keyvault::derive_session_id(&salt, &entropy[..]));
        let key = keyvault::derive_key(&id);
        let store = SecretStore::create(&id[..16])?;

        debug!(prefix = &id[..ID_PREFIX_LEN], "session started");

        *slot = Some(Session {
            id,
            key,
            store,
            started_at,
        });
        Ok(())
    }

    /// Encrypt `content` under the session key and persist it.
    ///
    /// [`Error::NotActive`] is an ordinary outcome here: a session
    /// burned mid-call is expected, not a crash.
    pub fn store_secret(&self, name: &str, content: &str) -> Result<()> {
        let slot = self.lock();
        let session = slot.as_ref().ok_or(Error::NotActive)?;

        let blob = keyvault::encrypt(&session.key, content.as_bytes())?;
        session.store.put(name, &blob)
    }

    /// Fetch and decrypt a secret.
    ///
    /// Returns `Ok(None)` both for an unknown name and for an inactive
    /// session - callers cannot distinguish "never existed" from
    /// "burned", by design. Decryption failures surface as
    /// [`Error::Crypto`], never as absence.
    pub fn retrieve_secret(&self, name: &str) -> Result<Option<String>> {
        let slot = self.lock();
        let Some(session) = slot.as_ref() else {
            return Ok(None);
        };

        let Some(blob) = session.store.get(name)? else {
            return Ok(None);
        };

        let plaintext = keyvault::decrypt(&session.key, &blob)?;
        String::from_utf8(plaintext)
            .map(Some)
            .map_err(|_| Error::Crypto("secret is not valid UTF-8".to_string()))
    }

    /// Names of currently stored secrets; empty when inactive.
    pub fn list_secrets(&self) -> Result<Vec<String>> {
        let slot = self.lock();
        match slot.as_ref() {
            Some(session) => session.store.list(),
            None => Ok(Vec::new()),
        }
    }

    /// Deterministic per-session service credential, `None` when
    /// inactive. Same label, same credential - until regeneration.
    pub fn derive_service_credential(&self, label: &str, length: usize) -> Option<String> {
        let slot = self.lock();
        slot.as_ref()
            .map(|session| keyvault::derive_credential(&session.id, label, length))
    }

    /// Driver-facing state: active flag and a non-reversible identity
    /// fragment.
    pub fn status(&self) -> SessionStatus {
        let slot = self.lock();
        match slot.as_ref() {
            Some(session) => SessionStatus {
                active: true,
                id_prefix: Some(session.id[..ID_PREFIX_LEN].to_string()),
            },
            None => SessionStatus {
                active: false,
                id_prefix: None,
            },
        }
    }

    /// When the live session started, if any.
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.lock().as_ref().map(|s| s.started_at)
    }

    /// Irreversibly destroy the session.
    ///
    /// Under the lock: the session leaves the slot (the linearization
    /// point - every subsequent operation sees inactive), the key and
    /// identity are overwritten with zeros, then the storage area is
    /// removed bottom-up. A storage failure never resurrects the
    /// session; it is carried in the report as a residual warning.
    /// Burning an already-burned manager is a no-op.
    pub fn burn(&self) -> BurnReport {
        let mut slot = self.lock();
        Self::burn_locked(&mut slot)
    }

    fn burn_locked(slot: &mut Option<Session>) -> BurnReport {
        let Some(mut session) = slot.take() else {
            return BurnReport {
                was_active: false,
                residual: None,
            };
        };

        session.key.zeroize();
        session.id.zeroize();

        let residual = session.store.destroy_all().err();
        match &residual {
            None => debug!("session burned"),
            Some(e) => warn!(error = %e, "session burned with residual storage"),
        }

        BurnReport {
            was_active: true,
            residual,
        }
    }

    /// Burn, then immediately start a fresh session sharing no derived
    /// material with the old one. Atomic with respect to concurrent
    /// callers: nobody observes the gap between the two.
    pub fn regenerate(&self) -> Result<BurnReport> {
        let mut slot = self.lock();
        let report = Self::burn_locked(&mut slot);
        Self::start_locked(&mut slot)?;
        Ok(report)
    }
}
