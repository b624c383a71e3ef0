//! Error types shared across the Cinder core

use thiserror::Error;

/// Core errors. All of these are ordinary outcomes reported to the
/// caller; none are used for control flow and none are fatal to the
/// process.
#[derive(Error, Debug)]
pub enum Error {
    /// `start()` was called while a session is already live.
    /// Burn explicitly first; Cinder never restarts implicitly.
    #[error("session already active - burn it before starting a new one")]
    AlreadyActive,

    /// A secret or credential operation needs a live session.
    #[error("no active session")]
    NotActive,

    /// Encryption or decryption failed - wrong key, tampered or
    /// foreign ciphertext. Never conflated with "not found".
    #[error("crypto failure: {0}")]
    Crypto(String),

    /// The session storage area misbehaved (write, read or removal).
    #[error("storage failure: {0}")]
    Storage(String),

    /// Secret names must be non-empty and filesystem-safe.
    #[error("invalid secret name: {0}")]
    InvalidName(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
