//! cinder-core - Session lifecycle and threat aggregation for Cinder
//!
//! "A secret that cannot be destroyed was never yours to keep."
//!
//! Cinder holds secrets only inside an ephemeral session: an opaque
//! identity, a derived encryption key, and an isolated storage area that
//! all die together the moment the aggregated threat level crosses its
//! threshold, the dead-man's switch expires, or the operator panics.
//!
//! This crate is the engine: the session state machine, the key vault,
//! the encrypted secret store, the weighted threat aggregator, and the
//! dead-man's switch. Presentation (console, HTTP) lives elsewhere and
//! consumes only the driver surface re-exported here.

pub mod config;
pub mod deadman;
pub mod error;
pub mod keyvault;
pub mod session;
pub mod store;
pub mod threat;

pub use config::Config;
pub use deadman::DeadManSwitch;
pub use error::{Error, Result};
pub use session::{BurnReport, SessionManager, SessionStatus};
pub use store::SecretStore;
pub use threat::{Sensor, ThreatAggregator};
