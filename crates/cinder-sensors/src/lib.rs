//! cinder-sensors - Concrete threat sensors for Cinder
//!
//! Each sensor implements the one-method contract from
//! `cinder_core::threat::Sensor`: a normalized score in [0, 1] and a
//! static weight. Sensors are composed by registration on the
//! aggregator, never by inheritance, and never observe each other.

pub mod integrity;
pub mod panic;
pub mod system;

pub use integrity::FileIntegritySensor;
pub use panic::PanicSensor;
pub use system::SystemLoadSensor;
