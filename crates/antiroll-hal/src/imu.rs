//! Generic `ImuSource` trait for accelerometer/gyroscope drivers.
//!
//! Sensor acquisition is the only operation in the control cycle that may
//! block, so the trait is async and the control loop bounds every read with
//! a timeout.

use antiroll_types::{AntirollError, RawReading};
use async_trait::async_trait;

/// A periodic inertial sensor.
///
/// Implementations return whatever the SDK delivered as a [`RawReading`];
/// component arity is validated downstream, not here.
#[async_trait]
pub trait ImuSource: Send {
    /// Stable identifier for this sensor, e.g. `"onboard_imu"`.
    fn id(&self) -> &str;

    /// Wait for the next reading.
    ///
    /// # Errors
    ///
    /// Returns [`AntirollError::SensorFault`] when the device cannot produce
    /// a reading.
    async fn read(&mut self) -> Result<RawReading, AntirollError>;
}
