//! `antiroll-types` – shared data model for the anti-rollover stack.
//!
//! Every other crate in the workspace speaks in these types: raw inertial
//! readings flow in as [`RawReading`] / [`SensorSample`], the risk estimator
//! emits [`RiskAssessment`], and the differential controller publishes
//! [`ControlState`].  [`AntirollError`] is the single error type spanning
//! sample validation, sensor stalls, and actuation failures.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Monotonic time since an arbitrary clock origin.
///
/// The origin is owned by whichever clock produced the value; only
/// differences between two timestamps from the same clock are meaningful.
pub type Timestamp = Duration;

/// Standard gravity (m/s²).
pub const STANDARD_GRAVITY: f64 = 9.81;

/// Which inertial sensor a reading came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sensor {
    Accelerometer,
    Gyroscope,
}

impl fmt::Display for Sensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sensor::Accelerometer => write!(f, "accelerometer"),
            Sensor::Gyroscope => write!(f, "gyroscope"),
        }
    }
}

/// A three-axis vector: acceleration in m/s² or angular rate in rad/s.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 { x: 0.0, y: 0.0, z: 0.0 };

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Build a vector from raw sensor components.
    ///
    /// # Errors
    ///
    /// Returns [`AntirollError::InvalidSample`] unless `components` holds
    /// exactly three values.
    pub fn from_components(sensor: Sensor, components: &[f64]) -> Result<Self, AntirollError> {
        match *components {
            [x, y, z] => Ok(Self { x, y, z }),
            _ => Err(AntirollError::InvalidSample {
                sensor,
                arity: components.len(),
            }),
        }
    }

    /// Euclidean norm.
    pub fn magnitude(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Tilt angles implied by treating `self` as a gravity-dominated
    /// accelerometer reading.
    ///
    /// `pitch = atan2(x, sqrt(y² + z²))`, `roll = atan2(y, z)`, both in
    /// degrees.  A zero vector yields `0°` for both (`atan2(0, 0) == 0`).
    pub fn orientation(&self) -> Orientation {
        let pitch = self.x.atan2((self.y * self.y + self.z * self.z).sqrt());
        let roll = self.y.atan2(self.z);
        Orientation {
            pitch_deg: pitch.to_degrees(),
            roll_deg: roll.to_degrees(),
        }
    }

    /// Largest absolute per-axis difference between `self` and `other`.
    pub fn max_axis_delta(&self, other: &Vec3) -> f64 {
        (self.x - other.x)
            .abs()
            .max((self.y - other.y).abs())
            .max((self.z - other.z).abs())
    }
}

impl From<(f64, f64, f64)> for Vec3 {
    fn from((x, y, z): (f64, f64, f64)) -> Self {
        Self { x, y, z }
    }
}

/// Pitch and roll in degrees.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Orientation {
    /// Rotation about the lateral axis.
    pub pitch_deg: f64,
    /// Rotation about the longitudinal axis; positive when tilting right.
    pub roll_deg: f64,
}

impl Orientation {
    /// `max(|pitch|, |roll|)`.
    pub fn tilt_deg(&self) -> f64 {
        self.pitch_deg.abs().max(self.roll_deg.abs())
    }
}

/// One validated inertial reading: accelerometer, optional gyroscope, and
/// the time it was captured.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorSample {
    pub accel: Vec3,
    pub gyro: Option<Vec3>,
    pub timestamp: Timestamp,
}

impl SensorSample {
    /// Validate raw component slices into a sample.
    ///
    /// Both readings are checked before anything is returned, so a malformed
    /// gyroscope reading rejects the whole sample.
    pub fn from_components(
        accel: &[f64],
        gyro: Option<&[f64]>,
        timestamp: Timestamp,
    ) -> Result<Self, AntirollError> {
        let accel = Vec3::from_components(Sensor::Accelerometer, accel)?;
        let gyro = gyro
            .map(|g| Vec3::from_components(Sensor::Gyroscope, g))
            .transpose()?;
        Ok(Self {
            accel,
            gyro,
            timestamp,
        })
    }
}

/// An unvalidated reading as delivered by a sensor driver.
///
/// Drivers hand over whatever the SDK produced; arity is checked when the
/// reading enters the controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawReading {
    pub accel: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gyro: Option<Vec<f64>>,
}

impl RawReading {
    pub fn new(accel: impl Into<Vec<f64>>, gyro: Option<Vec<f64>>) -> Self {
        Self {
            accel: accel.into(),
            gyro,
        }
    }

    /// A reading with accelerometer data only.
    pub fn accel_only(accel: impl Into<Vec<f64>>) -> Self {
        Self::new(accel, None)
    }
}

/// Coarse classification of a [`RiskAssessment::risk_score`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "LOW"),
            RiskLevel::Medium => write!(f, "MEDIUM"),
            RiskLevel::High => write!(f, "HIGH"),
        }
    }
}

/// Result of evaluating one sample against the rollover thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    /// Combined risk in `[0, 1]`.
    pub risk_score: f64,
    pub risk_level: RiskLevel,
    /// Largest of `|pitch|` and `|roll|`, in degrees.
    pub tilt_angle: f64,
    /// Acceleration magnitude in m/s².
    pub acceleration_magnitude: f64,
    pub needs_control: bool,
}

/// The wheel-speed command owned by the differential controller.
///
/// Speeds are ratios of the base speed.  Once the controller has run they
/// stay within `[min_speed, base_speed]`; a fresh or reset controller holds
/// `0.0` on both wheels until its first computed tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ControlState {
    pub left_speed: f64,
    pub right_speed: f64,
    pub control_active: bool,
    /// Time of the last full recomputation; `None` until the first one.
    pub last_update: Option<Timestamp>,
}

impl ControlState {
    /// `(left_speed, right_speed)`.
    pub fn speeds(&self) -> (f64, f64) {
        (self.left_speed, self.right_speed)
    }
}

/// Sudden-change signal derived from the two most recent accelerometer
/// samples.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnomalySignal {
    pub anomaly_detected: bool,
    /// `min(1, max_change / threshold)`.
    pub confidence: f64,
    /// Largest absolute per-axis change, m/s².
    pub max_change: f64,
    pub threshold: f64,
}

impl AnomalySignal {
    /// The zero-confidence result reported when too little history exists.
    pub fn quiet(threshold: f64) -> Self {
        Self {
            anomaly_detected: false,
            confidence: 0.0,
            max_change: 0.0,
            threshold,
        }
    }
}

/// Global error type spanning sample validation, sensor stalls, actuation
/// failures, and configuration problems.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AntirollError {
    #[error("Invalid {sensor} sample: expected 3 components, got {arity}")]
    InvalidSample { sensor: Sensor, arity: usize },

    #[error("Sensor read timed out after {after:?}")]
    SensorTimeout { after: Duration },

    #[error("Sensor Fault on {sensor}: {details}")]
    SensorFault { sensor: String, details: String },

    #[error("Actuation Fault on {component}: {details}")]
    ActuationFault { component: String, details: String },

    #[error("Configuration Error: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vec3_from_three_components() {
        let v = Vec3::from_components(Sensor::Accelerometer, &[1.0, 2.0, 3.0]).unwrap();
        assert_eq!(v, Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn vec3_rejects_wrong_arity() {
        let err = Vec3::from_components(Sensor::Accelerometer, &[1.0, 2.0]).unwrap_err();
        assert_eq!(
            err,
            AntirollError::InvalidSample {
                sensor: Sensor::Accelerometer,
                arity: 2
            }
        );

        let err = Vec3::from_components(Sensor::Gyroscope, &[0.0; 4]).unwrap_err();
        assert!(matches!(err, AntirollError::InvalidSample { arity: 4, .. }));
    }

    #[test]
    fn vec3_magnitude_and_delta() {
        let a = Vec3::new(3.0, 4.0, 0.0);
        assert!((a.magnitude() - 5.0).abs() < 1e-12);

        let b = Vec3::new(1.0, 8.0, -0.5);
        assert!((a.max_axis_delta(&b) - 4.0).abs() < 1e-12);
    }

    #[test]
    fn orientation_of_level_and_tilted_readings() {
        let level = Vec3::new(0.0, 0.0, STANDARD_GRAVITY).orientation();
        assert!(level.pitch_deg.abs() < 1e-9);
        assert!(level.roll_deg.abs() < 1e-9);

        // 45° roll to the right.
        let rolled = Vec3::new(0.0, 1.0, 1.0).orientation();
        assert!((rolled.roll_deg - 45.0).abs() < 1e-9);
        assert!((rolled.tilt_deg() - 45.0).abs() < 1e-9);

        let pitched = Vec3::new(-1.0, 0.0, 1.0).orientation();
        assert!((pitched.pitch_deg + 45.0).abs() < 1e-9);
        assert!((pitched.tilt_deg() - 45.0).abs() < 1e-9);
    }

    #[test]
    fn orientation_of_zero_vector_is_level() {
        let o = Vec3::ZERO.orientation();
        assert_eq!(o.pitch_deg, 0.0);
        assert_eq!(o.roll_deg, 0.0);
    }

    #[test]
    fn sample_rejects_malformed_gyro() {
        let err = SensorSample::from_components(
            &[0.0, 0.0, 9.81],
            Some(&[0.1, 0.2][..]),
            Duration::ZERO,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            AntirollError::InvalidSample {
                sensor: Sensor::Gyroscope,
                arity: 2
            }
        ));
    }

    #[test]
    fn sample_without_gyro() {
        let s = SensorSample::from_components(&[0.1, 0.05, 9.81], None, Duration::from_millis(5))
            .unwrap();
        assert!(s.gyro.is_none());
        assert_eq!(s.timestamp, Duration::from_millis(5));
    }

    #[test]
    fn risk_level_serializes_uppercase() {
        let json = serde_json::to_string(&RiskLevel::Medium).unwrap();
        assert_eq!(json, "\"MEDIUM\"");
        assert_eq!(RiskLevel::High.to_string(), "HIGH");
    }

    #[test]
    fn control_state_default_is_stopped() {
        let state = ControlState::default();
        assert_eq!(state.speeds(), (0.0, 0.0));
        assert!(!state.control_active);
        assert!(state.last_update.is_none());
    }

    #[test]
    fn raw_reading_omits_missing_gyro() {
        let json = serde_json::to_string(&RawReading::accel_only(vec![0.0, 0.0, 9.81])).unwrap();
        assert!(!json.contains("gyro"));
        let back: RawReading = serde_json::from_str(&json).unwrap();
        assert!(back.gyro.is_none());
    }

    #[test]
    fn error_display() {
        let err = AntirollError::InvalidSample {
            sensor: Sensor::Accelerometer,
            arity: 2,
        };
        assert!(err.to_string().contains("accelerometer"));
        assert!(err.to_string().contains("got 2"));

        let err = AntirollError::ActuationFault {
            component: "left_wheel".to_string(),
            details: "stalled".to_string(),
        };
        assert!(err.to_string().contains("left_wheel"));
    }
}
