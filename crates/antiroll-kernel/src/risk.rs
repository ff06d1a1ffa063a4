//! [`RiskEstimator`] – threshold-based rollover risk.
//!
//! Every assessment is a pure function of one sample and the configured
//! [`RiskThresholds`]:
//!
//! ```text
//! tilt_risk  = max(|pitch|, |roll|) / rollover_angle_deg
//! accel_risk = magnitude / gravity − 1
//! risk_score = clamp(max(tilt_risk, accel_risk), 0, 1)
//! ```
//!
//! The estimator derives orientation from the instantaneous sample itself
//! rather than from a windowed snapshot, so it can be evaluated on its own.
//!
//! | `risk_score` | [`RiskLevel`] |
//! |---|---|
//! | `> high_risk` (0.8) | `HIGH` |
//! | `> medium_risk` (0.4) | `MEDIUM` |
//! | otherwise | `LOW` |
//!
//! `needs_control` is `risk_score > control_threshold` (0.3).
//!
//! # Example
//!
//! ```
//! use antiroll_kernel::risk::RiskEstimator;
//! use antiroll_types::{RiskLevel, Vec3};
//!
//! let estimator = RiskEstimator::default();
//!
//! let level = estimator.assess(&Vec3::new(0.1, 0.05, 9.81), None);
//! assert_eq!(level.risk_level, RiskLevel::Low);
//! assert!(!level.needs_control);
//!
//! let tipping = estimator.assess(&Vec3::new(1.5, 3.0, 8.5), None);
//! assert_eq!(tipping.risk_level, RiskLevel::High);
//! assert!(tipping.needs_control);
//! ```

use antiroll_types::{
    AntirollError, RiskAssessment, RiskLevel, STANDARD_GRAVITY, Sensor, Vec3,
};
use serde::{Deserialize, Serialize};
use tracing::trace;

// ────────────────────────────────────────────────────────────────────────────
// Configuration
// ────────────────────────────────────────────────────────────────────────────

/// Threshold constants for the risk mapping.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskThresholds {
    /// Tilt (degrees) at which `tilt_risk` reaches 1.
    pub rollover_angle_deg: f64,
    /// Wheel-slip ratio limit.  Carried with the other thresholds for the
    /// actuation layer; the tilt/acceleration score does not consult it.
    pub wheel_slip_threshold: f64,
    /// Reference acceleration for `accel_risk` (m/s²).
    pub gravity: f64,
    pub high_risk: f64,
    pub medium_risk: f64,
    /// Score above which corrective control is requested.
    pub control_threshold: f64,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            rollover_angle_deg: 15.0,
            wheel_slip_threshold: 0.1,
            gravity: STANDARD_GRAVITY,
            high_risk: 0.8,
            medium_risk: 0.4,
            control_threshold: 0.3,
        }
    }
}

impl RiskThresholds {
    /// Check that the thresholds describe a usable mapping.
    ///
    /// # Errors
    ///
    /// Returns [`AntirollError::Config`] for non-positive divisors or levels
    /// that are out of order.
    pub fn validate(&self) -> Result<(), AntirollError> {
        if !(self.rollover_angle_deg.is_finite() && self.rollover_angle_deg > 0.0) {
            return Err(AntirollError::Config(format!(
                "rollover_angle_deg must be positive, got {}",
                self.rollover_angle_deg
            )));
        }
        if !(self.gravity.is_finite() && self.gravity > 0.0) {
            return Err(AntirollError::Config(format!(
                "gravity must be positive, got {}",
                self.gravity
            )));
        }
        if !(0.0..=1.0).contains(&self.medium_risk)
            || !(0.0..=1.0).contains(&self.high_risk)
            || self.medium_risk > self.high_risk
        {
            return Err(AntirollError::Config(format!(
                "risk levels must satisfy 0 <= medium ({}) <= high ({}) <= 1",
                self.medium_risk, self.high_risk
            )));
        }
        if !(0.0..=1.0).contains(&self.control_threshold) {
            return Err(AntirollError::Config(format!(
                "control_threshold must lie in [0, 1], got {}",
                self.control_threshold
            )));
        }
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// RiskEstimator
// ────────────────────────────────────────────────────────────────────────────

/// The two unclamped components of the risk score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskFactors {
    pub tilt_risk: f64,
    /// Deviation from 1 g; negative below gravity.
    pub accel_risk: f64,
}

/// Stateless rollover risk estimator.
#[derive(Debug, Clone, Default)]
pub struct RiskEstimator {
    thresholds: RiskThresholds,
}

impl RiskEstimator {
    pub fn new(thresholds: RiskThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &RiskThresholds {
        &self.thresholds
    }

    /// Unclamped tilt and acceleration risk for `accel`.
    pub fn factors(&self, accel: &Vec3) -> RiskFactors {
        RiskFactors {
            tilt_risk: accel.orientation().tilt_deg() / self.thresholds.rollover_angle_deg,
            accel_risk: accel.magnitude() / self.thresholds.gravity - 1.0,
        }
    }

    /// Assess one sample.
    ///
    /// `_gyro` is accepted so callers can pass the full sample pair; the
    /// threshold mapping is driven by the accelerometer alone.
    pub fn assess(&self, accel: &Vec3, _gyro: Option<&Vec3>) -> RiskAssessment {
        let RiskFactors {
            tilt_risk,
            accel_risk,
        } = self.factors(accel);
        let risk_score = tilt_risk.max(accel_risk).clamp(0.0, 1.0);
        trace!(tilt_risk, accel_risk, risk_score, "risk assessed");

        RiskAssessment {
            risk_score,
            risk_level: self.classify(risk_score),
            tilt_angle: accel.orientation().tilt_deg(),
            acceleration_magnitude: accel.magnitude(),
            needs_control: risk_score > self.thresholds.control_threshold,
        }
    }

    /// Assess raw component slices.
    ///
    /// # Errors
    ///
    /// Returns [`AntirollError::InvalidSample`] if either reading does not
    /// have exactly three components.
    pub fn assess_components(
        &self,
        accel: &[f64],
        gyro: Option<&[f64]>,
    ) -> Result<RiskAssessment, AntirollError> {
        let accel = Vec3::from_components(Sensor::Accelerometer, accel)?;
        let gyro = gyro
            .map(|g| Vec3::from_components(Sensor::Gyroscope, g))
            .transpose()?;
        Ok(self.assess(&accel, gyro.as_ref()))
    }

    fn classify(&self, risk_score: f64) -> RiskLevel {
        if risk_score > self.thresholds.high_risk {
            RiskLevel::High
        } else if risk_score > self.thresholds.medium_risk {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
