//! Feature Extractor.
//!
//! Maintains bounded accelerometer and gyroscope histories and derives a
//! [`FeatureSnapshot`] from them on demand.  Nothing is accumulated
//! incrementally: every snapshot is recomputed from the current window
//! contents, so the statistics never drift.
//!
//! Derived features:
//!
//! ```text
//! magnitude = sqrt(ax² + ay² + az²)
//! pitch     = atan2(ax, sqrt(ay² + az²))          (degrees)
//! roll      = atan2(ay, az)                       (degrees)
//! rate      = |magnitude − previous magnitude|    (0 with < 2 samples)
//! mean, std = population statistics per axis      (0 with < 2 samples)
//! ```
//!
//! # Example
//!
//! ```rust
//! use antiroll_perception::features::FeatureExtractor;
//!
//! let mut extractor = FeatureExtractor::new(10);
//! assert!(extractor.snapshot().is_none());
//!
//! extractor.ingest_accel(&[0.0, 0.0, 9.81]).unwrap();
//! extractor.ingest_accel(&[0.0, 3.0, 9.81]).unwrap();
//!
//! let features = extractor.snapshot().unwrap();
//! assert!(features.orientation.roll_deg > 0.0);
//! assert!(features.magnitude_rate > 0.0);
//!
//! // Arity is checked before anything is buffered.
//! assert!(extractor.ingest_accel(&[1.0, 2.0]).is_err());
//! assert_eq!(extractor.accel_window().len(), 2);
//! ```

use antiroll_types::{
    AnomalySignal, AntirollError, Orientation, Sensor, SensorSample, Timestamp, Vec3,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::window::SampleWindow;

/// Per-axis change (m/s²) between consecutive samples that counts as an
/// anomaly.
pub const DEFAULT_ANOMALY_THRESHOLD: f64 = 3.0;

/// Fewest buffered accelerometer samples before anomaly detection reports
/// anything.
const ANOMALY_MIN_SAMPLES: usize = 3;

// ────────────────────────────────────────────────────────────────────────────
// Output type
// ────────────────────────────────────────────────────────────────────────────

/// Read-only feature view computed from the current window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureSnapshot {
    /// Latest accelerometer reading (m/s²).
    pub accel: Vec3,
    /// Euclidean norm of [`FeatureSnapshot::accel`].
    pub magnitude: f64,
    pub orientation: Orientation,
    /// `|magnitude − previous magnitude|`.
    pub magnitude_rate: f64,
    /// Per-axis population mean over the accelerometer window.
    pub mean: Vec3,
    /// Per-axis population standard deviation over the accelerometer window.
    pub std_dev: Vec3,
    /// Population standard deviation of the buffered magnitudes.
    pub magnitude_std: f64,
    /// Latest gyroscope reading (rad/s), zero if none was ingested.
    pub gyro: Vec3,
    /// Capture time of the latest sample, when it was ingested with one.
    pub timestamp: Option<Timestamp>,
}

// ────────────────────────────────────────────────────────────────────────────
// FeatureExtractor
// ────────────────────────────────────────────────────────────────────────────

/// Sliding-window feature extractor.
///
/// Construct with [`FeatureExtractor::new`], feed samples in chronological
/// order, then call [`FeatureExtractor::snapshot`] or
/// [`FeatureExtractor::detect_anomaly`].
#[derive(Debug, Clone)]
pub struct FeatureExtractor {
    accel: SampleWindow<Vec3>,
    gyro: SampleWindow<Vec3>,
    magnitudes: SampleWindow<f64>,
    last_timestamp: Option<Timestamp>,
    anomaly_threshold: f64,
}

impl FeatureExtractor {
    /// Create an extractor whose windows hold `window_size` samples each.
    pub fn new(window_size: usize) -> Self {
        Self::with_anomaly_threshold(window_size, DEFAULT_ANOMALY_THRESHOLD)
    }

    /// Like [`FeatureExtractor::new`] with a custom anomaly threshold.
    pub fn with_anomaly_threshold(window_size: usize, anomaly_threshold: f64) -> Self {
        Self {
            accel: SampleWindow::new(window_size),
            gyro: SampleWindow::new(window_size),
            magnitudes: SampleWindow::new(window_size),
            last_timestamp: None,
            anomaly_threshold,
        }
    }

    /// Append an accelerometer reading.
    ///
    /// # Errors
    ///
    /// Returns [`AntirollError::InvalidSample`] unless `components` has
    /// exactly three values; nothing is buffered in that case.
    pub fn ingest_accel(&mut self, components: &[f64]) -> Result<(), AntirollError> {
        let accel = Vec3::from_components(Sensor::Accelerometer, components).inspect_err(|e| {
            debug!(error = %e, "rejected accelerometer sample");
        })?;
        self.push_accel(accel);
        Ok(())
    }

    /// Append a gyroscope reading.  Same arity contract as
    /// [`FeatureExtractor::ingest_accel`].
    pub fn ingest_gyro(&mut self, components: &[f64]) -> Result<(), AntirollError> {
        let gyro = Vec3::from_components(Sensor::Gyroscope, components).inspect_err(|e| {
            debug!(error = %e, "rejected gyroscope sample");
        })?;
        self.gyro.push(gyro);
        Ok(())
    }

    /// Append an already validated sample, recording its capture time.
    pub fn ingest_sample(&mut self, sample: &SensorSample) {
        self.push_accel(sample.accel);
        if let Some(gyro) = sample.gyro {
            self.gyro.push(gyro);
        }
        self.last_timestamp = Some(sample.timestamp);
    }

    fn push_accel(&mut self, accel: Vec3) {
        self.magnitudes.push(accel.magnitude());
        self.accel.push(accel);
    }

    /// Compute features from the current window contents.
    ///
    /// Returns `None` while the accelerometer window is empty.
    pub fn snapshot(&self) -> Option<FeatureSnapshot> {
        let accel = *self.accel.latest()?;
        let magnitude = accel.magnitude();

        let magnitude_rate = self
            .accel
            .previous()
            .map_or(0.0, |prev| (magnitude - prev.magnitude()).abs());

        let (mean, std_dev) = if self.accel.len() > 1 {
            let (mx, sx) = population_stats(self.accel.iter().map(|v| v.x));
            let (my, sy) = population_stats(self.accel.iter().map(|v| v.y));
            let (mz, sz) = population_stats(self.accel.iter().map(|v| v.z));
            (Vec3::new(mx, my, mz), Vec3::new(sx, sy, sz))
        } else {
            (Vec3::ZERO, Vec3::ZERO)
        };

        Some(FeatureSnapshot {
            accel,
            magnitude,
            orientation: accel.orientation(),
            magnitude_rate,
            mean,
            std_dev,
            magnitude_std: self.magnitude_std(),
            gyro: self.gyro.latest().copied().unwrap_or(Vec3::ZERO),
            timestamp: self.last_timestamp,
        })
    }

    /// Flag a sudden change between the two most recent accelerometer
    /// samples.
    ///
    /// An anomaly is reported when any axis changed by more than the
    /// threshold; `confidence = min(1, max_change / threshold)`.  With fewer
    /// than three buffered samples the result is a quiet, zero-confidence
    /// signal.
    pub fn detect_anomaly(&self) -> AnomalySignal {
        if self.accel.len() < ANOMALY_MIN_SAMPLES {
            return AnomalySignal::quiet(self.anomaly_threshold);
        }
        let (Some(prev), Some(latest)) = (self.accel.previous(), self.accel.latest()) else {
            return AnomalySignal::quiet(self.anomaly_threshold);
        };

        let max_change = latest.max_axis_delta(prev);
        AnomalySignal {
            anomaly_detected: max_change > self.anomaly_threshold,
            confidence: (max_change / self.anomaly_threshold).min(1.0),
            max_change,
            threshold: self.anomaly_threshold,
        }
    }

    /// Population standard deviation of the buffered magnitudes, 0 with
    /// fewer than two entries.
    pub fn magnitude_std(&self) -> f64 {
        if self.magnitudes.len() > 1 {
            population_stats(self.magnitudes.iter().copied()).1
        } else {
            0.0
        }
    }

    pub fn accel_window(&self) -> &SampleWindow<Vec3> {
        &self.accel
    }

    pub fn gyro_window(&self) -> &SampleWindow<Vec3> {
        &self.gyro
    }

    /// Buffered accelerometer magnitudes, oldest first.
    pub fn magnitude_history(&self) -> &SampleWindow<f64> {
        &self.magnitudes
    }

    pub fn window_size(&self) -> usize {
        self.accel.capacity()
    }

    /// Drop every buffered sample, keeping capacity and threshold.
    pub fn clear(&mut self) {
        self.accel.clear();
        self.gyro.clear();
        self.magnitudes.clear();
        self.last_timestamp = None;
    }
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new(crate::window::DEFAULT_WINDOW_SIZE)
    }
}

/// `(mean, population standard deviation)` of `values`.
fn population_stats(values: impl ExactSizeIterator<Item = f64> + Clone) -> (f64, f64) {
    let n = values.len();
    if n == 0 {
        return (0.0, 0.0);
    }
    let n = n as f64;
    let mean = values.clone().sum::<f64>() / n;
    let variance = values.map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
