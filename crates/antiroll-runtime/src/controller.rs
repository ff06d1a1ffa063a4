//! [`DifferentialController`] – risk-driven wheel-speed control.
//!
//! Converts periodic risk assessments into bounded, biased wheel-speed
//! commands.  Each full update:
//!
//! 1. **Rate limit** – if less than `control_interval` has passed since the
//!    last recomputation, the stored [`ControlState`] is returned unchanged.
//! 2. **Extract** – the sample enters the [`FeatureExtractor`] window and a
//!    [`FeatureSnapshot`] is taken.
//! 3. **Assess** – the [`RiskEstimator`] scores the raw sample.
//! 4. **Actuate** – with `needs_control` the controller goes `ACTIVE` and
//!    slows the wheel on the side the carrier is rolling toward:
//!
//! ```text
//! differential = min(max_wheel_diff, risk_score × max_wheel_diff × 2)
//! roll > 0  →  left = base,                         right = max(min, base − differential)
//! roll ≤ 0  →  left = max(min, base − differential), right = base
//! ```
//!
//!    Otherwise it goes `INACTIVE` with both wheels at `base_speed`.
//!
//! There is no hysteresis beyond the rate limiter: every computed tick
//! re-evaluates the mode from scratch.
//!
//! # Failure semantics
//!
//! A sample with the wrong number of components is rejected with
//! [`AntirollError::InvalidSample`] before anything is touched, so the last
//! good command stays in force.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use antiroll_runtime::controller::{ControllerConfig, DifferentialController};
//!
//! let mut controller = DifferentialController::new(ControllerConfig::default())
//!     .expect("default config is valid");
//!
//! let calm = controller.ingest(&[0.1, 0.05, 9.81], None, Duration::ZERO).unwrap();
//! assert_eq!(calm.speeds(), (1.0, 1.0));
//! assert!(!calm.control_active);
//!
//! // Rolling right: the right wheel is slowed.
//! let tipping = controller
//!     .ingest(&[1.5, 3.0, 8.5], None, Duration::from_millis(200))
//!     .unwrap();
//! assert!(tipping.control_active);
//! assert!(tipping.right_speed < tipping.left_speed);
//! ```

use std::time::Duration;

use antiroll_kernel::{RiskEstimator, RiskThresholds};
use antiroll_perception::{
    DEFAULT_ANOMALY_THRESHOLD, DEFAULT_WINDOW_SIZE, FeatureExtractor, FeatureSnapshot,
};
use antiroll_types::{
    AnomalySignal, AntirollError, ControlState, RiskAssessment, SensorSample, Timestamp,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::clock::{Clock, MonotonicClock};

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Construction-time constants for [`DifferentialController`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Capacity of the accelerometer and gyroscope windows.
    pub window_size: usize,
    /// Minimum spacing between full recomputations, in milliseconds.
    pub control_interval_ms: u64,
    /// Largest speed reduction applied to the slowed wheel.
    pub max_wheel_diff: f64,
    /// Speed ratio of an unslowed wheel.
    pub base_speed: f64,
    /// Floor for the slowed wheel.
    pub min_speed: f64,
    /// Per-axis change (m/s²) reported as an anomaly.
    pub anomaly_threshold: f64,
    pub risk: RiskThresholds,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            control_interval_ms: 100,
            max_wheel_diff: 0.3,
            base_speed: 1.0,
            min_speed: 0.1,
            anomaly_threshold: DEFAULT_ANOMALY_THRESHOLD,
            risk: RiskThresholds::default(),
        }
    }
}

impl ControllerConfig {
    pub fn control_interval(&self) -> Duration {
        Duration::from_millis(self.control_interval_ms)
    }

    /// Check the configuration before a controller is built from it.
    ///
    /// # Errors
    ///
    /// Returns [`AntirollError::Config`] describing the first invalid field.
    pub fn validate(&self) -> Result<(), AntirollError> {
        if self.window_size == 0 {
            return Err(AntirollError::Config("window_size must be at least 1".into()));
        }
        if !(self.base_speed.is_finite() && self.base_speed > 0.0) {
            return Err(AntirollError::Config(format!(
                "base_speed must be positive, got {}",
                self.base_speed
            )));
        }
        if !(self.min_speed.is_finite() && (0.0..=self.base_speed).contains(&self.min_speed)) {
            return Err(AntirollError::Config(format!(
                "min_speed must lie in [0, base_speed], got {}",
                self.min_speed
            )));
        }
        if !(self.max_wheel_diff.is_finite() && self.max_wheel_diff >= 0.0) {
            return Err(AntirollError::Config(format!(
                "max_wheel_diff must be non-negative, got {}",
                self.max_wheel_diff
            )));
        }
        if !(self.anomaly_threshold.is_finite() && self.anomaly_threshold > 0.0) {
            return Err(AntirollError::Config(format!(
                "anomaly_threshold must be positive, got {}",
                self.anomaly_threshold
            )));
        }
        self.risk.validate()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// DifferentialController
// ─────────────────────────────────────────────────────────────────────────────

/// Rate-limited differential controller.
///
/// Exclusively owns its feature extractor, risk estimator, and
/// [`ControlState`]; only [`DifferentialController::ingest`] (and
/// [`DifferentialController::reset`]) mutate them.
pub struct DifferentialController<C: Clock = MonotonicClock> {
    config: ControllerConfig,
    extractor: FeatureExtractor,
    estimator: RiskEstimator,
    state: ControlState,
    last_assessment: Option<RiskAssessment>,
    clock: C,
}

impl DifferentialController<MonotonicClock> {
    /// Build a controller reading time from a [`MonotonicClock`].
    ///
    /// # Errors
    ///
    /// Returns [`AntirollError::Config`] if `config` fails validation.
    pub fn new(config: ControllerConfig) -> Result<Self, AntirollError> {
        Self::with_clock(config, MonotonicClock::new())
    }
}

impl<C: Clock> DifferentialController<C> {
    /// Build a controller reading time from `clock`.
    pub fn with_clock(config: ControllerConfig, clock: C) -> Result<Self, AntirollError> {
        config.validate()?;
        Ok(Self {
            extractor: FeatureExtractor::with_anomaly_threshold(
                config.window_size,
                config.anomaly_threshold,
            ),
            estimator: RiskEstimator::new(config.risk),
            state: ControlState::default(),
            last_assessment: None,
            config,
            clock,
        })
    }

    /// Run one control update for a sample captured at `now`.
    ///
    /// Within `control_interval` of the last recomputation this is a pure
    /// read of the stored state.
    ///
    /// # Errors
    ///
    /// Returns [`AntirollError::InvalidSample`] if `accel` or `gyro` does not
    /// have exactly three components.  The stored state is left untouched.
    pub fn ingest(
        &mut self,
        accel: &[f64],
        gyro: Option<&[f64]>,
        now: Timestamp,
    ) -> Result<ControlState, AntirollError> {
        let sample = SensorSample::from_components(accel, gyro, now).inspect_err(|e| {
            warn!(error = %e, "sample rejected; holding last command");
        })?;

        if self.is_rate_limited(now) {
            return Ok(self.state);
        }

        self.extractor.ingest_sample(&sample);
        let Some(features) = self.extractor.snapshot() else {
            return Ok(ControlState {
                control_active: false,
                ..self.state
            });
        };

        let assessment = self.estimator.assess(&sample.accel, sample.gyro.as_ref());
        let (left_speed, right_speed) = if assessment.needs_control {
            let differential = self
                .config
                .max_wheel_diff
                .min(assessment.risk_score * self.config.max_wheel_diff * 2.0);
            differential_speeds(
                features.orientation.roll_deg,
                differential,
                self.config.base_speed,
                self.config.min_speed,
            )
        } else {
            (self.config.base_speed, self.config.base_speed)
        };

        if assessment.needs_control != self.state.control_active {
            info!(
                active = assessment.needs_control,
                risk_score = assessment.risk_score,
                risk_level = %assessment.risk_level,
                roll_deg = features.orientation.roll_deg,
                "differential control mode changed"
            );
        }

        self.state = ControlState {
            left_speed,
            right_speed,
            control_active: assessment.needs_control,
            last_update: Some(now),
        };
        self.last_assessment = Some(assessment);
        debug!(left_speed, right_speed, risk_score = assessment.risk_score, "control updated");
        Ok(self.state)
    }

    /// Whether a sample stamped `now` would fall inside the control interval
    /// of the last recomputation and be served from the stored state.
    pub fn is_rate_limited(&self, now: Timestamp) -> bool {
        self.state
            .last_update
            .is_some_and(|last| now.saturating_sub(last) < self.config.control_interval())
    }

    /// [`DifferentialController::ingest`] timestamped by the injected clock.
    pub fn tick(
        &mut self,
        accel: &[f64],
        gyro: Option<&[f64]>,
    ) -> Result<ControlState, AntirollError> {
        let now = self.clock.now();
        self.ingest(accel, gyro, now)
    }

    /// The result of a tick that produced no sample (e.g. a sensor timeout):
    /// the stored speeds with control reported inactive.  Nothing is
    /// fabricated and nothing is stored.
    pub fn missing_sample(&self) -> ControlState {
        debug!("no sample this tick");
        ControlState {
            control_active: false,
            ..self.state
        }
    }

    /// Return to the startup state: speeds zeroed, control inactive, and
    /// every sample window emptied.
    pub fn reset(&mut self) {
        info!("differential controller reset");
        self.state = ControlState::default();
        self.extractor.clear();
        self.last_assessment = None;
    }

    /// `(left_speed, right_speed)` of the stored command.
    pub fn current_speeds(&self) -> (f64, f64) {
        self.state.speeds()
    }

    pub fn state(&self) -> ControlState {
        self.state
    }

    /// Assessment from the most recent computed tick.
    pub fn last_assessment(&self) -> Option<RiskAssessment> {
        self.last_assessment
    }

    /// Features over the current window.
    pub fn features(&self) -> Option<FeatureSnapshot> {
        self.extractor.snapshot()
    }

    /// Sudden-change signal over the current window.  Reported for
    /// diagnostics only; it does not influence the command.
    pub fn anomaly(&self) -> AnomalySignal {
        self.extractor.detect_anomaly()
    }

    pub fn extractor(&self) -> &FeatureExtractor {
        &self.extractor
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }
}

/// Left/right speeds that slow the wheel on the side the carrier rolls
/// toward.  Positive roll is a tilt to the right.
fn differential_speeds(roll_deg: f64, differential: f64, base: f64, min: f64) -> (f64, f64) {
    let slowed = (base - differential).max(min);
    if roll_deg > 0.0 {
        (base, slowed)
    } else {
        (slowed, base)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    const LEVEL: [f64; 3] = [0.1, 0.05, 9.81];
    const ROLLING_RIGHT: [f64; 3] = [1.5, 3.0, 8.5];

    fn controller() -> (DifferentialController<ManualClock>, ManualClock) {
        let clock = ManualClock::new();
        let c = DifferentialController::with_clock(ControllerConfig::default(), clock.clone())
            .expect("default config");
        (c, clock)
    }

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn fresh_controller_level_sample() {
        let (mut c, _) = controller();
        let state = c.ingest(&LEVEL, None, Duration::ZERO).unwrap();
        let a = c.last_assessment().unwrap();

        assert!(a.risk_score <= 0.05);
        assert_eq!(a.risk_level, antiroll_types::RiskLevel::Low);
        assert!(!a.needs_control);
        assert_eq!(state.speeds(), (1.0, 1.0));
        assert!(!state.control_active);
        assert_eq!(state.last_update, Some(Duration::ZERO));
    }

    #[test]
    fn high_roll_right_slows_right_wheel() {
        let (mut c, _) = controller();
        c.ingest(&LEVEL, None, Duration::ZERO).unwrap();
        let state = c.ingest(&ROLLING_RIGHT, None, ms(150)).unwrap();
        let a = c.last_assessment().unwrap();

        assert!((a.acceleration_magnitude - 9.138).abs() < 1e-3);
        assert_eq!(a.risk_score, 1.0);
        assert_eq!(a.risk_level, antiroll_types::RiskLevel::High);
        assert!(a.needs_control);

        let roll = c.features().unwrap().orientation.roll_deg;
        assert!((roll - 19.47).abs() < 0.1);

        assert_eq!(state.left_speed, 1.0);
        assert!((state.right_speed - 0.7).abs() < 1e-12);
        assert!(state.control_active);
    }

    #[test]
    fn roll_left_slows_left_wheel() {
        let (mut c, _) = controller();
        let state = c.ingest(&[1.5, -3.0, 8.5], None, Duration::ZERO).unwrap();
        assert!(state.control_active);
        assert!((state.left_speed - 0.7).abs() < 1e-12);
        assert_eq!(state.right_speed, 1.0);
    }

    #[test]
    fn differential_scales_with_moderate_risk() {
        let (mut c, _) = controller();
        // 6° of roll → risk 0.4 → differential 0.24.
        let r = 6.0_f64.to_radians();
        let state = c
            .ingest(&[0.0, 9.81 * r.sin(), 9.81 * r.cos()], None, Duration::ZERO)
            .unwrap();
        assert!(state.control_active);
        assert_eq!(state.left_speed, 1.0);
        assert!((state.right_speed - 0.76).abs() < 1e-9);
    }

    #[test]
    fn malformed_sample_keeps_prior_state() {
        let (mut c, _) = controller();
        let before = c.ingest(&ROLLING_RIGHT, None, Duration::ZERO).unwrap();

        let err = c.ingest(&[1.0, 2.0], None, ms(500)).unwrap_err();
        assert!(matches!(err, AntirollError::InvalidSample { arity: 2, .. }));
        assert_eq!(c.state(), before);
        assert_eq!(c.extractor().accel_window().len(), 1);

        let err = c.ingest(&LEVEL, Some(&[0.0; 2][..]), ms(500)).unwrap_err();
        assert!(matches!(err, AntirollError::InvalidSample { .. }));
        assert_eq!(c.state(), before);
    }

    #[test]
    fn calls_inside_interval_return_identical_state() {
        let (mut c, _) = controller();
        let first = c.ingest(&ROLLING_RIGHT, None, ms(1_000)).unwrap();
        let second = c.ingest(&LEVEL, None, ms(1_020)).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.left_speed.to_bits(), second.left_speed.to_bits());
        assert_eq!(first.right_speed.to_bits(), second.right_speed.to_bits());
        // Nothing was ingested by the rate-limited call.
        assert_eq!(c.extractor().accel_window().len(), 1);
    }

    #[test]
    fn rate_limit_window_is_half_open() {
        let (mut c, _) = controller();
        assert!(!c.is_rate_limited(Duration::ZERO));
        c.ingest(&LEVEL, None, ms(1_000)).unwrap();
        assert!(c.is_rate_limited(ms(1_000)));
        assert!(c.is_rate_limited(ms(1_099)));
        assert!(!c.is_rate_limited(ms(1_100)));
    }

    #[test]
    fn interval_boundary_recomputes() {
        let (mut c, _) = controller();
        c.ingest(&ROLLING_RIGHT, None, Duration::ZERO).unwrap();
        let state = c.ingest(&LEVEL, None, ms(100)).unwrap();
        assert!(!state.control_active);
        assert_eq!(state.speeds(), (1.0, 1.0));
        assert_eq!(state.last_update, Some(ms(100)));
    }

    #[test]
    fn mode_switches_back_to_inactive() {
        let (mut c, _) = controller();
        assert!(c.ingest(&ROLLING_RIGHT, None, Duration::ZERO).unwrap().control_active);
        assert!(!c.ingest(&LEVEL, None, ms(200)).unwrap().control_active);
        assert!(c.ingest(&ROLLING_RIGHT, None, ms(400)).unwrap().control_active);
    }

    #[test]
    fn reset_returns_to_startup_state() {
        let (mut c, _) = controller();
        c.ingest(&ROLLING_RIGHT, None, Duration::ZERO).unwrap();
        c.reset();

        assert_eq!(c.current_speeds(), (0.0, 0.0));
        assert!(!c.state().control_active);
        assert!(c.state().last_update.is_none());
        assert!(c.extractor().accel_window().is_empty());
        assert!(c.features().is_none());
        assert!(c.last_assessment().is_none());

        // The first tick after a reset is computed immediately.
        let state = c.ingest(&LEVEL, None, ms(10)).unwrap();
        assert_eq!(state.speeds(), (1.0, 1.0));
    }

    #[test]
    fn tick_reads_injected_clock() {
        let (mut c, clock) = controller();
        let first = c.tick(&ROLLING_RIGHT, None).unwrap();
        assert!(first.control_active);

        clock.advance(ms(50));
        assert_eq!(c.tick(&LEVEL, None).unwrap(), first);

        clock.advance(ms(50));
        let later = c.tick(&LEVEL, None).unwrap();
        assert!(!later.control_active);
        assert_eq!(later.last_update, Some(ms(100)));
    }

    #[test]
    fn missing_sample_holds_speeds_without_control() {
        let (mut c, _) = controller();
        assert_eq!(c.missing_sample(), ControlState::default());

        let active = c.ingest(&ROLLING_RIGHT, None, Duration::ZERO).unwrap();
        let held = c.missing_sample();
        assert_eq!(held.speeds(), active.speeds());
        assert!(!held.control_active);
        // The stored state is untouched.
        assert_eq!(c.state(), active);
    }

    #[test]
    fn speeds_stay_in_bounds_and_follow_roll_direction() {
        let (mut c, _) = controller();
        let mut now = Duration::ZERO;
        for ay in [-9.0, -5.0, -2.5, -1.0, -0.2, 0.0, 0.2, 1.0, 2.5, 5.0, 9.0] {
            for ax in [-6.0, 0.0, 6.0] {
                for az in [-9.81, 2.0, 9.81, 20.0] {
                    now += ms(100);
                    let state = c.ingest(&[ax, ay, az], Some(&[0.0, 0.0, 0.0][..]), now).unwrap();
                    for speed in [state.left_speed, state.right_speed] {
                        assert!((0.1..=1.0).contains(&speed), "speed {speed} out of bounds");
                    }
                    if state.control_active {
                        let roll = c.features().unwrap().orientation.roll_deg;
                        if roll > 0.0 {
                            assert!(state.right_speed < state.left_speed);
                        } else {
                            assert!(state.left_speed <= state.right_speed);
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn min_speed_floors_slowed_wheel() {
        let config = ControllerConfig {
            max_wheel_diff: 2.0,
            ..ControllerConfig::default()
        };
        let mut c = DifferentialController::with_clock(config, ManualClock::new()).unwrap();
        let state = c.ingest(&ROLLING_RIGHT, None, Duration::ZERO).unwrap();
        assert_eq!(state.right_speed, 0.1);
    }

    #[test]
    fn anomaly_is_reported_but_not_used_for_control() {
        let (mut c, _) = controller();
        for (i, s) in [[0.0, 0.0, 9.81], [0.0, 0.0, 9.81], [0.0, 0.0, 14.0]].iter().enumerate() {
            c.ingest(s, None, ms(100 * i as u64)).unwrap();
        }
        let signal = c.anomaly();
        assert!(signal.anomaly_detected);
        // 14 / 9.81 − 1 ≈ 0.427 → control follows the risk score alone.
        assert!(c.state().control_active);
        assert!((c.last_assessment().unwrap().risk_score - (14.0 / 9.81 - 1.0)).abs() < 1e-9);
    }

    #[test]
    fn differential_speeds_mirror_on_roll_sign() {
        assert_eq!(differential_speeds(5.0, 0.3, 1.0, 0.1), (1.0, 0.7));
        assert_eq!(differential_speeds(-5.0, 0.3, 1.0, 0.1), (0.7, 1.0));
        assert_eq!(differential_speeds(0.0, 0.3, 1.0, 0.1), (0.7, 1.0));
        assert_eq!(differential_speeds(1.0, 5.0, 1.0, 0.1), (1.0, 0.1));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let zero_window = ControllerConfig {
            window_size: 0,
            ..ControllerConfig::default()
        };
        assert!(DifferentialController::new(zero_window).is_err());

        let inverted = ControllerConfig {
            min_speed: 2.0,
            ..ControllerConfig::default()
        };
        assert!(matches!(inverted.validate(), Err(AntirollError::Config(_))));
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let config: ControllerConfig = toml::from_str(
            r#"
            control_interval_ms = 50

            [risk]
            rollover_angle_deg = 20.0
            "#,
        )
        .unwrap();
        assert_eq!(config.control_interval(), ms(50));
        assert_eq!(config.window_size, DEFAULT_WINDOW_SIZE);
        assert_eq!(config.risk.rollover_angle_deg, 20.0);
        assert_eq!(config.risk.control_threshold, 0.3);
    }
}
