//! [`ControlLoop`] – the periodic control task.
//!
//! One tick every `sample_period`:
//!
//! 1. **Read** – wait for the next [`RawReading`] from the [`ImuSource`],
//!    bounded by `sensor_timeout`.  A stalled or faulted sensor turns the
//!    tick into a missing-sample tick: the stored speeds with control
//!    reported inactive.  No reading is ever fabricated.
//! 2. **Control** – run [`DifferentialController::ingest`] stamped with the
//!    time the tick started, so read latency never pushes a sample into the
//!    rate-limit window.  A malformed reading is rejected and the tick ends
//!    there, so the last good command stays on the wheels.
//! 3. **Actuate** – forward the speeds to the [`WheelDrive`].
//! 4. **Publish** – send the [`ControlState`] on a `watch` channel.  The loop
//!    is the only writer; telemetry readers always see a whole snapshot.
//!
//! The loop is strictly sequential and non-reentrant.  It exits when the
//! shutdown signal flips to `true` (or its sender is dropped) and returns a
//! [`LoopReport`].
//!
//! # Example
//!
//! ```rust,no_run
//! use antiroll_hal::sim::{ScriptStep, ScriptedImu, SimWheelDrive};
//! use antiroll_runtime::{ControlLoop, ControlLoopConfig, ControllerConfig, DifferentialController};
//! use antiroll_types::RawReading;
//!
//! # async fn demo() {
//! let controller = DifferentialController::new(ControllerConfig::default()).unwrap();
//! let imu = ScriptedImu::new(
//!     "bench_imu",
//!     vec![ScriptStep::Reading(RawReading::accel_only(vec![0.0, 0.0, 9.81]))],
//! )
//! .looping();
//!
//! let control = ControlLoop::new(
//!     controller,
//!     Box::new(imu),
//!     Box::new(SimWheelDrive::new("wheel_base")),
//!     ControlLoopConfig::default(),
//! );
//! let (stop_tx, stop_rx) = tokio::sync::watch::channel(false);
//! let handle = tokio::spawn(control.run(stop_rx));
//! // ... later
//! stop_tx.send(true).ok();
//! let report = handle.await.unwrap();
//! println!("{} ticks", report.ticks);
//! # }
//! ```

use std::time::Duration;

use antiroll_hal::{ImuSource, WheelDrive};
use antiroll_types::{AntirollError, ControlState, RawReading, Timestamp};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use crate::clock::Clock;
use crate::controller::DifferentialController;

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Scheduling constants for [`ControlLoop`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlLoopConfig {
    /// Period between ticks, in milliseconds.
    pub sample_period_ms: u64,
    /// Longest a single sensor read may take, in milliseconds.
    pub sensor_timeout_ms: u64,
}

impl Default for ControlLoopConfig {
    fn default() -> Self {
        Self {
            sample_period_ms: 100,
            sensor_timeout_ms: 50,
        }
    }
}

impl ControlLoopConfig {
    pub fn sample_period(&self) -> Duration {
        Duration::from_millis(self.sample_period_ms)
    }

    pub fn sensor_timeout(&self) -> Duration {
        Duration::from_millis(self.sensor_timeout_ms)
    }

    /// # Errors
    ///
    /// Returns [`AntirollError::Config`] for a zero period or timeout.
    pub fn validate(&self) -> Result<(), AntirollError> {
        if self.sample_period_ms == 0 {
            return Err(AntirollError::Config("sample_period_ms must be positive".into()));
        }
        if self.sensor_timeout_ms == 0 {
            return Err(AntirollError::Config("sensor_timeout_ms must be positive".into()));
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tick outcome and report
// ─────────────────────────────────────────────────────────────────────────────

/// What happened during one control tick.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// The controller recomputed and the command was applied.
    Commanded(ControlState),
    /// The sample arrived inside the control interval; the stored command
    /// was re-applied and the sample was not ingested.
    RateLimited(ControlState),
    /// No reading arrived within the sensor timeout.
    SensorTimeout(ControlState),
    /// The sensor reported a fault.
    SensorFault(ControlState, AntirollError),
    /// The reading was malformed; no new command was issued.
    Rejected(AntirollError),
    /// The wheel drive refused the command.
    ActuationFault(ControlState, AntirollError),
}

/// Counters accumulated over a [`ControlLoop::run`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoopReport {
    pub ticks: u64,
    pub commanded: u64,
    pub rate_limited: u64,
    pub sensor_timeouts: u64,
    pub sensor_faults: u64,
    pub rejected_samples: u64,
    pub actuation_faults: u64,
    /// Last state published by the loop.
    pub final_state: ControlState,
}

impl LoopReport {
    fn record(&mut self, outcome: &TickOutcome) {
        self.ticks += 1;
        match outcome {
            TickOutcome::Commanded(_) => self.commanded += 1,
            TickOutcome::RateLimited(_) => self.rate_limited += 1,
            TickOutcome::SensorTimeout(_) => self.sensor_timeouts += 1,
            TickOutcome::SensorFault(..) => self.sensor_faults += 1,
            TickOutcome::Rejected(_) => self.rejected_samples += 1,
            TickOutcome::ActuationFault(..) => self.actuation_faults += 1,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ControlLoop
// ─────────────────────────────────────────────────────────────────────────────

/// Periodic sensor → controller → wheel drive task.
pub struct ControlLoop<C: Clock> {
    controller: DifferentialController<C>,
    imu: Box<dyn ImuSource>,
    drive: Box<dyn WheelDrive>,
    config: ControlLoopConfig,
    state_tx: watch::Sender<ControlState>,
}

impl<C: Clock> ControlLoop<C> {
    pub fn new(
        controller: DifferentialController<C>,
        imu: Box<dyn ImuSource>,
        drive: Box<dyn WheelDrive>,
        config: ControlLoopConfig,
    ) -> Self {
        let (state_tx, _) = watch::channel(controller.state());
        Self {
            controller,
            imu,
            drive,
            config,
            state_tx,
        }
    }

    /// A receiver that observes every published [`ControlState`].
    pub fn subscribe(&self) -> watch::Receiver<ControlState> {
        self.state_tx.subscribe()
    }

    pub fn controller(&self) -> &DifferentialController<C> {
        &self.controller
    }

    /// Clear the controller back to its startup state and publish it.
    pub fn reset(&mut self) {
        self.controller.reset();
        self.state_tx.send_replace(self.controller.state());
    }

    /// Run a single tick.
    pub async fn tick_once(&mut self) -> TickOutcome {
        let now = self.controller.clock().now();
        let read = tokio::time::timeout(self.config.sensor_timeout(), self.imu.read()).await;

        let rate_limited = self.controller.is_rate_limited(now);
        let (state, sensor_error) = match read {
            Ok(Ok(reading)) => match self.apply(&reading, now) {
                Ok(state) => (state, None),
                Err(e) => return TickOutcome::Rejected(e),
            },
            Ok(Err(e)) => {
                warn!(sensor = %self.imu.id(), error = %e, "sensor fault; treating tick as empty");
                (self.controller.missing_sample(), Some(e))
            }
            Err(_) => {
                warn!(
                    sensor = %self.imu.id(),
                    timeout = ?self.config.sensor_timeout(),
                    "sensor read timed out; treating tick as empty"
                );
                let after = self.config.sensor_timeout();
                (
                    self.controller.missing_sample(),
                    Some(AntirollError::SensorTimeout { after }),
                )
            }
        };

        let actuation = self.drive.set_speeds(state.left_speed, state.right_speed);
        self.state_tx.send_replace(state);

        match (actuation, sensor_error) {
            (Err(e), _) => {
                warn!(drive = %self.drive.id(), error = %e, "wheel command rejected");
                TickOutcome::ActuationFault(state, e)
            }
            (Ok(()), None) if rate_limited => TickOutcome::RateLimited(state),
            (Ok(()), None) => TickOutcome::Commanded(state),
            (Ok(()), Some(AntirollError::SensorTimeout { .. })) => TickOutcome::SensorTimeout(state),
            (Ok(()), Some(e)) => TickOutcome::SensorFault(state, e),
        }
    }

    fn apply(
        &mut self,
        reading: &RawReading,
        now: Timestamp,
    ) -> Result<ControlState, AntirollError> {
        self.controller
            .ingest(&reading.accel, reading.gyro.as_deref(), now)
    }

    /// Tick every `sample_period` until `shutdown` becomes `true` or its
    /// sender is dropped.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> LoopReport {
        let mut report = LoopReport::default();
        let mut interval = tokio::time::interval(self.config.sample_period());
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            sensor = %self.imu.id(),
            drive = %self.drive.id(),
            period = ?self.config.sample_period(),
            "control loop started"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                _ = interval.tick() => {
                    let outcome = self.tick_once().await;
                    report.record(&outcome);
                }
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        report.final_state = *self.state_tx.borrow();
        info!(
            ticks = report.ticks,
            rate_limited = report.rate_limited,
            sensor_timeouts = report.sensor_timeouts,
            rejected = report.rejected_samples,
            "control loop stopped"
        );
        report
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
