//! In-process simulation drivers for tests and bench runs without hardware.
//!
//! [`ScriptedImu`] replays a fixed list of [`ScriptStep`]s, including
//! stalls and faults, so the control loop's timeout and error paths can be
//! exercised deterministically.  [`SimWheelDrive`] records every command it
//! receives.
//!
//! # Example
//!
//! ```rust
//! use antiroll_hal::sim::SimWheelDrive;
//! use antiroll_hal::WheelDrive;
//!
//! let mut drive = SimWheelDrive::new("wheel_base");
//! let log = drive.command_log();
//!
//! drive.set_speeds(1.0, 0.7).expect("sim drive must succeed");
//! assert_eq!(drive.speeds(), (1.0, 0.7));
//! assert_eq!(log.lock().unwrap().len(), 1);
//! ```

use std::sync::{Arc, Mutex};
use std::time::Duration;

use antiroll_types::{AntirollError, RawReading};
use async_trait::async_trait;
use tracing::debug;

use crate::drive::WheelDrive;
use crate::imu::ImuSource;

// ────────────────────────────────────────────────────────────────────────────
// Scripted IMU
// ────────────────────────────────────────────────────────────────────────────

/// One step of a [`ScriptedImu`] replay.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptStep {
    /// Deliver this reading immediately.
    Reading(RawReading),
    /// Block for the given duration, then deliver the reading.
    Delayed(Duration, RawReading),
    /// Fail the read with a sensor fault.
    Fault(String),
}

/// A simulated IMU replaying a script of readings.
///
/// Each call to [`ImuSource::read`] consumes one step.  Once the script is
/// exhausted the source either starts over ([`ScriptedImu::looping`]) or
/// reports a sensor fault.
pub struct ScriptedImu {
    id: String,
    steps: Vec<ScriptStep>,
    cursor: usize,
    looping: bool,
}

impl ScriptedImu {
    pub fn new(id: impl Into<String>, steps: Vec<ScriptStep>) -> Self {
        Self {
            id: id.into(),
            steps,
            cursor: 0,
            looping: false,
        }
    }

    /// Restart from the first step once the script is exhausted.
    pub fn looping(mut self) -> Self {
        self.looping = true;
        self
    }

    /// Number of steps consumed so far (across loops).
    pub fn consumed(&self) -> usize {
        self.cursor
    }

    fn next_step(&mut self) -> Option<ScriptStep> {
        if self.steps.is_empty() {
            return None;
        }
        let index = if self.looping {
            self.cursor % self.steps.len()
        } else {
            self.cursor
        };
        let step = self.steps.get(index).cloned()?;
        self.cursor += 1;
        Some(step)
    }
}

#[async_trait]
impl ImuSource for ScriptedImu {
    fn id(&self) -> &str {
        &self.id
    }

    async fn read(&mut self) -> Result<RawReading, AntirollError> {
        // The step is consumed before any delay, so a read cancelled by a
        // timeout does not replay it.
        match self.next_step() {
            Some(ScriptStep::Reading(reading)) => Ok(reading),
            Some(ScriptStep::Delayed(delay, reading)) => {
                debug!(sensor = %self.id, ?delay, "scripted stall");
                tokio::time::sleep(delay).await;
                Ok(reading)
            }
            Some(ScriptStep::Fault(details)) => Err(AntirollError::SensorFault {
                sensor: self.id.clone(),
                details,
            }),
            None => Err(AntirollError::SensorFault {
                sensor: self.id.clone(),
                details: "script exhausted".to_string(),
            }),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Simulated wheel drive
// ────────────────────────────────────────────────────────────────────────────

/// Shared log of `(left, right)` commands applied to a [`SimWheelDrive`].
pub type CommandLog = Arc<Mutex<Vec<(f64, f64)>>>;

/// A simulated wheel pair that records every command.  Succeeds unless
/// built with [`SimWheelDrive::faulty`].
pub struct SimWheelDrive {
    id: String,
    speeds: (f64, f64),
    log: CommandLog,
    faulty: bool,
}

impl SimWheelDrive {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            speeds: (0.0, 0.0),
            log: CommandLog::default(),
            faulty: false,
        }
    }

    /// A drive that rejects every command with an actuation fault.
    pub fn faulty(id: impl Into<String>) -> Self {
        Self {
            faulty: true,
            ..Self::new(id)
        }
    }

    /// Handle to the command log; stays valid after the drive is moved
    /// into a control loop.
    pub fn command_log(&self) -> CommandLog {
        Arc::clone(&self.log)
    }
}

impl WheelDrive for SimWheelDrive {
    fn id(&self) -> &str {
        &self.id
    }

    fn set_speeds(&mut self, left: f64, right: f64) -> Result<(), AntirollError> {
        if self.faulty {
            return Err(AntirollError::ActuationFault {
                component: self.id.clone(),
                details: "simulated motor fault".to_string(),
            });
        }
        self.speeds = (left, right);
        if let Ok(mut log) = self.log.lock() {
            log.push((left, right));
        }
        Ok(())
    }

    fn speeds(&self) -> (f64, f64) {
        self.speeds
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
