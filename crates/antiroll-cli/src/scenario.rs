//! Bench drive used by the `antiroll` binary when no hardware is attached.

use std::time::Duration;

use antiroll_hal::sim::{ScriptStep, ScriptedImu};
use antiroll_types::RawReading;

fn step(accel: [f64; 3], gyro: [f64; 3]) -> ScriptStep {
    ScriptStep::Reading(RawReading::new(accel.to_vec(), Some(gyro.to_vec())))
}

fn repeat(n: usize, s: ScriptStep) -> impl Iterator<Item = ScriptStep> {
    std::iter::repeat_n(s, n)
}

/// Straight run, a gentle left bend, a sharp right turn, one sensor stall,
/// then back to straight.  Loops forever.
pub fn bench_drive(sensor_timeout: Duration) -> ScriptedImu {
    let straight = step([0.1, 0.05, 9.81], [0.0, 0.0, 0.0]);
    let gentle_left = step([0.3, -1.2, 9.7], [0.0, -0.05, 0.1]);
    let sharp_right = step([1.5, 3.0, 8.5], [0.0, 0.2, -0.4]);
    let stall = ScriptStep::Delayed(
        sensor_timeout * 2,
        RawReading::accel_only(vec![0.1, 0.05, 9.81]),
    );

    let steps: Vec<ScriptStep> = repeat(20, straight.clone())
        .chain(repeat(10, gentle_left))
        .chain(repeat(10, sharp_right))
        .chain(std::iter::once(stall))
        .chain(repeat(9, straight))
        .collect();

    ScriptedImu::new("bench_imu", steps).looping()
}
