//! `antiroll-hal` – Hardware Abstraction Layer
//!
//! The control core never talks to a sensor SDK or a motor controller
//! directly.  It reads through [`ImuSource`] and commands through
//! [`WheelDrive`], so boards can be swapped without touching the risk or
//! control logic.
//!
//! # Modules
//!
//! - [`imu`] – [`ImuSource`][imu::ImuSource]: periodic inertial sensor
//!   source yielding raw `(x, y, z)` triples.
//! - [`drive`] – [`WheelDrive`][drive::WheelDrive]: maps left/right speed
//!   ratios onto the physical wheel motors.
//! - [`sim`] – in-process drivers ([`ScriptedImu`][sim::ScriptedImu],
//!   [`SimWheelDrive`][sim::SimWheelDrive]) for tests and bench runs without
//!   hardware.

pub mod drive;
pub mod imu;
pub mod sim;

pub use drive::WheelDrive;
pub use imu::ImuSource;
pub use sim::{ScriptStep, ScriptedImu, SimWheelDrive};
