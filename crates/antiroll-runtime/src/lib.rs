//! `antiroll-runtime` – The Control Loop
//!
//! Where risk becomes actuation.  One control tick reads one sample, runs
//! feature extraction, risk estimation, and the differential law in order,
//! and emits one wheel-speed command.
//!
//! # Modules
//!
//! - [`controller`] – [`DifferentialController`][controller::DifferentialController]:
//!   owns a [`FeatureExtractor`][antiroll_perception::FeatureExtractor] and a
//!   [`RiskEstimator`][antiroll_kernel::RiskEstimator], rate-limits full
//!   recomputation to the control interval, and turns risk into asymmetric
//!   left/right wheel speeds.
//! - [`clock`] – [`Clock`][clock::Clock]: injectable monotonic time source so
//!   the rate limiter can be driven without real delays.
//! - [`control_loop`] – [`ControlLoop`][control_loop::ControlLoop]: the
//!   periodic task that bounds every sensor read with a timeout, forwards
//!   commands to a [`WheelDrive`][antiroll_hal::WheelDrive], and publishes
//!   each [`ControlState`][antiroll_types::ControlState] on a `watch`
//!   channel for telemetry readers.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]: initialises
//!   the global `tracing` subscriber with an optional OTLP span exporter.

pub mod clock;
pub mod control_loop;
pub mod controller;
pub mod telemetry;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use control_loop::{ControlLoop, ControlLoopConfig, LoopReport, TickOutcome};
pub use controller::{ControllerConfig, DifferentialController};
pub use telemetry::{TracerProviderGuard, init_tracing};
