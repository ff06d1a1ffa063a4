//! `antiroll-perception` – windowed sensor features.
//!
//! Turns the raw inertial stream into the derived view the controller
//! reasons about.
//!
//! # Modules
//!
//! - [`window`] – [`SampleWindow`][window::SampleWindow]: fixed-capacity ring
//!   buffer holding the most recent samples in chronological order.
//! - [`features`] – [`FeatureExtractor`][features::FeatureExtractor]: owns the
//!   accelerometer and gyroscope windows and computes a
//!   [`FeatureSnapshot`][features::FeatureSnapshot] (orientation, magnitude,
//!   rate of change, window statistics) plus a sudden-change
//!   [`AnomalySignal`][antiroll_types::AnomalySignal] on demand.

pub mod features;
pub mod window;

pub use features::{DEFAULT_ANOMALY_THRESHOLD, FeatureExtractor, FeatureSnapshot};
pub use window::{DEFAULT_WINDOW_SIZE, SampleWindow};
