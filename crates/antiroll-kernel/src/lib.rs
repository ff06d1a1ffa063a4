//! `antiroll-kernel` – Rollover Risk Assessment
//!
//! The safety core of the stack.  It does not actuate anything; it decides
//! how dangerous the carrier's current attitude is.
//!
//! # Modules
//!
//! - [`risk`] – [`RiskEstimator`][risk::RiskEstimator]: a stateless mapping
//!   from one inertial sample to a bounded
//!   [`RiskAssessment`][antiroll_types::RiskAssessment], parameterised by a
//!   [`RiskThresholds`][risk::RiskThresholds] configuration value.

pub mod risk;

pub use risk::{RiskEstimator, RiskFactors, RiskThresholds};
