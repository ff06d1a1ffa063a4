//! Generic `WheelDrive` trait for the carrier's left/right wheel motors.
//!
//! Speeds are ratios of the carrier's base speed (`1.0` = full speed).  How a
//! ratio becomes a PWM duty cycle or an ESC command is the driver's concern.

use antiroll_types::AntirollError;

/// The actuation layer for a two-wheel differential.
pub trait WheelDrive: Send + Sync {
    /// Stable identifier, e.g. `"wheel_base"`.
    fn id(&self) -> &str;

    /// Apply a new left/right speed ratio pair.
    ///
    /// # Errors
    ///
    /// Returns [`AntirollError::ActuationFault`] if the motors cannot accept
    /// the command.
    fn set_speeds(&mut self, left: f64, right: f64) -> Result<(), AntirollError>;

    /// Most recently applied `(left, right)` ratios.
    fn speeds(&self) -> (f64, f64);
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MockDrive {
        speeds: (f64, f64),
    }

    impl WheelDrive for MockDrive {
        fn id(&self) -> &str {
            "mock"
        }

        fn set_speeds(&mut self, left: f64, right: f64) -> Result<(), AntirollError> {
            self.speeds = (left, right);
            Ok(())
        }

        fn speeds(&self) -> (f64, f64) {
            self.speeds
        }
    }

    #[test]
    fn mock_drive_set_and_get() {
        let mut drive = MockDrive { speeds: (0.0, 0.0) };
        drive.set_speeds(1.0, 0.7).unwrap();
        assert_eq!(drive.speeds(), (1.0, 0.7));
        assert_eq!(drive.id(), "mock");
    }
}
