//! Light driver capability.
//!
//! The controller only needs to set one unit's color and latch a frame.
//! Hardware drivers implement [`IndicatorDriver`]; without hardware the
//! [`NullIndicator`] accepts every write and does nothing.

use hexlight_core::Rgb;
use thiserror::Error;
use tracing::trace;

#[derive(Debug, Clone, Error)]
pub enum IndicatorError {
    #[error("Unit {unit} out of range (strip has {count} units)")]
    UnitOutOfRange { unit: usize, count: usize },

    #[error("Driver write failed: {0}")]
    Write(String),
}

/// Something that can light the board's units.
pub trait IndicatorDriver: Send {
    /// Number of units on the strip
    fn unit_count(&self) -> usize;

    /// Stage a color for one unit; visible after [`IndicatorDriver::show`]
    fn set_unit_color(&mut self, unit: usize, color: Rgb) -> Result<(), IndicatorError>;

    /// Latch staged colors to the lights
    fn show(&mut self) -> Result<(), IndicatorError>;
}

/// Driver used when no lights are attached
#[derive(Debug, Clone)]
pub struct NullIndicator {
    units: usize,
}

impl NullIndicator {
    pub fn new(units: usize) -> Self {
        Self { units }
    }
}

impl IndicatorDriver for NullIndicator {
    fn unit_count(&self) -> usize {
        self.units
    }

    fn set_unit_color(&mut self, _unit: usize, _color: Rgb) -> Result<(), IndicatorError> {
        Ok(())
    }

    fn show(&mut self) -> Result<(), IndicatorError> {
        Ok(())
    }
}

/// Driver that traces every frame instead of lighting anything.
///
/// Handy for watching animations on a machine without the strip.
#[derive(Debug, Clone)]
pub struct LogIndicator {
    staged: Vec<Rgb>,
}

impl LogIndicator {
    pub fn new(units: usize) -> Self {
        Self {
            staged: vec![Rgb::OFF; units],
        }
    }
}

impl IndicatorDriver for LogIndicator {
    fn unit_count(&self) -> usize {
        self.staged.len()
    }

    fn set_unit_color(&mut self, unit: usize, color: Rgb) -> Result<(), IndicatorError> {
        let count = self.staged.len();
        let slot = self
            .staged
            .get_mut(unit)
            .ok_or(IndicatorError::UnitOutOfRange { unit, count })?;
        *slot = color;
        Ok(())
    }

    fn show(&mut self) -> Result<(), IndicatorError> {
        trace!(frame = ?self.staged, "show");
        Ok(())
    }
}

/// Which driver to build at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverKind {
    None,
    Log,
}

impl std::str::FromStr for DriverKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" | "null" => Ok(DriverKind::None),
            "log" => Ok(DriverKind::Log),
            other => Err(format!("unknown indicator driver '{}'", other)),
        }
    }
}

impl DriverKind {
    pub fn build(self, units: usize) -> Box<dyn IndicatorDriver> {
        match self {
            DriverKind::None => Box::new(NullIndicator::new(units)),
            DriverKind::Log => Box::new(LogIndicator::new(units)),
        }
    }
}

/// Test driver that records every shown frame and can be told to fail.
#[cfg(test)]
#[derive(Debug, Clone)]
pub struct RecordingIndicator {
    staged: Vec<Rgb>,
    frames: std::sync::Arc<parking_lot::Mutex<Vec<Vec<Rgb>>>>,
    failure: Option<Failure>,
}

#[cfg(test)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    /// `show` returns an error
    Error,
    /// `show` panics
    Panic,
}

#[cfg(test)]
impl RecordingIndicator {
    pub fn new(units: usize) -> Self {
        Self {
            staged: vec![Rgb::OFF; units],
            frames: Default::default(),
            failure: None,
        }
    }

    pub fn failing(units: usize, failure: Failure) -> Self {
        Self {
            failure: Some(failure),
            ..Self::new(units)
        }
    }

    /// Shared handle to the recorded frames
    pub fn frames(&self) -> std::sync::Arc<parking_lot::Mutex<Vec<Vec<Rgb>>>> {
        std::sync::Arc::clone(&self.frames)
    }
}

#[cfg(test)]
impl IndicatorDriver for RecordingIndicator {
    fn unit_count(&self) -> usize {
        self.staged.len()
    }

    fn set_unit_color(&mut self, unit: usize, color: Rgb) -> Result<(), IndicatorError> {
        let count = self.staged.len();
        let slot = self
            .staged
            .get_mut(unit)
            .ok_or(IndicatorError::UnitOutOfRange { unit, count })?;
        *slot = color;
        Ok(())
    }

    fn show(&mut self) -> Result<(), IndicatorError> {
        match self.failure {
            Some(Failure::Error) => Err(IndicatorError::Write("strip unplugged".into())),
            Some(Failure::Panic) => panic!("driver crashed"),
            None => {
                self.frames.lock().push(self.staged.clone());
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_indicator_accepts_everything() {
        let mut driver = NullIndicator::new(18);
        assert_eq!(driver.unit_count(), 18);
        assert!(driver.set_unit_color(99, Rgb::WHITE).is_ok());
        assert!(driver.show().is_ok());
    }

    #[test]
    fn test_log_indicator_bounds() {
        let mut driver = LogIndicator::new(2);
        assert!(driver.set_unit_color(1, Rgb::RED).is_ok());
        assert!(matches!(
            driver.set_unit_color(2, Rgb::RED),
            Err(IndicatorError::UnitOutOfRange { unit: 2, count: 2 })
        ));
        assert!(driver.show().is_ok());
    }

    #[test]
    fn test_driver_kind_parse() {
        assert_eq!("none".parse::<DriverKind>(), Ok(DriverKind::None));
        assert_eq!("LOG".parse::<DriverKind>(), Ok(DriverKind::Log));
        assert!("neopixel".parse::<DriverKind>().is_err());
    }
}
