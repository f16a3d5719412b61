//! Range checks for actuator commands and device pushes.

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("light_level must be one of 1, 2, 3 or 4 (got {0})")]
    LightLevel(f64),

    #[error("fan_speed must be between 0 and 100 (got {0})")]
    FanSpeed(f64),

    #[error("{0} must be a finite number")]
    NotFinite(&'static str),

    #[error("{0} must not be empty")]
    Empty(&'static str),
}

pub fn light_level(value: f64) -> Result<u8, ValidationError> {
    if value.fract() == 0.0 && (1.0..=4.0).contains(&value) {
        Ok(value as u8)
    } else {
        Err(ValidationError::LightLevel(value))
    }
}

/// Validate a commanded fan speed and round it to the webhook's integer form.
pub fn fan_speed(value: f64) -> Result<u8, ValidationError> {
    fan_speed_value(value).map(|v| v.round() as u8)
}

/// Validate a fan speed without rounding; used for readings pushed by devices.
pub fn fan_speed_value(value: f64) -> Result<f64, ValidationError> {
    if (0.0..=100.0).contains(&value) {
        Ok(value)
    } else {
        Err(ValidationError::FanSpeed(value))
    }
}

pub fn finite(field: &'static str, value: f64) -> Result<f64, ValidationError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ValidationError::NotFinite(field))
    }
}

pub fn non_empty<'a>(field: &'static str, value: &'a str) -> Result<&'a str, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(ValidationError::Empty(field))
    } else {
        Ok(trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fan_speed_bounds() {
        assert_eq!(fan_speed(-1.0), Err(ValidationError::FanSpeed(-1.0)));
        assert_eq!(fan_speed(101.0), Err(ValidationError::FanSpeed(101.0)));
        assert_eq!(fan_speed(0.0), Ok(0));
        assert_eq!(fan_speed(100.0), Ok(100));
        assert_eq!(fan_speed(49.6), Ok(50));
        assert!(fan_speed(f64::NAN).is_err());
    }

    #[test]
    fn light_level_accepts_only_four_steps() {
        for level in 1..=4 {
            assert_eq!(light_level(level as f64), Ok(level));
        }
        assert!(light_level(0.0).is_err());
        assert!(light_level(5.0).is_err());
        assert!(light_level(2.5).is_err());
        assert!(light_level(f64::INFINITY).is_err());
    }

    #[test]
    fn finite_and_non_empty() {
        assert_eq!(finite("temp", 21.0), Ok(21.0));
        assert_eq!(finite("temp", f64::NAN), Err(ValidationError::NotFinite("temp")));
        assert_eq!(non_empty("device_type", "  Fan "), Ok("Fan"));
        assert_eq!(non_empty("device_type", "   "), Err(ValidationError::Empty("device_type")));
    }
}
