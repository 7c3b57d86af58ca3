use log::debug;

use super::model::ExamReading;
use super::{GLUCOSE_MAX, GLUCOSE_MIN};
use crate::blockchain::Payload;
use crate::error::{LedgerError, Result};

/// Range check applied to every reading before it becomes a block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExamContract {
    min: f64,
    max: f64,
}

impl Default for ExamContract {
    fn default() -> Self {
        Self {
            min: GLUCOSE_MIN,
            max: GLUCOSE_MAX,
        }
    }
}

impl ExamContract {
    pub fn with_range(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Accept a raw glucose value, returning the reading to record.
    pub fn validate(&self, glucose: f64) -> Result<ExamReading> {
        if !glucose.is_finite() {
            return Err(LedgerError::InvalidReading(
                "missing or invalid glucose data".into(),
            ));
        }
        if glucose < self.min || glucose > self.max {
            debug!("CONTRACT - rejected glucose={glucose}");
            return Err(LedgerError::InvalidReading(format!(
                "glucose value outside the allowed range ({} to {})",
                self.min, self.max
            )));
        }
        ExamReading::new(glucose)
    }

    /// Same check for a payload that arrived already built.
    pub fn validate_payload(&self, payload: &Payload) -> Result<ExamReading> {
        match payload.as_exam() {
            Some(reading) => self.validate(reading.glucose()),
            None => Err(LedgerError::InvalidReading(
                "missing or invalid glucose data".into(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ExamContract;
    use crate::blockchain::Payload;
    use crate::error::LedgerError;

    #[test]
    fn accepts_bounds_inclusive() {
        let contract = ExamContract::default();
        assert_eq!(contract.validate(70.0).unwrap().glucose(), 70.0);
        assert_eq!(contract.validate(95.0).unwrap().glucose(), 95.0);
        assert_eq!(contract.validate(200.0).unwrap().glucose(), 200.0);
    }

    #[test]
    fn rejects_out_of_range() {
        let contract = ExamContract::default();
        let err = contract.validate(250.0).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidReading(ref msg) if msg.contains("70 to 200")));
        assert!(contract.validate(69.9).is_err());
    }

    #[test]
    fn rejects_nan() {
        assert!(matches!(
            ExamContract::default().validate(f64::NAN),
            Err(LedgerError::InvalidReading(_))
        ));
    }

    #[test]
    fn payload_without_reading_is_rejected() {
        let contract = ExamContract::default();
        assert!(contract.validate_payload(&Payload::genesis()).is_err());
    }

    #[test]
    fn custom_range() {
        let contract = ExamContract::with_range(50.0, 60.0);
        assert!(contract.validate(55.0).is_ok());
        assert!(contract.validate(95.0).is_err());
    }
}
