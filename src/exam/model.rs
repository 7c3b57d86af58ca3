use std::fmt;

use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Number;

use crate::error::{LedgerError, Result};

/// A blood glucose measurement, persisted as `{"glicose": <number>}`.
///
/// The value is kept as a JSON number so readings restored from disk
/// re-serialize exactly as they were stored (`95` stays `95`, `95.0` stays
/// `95.0`). Only an object whose single key is `glicose` decodes as a
/// reading; arrays and other shapes are left to the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExamReading {
    #[serde(rename = "glicose")]
    glucose: Number,
}

impl ExamReading {
    /// Fails for NaN and infinities, which have no JSON form.
    pub fn new(glucose: f64) -> Result<Self> {
        Number::from_f64(glucose)
            .map(|glucose| Self { glucose })
            .ok_or_else(|| LedgerError::NonCanonical(format!("glucose reading {glucose}")))
    }

    pub fn glucose(&self) -> f64 {
        self.glucose.as_f64().unwrap_or(f64::NAN)
    }
}

const GLUCOSE_FIELD: &str = "glicose";

struct ExamReadingVisitor;

impl<'de> Visitor<'de> for ExamReadingVisitor {
    type Value = ExamReading;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an object with a single numeric `glicose` field")
    }

    fn visit_map<A>(self, mut map: A) -> std::result::Result<ExamReading, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut glucose: Option<Number> = None;
        while let Some(key) = map.next_key::<String>()? {
            if key != GLUCOSE_FIELD {
                return Err(de::Error::unknown_field(&key, &[GLUCOSE_FIELD]));
            }
            if glucose.is_some() {
                return Err(de::Error::duplicate_field(GLUCOSE_FIELD));
            }
            glucose = Some(map.next_value()?);
        }
        let glucose = glucose.ok_or_else(|| de::Error::missing_field(GLUCOSE_FIELD))?;
        Ok(ExamReading { glucose })
    }
}

impl<'de> Deserialize<'de> for ExamReading {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(ExamReadingVisitor)
    }
}
