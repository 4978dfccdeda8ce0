// Verification stamp: `PREFIX-YYYY-NNNNN` identifiers and the record that
// travels with each rendered register.

use std::fmt;

use chrono::{Datelike, NaiveDate};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{ReportError, Result};

pub const DEFAULT_PREFIX: &str = "ETNCH";

// Exclusive upper bound of the serial part.
const SERIAL_LIMIT: u32 = 100_000;

/// Human-readable stamp for manual cross-reference. Not globally unique.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VerificationId(String);

impl VerificationId {
    /// Assemble an identifier from its parts. The serial is reduced modulo
    /// 100000 so it always fits five digits.
    pub fn from_parts(prefix: &str, year: i32, serial: u32) -> Self {
        Self(format!(
            "{}-{:04}-{:05}",
            prefix,
            year,
            serial % SERIAL_LIMIT
        ))
    }

    pub fn generate<R: Rng>(prefix: &str, year: i32, rng: &mut R) -> Self {
        Self::from_parts(prefix, year, rng.gen_range(0..SERIAL_LIMIT))
    }

    /// Validate and wrap an existing identifier.
    pub fn parse(value: &str) -> Result<Self> {
        let invalid = || ReportError::Config(format!("malformed verification id: {}", value));

        let mut parts = value.rsplitn(3, '-');
        let serial = parts.next().ok_or_else(invalid)?;
        let year = parts.next().ok_or_else(invalid)?;
        let prefix = parts.next().ok_or_else(invalid)?;

        let digits = |s: &str, len: usize| s.len() == len && s.bytes().all(|b| b.is_ascii_digit());
        if !is_valid_prefix(prefix) || !digits(year, 4) || !digits(serial, 5) {
            return Err(invalid());
        }
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

pub fn is_valid_prefix(prefix: &str) -> bool {
    !prefix.is_empty() && prefix.bytes().all(|b| b.is_ascii_alphanumeric())
}

impl fmt::Display for VerificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for VerificationId {
    type Error = ReportError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<VerificationId> for String {
    fn from(id: VerificationId) -> Self {
        id.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationRecord {
    pub identifier: VerificationId,
    pub generated_on: NaiveDate,
    pub total_plates: usize,
}

impl VerificationRecord {
    /// Issue a fresh record. The identifier year follows `generated_on`.
    pub fn issue(prefix: &str, generated_on: NaiveDate, total_plates: usize) -> Self {
        let identifier =
            VerificationId::generate(prefix, generated_on.year(), &mut rand::thread_rng());
        Self {
            identifier,
            generated_on,
            total_plates,
        }
    }

    pub fn date_label(&self) -> String {
        self.generated_on.format("%Y-%m-%d").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn serial_is_always_five_digits() {
        for serial in [0, 7, 42, 999, 12_345, 99_999] {
            let id = VerificationId::from_parts("ETNCH", 2026, serial);
            let tail = id.as_str().rsplit('-').next().unwrap();
            assert_eq!(tail.len(), 5, "{}", id);
            assert!(VerificationId::parse(id.as_str()).is_ok());
        }
        assert_eq!(VerificationId::from_parts("ETNCH", 2026, 0).as_str(), "ETNCH-2026-00000");
    }

    #[test]
    fn random_draws_match_the_shape() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            let id = VerificationId::generate("ETNCH", 2026, &mut rng);
            assert!(id.as_str().starts_with("ETNCH-2026-"));
            assert!(VerificationId::parse(id.as_str()).is_ok(), "{}", id);
        }
    }

    #[test]
    fn issued_record_uses_the_generation_year() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 9).unwrap();
        let record = VerificationRecord::issue("ETNCH", date, 12);
        assert!(record.identifier.as_str().starts_with("ETNCH-2025-"));
        assert_eq!(record.date_label(), "2025-03-09");
        assert_eq!(record.total_plates, 12);
    }

    #[test]
    fn malformed_identifiers_are_rejected() {
        for bad in ["", "ETNCH", "ETNCH-2026", "ETNCH-26-00001", "ETNCH-2026-1", "-2026-00001", "ET NCH-2026-00001"] {
            assert!(VerificationId::parse(bad).is_err(), "{}", bad);
        }
    }

    #[test]
    fn record_round_trips_through_json() {
        let record = VerificationRecord {
            identifier: VerificationId::from_parts("ETNCH", 2026, 314),
            generated_on: NaiveDate::from_ymd_opt(2026, 10, 18).unwrap(),
            total_plates: 3,
        };
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"ETNCH-2026-00314\""));
        let back: VerificationRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }
}
