//! Measurement records - one inspected piece per record

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;

/// Pass/fail outcome of a tolerance evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verdict {
    #[serde(rename = "APROVADO")]
    Approved,
    #[serde(rename = "REPROVADO")]
    Rejected,
}

impl Verdict {
    pub fn is_approved(&self) -> bool {
        matches!(self, Verdict::Approved)
    }

    /// Persisted name
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Approved => "APROVADO",
            Verdict::Rejected => "REPROVADO",
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Verdict {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "APROVADO" | "APPROVED" => Ok(Verdict::Approved),
            "REPROVADO" | "REJECTED" => Ok(Verdict::Rejected),
            _ => Err(format!(
                "Invalid verdict: {}. Use APROVADO or REPROVADO",
                s
            )),
        }
    }
}

/// One piece's measured dimensions and the verdict derived at creation time.
///
/// Field names match the legacy JSON layout so the same type serves both the
/// YAML entity files and the `medicoes_json` blob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementRecord {
    /// Sequence id, unique within the owning lot
    pub id: u64,

    /// When the measurement was taken
    #[serde(rename = "data", with = "lenient_timestamp")]
    pub taken_at: DateTime<Utc>,

    /// Piece sequence number assigned by the lot
    #[serde(rename = "pecaNumero")]
    pub piece_number: u32,

    /// Measured value per dimension name
    #[serde(rename = "dimensoes", default)]
    pub dimensions: BTreeMap<String, f64>,

    /// Free-text note
    #[serde(rename = "observacoes", default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,

    /// Verdict computed when the record was created
    #[serde(rename = "status")]
    pub verdict: Verdict,
}

impl MeasurementRecord {
    pub fn is_approved(&self) -> bool {
        self.verdict.is_approved()
    }
}

/// Timestamps written as RFC 3339; naive `YYYY-MM-DDTHH:MM:SS[.fff]` values
/// from older data are read as UTC.
pub mod lenient_timestamp {
    use super::*;

    const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

    pub fn parse(value: &str) -> Result<DateTime<Utc>, String> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
            return Ok(dt.with_timezone(&Utc));
        }
        for fmt in NAIVE_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(value, fmt) {
                return Ok(naive.and_utc());
            }
        }
        Err(format!("invalid timestamp '{}'", value))
    }

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let s = String::deserialize(deserializer)?;
        parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_verdict_persisted_names() {
        assert_eq!(
            serde_json::to_string(&Verdict::Approved).unwrap(),
            "\"APROVADO\""
        );
        assert_eq!(
            serde_json::from_str::<Verdict>("\"REPROVADO\"").unwrap(),
            Verdict::Rejected
        );
        assert_eq!("approved".parse::<Verdict>().unwrap(), Verdict::Approved);
        assert!("maybe".parse::<Verdict>().is_err());
    }

    #[test]
    fn test_record_uses_legacy_field_names() {
        let record = MeasurementRecord {
            id: 3,
            taken_at: Utc.with_ymd_and_hms(2024, 3, 1, 8, 30, 0).unwrap(),
            piece_number: 7,
            dimensions: BTreeMap::from([("comprimento".to_string(), 50.05)]),
            note: Some("ok".to_string()),
            verdict: Verdict::Approved,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["pecaNumero"], 7);
        assert_eq!(json["dimensoes"]["comprimento"], 50.05);
        assert_eq!(json["observacoes"], "ok");
        assert_eq!(json["status"], "APROVADO");
        assert!(json["data"].as_str().unwrap().starts_with("2024-03-01T08:30:00"));
    }

    #[test]
    fn test_naive_timestamp_read_as_utc() {
        let json = r#"{"id":1,"data":"2024-03-01T08:30:00.123","pecaNumero":1,"dimensoes":{},"status":"REPROVADO"}"#;
        let record: MeasurementRecord = serde_json::from_str(json).unwrap();
        assert_eq!(
            record.taken_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            "2024-03-01 08:30:00"
        );
        assert_eq!(record.note, None);
        assert!(!record.is_approved());
    }

    #[test]
    fn test_bad_timestamp_is_error() {
        let json = r#"{"id":1,"data":"yesterday","pecaNumero":1,"dimensoes":{},"status":"APROVADO"}"#;
        assert!(serde_json::from_str::<MeasurementRecord>(json).is_err());
    }
}
