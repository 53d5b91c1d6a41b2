//! LOT entity type - Production lot under sampled inspection

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::entity::Entity;
use crate::core::identity::{EntityId, EntityPrefix};
use crate::core::workflow;
use crate::entities::measurement::{MeasurementRecord, Verdict};

/// Lot inspection status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[derive(Default)]
pub enum LotStatus {
    #[default]
    #[serde(rename = "EM_ANDAMENTO")]
    InProgress,
    #[serde(rename = "PRONTO_PARA_CONCLUSAO")]
    ReadyForReview,
    #[serde(rename = "APROVADO")]
    Approved,
    #[serde(rename = "REPROVADO")]
    Rejected,
}

impl LotStatus {
    /// Persisted name
    pub fn as_str(&self) -> &'static str {
        match self {
            LotStatus::InProgress => "EM_ANDAMENTO",
            LotStatus::ReadyForReview => "PRONTO_PARA_CONCLUSAO",
            LotStatus::Approved => "APROVADO",
            LotStatus::Rejected => "REPROVADO",
        }
    }

    /// Approved and rejected lots are only changed by explicit operations
    pub fn is_terminal(&self) -> bool {
        matches!(self, LotStatus::Approved | LotStatus::Rejected)
    }

    pub fn all() -> &'static [LotStatus] {
        &[
            LotStatus::InProgress,
            LotStatus::ReadyForReview,
            LotStatus::Approved,
            LotStatus::Rejected,
        ]
    }
}

impl std::fmt::Display for LotStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for LotStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "em_andamento" | "in_progress" | "inprogress" => Ok(LotStatus::InProgress),
            "pronto_para_conclusao" | "ready" | "ready_for_review" => {
                Ok(LotStatus::ReadyForReview)
            }
            "aprovado" | "approved" => Ok(LotStatus::Approved),
            "reprovado" | "rejected" => Ok(LotStatus::Rejected),
            _ => Err(format!(
                "Invalid lot status: {}. Use in_progress, ready, approved, or rejected",
                s
            )),
        }
    }
}

/// Aggregates cached on the lot, derived from its measurements
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LotStats {
    /// Number of measurement records
    #[serde(default)]
    pub sample_count: u32,

    #[serde(default)]
    pub approved_count: u32,

    #[serde(default)]
    pub rejected_count: u32,

    /// Approved / samples x 100, 0 without samples
    #[serde(default)]
    pub approval_rate: f64,

    /// Samples / total units x 100
    #[serde(default)]
    pub sampling_percentage: f64,
}

/// Production lot entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lot {
    /// Unique identifier (LOT-xxx)
    pub id: EntityId,

    /// Human-readable code (LOTE-NNNNNN)
    pub code: String,

    pub description: String,

    /// Part type being inspected (PT-xxx), fixed at creation
    pub part_type: EntityId,

    /// Total physical units in the lot
    pub quantity: u32,

    /// Samples needed before the lot can be completed
    #[serde(default)]
    pub desired_samples: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    /// Owning user
    pub owner: String,

    #[serde(default)]
    pub status: LotStatus,

    /// Creation timestamp
    pub created: DateTime<Utc>,

    /// Set only by explicit completion
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<DateTime<Utc>>,

    #[serde(default)]
    pub stats: LotStats,

    /// Measurements in insertion order
    #[serde(default)]
    pub measurements: Vec<MeasurementRecord>,

    /// Highest piece number ever assigned in this lot
    #[serde(default)]
    pub last_piece_number: u32,

    /// Highest measurement id ever assigned in this lot
    #[serde(default)]
    pub last_measurement_id: u64,
}

impl Entity for Lot {
    const PREFIX: EntityPrefix = EntityPrefix::Lot;

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn title(&self) -> &str {
        &self.description
    }

    fn created(&self) -> DateTime<Utc> {
        self.created
    }

    fn author(&self) -> &str {
        &self.owner
    }
}

impl Lot {
    /// Create a new lot with no measurements
    pub fn new(
        code: String,
        description: String,
        part_type: EntityId,
        quantity: u32,
        desired_samples: u32,
        owner: String,
        created: DateTime<Utc>,
    ) -> Self {
        Self {
            id: EntityId::new(EntityPrefix::Lot),
            code,
            description,
            part_type,
            quantity,
            desired_samples,
            notes: None,
            owner,
            status: LotStatus::InProgress,
            created,
            completed: None,
            stats: LotStats::default(),
            measurements: Vec::new(),
            last_piece_number: 0,
            last_measurement_id: 0,
        }
    }

    /// Next piece number: one past the highest present or previously assigned
    pub fn next_piece_number(&self) -> u32 {
        self.measurements
            .iter()
            .map(|m| m.piece_number)
            .max()
            .unwrap_or(0)
            .max(self.last_piece_number)
            + 1
    }

    /// Next record id, same rule as piece numbers
    pub fn next_measurement_id(&self) -> u64 {
        self.measurements
            .iter()
            .map(|m| m.id)
            .max()
            .unwrap_or(0)
            .max(self.last_measurement_id)
            + 1
    }

    pub fn measurement(&self, id: u64) -> Option<&MeasurementRecord> {
        self.measurements.iter().find(|m| m.id == id)
    }

    /// Append a measurement with an already computed verdict and refresh aggregates
    pub fn record_measurement(
        &mut self,
        dimensions: BTreeMap<String, f64>,
        note: Option<String>,
        verdict: Verdict,
        taken_at: DateTime<Utc>,
    ) -> MeasurementRecord {
        let record = MeasurementRecord {
            id: self.next_measurement_id(),
            taken_at,
            piece_number: self.next_piece_number(),
            dimensions,
            note,
            verdict,
        };
        self.last_piece_number = record.piece_number;
        self.last_measurement_id = record.id;
        self.measurements.push(record.clone());
        self.recompute();
        record
    }

    /// Remove a measurement by id and refresh aggregates
    pub fn remove_measurement(&mut self, id: u64) -> Option<MeasurementRecord> {
        let index = self.measurements.iter().position(|m| m.id == id)?;
        let removed = self.measurements.remove(index);
        self.recompute();
        Some(removed)
    }

    /// Drop all measurements and zero every aggregate
    pub fn clear_measurements(&mut self) {
        self.measurements.clear();
        self.stats = LotStats::default();
        self.last_piece_number = 0;
        self.last_measurement_id = 0;
    }

    /// Recompute cached aggregates from the measurement sequence.
    ///
    /// Terminal statuses are left alone; otherwise the status follows the
    /// sample count. The completion timestamp is never touched here.
    pub fn recompute(&mut self) {
        let sample_count = self.measurements.len() as u32;
        let approved_count = self
            .measurements
            .iter()
            .filter(|m| m.is_approved())
            .count() as u32;

        let approval_rate = if sample_count > 0 {
            f64::from(approved_count) / f64::from(sample_count) * 100.0
        } else {
            0.0
        };

        // quantity is validated > 0 on create; guard against hand-edited files
        let sampling_percentage = if self.quantity > 0 {
            f64::from(sample_count) / f64::from(self.quantity) * 100.0
        } else {
            0.0
        };

        self.stats = LotStats {
            sample_count,
            approved_count,
            rejected_count: sample_count - approved_count,
            approval_rate,
            sampling_percentage,
        };

        self.status =
            workflow::status_after_recompute(self.status, sample_count, self.desired_samples);
    }

    /// Samples still needed before completion
    pub fn samples_remaining(&self) -> u32 {
        self.desired_samples.saturating_sub(self.stats.sample_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap()
    }

    fn test_lot(quantity: u32, desired: u32) -> Lot {
        Lot::new(
            "LOTE-000001".to_string(),
            "Test Lot".to_string(),
            EntityId::new(EntityPrefix::Pt),
            quantity,
            desired,
            "jsmith".to_string(),
            ts(),
        )
    }

    fn dims(value: f64) -> BTreeMap<String, f64> {
        BTreeMap::from([("comprimento".to_string(), value)])
    }

    #[test]
    fn test_lot_creation() {
        let lot = test_lot(100, 2);
        assert!(lot.id.to_string().starts_with("LOT-"));
        assert_eq!(lot.status, LotStatus::InProgress);
        assert_eq!(lot.stats, LotStats::default());
        assert_eq!(lot.next_piece_number(), 1);
        assert_eq!(lot.next_measurement_id(), 1);
    }

    #[test]
    fn test_lot_status_parsing() {
        assert_eq!(
            "EM_ANDAMENTO".parse::<LotStatus>().unwrap(),
            LotStatus::InProgress
        );
        assert_eq!("ready".parse::<LotStatus>().unwrap(), LotStatus::ReadyForReview);
        assert_eq!("approved".parse::<LotStatus>().unwrap(), LotStatus::Approved);
        assert_eq!("reprovado".parse::<LotStatus>().unwrap(), LotStatus::Rejected);
        assert!("scrapped".parse::<LotStatus>().is_err());
    }

    #[test]
    fn test_record_measurement_updates_stats() {
        let mut lot = test_lot(100, 2);
        lot.record_measurement(dims(50.05), None, Verdict::Approved, ts());
        assert_eq!(lot.stats.sample_count, 1);
        assert_eq!(lot.stats.approval_rate, 100.0);
        assert_eq!(lot.stats.sampling_percentage, 1.0);
        assert_eq!(lot.status, LotStatus::InProgress);

        lot.record_measurement(dims(50.5), None, Verdict::Rejected, ts());
        assert_eq!(lot.stats.sample_count, 2);
        assert_eq!(lot.stats.approved_count, 1);
        assert_eq!(lot.stats.rejected_count, 1);
        assert_eq!(lot.stats.approval_rate, 50.0);
        assert_eq!(lot.status, LotStatus::ReadyForReview);
    }

    #[test]
    fn test_piece_numbers_never_reused_after_removal() {
        let mut lot = test_lot(10, 5);
        let first = lot.record_measurement(dims(1.0), None, Verdict::Approved, ts());
        let second = lot.record_measurement(dims(1.0), None, Verdict::Approved, ts());
        assert!(lot.remove_measurement(first.id).is_some());

        let third = lot.record_measurement(dims(1.0), None, Verdict::Approved, ts());
        assert!(third.piece_number > second.piece_number);
        assert!(third.id > second.id);

        // Removing the most recent record does not free its number
        lot.remove_measurement(third.id);
        let fourth = lot.record_measurement(dims(1.0), None, Verdict::Approved, ts());
        assert!(fourth.piece_number > third.piece_number);
        assert!(fourth.id > third.id);
    }

    #[test]
    fn test_recompute_is_idempotent() {
        let mut lot = test_lot(7, 3);
        lot.record_measurement(dims(1.0), None, Verdict::Approved, ts());
        lot.record_measurement(dims(1.0), None, Verdict::Rejected, ts());
        lot.record_measurement(dims(1.0), None, Verdict::Approved, ts());

        lot.recompute();
        let (stats, status) = (lot.stats.clone(), lot.status);
        lot.recompute();
        assert_eq!(lot.stats, stats);
        assert_eq!(lot.status, status);
    }

    #[test]
    fn test_recompute_keeps_terminal_status() {
        let mut lot = test_lot(100, 2);
        lot.record_measurement(dims(1.0), None, Verdict::Approved, ts());
        lot.record_measurement(dims(1.0), None, Verdict::Rejected, ts());
        lot.status = LotStatus::Rejected;

        let id = lot.measurements[1].id;
        lot.remove_measurement(id);
        assert_eq!(lot.stats.sample_count, 1);
        assert_eq!(lot.status, LotStatus::Rejected);
        assert_eq!(lot.completed, None);
    }

    #[test]
    fn test_removal_moves_ready_back_to_in_progress() {
        let mut lot = test_lot(100, 1);
        let record = lot.record_measurement(dims(1.0), None, Verdict::Approved, ts());
        assert_eq!(lot.status, LotStatus::ReadyForReview);

        lot.remove_measurement(record.id);
        assert_eq!(lot.status, LotStatus::InProgress);
        assert_eq!(lot.stats.approval_rate, 0.0);
    }

    #[test]
    fn test_zero_desired_samples_is_ready_immediately_on_recompute() {
        let mut lot = test_lot(100, 0);
        lot.recompute();
        assert_eq!(lot.status, LotStatus::ReadyForReview);
    }

    #[test]
    fn test_remove_unknown_measurement() {
        let mut lot = test_lot(100, 1);
        assert!(lot.remove_measurement(42).is_none());
    }

    #[test]
    fn test_lot_serialization_roundtrip() {
        let mut lot = test_lot(100, 2);
        lot.record_measurement(dims(50.05), Some("first".to_string()), Verdict::Approved, ts());
        let yaml = serde_yml::to_string(&lot).unwrap();
        assert!(yaml.contains("LOTE-000001"));
        assert!(yaml.contains("EM_ANDAMENTO"));
        assert!(yaml.contains("pecaNumero"));

        let loaded: Lot = serde_yml::from_str(&yaml).unwrap();
        assert_eq!(loaded.measurements, lot.measurements);
        assert_eq!(loaded.stats, lot.stats);
    }
}
