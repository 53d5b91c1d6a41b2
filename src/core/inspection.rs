//! Lot and measurement operations

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::core::clock::Clock;
use crate::core::error::{BusinessRule, QcError, QcResult};
use crate::core::identity::{lot_code_from_millis, next_lot_code_seed, EntityId};
use crate::core::service::{non_blank, require_admin, QualityService};
use crate::core::store::{BatchStore, PartTypeStore};
use crate::core::team::User;
use crate::core::{tolerance, workflow};
use crate::entities::{Lot, LotStatus, MeasurementRecord};

/// Candidate lot codes tried before giving up
pub const MAX_CODE_ATTEMPTS: u32 = 1000;

/// Input for creating a lot
#[derive(Debug, Clone)]
pub struct NewLot {
    pub description: String,
    pub part_type: EntityId,
    /// Total physical units, must be > 0
    pub quantity: u32,
    /// Defaults to 0
    pub desired_samples: Option<u32>,
    pub notes: Option<String>,
}

impl NewLot {
    pub fn new(description: impl Into<String>, part_type: EntityId, quantity: u32) -> Self {
        Self {
            description: description.into(),
            part_type,
            quantity,
            desired_samples: None,
            notes: None,
        }
    }

    pub fn with_desired_samples(mut self, desired: u32) -> Self {
        self.desired_samples = Some(desired);
        self
    }

    fn validate(&self) -> QcResult<()> {
        if self.description.trim().is_empty() {
            return Err(QcError::invalid("lot description must not be blank"));
        }
        if self.quantity == 0 {
            return Err(QcError::invalid("lot quantity must be greater than zero"));
        }
        Ok(())
    }
}

/// Editable lot fields; part type and sample targets are fixed at creation
#[derive(Debug, Clone)]
pub struct LotUpdate {
    pub description: String,
    pub notes: Option<String>,
}

/// A measurement as submitted by an inspector
#[derive(Debug, Clone, Default)]
pub struct MeasurementInput {
    pub dimensions: BTreeMap<String, f64>,
    pub note: Option<String>,
}

impl MeasurementInput {
    pub fn new(dimensions: impl IntoIterator<Item = (String, f64)>) -> Self {
        Self {
            dimensions: dimensions.into_iter().collect(),
            note: None,
        }
    }

    fn validate(&self) -> QcResult<()> {
        if self.dimensions.keys().any(|k| k.trim().is_empty()) {
            return Err(QcError::invalid("dimension names must not be blank"));
        }
        if let Some((name, value)) = self.dimensions.iter().find(|(_, v)| !v.is_finite()) {
            return Err(QcError::invalid(format!(
                "reading for dimension '{}' must be a finite number, got {}",
                name, value
            )));
        }
        Ok(())
    }
}

impl<S, C> QualityService<S, C>
where
    S: PartTypeStore + BatchStore,
    C: Clock,
{
    /// Create a lot owned by `user`
    pub fn create_lot(&self, user: &User, input: NewLot) -> QcResult<Lot> {
        input.validate()?;
        if !self.store.part_type_exists(&input.part_type)? {
            return Err(QcError::not_found("part type", input.part_type.to_string()));
        }

        let now = self.clock.now();
        let code = self.generate_lot_code(now.timestamp_millis())?;

        let mut lot = Lot::new(
            code,
            input.description.trim().to_string(),
            input.part_type,
            input.quantity,
            input.desired_samples.unwrap_or(0),
            user.username.clone(),
            now,
        );
        lot.notes = non_blank(input.notes.as_deref());

        self.store.save_lot(&lot)?;
        info!(
            id = %lot.id,
            code = %lot.code,
            part_type = %lot.part_type,
            quantity = lot.quantity,
            desired_samples = lot.desired_samples,
            owner = %lot.owner,
            "lot created"
        );
        Ok(lot)
    }

    /// Change description and notes (owner or administrator)
    pub fn update_lot(&self, user: &User, id: &EntityId, update: LotUpdate) -> QcResult<Lot> {
        let mut lot = self.load_lot(id)?;
        if !user.is_admin() && lot.owner != user.username {
            return Err(QcError::AccessDenied(format!(
                "only the owner or an administrator may edit {}",
                lot.code
            )));
        }
        if update.description.trim().is_empty() {
            return Err(QcError::invalid("lot description must not be blank"));
        }

        lot.description = update.description.trim().to_string();
        lot.notes = non_blank(update.notes.as_deref());
        self.store.save_lot(&lot)?;
        info!(code = %lot.code, user = %user.username, "lot updated");
        Ok(lot)
    }

    /// Delete an empty lot (see [`workflow::check_delete`] for who may)
    pub fn delete_lot(&self, user: &User, id: &EntityId) -> QcResult<()> {
        let lot = self.load_lot(id)?;
        workflow::check_delete(&lot, user)?;
        self.store.delete_lot(id)?;
        info!(code = %lot.code, user = %user.username, "lot deleted");
        Ok(())
    }

    pub fn get_lot(&self, id: &EntityId) -> QcResult<Lot> {
        self.load_lot(id)
    }

    /// Look a lot up by its human-readable code
    pub fn find_lot_by_code(&self, code: &str) -> QcResult<Lot> {
        self.store
            .list_lots()?
            .into_iter()
            .find(|l| l.code.eq_ignore_ascii_case(code.trim()))
            .ok_or_else(|| QcError::not_found("lot", code))
    }

    /// Lots owned by `user`, newest first
    pub fn list_lots_for(&self, user: &User) -> QcResult<Vec<Lot>> {
        Ok(self
            .lots_newest_first()?
            .into_iter()
            .filter(|l| l.owner == user.username)
            .collect())
    }

    /// Every lot, newest first (administrators only)
    pub fn list_all_lots(&self, user: &User) -> QcResult<Vec<Lot>> {
        require_admin(user, "listing all lots")?;
        self.lots_newest_first()
    }

    pub fn list_lots_by_status(&self, status: LotStatus) -> QcResult<Vec<Lot>> {
        Ok(self
            .lots_newest_first()?
            .into_iter()
            .filter(|l| l.status == status)
            .collect())
    }

    /// Lots whose description contains `text` (case-insensitive)
    pub fn search_lots(&self, text: &str) -> QcResult<Vec<Lot>> {
        let needle = text.trim().to_lowercase();
        Ok(self
            .lots_newest_first()?
            .into_iter()
            .filter(|l| l.description.to_lowercase().contains(&needle))
            .collect())
    }

    /// Evaluate a measurement against the lot's part type and record it
    pub fn add_measurement(
        &self,
        lot_id: &EntityId,
        input: MeasurementInput,
    ) -> QcResult<(Lot, MeasurementRecord)> {
        input.validate()?;
        let mut lot = self.load_lot(lot_id)?;
        let part_type = self.load_part_type(&lot.part_type)?;

        let verdict = tolerance::evaluate(&input.dimensions, &part_type.dimensions);
        let record = lot.record_measurement(
            input.dimensions,
            non_blank(input.note.as_deref()),
            verdict,
            self.clock.now(),
        );
        debug!(code = %lot.code, stats = ?lot.stats, status = %lot.status, "lot recomputed");

        self.store.save_lot(&lot)?;
        info!(
            code = %lot.code,
            measurement = record.id,
            piece = record.piece_number,
            verdict = %record.verdict,
            "measurement recorded"
        );
        Ok((lot, record))
    }

    /// Remove a measurement by id and recompute the lot
    pub fn remove_measurement(&self, lot_id: &EntityId, measurement_id: u64) -> QcResult<Lot> {
        let mut lot = self.load_lot(lot_id)?;
        if lot.remove_measurement(measurement_id).is_none() {
            return Err(QcError::not_found(
                "measurement",
                format!("{} in lot {}", measurement_id, lot.code),
            ));
        }
        debug!(code = %lot.code, stats = ?lot.stats, status = %lot.status, "lot recomputed");

        self.store.save_lot(&lot)?;
        info!(code = %lot.code, measurement = measurement_id, "measurement removed");
        Ok(lot)
    }

    /// Measurements in insertion order
    pub fn list_measurements(&self, lot_id: &EntityId) -> QcResult<Vec<MeasurementRecord>> {
        Ok(self.load_lot(lot_id)?.measurements)
    }

    /// Decide the lot; returns whether it was approved
    pub fn complete_lot(&self, lot_id: &EntityId) -> QcResult<bool> {
        let mut lot = self.load_lot(lot_id)?;
        let approved = workflow::complete(&mut lot, self.clock.now())?;
        self.store.save_lot(&lot)?;
        info!(
            code = %lot.code,
            approval_rate = lot.stats.approval_rate,
            status = %lot.status,
            "lot completed"
        );
        Ok(approved)
    }

    pub fn reopen_lot(&self, lot_id: &EntityId) -> QcResult<Lot> {
        let mut lot = self.load_lot(lot_id)?;
        workflow::reopen(&mut lot);
        self.store.save_lot(&lot)?;
        info!(code = %lot.code, "lot reopened");
        Ok(lot)
    }

    /// Discard all measurements and start the inspection over
    pub fn restart_lot(&self, lot_id: &EntityId) -> QcResult<Lot> {
        let mut lot = self.load_lot(lot_id)?;
        let discarded = lot.measurements.len();
        workflow::restart(&mut lot);
        self.store.save_lot(&lot)?;
        info!(code = %lot.code, discarded, "lot restarted");
        Ok(lot)
    }

    fn lots_newest_first(&self) -> QcResult<Vec<Lot>> {
        let mut lots = self.store.list_lots()?;
        lots.sort_by(|a, b| b.created.cmp(&a.created).then_with(|| b.code.cmp(&a.code)));
        Ok(lots)
    }

    /// `LOTE-` plus the last six digits of the creation millis, moving to the
    /// next millisecond value while the code is taken
    fn generate_lot_code(&self, millis: i64) -> QcResult<String> {
        let mut seed = millis;
        for _ in 0..MAX_CODE_ATTEMPTS {
            let code = lot_code_from_millis(seed);
            if !self.store.lot_code_exists(&code)? {
                return Ok(code);
            }
            debug!(%code, "lot code taken, trying next");
            seed = next_lot_code_seed(seed);
        }
        Err(BusinessRule::CodeSpaceExhausted.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::catalog::NewPartType;
    use crate::core::service::test_support::*;
    use crate::entities::{DimensionSpec, Verdict};
    use chrono::Duration;

    fn bolt_type(svc: &TestService) -> EntityId {
        svc.create_part_type(
            &admin(),
            NewPartType::new(
                "Bolt-M8",
                vec![DimensionSpec::new("comprimento", "Comprimento", "mm").with_range(50.0, 0.1)],
            ),
        )
        .unwrap()
        .id
    }

    fn comprimento(value: f64) -> MeasurementInput {
        MeasurementInput::new([("comprimento".to_string(), value)])
    }

    #[test]
    fn test_bolt_scenario() {
        let svc = service();
        let pt = bolt_type(&svc);
        let lot = svc
            .create_lot(
                &inspector("jsmith"),
                NewLot::new("Bolt run", pt, 100).with_desired_samples(2),
            )
            .unwrap();
        assert_eq!(lot.status, LotStatus::InProgress);

        let (after_first, first) = svc.add_measurement(&lot.id, comprimento(50.05)).unwrap();
        assert_eq!(first.verdict, Verdict::Approved);
        assert_eq!(after_first.stats.sample_count, 1);
        assert_eq!(after_first.stats.approval_rate, 100.0);

        let (after_second, second) = svc.add_measurement(&lot.id, comprimento(50.5)).unwrap();
        assert_eq!(second.verdict, Verdict::Rejected);
        assert_eq!(after_second.stats.sample_count, 2);
        assert_eq!(after_second.stats.approved_count, 1);
        assert_eq!(after_second.stats.approval_rate, 50.0);
        assert_eq!(after_second.status, LotStatus::ReadyForReview);

        assert!(!svc.complete_lot(&lot.id).unwrap());
        let completed = svc.get_lot(&lot.id).unwrap();
        assert_eq!(completed.status, LotStatus::Rejected);
        assert!(completed.completed.is_some());

        // Terminal status survives a removal that drops below the target
        let after_removal = svc.remove_measurement(&lot.id, second.id).unwrap();
        assert_eq!(after_removal.stats.sample_count, 1);
        assert_eq!(after_removal.status, LotStatus::Rejected);
    }

    #[test]
    fn test_add_measurement_unknown_lot() {
        let svc = service();
        let err = svc
            .add_measurement(&EntityId::new(crate::core::identity::EntityPrefix::Lot), comprimento(1.0))
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_missing_dimension_recorded_as_rejected() {
        let svc = service();
        let pt = bolt_type(&svc);
        let lot = svc
            .create_lot(&inspector("jsmith"), NewLot::new("Lot", pt, 10))
            .unwrap();
        let (_, record) = svc
            .add_measurement(&lot.id, MeasurementInput::new([("outra".to_string(), 1.0)]))
            .unwrap();
        assert_eq!(record.verdict, Verdict::Rejected);
        assert_eq!(record.dimensions.get("outra"), Some(&1.0));
    }

    #[test]
    fn test_non_finite_reading_is_refused() {
        let svc = service();
        let pt = svc
            .create_part_type(
                &admin(),
                NewPartType::new("Nut-M8", vec![DimensionSpec::new("rosca", "Rosca", "")]),
            )
            .unwrap()
            .id;
        let lot = svc
            .create_lot(&inspector("jsmith"), NewLot::new("Nut run", pt, 10))
            .unwrap();

        for value in [f64::INFINITY, f64::NEG_INFINITY, f64::NAN] {
            let err = svc
                .add_measurement(&lot.id, MeasurementInput::new([("rosca".to_string(), value)]))
                .unwrap_err();
            assert!(matches!(err, QcError::ValidationFailed(_)));
        }
        assert!(svc.list_measurements(&lot.id).unwrap().is_empty());

        svc.add_measurement(&lot.id, MeasurementInput::new([("rosca".to_string(), 8.0)]))
            .unwrap();
        let blob = crate::core::codec::encode_measurements(&svc.list_measurements(&lot.id).unwrap())
            .unwrap();
        let decoded = crate::core::codec::decode_measurements(&blob).unwrap();
        assert_eq!(decoded[0].dimensions.get("rosca"), Some(&8.0));
    }

    #[test]
    fn test_complete_requires_desired_samples() {
        let svc = service();
        let pt = bolt_type(&svc);
        let lot = svc
            .create_lot(
                &inspector("jsmith"),
                NewLot::new("Lot", pt, 10).with_desired_samples(3),
            )
            .unwrap();
        svc.add_measurement(&lot.id, comprimento(50.0)).unwrap();

        let err = svc.complete_lot(&lot.id).unwrap_err();
        assert!(matches!(
            err,
            QcError::PreconditionFailed(BusinessRule::InsufficientSamples {
                required: 3,
                actual: 1
            })
        ));
        assert!(err.to_string().contains("3 samples required"));
    }

    #[test]
    fn test_reopen_and_restart() {
        let svc = service();
        let pt = bolt_type(&svc);
        let lot = svc
            .create_lot(
                &inspector("jsmith"),
                NewLot::new("Lot", pt, 10).with_desired_samples(1),
            )
            .unwrap();
        svc.add_measurement(&lot.id, comprimento(50.0)).unwrap();
        assert!(svc.complete_lot(&lot.id).unwrap());

        let reopened = svc.reopen_lot(&lot.id).unwrap();
        assert_eq!(reopened.status, LotStatus::InProgress);
        assert!(reopened.completed.is_none());
        assert_eq!(reopened.stats.sample_count, 1);

        let restarted = svc.restart_lot(&lot.id).unwrap();
        assert!(restarted.measurements.is_empty());
        assert_eq!(restarted.stats.approval_rate, 0.0);
        assert_eq!(restarted.status, LotStatus::InProgress);
        assert_eq!(restarted.desired_samples, 1);
    }

    #[test]
    fn test_remove_unknown_measurement() {
        let svc = service();
        let pt = bolt_type(&svc);
        let lot = svc
            .create_lot(&inspector("jsmith"), NewLot::new("Lot", pt, 10))
            .unwrap();
        let err = svc.remove_measurement(&lot.id, 99).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_create_lot_validation() {
        let svc = service();
        let pt = bolt_type(&svc);
        let user = inspector("jsmith");

        assert!(matches!(
            svc.create_lot(&user, NewLot::new("  ", pt.clone(), 10)),
            Err(QcError::ValidationFailed(_))
        ));
        assert!(matches!(
            svc.create_lot(&user, NewLot::new("Lot", pt, 0)),
            Err(QcError::ValidationFailed(_))
        ));
        assert!(svc
            .create_lot(
                &user,
                NewLot::new("Lot", EntityId::new(crate::core::identity::EntityPrefix::Pt), 10)
            )
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn test_lot_code_from_clock_and_collision() {
        let svc = service();
        let pt = bolt_type(&svc);
        let user = inspector("jsmith");
        let millis = svc.clock().now().timestamp_millis();

        let first = svc.create_lot(&user, NewLot::new("A", pt.clone(), 10)).unwrap();
        assert_eq!(first.code, lot_code_from_millis(millis));

        // Same instant: next code is derived from the following millisecond
        let second = svc.create_lot(&user, NewLot::new("B", pt.clone(), 10)).unwrap();
        assert_eq!(second.code, lot_code_from_millis(millis + 1));

        // One million ms later the last six digits wrap onto the first code
        svc.clock().advance(Duration::milliseconds(1_000_000));
        let third = svc.create_lot(&user, NewLot::new("C", pt, 10)).unwrap();
        assert_eq!(third.code, lot_code_from_millis(millis + 2));
    }

    #[test]
    fn test_update_lot_permissions() {
        let svc = service();
        let pt = bolt_type(&svc);
        let lot = svc
            .create_lot(&inspector("jsmith"), NewLot::new("Lot", pt, 10))
            .unwrap();
        let update = LotUpdate {
            description: "Renamed".to_string(),
            notes: Some("  shift B ".to_string()),
        };

        assert!(svc
            .update_lot(&inspector("bwilson"), &lot.id, update.clone())
            .unwrap_err()
            .is_access_denied());

        let updated = svc.update_lot(&inspector("jsmith"), &lot.id, update).unwrap();
        assert_eq!(updated.description, "Renamed");
        assert_eq!(updated.notes.as_deref(), Some("shift B"));
    }

    #[test]
    fn test_delete_lot_gates() {
        let svc = service();
        let pt = bolt_type(&svc);
        let owner = inspector("jsmith");
        let lot = svc
            .create_lot(&owner, NewLot::new("Lot", pt.clone(), 10).with_desired_samples(5))
            .unwrap();
        svc.add_measurement(&lot.id, comprimento(50.0)).unwrap();

        assert!(svc
            .delete_lot(&inspector("bwilson"), &lot.id)
            .unwrap_err()
            .is_access_denied());
        assert!(matches!(
            svc.delete_lot(&owner, &lot.id),
            Err(QcError::PreconditionFailed(BusinessRule::LotHasMeasurements { count: 1 }))
        ));

        let empty = svc.create_lot(&owner, NewLot::new("Empty", pt, 10)).unwrap();
        svc.delete_lot(&owner, &empty.id).unwrap();
        assert!(svc.get_lot(&empty.id).unwrap_err().is_not_found());
    }

    #[test]
    fn test_listing_and_search() {
        let svc = service();
        let pt = bolt_type(&svc);
        let jsmith = inspector("jsmith");
        let bwilson = inspector("bwilson");

        let older = svc.create_lot(&jsmith, NewLot::new("Morning bolts", pt.clone(), 10)).unwrap();
        svc.clock().advance(Duration::minutes(1));
        let newer = svc.create_lot(&jsmith, NewLot::new("Evening bolts", pt.clone(), 10)).unwrap();
        svc.create_lot(&bwilson, NewLot::new("Other", pt, 10)).unwrap();

        let mine = svc.list_lots_for(&jsmith).unwrap();
        assert_eq!(mine.len(), 2);
        assert_eq!(mine[0].id, newer.id);
        assert_eq!(mine[1].id, older.id);

        assert!(svc.list_all_lots(&jsmith).unwrap_err().is_access_denied());
        assert_eq!(svc.list_all_lots(&admin()).unwrap().len(), 3);

        assert_eq!(svc.search_lots("BOLTS").unwrap().len(), 2);
        assert_eq!(svc.list_lots_by_status(LotStatus::InProgress).unwrap().len(), 3);
        assert_eq!(svc.find_lot_by_code(&older.code).unwrap().id, older.id);
        assert!(svc.find_lot_by_code("LOTE-999999").unwrap_err().is_not_found());
    }

    #[test]
    fn test_list_measurements_in_insertion_order() {
        let svc = service();
        let pt = bolt_type(&svc);
        let lot = svc
            .create_lot(&inspector("jsmith"), NewLot::new("Lot", pt, 10))
            .unwrap();
        svc.add_measurement(&lot.id, comprimento(50.0)).unwrap();
        svc.add_measurement(&lot.id, comprimento(49.0)).unwrap();

        let records = svc.list_measurements(&lot.id).unwrap();
        let pieces: Vec<u32> = records.iter().map(|r| r.piece_number).collect();
        assert_eq!(pieces, vec![1, 2]);
        assert_eq!(records[1].verdict, Verdict::Rejected);
    }
}
