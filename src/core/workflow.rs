//! Lot lifecycle: status transitions and the completion, reopen, restart
//! and delete gates

use chrono::{DateTime, Utc};

use crate::core::error::{BusinessRule, QcError, QcResult};
use crate::core::team::User;
use crate::entities::lot::{Lot, LotStatus};

/// Approval rate (%) a lot must reach to be approved on completion
pub const MINIMUM_APPROVAL_RATE: f64 = 90.0;

/// Status a lot should hold after its aggregates were recomputed
pub fn status_after_recompute(current: LotStatus, sample_count: u32, desired: u32) -> LotStatus {
    if current.is_terminal() {
        return current;
    }
    if sample_count >= desired {
        LotStatus::ReadyForReview
    } else {
        LotStatus::InProgress
    }
}

/// Check if a status transition is valid
pub fn is_valid_transition(from: LotStatus, to: LotStatus) -> bool {
    use LotStatus::*;
    matches!(
        (from, to),
        // Driven by recompute
        (InProgress, ReadyForReview)
            | (ReadyForReview, InProgress)
            // Completion (an in-progress lot with no sample target can complete)
            | (InProgress | ReadyForReview, Approved | Rejected)
            // Re-deciding an already completed lot
            | (Approved | Rejected, Approved | Rejected)
            // Reopen / restart
            | (Approved | Rejected | InProgress, InProgress)
    )
}

/// Get allowed transitions from the current status
pub fn allowed_transitions(current: LotStatus) -> Vec<LotStatus> {
    LotStatus::all()
        .iter()
        .copied()
        .filter(|&to| is_valid_transition(current, to))
        .collect()
}

/// Decide a lot: approved when its approval rate reaches [`MINIMUM_APPROVAL_RATE`].
///
/// Fails when fewer samples than desired have been recorded. A lot that is
/// already approved or rejected is decided again from its current figures.
pub fn complete(lot: &mut Lot, now: DateTime<Utc>) -> QcResult<bool> {
    let actual = lot.stats.sample_count;
    if actual < lot.desired_samples {
        return Err(BusinessRule::InsufficientSamples {
            required: lot.desired_samples,
            actual,
        }
        .into());
    }

    let approved = lot.stats.approval_rate >= MINIMUM_APPROVAL_RATE;
    lot.status = if approved {
        LotStatus::Approved
    } else {
        LotStatus::Rejected
    };
    lot.completed = Some(now);
    Ok(approved)
}

/// Back to in progress; measurements and aggregates are kept
pub fn reopen(lot: &mut Lot) {
    lot.status = LotStatus::InProgress;
    lot.completed = None;
}

/// Discard the inspection history, keeping identity, part type and targets
pub fn restart(lot: &mut Lot) {
    lot.clear_measurements();
    lot.status = LotStatus::InProgress;
    lot.completed = None;
}

/// Permission gate first, then the has-data rule
pub fn check_delete(lot: &Lot, user: &User) -> QcResult<()> {
    let owner_may_delete = lot.owner == user.username && lot.status == LotStatus::InProgress;
    if !user.is_admin() && !owner_may_delete {
        return Err(QcError::AccessDenied(format!(
            "only administrators or the owner of an {} lot may delete {}",
            LotStatus::InProgress,
            lot.code
        )));
    }

    if !lot.measurements.is_empty() {
        return Err(BusinessRule::LotHasMeasurements {
            count: lot.measurements.len(),
        }
        .into());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::identity::{EntityId, EntityPrefix};
    use crate::entities::measurement::Verdict;
    use chrono::TimeZone;
    use std::collections::BTreeMap;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 2, 1, 9, 0, 0).unwrap()
    }

    fn lot_with(desired: u32, verdicts: &[Verdict]) -> Lot {
        let mut lot = Lot::new(
            "LOTE-000042".to_string(),
            "Workflow test".to_string(),
            EntityId::new(EntityPrefix::Pt),
            100,
            desired,
            "jsmith".to_string(),
            ts(),
        );
        for verdict in verdicts {
            lot.record_measurement(BTreeMap::new(), None, *verdict, ts());
        }
        lot
    }

    #[test]
    fn test_valid_transitions() {
        assert!(is_valid_transition(LotStatus::InProgress, LotStatus::ReadyForReview));
        assert!(is_valid_transition(LotStatus::ReadyForReview, LotStatus::Approved));
        assert!(is_valid_transition(LotStatus::Rejected, LotStatus::InProgress));
        assert!(!is_valid_transition(LotStatus::Approved, LotStatus::ReadyForReview));
    }

    #[test]
    fn test_allowed_transitions() {
        let from_ready = allowed_transitions(LotStatus::ReadyForReview);
        assert!(from_ready.contains(&LotStatus::Approved));
        assert!(from_ready.contains(&LotStatus::InProgress));
        assert!(!from_ready.contains(&LotStatus::ReadyForReview));

        let from_approved = allowed_transitions(LotStatus::Approved);
        assert!(from_approved.contains(&LotStatus::InProgress));
        assert!(!from_approved.contains(&LotStatus::ReadyForReview));
    }

    #[test]
    fn test_complete_requires_desired_samples() {
        let mut lot = lot_with(3, &[Verdict::Approved, Verdict::Approved]);
        let err = complete(&mut lot, ts()).unwrap_err();
        assert!(matches!(
            err,
            QcError::PreconditionFailed(BusinessRule::InsufficientSamples {
                required: 3,
                actual: 2
            })
        ));
        assert_eq!(lot.status, LotStatus::InProgress);
        assert!(lot.completed.is_none());
    }

    #[test]
    fn test_complete_rejects_below_minimum_rate() {
        let mut lot = lot_with(2, &[Verdict::Approved, Verdict::Rejected]);
        assert!(!complete(&mut lot, ts()).unwrap());
        assert_eq!(lot.status, LotStatus::Rejected);
        assert_eq!(lot.completed, Some(ts()));
    }

    #[test]
    fn test_complete_approves_at_exact_minimum() {
        let mut verdicts = vec![Verdict::Approved; 9];
        verdicts.push(Verdict::Rejected);
        let mut lot = lot_with(10, &verdicts);
        assert_eq!(lot.stats.approval_rate, 90.0);
        assert!(complete(&mut lot, ts()).unwrap());
        assert_eq!(lot.status, LotStatus::Approved);
    }

    #[test]
    fn test_complete_with_no_target_and_no_samples() {
        let mut lot = lot_with(0, &[]);
        assert!(!complete(&mut lot, ts()).unwrap());
        assert_eq!(lot.status, LotStatus::Rejected);
    }

    #[test]
    fn test_reopen_keeps_measurements() {
        let mut lot = lot_with(1, &[Verdict::Approved]);
        complete(&mut lot, ts()).unwrap();
        reopen(&mut lot);
        assert_eq!(lot.status, LotStatus::InProgress);
        assert!(lot.completed.is_none());
        assert_eq!(lot.stats.sample_count, 1);
        assert_eq!(lot.measurements.len(), 1);
    }

    #[test]
    fn test_restart_resets_everything() {
        for status in LotStatus::all() {
            let mut lot = lot_with(2, &[Verdict::Approved, Verdict::Rejected]);
            lot.status = *status;
            lot.completed = Some(ts());

            restart(&mut lot);

            assert!(lot.measurements.is_empty());
            assert_eq!(lot.stats.sample_count, 0);
            assert_eq!(lot.stats.approved_count, 0);
            assert_eq!(lot.stats.rejected_count, 0);
            assert_eq!(lot.stats.approval_rate, 0.0);
            assert_eq!(lot.stats.sampling_percentage, 0.0);
            assert_eq!(lot.status, LotStatus::InProgress);
            assert!(lot.completed.is_none());
            assert_eq!(lot.desired_samples, 2);
        }
    }

    #[test]
    fn test_owner_can_delete_empty_in_progress_lot() {
        let lot = lot_with(2, &[]);
        let owner = User::new("jsmith", Vec::<String>::new());
        assert!(check_delete(&lot, &owner).is_ok());
    }

    #[test]
    fn test_owner_cannot_delete_ready_lot() {
        let mut lot = lot_with(0, &[]);
        lot.recompute();
        assert_eq!(lot.status, LotStatus::ReadyForReview);
        let owner = User::new("jsmith", Vec::<String>::new());
        assert!(check_delete(&lot, &owner).unwrap_err().is_access_denied());
    }

    #[test]
    fn test_stranger_denied_before_data_check() {
        let lot = lot_with(5, &[Verdict::Approved]);
        let other = User::new("bwilson", Vec::<String>::new());
        assert!(check_delete(&lot, &other).unwrap_err().is_access_denied());
    }

    #[test]
    fn test_admin_blocked_by_measurements() {
        let lot = lot_with(5, &[Verdict::Approved]);
        let admin = User::admin("root");
        assert!(matches!(
            check_delete(&lot, &admin),
            Err(QcError::PreconditionFailed(
                BusinessRule::LotHasMeasurements { count: 1 }
            ))
        ));
    }
}
