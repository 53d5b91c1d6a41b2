//! Quality service: ties stores, clock and the acting user together
//!
//! Operations live in [`crate::core::catalog`] (part types),
//! [`crate::core::inspection`] (lots and measurements) and
//! [`crate::core::dashboard`] (read projections).

use crate::core::clock::{Clock, SystemClock};
use crate::core::error::{QcError, QcResult};
use crate::core::identity::EntityId;
use crate::core::store::{BatchStore, PartTypeStore};
use crate::core::team::User;
use crate::entities::{Lot, PartType};

/// Entry point for every inspection operation
#[derive(Debug)]
pub struct QualityService<S, C = SystemClock> {
    pub(crate) store: S,
    pub(crate) clock: C,
}

impl<S> QualityService<S, SystemClock>
where
    S: PartTypeStore + BatchStore,
{
    /// Service using wall-clock time
    pub fn with_system_clock(store: S) -> Self {
        Self::new(store, SystemClock)
    }
}

impl<S, C> QualityService<S, C>
where
    S: PartTypeStore + BatchStore,
    C: Clock,
{
    pub fn new(store: S, clock: C) -> Self {
        Self { store, clock }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub(crate) fn load_part_type(&self, id: &EntityId) -> QcResult<PartType> {
        self.store
            .get_part_type(id)?
            .ok_or_else(|| QcError::not_found("part type", id.to_string()))
    }

    pub(crate) fn load_lot(&self, id: &EntityId) -> QcResult<Lot> {
        self.store
            .get_lot(id)?
            .ok_or_else(|| QcError::not_found("lot", id.to_string()))
    }
}

/// Fail unless the user holds the administrator role
pub(crate) fn require_admin(user: &User, action: &str) -> QcResult<()> {
    if user.is_admin() {
        Ok(())
    } else {
        Err(QcError::AccessDenied(format!(
            "{} requires the administrator role (user '{}')",
            action, user.username
        )))
    }
}

/// Trimmed text, `None` when blank
pub(crate) fn non_blank(text: Option<&str>) -> Option<String> {
    text.map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::core::clock::FixedClock;
    use crate::core::store::MemoryStore;
    use chrono::{TimeZone, Utc};

    pub type TestService = QualityService<MemoryStore, FixedClock>;

    pub fn service() -> TestService {
        QualityService::new(
            MemoryStore::new(),
            FixedClock::new(Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap()),
        )
    }

    pub fn admin() -> User {
        User::admin("admin")
    }

    pub fn inspector(name: &str) -> User {
        User::new(name, ["INSPETOR"])
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::core::identity::EntityPrefix;

    #[test]
    fn test_require_admin() {
        assert!(require_admin(&admin(), "delete").is_ok());
        let err = require_admin(&inspector("jsmith"), "delete").unwrap_err();
        assert!(err.is_access_denied());
        assert!(err.to_string().contains("jsmith"));
    }

    #[test]
    fn test_missing_entities_are_not_found() {
        let svc = service();
        assert!(svc
            .load_lot(&EntityId::new(EntityPrefix::Lot))
            .unwrap_err()
            .is_not_found());
        assert!(svc
            .load_part_type(&EntityId::new(EntityPrefix::Pt))
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank(Some("  x ")), Some("x".to_string()));
        assert_eq!(non_blank(Some("   ")), None);
        assert_eq!(non_blank(None), None);
    }
}
