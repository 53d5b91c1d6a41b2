//! Part type catalog operations

use serde::Serialize;
use tracing::info;

use crate::core::clock::Clock;
use crate::core::error::{BusinessRule, QcError, QcResult};
use crate::core::identity::EntityId;
use crate::core::service::{non_blank, require_admin, QualityService};
use crate::core::store::{BatchStore, PartTypeStore};
use crate::core::team::User;
use crate::entities::part_type::validate_template;
use crate::entities::{DimensionSpec, PartType};

/// Input for creating or replacing a part type
#[derive(Debug, Clone, Default)]
pub struct NewPartType {
    pub name: String,
    pub description: Option<String>,
    pub dimensions: Vec<DimensionSpec>,
}

impl NewPartType {
    pub fn new(name: impl Into<String>, dimensions: Vec<DimensionSpec>) -> Self {
        Self {
            name: name.into(),
            description: None,
            dimensions,
        }
    }

    fn validate(&self) -> QcResult<()> {
        if self.name.trim().is_empty() {
            return Err(QcError::invalid("part type name must not be blank"));
        }
        validate_template(&self.dimensions)
    }
}

/// Dimensions an inspector must fill in for a part type
#[derive(Debug, Clone, Serialize)]
pub struct MeasurementTemplate {
    pub part_type_id: EntityId,
    pub part_type_name: String,
    pub dimensions: Vec<DimensionSpec>,
}

/// How many lots reference a part type
#[derive(Debug, Clone, Serialize)]
pub struct PartTypeUsage {
    pub part_type_id: EntityId,
    pub name: String,
    pub lot_count: usize,
}

impl<S, C> QualityService<S, C>
where
    S: PartTypeStore + BatchStore,
    C: Clock,
{
    /// Create a part type (administrators only)
    pub fn create_part_type(&self, user: &User, input: NewPartType) -> QcResult<PartType> {
        require_admin(user, "creating a part type")?;
        input.validate()?;
        self.ensure_unique_name(&input.name, None)?;

        let mut part_type = PartType::new(
            input.name.trim().to_string(),
            user.username.clone(),
            self.clock.now(),
        );
        part_type.description = non_blank(input.description.as_deref());
        part_type.dimensions = input.dimensions;

        self.store.save_part_type(&part_type)?;
        info!(
            id = %part_type.id,
            name = %part_type.name,
            dimensions = part_type.dimensions.len(),
            user = %user.username,
            "part type created"
        );
        Ok(part_type)
    }

    /// Replace name, description and the whole template (administrators only)
    pub fn update_part_type(
        &self,
        user: &User,
        id: &EntityId,
        input: NewPartType,
    ) -> QcResult<PartType> {
        require_admin(user, "updating a part type")?;
        let mut part_type = self.load_part_type(id)?;
        input.validate()?;
        self.ensure_unique_name(&input.name, Some(id))?;

        part_type.name = input.name.trim().to_string();
        part_type.description = non_blank(input.description.as_deref());
        part_type.dimensions = input.dimensions;
        part_type.updated = Some(self.clock.now());

        self.store.save_part_type(&part_type)?;
        info!(id = %part_type.id, name = %part_type.name, user = %user.username, "part type updated");
        Ok(part_type)
    }

    /// Delete a part type no lot refers to (administrators only)
    pub fn delete_part_type(&self, user: &User, id: &EntityId) -> QcResult<()> {
        require_admin(user, "deleting a part type")?;
        let part_type = self.load_part_type(id)?;

        if self.store.count_lots_for_part_type(id)? > 0 {
            return Err(BusinessRule::PartTypeInUse { id: id.to_string() }.into());
        }

        self.store.delete_part_type(id)?;
        info!(id = %id, name = %part_type.name, user = %user.username, "part type deleted");
        Ok(())
    }

    pub fn get_part_type(&self, id: &EntityId) -> QcResult<PartType> {
        self.load_part_type(id)
    }

    /// All part types ordered by name
    pub fn list_part_types(&self) -> QcResult<Vec<PartType>> {
        let mut all = self.store.list_part_types()?;
        all.sort_by_key(|pt| pt.name.to_lowercase());
        Ok(all)
    }

    /// Part types whose name contains `text` (case-insensitive)
    pub fn search_part_types(&self, text: &str) -> QcResult<Vec<PartType>> {
        let needle = text.trim().to_lowercase();
        Ok(self
            .list_part_types()?
            .into_iter()
            .filter(|pt| pt.name.to_lowercase().contains(&needle))
            .collect())
    }

    /// Part types referenced by at least one lot
    pub fn part_types_in_use(&self) -> QcResult<Vec<PartType>> {
        let lots = self.store.list_lots()?;
        Ok(self
            .list_part_types()?
            .into_iter()
            .filter(|pt| lots.iter().any(|l| l.part_type == pt.id))
            .collect())
    }

    /// Lot count per part type, including unused ones
    pub fn part_type_usage(&self) -> QcResult<Vec<PartTypeUsage>> {
        let lots = self.store.list_lots()?;
        Ok(self
            .list_part_types()?
            .into_iter()
            .map(|pt| PartTypeUsage {
                lot_count: lots.iter().filter(|l| l.part_type == pt.id).count(),
                part_type_id: pt.id,
                name: pt.name,
            })
            .collect())
    }

    /// Part types referenced by lots, most used first (ties keep name order)
    pub fn most_used_part_types(&self) -> QcResult<Vec<PartTypeUsage>> {
        let mut usage: Vec<PartTypeUsage> = self
            .part_type_usage()?
            .into_iter()
            .filter(|u| u.lot_count > 0)
            .collect();
        usage.sort_by(|a, b| b.lot_count.cmp(&a.lot_count));
        Ok(usage)
    }

    /// Required dimensions for measuring a part type, in template order
    pub fn measurement_template(&self, id: &EntityId) -> QcResult<MeasurementTemplate> {
        let part_type = self.load_part_type(id)?;
        Ok(MeasurementTemplate {
            part_type_id: part_type.id,
            part_type_name: part_type.name,
            dimensions: part_type.dimensions,
        })
    }

    fn ensure_unique_name(&self, name: &str, except: Option<&EntityId>) -> QcResult<()> {
        let taken = self
            .store
            .list_part_types()?
            .iter()
            .any(|pt| pt.has_name(name) && Some(&pt.id) != except);
        if taken {
            return Err(BusinessRule::DuplicatePartTypeName {
                name: name.trim().to_string(),
            }
            .into());
        }
        Ok(())
    }
}
