//! PT entity type - Part type with its dimensional tolerance template

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::core::entity::Entity;
use crate::core::error::{BusinessRule, QcError, QcResult};
use crate::core::identity::{EntityId, EntityPrefix};

/// One measurable attribute of a part type (a "cota").
///
/// Serialized with the legacy field names so the template can be exchanged
/// as the `metadados_cotas` JSON blob unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionSpec {
    /// Key used in measurement maps
    #[serde(rename = "nome")]
    pub name: String,

    /// Display label
    pub label: String,

    /// Input kind hint (e.g. "number"), carried through unchanged
    #[serde(rename = "tipo", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    /// Unit of measure
    #[serde(rename = "unidade", default)]
    pub unit: String,

    /// Allowed absolute deviation from the nominal value
    #[serde(rename = "tolerancia", default, skip_serializing_if = "Option::is_none")]
    pub tolerance: Option<f64>,

    /// Nominal value
    #[serde(rename = "valorPadrao", default, skip_serializing_if = "Option::is_none")]
    pub nominal: Option<f64>,
}

impl DimensionSpec {
    pub fn new(name: impl Into<String>, label: impl Into<String>, unit: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            kind: None,
            unit: unit.into(),
            tolerance: None,
            nominal: None,
        }
    }

    /// Set nominal value and tolerance
    pub fn with_range(mut self, nominal: f64, tolerance: f64) -> Self {
        self.nominal = Some(nominal);
        self.tolerance = Some(tolerance);
        self
    }

    /// Both nominal and tolerance are present, so a range check applies
    pub fn range(&self) -> Option<(f64, f64)> {
        match (self.nominal, self.tolerance) {
            (Some(nominal), Some(tolerance)) => Some((nominal, tolerance)),
            _ => None,
        }
    }

    /// Validate a single spec in isolation
    pub fn validate(&self) -> QcResult<()> {
        if self.name.trim().is_empty() {
            return Err(QcError::invalid("dimension name must not be blank"));
        }
        if self.name.trim() != self.name {
            return Err(QcError::invalid(format!(
                "dimension name '{}' must not start or end with whitespace",
                self.name
            )));
        }
        if self.label.trim().is_empty() {
            return Err(QcError::invalid(format!(
                "dimension '{}' must have a label",
                self.name
            )));
        }
        if let Some(tol) = self.tolerance {
            if !tol.is_finite() || tol < 0.0 {
                return Err(QcError::invalid(format!(
                    "dimension '{}' has invalid tolerance {} (must be >= 0)",
                    self.name, tol
                )));
            }
        }
        if let Some(nominal) = self.nominal {
            if !nominal.is_finite() {
                return Err(QcError::invalid(format!(
                    "dimension '{}' has a non-finite nominal value",
                    self.name
                )));
            }
        }
        Ok(())
    }
}

impl std::str::FromStr for DimensionSpec {
    type Err = String;

    /// Parse `nome:label:unidade[:tolerancia[:valorPadrao]]`; empty fields are allowed
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').map(str::trim).collect();
        if parts.len() < 3 || parts.len() > 5 {
            return Err(format!(
                "Invalid dimension '{}'. Use name:label:unit[:tolerance[:nominal]]",
                s
            ));
        }

        let parse_number = |field: &str, what: &str| -> Result<Option<f64>, String> {
            if field.is_empty() {
                return Ok(None);
            }
            field
                .parse::<f64>()
                .map(Some)
                .map_err(|_| format!("Invalid {} '{}' in dimension '{}'", what, field, s))
        };

        let mut spec = DimensionSpec::new(parts[0], parts[1], parts[2]);
        spec.kind = Some("number".to_string());
        if let Some(field) = parts.get(3) {
            spec.tolerance = parse_number(field, "tolerance")?;
        }
        if let Some(field) = parts.get(4) {
            spec.nominal = parse_number(field, "nominal value")?;
        }
        Ok(spec)
    }
}

/// Validate a whole template: every spec valid, names unique
pub fn validate_template(specs: &[DimensionSpec]) -> QcResult<()> {
    let mut seen = HashSet::new();
    for spec in specs {
        spec.validate()?;
        if !seen.insert(spec.name.trim()) {
            return Err(BusinessRule::DuplicateDimensionName {
                name: spec.name.clone(),
            }
            .into());
        }
    }
    Ok(())
}

/// Part type entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartType {
    /// Unique identifier (PT-xxx)
    pub id: EntityId,

    /// Unique display name
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Ordered tolerance template
    #[serde(default)]
    pub dimensions: Vec<DimensionSpec>,

    /// Creation timestamp
    pub created: DateTime<Utc>,

    /// Author
    pub author: String,

    /// Last update, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<DateTime<Utc>>,
}

impl Entity for PartType {
    const PREFIX: EntityPrefix = EntityPrefix::Pt;

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn title(&self) -> &str {
        &self.name
    }

    fn created(&self) -> DateTime<Utc> {
        self.created
    }

    fn author(&self) -> &str {
        &self.author
    }
}

impl PartType {
    /// Create a new part type with an empty template
    pub fn new(name: String, author: String, created: DateTime<Utc>) -> Self {
        Self {
            id: EntityId::new(EntityPrefix::Pt),
            name,
            description: None,
            dimensions: Vec::new(),
            created,
            author,
            updated: None,
        }
    }

    /// Look up a spec by name
    pub fn dimension(&self, name: &str) -> Option<&DimensionSpec> {
        self.dimensions.iter().find(|d| d.name == name)
    }

    /// Dimension names in template order
    pub fn dimension_names(&self) -> Vec<&str> {
        self.dimensions.iter().map(|d| d.name.as_str()).collect()
    }

    /// Case-insensitive, whitespace-trimmed name comparison
    pub fn has_name(&self, name: &str) -> bool {
        self.name.trim().eq_ignore_ascii_case(name.trim())
    }
}
