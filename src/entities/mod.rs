//! Entity type definitions
//!
//! - [`PartType`] - Named part type with its ordered dimensional tolerance template
//! - [`Lot`] - Production lot under sampled inspection, owning its measurements
//! - [`MeasurementRecord`] - One inspected piece with its verdict

pub mod lot;
pub mod measurement;
pub mod part_type;

pub use lot::{Lot, LotStats, LotStatus};
pub use measurement::{MeasurementRecord, Verdict};
pub use part_type::{DimensionSpec, PartType};
