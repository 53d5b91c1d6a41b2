//! ILT: Inspection Lot Tracker
//!
//! Quality-control tracking for production lots: part types carry a
//! dimensional tolerance template, inspectors record measured pieces, and
//! each lot is evaluated and closed out against an approval threshold.
//! Entities are stored as plain YAML files in a project directory.

pub mod cli;
pub mod core;
pub mod entities;
pub mod logging;
pub mod yaml;
