//! CLI command implementations

pub mod completions;
pub mod dashboard;
pub mod init;
pub mod lot;
pub mod meas;
pub mod part;
