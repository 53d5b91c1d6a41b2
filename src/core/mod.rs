//! Core module - domain engine, stores and project plumbing

pub mod catalog;
pub mod clock;
pub mod codec;
pub mod config;
pub mod dashboard;
pub mod entity;
pub mod error;
pub mod identity;
pub mod inspection;
pub mod project;
pub mod service;
pub mod shortid;
pub mod store;
pub mod team;
pub mod tolerance;
pub mod workflow;

pub use catalog::{MeasurementTemplate, NewPartType, PartTypeUsage};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::Config;
pub use dashboard::{Dashboard, LotSummary, PeriodStats, UserPerformance};
pub use entity::Entity;
pub use error::{BusinessRule, QcError, QcResult};
pub use identity::{EntityId, EntityPrefix, IdParseError};
pub use inspection::{LotUpdate, MeasurementInput, NewLot};
pub use project::{Project, ProjectError};
pub use service::QualityService;
pub use shortid::ShortIdIndex;
pub use store::{BatchStore, FileStore, MemoryStore, PartTypeStore, StoreError};
pub use team::{ConfigIdentity, IdentityProvider, TeamMember, TeamRoster, User};
