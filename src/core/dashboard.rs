//! Read-side projections over lots: dashboard and per-day statistics

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::core::clock::Clock;
use crate::core::error::{QcError, QcResult};
use crate::core::identity::EntityId;
use crate::core::service::QualityService;
use crate::core::store::{BatchStore, PartTypeStore};
use crate::core::team::User;
use crate::entities::{Lot, LotStatus};

/// Condensed view of a lot for listings
#[derive(Debug, Clone, Serialize)]
pub struct LotSummary {
    pub id: EntityId,
    pub code: String,
    pub description: String,
    pub part_type: EntityId,
    pub status: LotStatus,
    pub sample_count: u32,
    pub desired_samples: u32,
    pub approval_rate: f64,
    pub created: DateTime<Utc>,
}

impl From<&Lot> for LotSummary {
    fn from(lot: &Lot) -> Self {
        Self {
            id: lot.id.clone(),
            code: lot.code.clone(),
            description: lot.description.clone(),
            part_type: lot.part_type.clone(),
            status: lot.status,
            sample_count: lot.stats.sample_count,
            desired_samples: lot.desired_samples,
            approval_rate: lot.stats.approval_rate,
            created: lot.created,
        }
    }
}

/// Per-user overview
#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub total_lots: usize,
    /// In progress or ready for review
    pub in_progress: usize,
    /// Approved or rejected
    pub completed: usize,
    /// Mean approval rate of completed lots, 0 when none
    pub overall_approval_rate: f64,
    /// Most recently created lots, newest first
    pub recent: Vec<LotSummary>,
}

/// Lots created on one day
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodStats {
    pub day: NaiveDate,
    pub lot_count: usize,
    pub mean_approval_rate: f64,
}

/// Lots owned by one user
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserPerformance {
    pub username: String,
    pub lot_count: usize,
    pub mean_approval_rate: f64,
}

impl<S, C> QualityService<S, C>
where
    S: PartTypeStore + BatchStore,
    C: Clock,
{
    /// Dashboard over the lots `user` owns
    pub fn dashboard(&self, user: &User, recent_limit: usize) -> QcResult<Dashboard> {
        let lots = self.list_lots_for(user)?;

        let completed: Vec<&Lot> = lots.iter().filter(|l| l.status.is_terminal()).collect();
        let overall_approval_rate = mean(completed.iter().map(|l| l.stats.approval_rate));

        Ok(Dashboard {
            total_lots: lots.len(),
            in_progress: lots.len() - completed.len(),
            completed: completed.len(),
            overall_approval_rate,
            recent: lots.iter().take(recent_limit).map(LotSummary::from).collect(),
        })
    }

    /// Lot count and mean approval rate per creation day, `from..=to`
    pub fn statistics_by_period(&self, from: NaiveDate, to: NaiveDate) -> QcResult<Vec<PeriodStats>> {
        if from > to {
            return Err(QcError::invalid(format!(
                "period start {} is after its end {}",
                from, to
            )));
        }

        let mut by_day: BTreeMap<NaiveDate, Vec<f64>> = BTreeMap::new();
        for lot in self.store.list_lots()? {
            let day = lot.created.date_naive();
            if (from..=to).contains(&day) {
                by_day.entry(day).or_default().push(lot.stats.approval_rate);
            }
        }

        Ok(by_day
            .into_iter()
            .map(|(day, rates)| PeriodStats {
                day,
                lot_count: rates.len(),
                mean_approval_rate: mean(rates.into_iter()),
            })
            .collect())
    }

    /// Lot count and mean approval rate per owner, best rate first (ties by username)
    pub fn performance_by_user(&self) -> QcResult<Vec<UserPerformance>> {
        let mut by_user: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        for lot in self.store.list_lots()? {
            by_user.entry(lot.owner).or_default().push(lot.stats.approval_rate);
        }

        let mut performance: Vec<UserPerformance> = by_user
            .into_iter()
            .map(|(username, rates)| UserPerformance {
                username,
                lot_count: rates.len(),
                mean_approval_rate: mean(rates.into_iter()),
            })
            .collect();
        performance.sort_by(|a, b| b.mean_approval_rate.total_cmp(&a.mean_approval_rate));
        Ok(performance)
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}
