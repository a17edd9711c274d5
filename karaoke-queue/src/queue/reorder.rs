//! Reorder with optimistic concurrency
//!
//! A reorder is split into [`ReorderCoordinator::prepare`], which validates
//! the submitted order and snapshots `updated_at` of the reorderable subset
//! without taking the event lock, and [`ReorderCoordinator::commit`], which
//! re-reads the subset under the lock and refuses to write if anything moved
//! in between. Conflicts are reported, never retried.

use super::Collaborators;
use crate::db;
use crate::utils::db_retry::retry_on_lock;
use chrono::{DateTime, Utc};
use karaoke_common::db::QueueEntry;
use karaoke_common::events::Notification;
use karaoke_common::{Error, Result};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use tracing::{info, warn};
use uuid::Uuid;

/// Which part of the queue a reorder may touch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReorderScope {
    /// DJ reorder of the whole reorderable subset
    Full,
    /// A singer reordering their own requests within the slots they hold
    Singer(String),
}

/// Desired position of one entry
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PositionAssignment {
    pub queue_id: Uuid,
    pub position: i64,
}

/// Submitted ordering, either form
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ReorderInput {
    Ordered(Vec<Uuid>),
    Positions(Vec<PositionAssignment>),
}

impl ReorderInput {
    /// Flatten to an ordered id list; pairs are ranked by desired position
    pub fn into_order(self) -> Result<Vec<Uuid>> {
        match self {
            ReorderInput::Ordered(ids) => Ok(ids),
            ReorderInput::Positions(mut pairs) => {
                pairs.sort_by_key(|p| p.position);
                if pairs.windows(2).any(|w| w[0].position == w[1].position) {
                    return Err(Error::IncompleteOrDuplicateOrder(
                        "Two entries requested the same position".to_string(),
                    ));
                }
                Ok(pairs.into_iter().map(|p| p.queue_id).collect())
            }
        }
    }
}

/// Validated reorder waiting to be committed
#[derive(Debug, Clone)]
pub struct ReorderPlan {
    event_id: Uuid,
    /// `updated_at` of every reorderable entry at prepare time
    snapshot: HashMap<Uuid, DateTime<Utc>>,
    assignments: Vec<(Uuid, i64)>,
}

impl ReorderPlan {
    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    /// (queue id, new position) pairs
    pub fn assignments(&self) -> &[(Uuid, i64)] {
        &self.assignments
    }
}

/// Validate `order` against the reorderable subset and assign positions
///
/// `subset` must be in position order.
pub fn plan_positions(
    subset: &[QueueEntry],
    order: &[Uuid],
    scope: &ReorderScope,
) -> Result<Vec<(Uuid, i64)>> {
    let (allowed, slots): (Vec<Uuid>, Vec<i64>) = match scope {
        ReorderScope::Full => subset
            .iter()
            .enumerate()
            .map(|(i, e)| (e.queue_id, i as i64 + 1))
            .unzip(),
        ReorderScope::Singer(singer_id) => subset
            .iter()
            .filter(|e| &e.requestor == singer_id)
            .map(|e| (e.queue_id, e.position))
            .unzip(),
    };

    let allowed: HashSet<Uuid> = allowed.into_iter().collect();
    if let Some(stray) = order.iter().find(|id| !allowed.contains(*id)) {
        return Err(Error::InvalidId(*stray));
    }

    let distinct: HashSet<&Uuid> = order.iter().collect();
    if distinct.len() != order.len() || distinct.len() != allowed.len() {
        return Err(Error::IncompleteOrDuplicateOrder(format!(
            "Expected {} distinct entries, got {} ({} distinct)",
            allowed.len(),
            order.len(),
            distinct.len()
        )));
    }

    Ok(order.iter().copied().zip(slots).collect())
}

pub struct ReorderCoordinator<'a> {
    deps: Collaborators<'a>,
}

impl<'a> ReorderCoordinator<'a> {
    pub(crate) fn new(deps: Collaborators<'a>) -> Self {
        Self { deps }
    }

    /// Validate and snapshot, without the event lock
    pub async fn prepare(
        &self,
        event_id: Uuid,
        order: &[Uuid],
        scope: ReorderScope,
    ) -> Result<ReorderPlan> {
        let mut conn = self.deps.db.acquire().await?;
        db::events::require_open_event(&mut *conn, event_id).await?;
        let subset = db::queue::reorderable_entries(&mut *conn, event_id).await?;

        let assignments = plan_positions(&subset, order, &scope)?;
        let snapshot = subset.iter().map(|e| (e.queue_id, e.updated_at)).collect();

        Ok(ReorderPlan {
            event_id,
            snapshot,
            assignments,
        })
    }

    /// Apply a prepared plan, or fail with `ConcurrencyConflict`
    pub async fn commit(&self, plan: &ReorderPlan) -> Result<()> {
        retry_on_lock("reorder", self.deps.settings.max_lock_wait_ms, move || {
            self.try_commit(plan)
        })
        .await
    }

    /// Prepare and commit in one call
    pub async fn reorder(&self, event_id: Uuid, order: &[Uuid], scope: ReorderScope) -> Result<()> {
        let plan = self.prepare(event_id, order, scope).await?;
        self.commit(&plan).await
    }

    async fn try_commit(&self, plan: &ReorderPlan) -> Result<()> {
        let event_id = plan.event_id;
        let _guard = self.deps.locks.acquire(event_id).await?;
        let mut tx = self.deps.db.begin().await?;

        db::events::require_open_event(&mut *tx, event_id).await?;
        let current = db::queue::reorderable_entries(&mut *tx, event_id).await?;

        let unchanged = current.len() == plan.snapshot.len()
            && current
                .iter()
                .all(|e| plan.snapshot.get(&e.queue_id) == Some(&e.updated_at));
        if !unchanged {
            warn!(event_id = %event_id, "Reorder rejected: queue changed since it was read");
            return Err(Error::ConcurrencyConflict(
                "Queue changed since it was read; reload and try again".to_string(),
            ));
        }

        let by_id: HashMap<Uuid, &QueueEntry> = current.iter().map(|e| (e.queue_id, e)).collect();
        let mut moved = 0;
        for (queue_id, position) in &plan.assignments {
            if let Some(entry) = by_id.get(queue_id) {
                if entry.position != *position {
                    db::queue::set_position(&mut *tx, entry, *position).await?;
                    moved += 1;
                }
            }
        }
        tx.commit().await?;

        info!(event_id = %event_id, moved, "Queue reordered");
        self.deps.notifier.publish(Notification::reordered(event_id));
        Ok(())
    }
}
