//! Queue coordination
//!
//! [`QueueService`] owns the collaborators (pool, per-event locks, notifier,
//! settings) and hands out short-lived coordinators that borrow them. Each
//! mutating coordinator follows the same shape:
//!
//! 1. take the event lock,
//! 2. open a transaction and pass `&mut *tx` to the store functions,
//! 3. commit,
//! 4. publish the notifications collected along the way.
//!
//! The whole attempt runs inside [`retry_on_lock`](crate::utils::db_retry::retry_on_lock),
//! so transient SQLite contention is invisible to callers.

pub mod attendance;
pub mod directory;
pub mod hold;
pub mod lifecycle;
pub mod playback;
pub mod reorder;
pub mod requests;
pub mod selector;
pub mod view;

pub use attendance::{AttendanceChange, AttendanceTracker, SingerStatus};
pub use directory::Directory;
pub use hold::{resolve_hold_reason, AttendanceMap};
pub use lifecycle::EventLifecycle;
pub use playback::{PlaybackTransitions, TransitionOutcome};
pub use reorder::{ReorderCoordinator, ReorderInput, ReorderPlan, ReorderScope};
pub use requests::{NewRequest, RequestIntake};
pub use selector::{AutoplayOutcome, AutoplaySelector, NowPlaying};
pub use view::{DisplayStatus, QueueEntryView, QueueFilter, QueueView};

use crate::config::QueueSettings;
use crate::locks::EventLocks;
use crate::notify::Notifier;
use sqlx::SqlitePool;

/// Borrowed collaborators shared by every coordinator
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    pub db: &'a SqlitePool,
    pub locks: &'a EventLocks,
    pub notifier: &'a Notifier,
    pub settings: &'a QueueSettings,
}

/// Entry point for every queue operation
pub struct QueueService {
    db: SqlitePool,
    locks: EventLocks,
    notifier: Notifier,
    settings: QueueSettings,
}

impl QueueService {
    pub fn new(
        db: SqlitePool,
        locks: EventLocks,
        notifier: Notifier,
        settings: QueueSettings,
    ) -> Self {
        Self {
            db,
            locks,
            notifier,
            settings,
        }
    }

    /// Build locks and notifier from the `[queue]` settings
    pub fn with_settings(db: SqlitePool, settings: QueueSettings) -> Self {
        let locks = EventLocks::new(settings.lock_timeout());
        let notifier = Notifier::from_settings(&settings);
        Self::new(db, locks, notifier, settings)
    }

    fn collaborators(&self) -> Collaborators<'_> {
        Collaborators {
            db: &self.db,
            locks: &self.locks,
            notifier: &self.notifier,
            settings: &self.settings,
        }
    }

    pub fn db(&self) -> &SqlitePool {
        &self.db
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn lifecycle(&self) -> EventLifecycle<'_> {
        EventLifecycle::new(self.collaborators())
    }

    pub fn directory(&self) -> Directory<'_> {
        Directory::new(self.collaborators())
    }

    pub fn attendance(&self) -> AttendanceTracker<'_> {
        AttendanceTracker::new(self.collaborators())
    }

    pub fn requests(&self) -> RequestIntake<'_> {
        RequestIntake::new(self.collaborators())
    }

    pub fn playback(&self) -> PlaybackTransitions<'_> {
        PlaybackTransitions::new(self.collaborators())
    }

    pub fn selector(&self) -> AutoplaySelector<'_> {
        AutoplaySelector::new(self.collaborators())
    }

    pub fn reorder(&self) -> ReorderCoordinator<'_> {
        ReorderCoordinator::new(self.collaborators())
    }

    pub fn view(&self) -> QueueView<'_> {
        QueueView::new(self.collaborators())
    }
}
