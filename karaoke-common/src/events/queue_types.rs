//! Queue notification supporting types

use serde::{Deserialize, Serialize};

/// What happened to a queue entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum QueueAction {
    Playing,
    Skipped,
    Sung,
    OnHold,
    Reordered,
    Added,
    Removed,
    Released,
}

impl std::fmt::Display for QueueAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueueAction::Playing => write!(f, "Playing"),
            QueueAction::Skipped => write!(f, "Skipped"),
            QueueAction::Sung => write!(f, "Sung"),
            QueueAction::OnHold => write!(f, "OnHold"),
            QueueAction::Reordered => write!(f, "Reordered"),
            QueueAction::Added => write!(f, "Added"),
            QueueAction::Removed => write!(f, "Removed"),
            QueueAction::Released => write!(f, "Released"),
        }
    }
}
