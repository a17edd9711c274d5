//! Database models
//!
//! Domain shapes persisted by the karaoke services. Rows are read as plain
//! SQL types and converted here, so validation of stored values (singer
//! lists, enum columns, UUIDs) happens in exactly one place.

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// Singer list
// ============================================================================

/// Sentinel singer values that stand for a whole group of people
///
/// Group entries are always considered available by the hold resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpecialGroup {
    AllSing,
    TheBoys,
    TheGirls,
}

impl SpecialGroup {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpecialGroup::AllSing => "AllSing",
            SpecialGroup::TheBoys => "TheBoys",
            SpecialGroup::TheGirls => "TheGirls",
        }
    }

    /// Parse a group token, returning None for ordinary singer ids
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "AllSing" => Some(SpecialGroup::AllSing),
            "TheBoys" => Some(SpecialGroup::TheBoys),
            "TheGirls" => Some(SpecialGroup::TheGirls),
            _ => None,
        }
    }
}

impl fmt::Display for SpecialGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered singers assigned to a queue entry
///
/// Either exactly one special group token, or 1-7 distinct individual singer
/// ids in assignment order. The order matters: the hold resolver reports the
/// first unavailable singer.
///
/// Serialized as a flat JSON array of strings (`["alice","bob"]`,
/// `["AllSing"]`); deserialization re-validates cardinality.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub enum SingerList {
    Group(SpecialGroup),
    Individuals(Vec<String>),
}

impl SingerList {
    /// Upper bound on individually named singers per entry
    pub const MAX_INDIVIDUALS: usize = 7;

    /// Validate a raw singer list from a request or from storage
    pub fn parse<S: AsRef<str>>(raw: &[S]) -> Result<Self> {
        if raw.is_empty() {
            return Err(Error::ValidationFailed(
                "Singer list must name at least one singer".to_string(),
            ));
        }

        let groups: Vec<SpecialGroup> = raw
            .iter()
            .filter_map(|s| SpecialGroup::from_token(s.as_ref()))
            .collect();

        if !groups.is_empty() {
            if raw.len() != 1 {
                return Err(Error::ValidationFailed(format!(
                    "Group token {} cannot be combined with other singers",
                    groups[0]
                )));
            }
            return Ok(SingerList::Group(groups[0]));
        }

        if raw.len() > Self::MAX_INDIVIDUALS {
            return Err(Error::ValidationFailed(format!(
                "At most {} singers per request ({} given)",
                Self::MAX_INDIVIDUALS,
                raw.len()
            )));
        }

        let mut singers: Vec<String> = Vec::with_capacity(raw.len());
        for name in raw {
            let name = name.as_ref().trim();
            if name.is_empty() {
                return Err(Error::ValidationFailed("Singer id must not be blank".to_string()));
            }
            if singers.iter().any(|s| s == name) {
                return Err(Error::ValidationFailed(format!("Singer {} listed twice", name)));
            }
            singers.push(name.to_string());
        }

        Ok(SingerList::Individuals(singers))
    }

    /// Single named singer
    pub fn solo(singer_id: &str) -> Result<Self> {
        Self::parse(&[singer_id])
    }

    /// Individual singer ids in assignment order (empty for group entries)
    pub fn individuals(&self) -> &[String] {
        match self {
            SingerList::Group(_) => &[],
            SingerList::Individuals(singers) => singers,
        }
    }

    pub fn contains(&self, singer_id: &str) -> bool {
        self.individuals().iter().any(|s| s == singer_id)
    }

    pub fn to_json(&self) -> String {
        serde_json::Value::from(Vec::<String>::from(self.clone())).to_string()
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let names: Vec<String> = serde_json::from_str(raw)
            .map_err(|e| Error::Internal(format!("Corrupt singer list {}: {}", raw, e)))?;
        Self::parse(&names)
    }
}

impl TryFrom<Vec<String>> for SingerList {
    type Error = Error;

    fn try_from(value: Vec<String>) -> Result<Self> {
        SingerList::parse(&value)
    }
}

impl From<SingerList> for Vec<String> {
    fn from(value: SingerList) -> Self {
        match value {
            SingerList::Group(group) => vec![group.as_str().to_string()],
            SingerList::Individuals(singers) => singers,
        }
    }
}

// ============================================================================
// Enum columns
// ============================================================================

/// Why a queue entry cannot play right now
///
/// Recomputed from attendance on every selection pass and persisted on the
/// entry row so it survives restarts and is shared across service instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HoldReason {
    #[default]
    None,
    NotLoggedIn,
    NotJoined,
    OnBreak,
}

impl HoldReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            HoldReason::None => "None",
            HoldReason::NotLoggedIn => "NotLoggedIn",
            HoldReason::NotJoined => "NotJoined",
            HoldReason::OnBreak => "OnBreak",
        }
    }

    pub fn is_blocking(&self) -> bool {
        *self != HoldReason::None
    }
}

impl fmt::Display for HoldReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HoldReason {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "None" => Ok(HoldReason::None),
            "NotLoggedIn" => Ok(HoldReason::NotLoggedIn),
            "NotJoined" => Ok(HoldReason::NotJoined),
            "OnBreak" => Ok(HoldReason::OnBreak),
            other => Err(Error::Internal(format!("Unknown hold reason: {}", other))),
        }
    }
}

/// Event lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventStatus {
    Upcoming,
    Live,
    Archived,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Upcoming => "Upcoming",
            EventStatus::Live => "Live",
            EventStatus::Archived => "Archived",
        }
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Upcoming" => Ok(EventStatus::Upcoming),
            "Live" => Ok(EventStatus::Live),
            "Archived" => Ok(EventStatus::Archived),
            other => Err(Error::Internal(format!("Unknown event status: {}", other))),
        }
    }
}

// ============================================================================
// Records
// ============================================================================

/// Karaoke event (aggregate root)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub event_id: Uuid,
    pub name: String,
    pub status: EventStatus,
    /// Maximum unplayed requests a single requestor may hold at once
    pub request_limit: i64,
    pub songs_completed: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Singer {
    pub singer_id: String,
    pub display_name: String,
}

/// Catalog entry, already approved by the external catalog workflow
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Song {
    pub song_id: Uuid,
    pub title: String,
    pub artist: String,
    /// Opaque media reference handed to the playback client
    pub media_ref: Option<String>,
}

/// Per (event, singer) availability; overwritten in place, never deleted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub event_id: Uuid,
    pub singer_id: String,
    pub is_logged_in: bool,
    pub is_joined: bool,
    pub is_on_break: bool,
    pub break_started_at: Option<DateTime<Utc>>,
    pub break_ended_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

/// One song request occupying one slot in an event's queue
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueEntry {
    pub queue_id: Uuid,
    pub event_id: Uuid,
    pub song_id: Uuid,
    pub requestor: String,
    pub singers: SingerList,
    /// 1-based, dense within the reorderable subset
    pub position: i64,
    /// False once the event is archived
    pub is_active: bool,
    pub was_skipped: bool,
    pub is_currently_playing: bool,
    /// Entry is held (by attendance or by the DJ)
    pub is_on_break: bool,
    /// Hold was placed manually and is never lifted by autoplay
    pub held_by_dj: bool,
    pub hold_reason: HoldReason,
    pub sung_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    /// Optimistic-concurrency token
    pub updated_at: DateTime<Utc>,
}

impl QueueEntry {
    /// Unsung, not playing, not archived
    pub fn is_reorderable(&self) -> bool {
        self.sung_at.is_none() && !self.is_currently_playing && self.is_active
    }

    /// Entry an autoplay pass may consider
    pub fn is_autoplay_candidate(&self) -> bool {
        self.is_reorderable() && !self.was_skipped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_singer_list_accepts_single_group_token() {
        let list = SingerList::parse(&["AllSing"]).unwrap();
        assert_eq!(list, SingerList::Group(SpecialGroup::AllSing));
        assert!(list.individuals().is_empty());
    }

    #[test]
    fn test_singer_list_rejects_group_mixed_with_individuals() {
        let err = SingerList::parse(&["alice", "TheGirls"]).unwrap_err();
        assert!(matches!(err, Error::ValidationFailed(_)));
    }

    #[test]
    fn test_singer_list_cardinality() {
        assert!(SingerList::parse::<&str>(&[]).is_err());

        let seven: Vec<String> = (0..7).map(|i| format!("singer{}", i)).collect();
        assert_eq!(SingerList::parse(&seven).unwrap().individuals().len(), 7);

        let eight: Vec<String> = (0..8).map(|i| format!("singer{}", i)).collect();
        assert!(matches!(
            SingerList::parse(&eight),
            Err(Error::ValidationFailed(_))
        ));
    }

    #[test]
    fn test_singer_list_rejects_duplicates_and_blanks() {
        assert!(SingerList::parse(&["alice", "alice"]).is_err());
        assert!(SingerList::parse(&["alice", "  "]).is_err());
    }

    #[test]
    fn test_singer_list_json_preserves_order() {
        let list = SingerList::parse(&["carol", "alice", "bob"]).unwrap();
        let json = list.to_json();
        assert_eq!(json, r#"["carol","alice","bob"]"#);
        assert_eq!(SingerList::from_json(&json).unwrap(), list);
    }

    #[test]
    fn test_singer_list_serde_revalidates() {
        let parsed: std::result::Result<SingerList, _> =
            serde_json::from_str(r#"["AllSing","bob"]"#);
        assert!(parsed.is_err());

        let group: SingerList = serde_json::from_str(r#"["TheBoys"]"#).unwrap();
        assert_eq!(group, SingerList::Group(SpecialGroup::TheBoys));
    }

    #[test]
    fn test_hold_reason_column_roundtrip() {
        for reason in [
            HoldReason::None,
            HoldReason::NotLoggedIn,
            HoldReason::NotJoined,
            HoldReason::OnBreak,
        ] {
            assert_eq!(reason.as_str().parse::<HoldReason>().unwrap(), reason);
        }
        assert!("Sleeping".parse::<HoldReason>().is_err());
    }
}
