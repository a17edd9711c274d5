//! Singer and catalog upserts
//!
//! Identity and catalog approval live outside this service; these calls
//! only mirror the ids, names and media references the queue needs.

use super::Collaborators;
use crate::db;
use karaoke_common::db::{Singer, Song};
use karaoke_common::{Error, Result};
use tracing::debug;

pub struct Directory<'a> {
    deps: Collaborators<'a>,
}

impl<'a> Directory<'a> {
    pub(crate) fn new(deps: Collaborators<'a>) -> Self {
        Self { deps }
    }

    pub async fn upsert_singer(&self, singer: Singer) -> Result<Singer> {
        let singer = Singer {
            singer_id: singer.singer_id.trim().to_string(),
            display_name: singer.display_name.trim().to_string(),
        };
        if singer.singer_id.is_empty() || singer.display_name.is_empty() {
            return Err(Error::ValidationFailed(
                "Singer id and display name are required".to_string(),
            ));
        }
        // Group tokens are reserved singer-list values
        if karaoke_common::db::SpecialGroup::from_token(&singer.singer_id).is_some() {
            return Err(Error::ValidationFailed(format!(
                "{} is a reserved group name",
                singer.singer_id
            )));
        }

        let mut conn = self.deps.db.acquire().await?;
        db::singers::upsert_singer(&mut *conn, &singer).await?;
        debug!(singer_id = %singer.singer_id, "Singer upserted");
        Ok(singer)
    }

    pub async fn upsert_song(&self, song: Song) -> Result<Song> {
        if song.title.trim().is_empty() {
            return Err(Error::ValidationFailed("Song title is required".to_string()));
        }

        let mut conn = self.deps.db.acquire().await?;
        db::songs::upsert_song(&mut *conn, &song).await?;
        debug!(song_id = %song.song_id, title = %song.title, "Song upserted");
        Ok(song)
    }
}
