//! Song catalog
//!
//! Filled by the external approval workflow through the sync endpoint; the
//! queue only reads it.

use karaoke_common::db::Song;
use karaoke_common::uuid_utils::parse_column;
use karaoke_common::{time, Error, Result};
use sqlx::SqliteConnection;
use std::collections::HashMap;
use uuid::Uuid;

#[derive(sqlx::FromRow)]
struct SongRow {
    song_id: String,
    title: String,
    artist: String,
    media_ref: Option<String>,
}

impl TryFrom<SongRow> for Song {
    type Error = Error;

    fn try_from(row: SongRow) -> Result<Self> {
        Ok(Song {
            song_id: parse_column(&row.song_id, "songs.song_id")?,
            title: row.title,
            artist: row.artist,
            media_ref: row.media_ref,
        })
    }
}

pub async fn upsert_song(conn: &mut SqliteConnection, song: &Song) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO songs (song_id, title, artist, media_ref, updated_at)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(song_id) DO UPDATE SET
            title = excluded.title,
            artist = excluded.artist,
            media_ref = excluded.media_ref,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(song.song_id.to_string())
    .bind(&song.title)
    .bind(&song.artist)
    .bind(&song.media_ref)
    .bind(time::now())
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub async fn get_song(conn: &mut SqliteConnection, song_id: Uuid) -> Result<Option<Song>> {
    let row = sqlx::query_as::<_, SongRow>(
        "SELECT song_id, title, artist, media_ref FROM songs WHERE song_id = ?",
    )
    .bind(song_id.to_string())
    .fetch_optional(&mut *conn)
    .await?;

    row.map(Song::try_from).transpose()
}

pub async fn require_song(conn: &mut SqliteConnection, song_id: Uuid) -> Result<Song> {
    get_song(conn, song_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Song {}", song_id)))
}

/// Every song referenced by an event's queue, keyed by id
pub async fn songs_for_event(
    conn: &mut SqliteConnection,
    event_id: Uuid,
) -> Result<HashMap<Uuid, Song>> {
    let rows = sqlx::query_as::<_, SongRow>(
        r#"
        SELECT song_id, title, artist, media_ref
        FROM songs
        WHERE song_id IN (SELECT song_id FROM queue_entries WHERE event_id = ?)
        "#,
    )
    .bind(event_id.to_string())
    .fetch_all(&mut *conn)
    .await?;

    rows.into_iter()
        .map(|row| Song::try_from(row).map(|song| (song.song_id, song)))
        .collect()
}
