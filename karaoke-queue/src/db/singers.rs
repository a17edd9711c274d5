//! Singer directory

use karaoke_common::db::Singer;
use karaoke_common::{time, Error, Result};
use sqlx::SqliteConnection;

#[derive(sqlx::FromRow)]
struct SingerRow {
    singer_id: String,
    display_name: String,
}

impl From<SingerRow> for Singer {
    fn from(row: SingerRow) -> Self {
        Singer {
            singer_id: row.singer_id,
            display_name: row.display_name,
        }
    }
}

/// Insert or rename a singer
pub async fn upsert_singer(conn: &mut SqliteConnection, singer: &Singer) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO singers (singer_id, display_name, updated_at)
        VALUES (?, ?, ?)
        ON CONFLICT(singer_id) DO UPDATE SET
            display_name = excluded.display_name,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(&singer.singer_id)
    .bind(&singer.display_name)
    .bind(time::now())
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub async fn get_singer(conn: &mut SqliteConnection, singer_id: &str) -> Result<Option<Singer>> {
    let row = sqlx::query_as::<_, SingerRow>(
        "SELECT singer_id, display_name FROM singers WHERE singer_id = ?",
    )
    .bind(singer_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.map(Singer::from))
}

pub async fn require_singer(conn: &mut SqliteConnection, singer_id: &str) -> Result<Singer> {
    get_singer(conn, singer_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Singer {}", singer_id)))
}
