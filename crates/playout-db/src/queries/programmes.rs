//! Programme catalog.

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension};
use playout_common::{Error, ProgrammeId, Result};

use super::is_constraint_violation;
use crate::models::{encode_ts, NewProgramme, Programme};

const COLS: &str = "programme_id, title, description, thumbnail, created_at";

/// Insert a programme and its ordered video list.
pub fn create_programme(conn: &Connection, new: &NewProgramme) -> Result<Programme> {
    if new.title.trim().is_empty() {
        return Err(Error::validation("programme title must not be empty"));
    }

    let tx = conn
        .unchecked_transaction()
        .map_err(|e| Error::database(e.to_string()))?;

    tx.execute(
        "INSERT INTO programmes (title, description, thumbnail, created_at)
         VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![
            &new.title,
            &new.description,
            &new.thumbnail,
            encode_ts(&Utc::now())
        ],
    )
    .map_err(|e| Error::database(e.to_string()))?;
    let id = ProgrammeId::from(tx.last_insert_rowid());

    for (position, url) in new.videos.iter().enumerate() {
        tx.execute(
            "INSERT INTO programme_videos (programme_id, position, url) VALUES (?1, ?2, ?3)",
            rusqlite::params![id.get(), position as i64, url],
        )
        .map_err(|e| Error::database(e.to_string()))?;
    }

    tx.commit().map_err(|e| Error::database(e.to_string()))?;

    get_programme(conn, id)?.ok_or_else(|| Error::not_found("programme", id))
}

/// Get a programme with its videos in play order.
pub fn get_programme(conn: &Connection, id: ProgrammeId) -> Result<Option<Programme>> {
    let q = format!("SELECT {COLS} FROM programmes WHERE programme_id = ?1");
    let programme = conn
        .query_row(&q, [id.get()], Programme::from_row)
        .optional()
        .map_err(|e| Error::database(e.to_string()))?;

    match programme {
        Some(mut p) => {
            p.videos = list_videos(conn, id)?;
            Ok(Some(p))
        }
        None => Ok(None),
    }
}

fn list_videos(conn: &Connection, id: ProgrammeId) -> Result<Vec<String>> {
    let mut stmt = conn
        .prepare("SELECT url FROM programme_videos WHERE programme_id = ?1 ORDER BY position")
        .map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map([id.get()], |row| row.get(0))
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<String>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(rows)
}

/// Whether a programme exists.
pub fn programme_exists(conn: &Connection, id: ProgrammeId) -> Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM programmes WHERE programme_id = ?1)",
        [id.get()],
        |row| row.get(0),
    )
    .map_err(|e| Error::database(e.to_string()))
}

/// List all programmes, newest first.
pub fn list_programmes(conn: &Connection) -> Result<Vec<Programme>> {
    let q = format!("SELECT {COLS} FROM programmes ORDER BY programme_id DESC");
    let mut stmt = conn.prepare(&q).map_err(|e| Error::database(e.to_string()))?;
    let mut programmes = stmt
        .query_map([], Programme::from_row)
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;

    for p in &mut programmes {
        p.videos = list_videos(conn, p.id)?;
    }
    Ok(programmes)
}

/// Delete a programme.
///
/// Fails with `Conflict` while any schedule entry still references it.
pub fn delete_programme(conn: &Connection, id: ProgrammeId) -> Result<()> {
    let changed = conn
        .execute("DELETE FROM programmes WHERE programme_id = ?1", [id.get()])
        .map_err(|e| {
            if is_constraint_violation(&e) {
                Error::Conflict(format!("programme {} is still scheduled", id))
            } else {
                Error::database(e.to_string())
            }
        })?;
    if changed == 0 {
        return Err(Error::not_found("programme", id));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::init_memory_pool;
    use crate::queries::test_support::{new_channel, new_entry, new_programme};
    use crate::queries::{channels, schedule_entries};

    #[test]
    fn test_create_programme_keeps_video_order() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();

        let created = create_programme(
            &conn,
            &new_programme("Late Show", &["s3://vod/c.mp4", "s3://vod/a.mp4", "s3://vod/b.mp4"]),
        )
        .unwrap();
        assert_eq!(
            created.videos,
            vec!["s3://vod/c.mp4", "s3://vod/a.mp4", "s3://vod/b.mp4"]
        );
        assert!(!created.is_live());

        let fetched = get_programme(&conn, created.id).unwrap().unwrap();
        assert_eq!(fetched, created);
    }

    #[test]
    fn test_programme_without_videos_is_live() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();

        let live = create_programme(&conn, &new_programme("Match", &[])).unwrap();
        assert!(live.is_live());
        assert!(programme_exists(&conn, live.id).unwrap());
        assert!(!programme_exists(&conn, ProgrammeId::from(999)).unwrap());
    }

    #[test]
    fn test_empty_title_rejected() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();

        let err = create_programme(&conn, &new_programme("  ", &[])).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_list_programmes_newest_first() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();

        create_programme(&conn, &new_programme("First", &["a.mp4"])).unwrap();
        create_programme(&conn, &new_programme("Second", &[])).unwrap();

        let all = list_programmes(&conn).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].title, "Second");
        assert_eq!(all[1].videos, vec!["a.mp4"]);
    }

    #[test]
    fn test_delete_scheduled_programme_conflicts() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();

        channels::create_channel(&conn, &new_channel("news")).unwrap();
        let programme = create_programme(&conn, &new_programme("Bulletin", &[])).unwrap();
        let entry =
            schedule_entries::create_entry(&conn, &new_entry("news", programme.id, 0, 30)).unwrap();

        let err = delete_programme(&conn, programme.id).unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));

        schedule_entries::delete_entry(&conn, entry.id).unwrap();
        delete_programme(&conn, programme.id).unwrap();
        assert!(matches!(
            delete_programme(&conn, programme.id).unwrap_err(),
            Error::NotFound { .. }
        ));
    }
}
