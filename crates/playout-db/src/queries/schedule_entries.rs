//! Schedule store: timeline entries per channel.
//!
//! Writes that can move an entry on the timeline run the overlap check and
//! the write inside one `BEGIN IMMEDIATE` transaction, so two writers racing
//! for the same slot serialize on the database write lock and the second one
//! sees the first one's row.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Transaction, TransactionBehavior};
use playout_common::{ChannelId, EntryId, Error, Result};

use super::{channels, map_err, programmes};
use crate::islands::{self, EntrySpan, Island, ScheduleHealth};
use crate::models::{encode_ts, EntryUpdate, NewScheduleEntry, ScheduleEntry};

const COLS: &str = "entry_id, channel_id, programme_id, ingest_url, ingest_type,
    scheduled_start, scheduled_end, broadcast_start, broadcast_end, vod_url, dvr, archive";

fn begin_immediate(conn: &Connection) -> Result<Transaction<'_>> {
    Transaction::new_unchecked(conn, TransactionBehavior::Immediate)
        .map_err(|e| Error::database(e.to_string()))
}

fn check_bounds(start: &DateTime<Utc>, end: &DateTime<Utc>) -> Result<()> {
    if end <= start {
        return Err(Error::validation(
            "scheduled end must be after scheduled start",
        ));
    }
    Ok(())
}

/// Reject `[start, end)` if it intersects any entry of `channel`.
///
/// Intervals are half-open: an entry ending at 10:00 does not collide with
/// one starting at 10:00. `exclude` skips the entry being updated. The
/// error names the earliest colliding entry.
pub fn validate_no_overlap(
    conn: &Connection,
    channel: &ChannelId,
    start: &DateTime<Utc>,
    end: &DateTime<Utc>,
    exclude: Option<EntryId>,
) -> Result<()> {
    check_bounds(start, end)?;

    let collision: Option<i64> = conn
        .query_row(
            "SELECT entry_id FROM schedule_entries
             WHERE channel_id = ?1
               AND scheduled_start < ?3
               AND scheduled_end > ?2
               AND (?4 IS NULL OR entry_id != ?4)
             ORDER BY scheduled_start, entry_id
             LIMIT 1",
            rusqlite::params![
                channel.as_str(),
                encode_ts(start),
                encode_ts(end),
                exclude.map(EntryId::get),
            ],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| Error::database(e.to_string()))?;

    match collision {
        Some(id) => Err(Error::ScheduleConflict {
            entry_id: EntryId::from(id),
        }),
        None => Ok(()),
    }
}

/// Insert a new entry after checking references and overlap.
pub fn create_entry(conn: &Connection, new: &NewScheduleEntry) -> Result<ScheduleEntry> {
    check_bounds(&new.scheduled_start, &new.scheduled_end)?;

    let tx = begin_immediate(conn)?;

    if !channels::channel_exists(&tx, &new.channel_id)? {
        return Err(Error::not_found("channel", &new.channel_id));
    }
    if !programmes::programme_exists(&tx, new.programme_id)? {
        return Err(Error::not_found("programme", new.programme_id));
    }
    validate_no_overlap(
        &tx,
        &new.channel_id,
        &new.scheduled_start,
        &new.scheduled_end,
        None,
    )?;

    tx.execute(
        "INSERT INTO schedule_entries (channel_id, programme_id, ingest_url, ingest_type,
            scheduled_start, scheduled_end, vod_url, dvr, archive)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        rusqlite::params![
            new.channel_id.as_str(),
            new.programme_id.get(),
            &new.ingest_url,
            &new.ingest_type,
            encode_ts(&new.scheduled_start),
            encode_ts(&new.scheduled_end),
            &new.vod_url,
            new.dvr,
            new.archive,
        ],
    )
    .map_err(|e| Error::database(e.to_string()))?;
    let id = EntryId::from(tx.last_insert_rowid());

    let entry = fetch_entry(&tx, id)?;
    tx.commit().map_err(|e| Error::database(e.to_string()))?;
    Ok(entry)
}

fn fetch_entry(conn: &Connection, id: EntryId) -> Result<ScheduleEntry> {
    let q = format!("SELECT {COLS} FROM schedule_entries WHERE entry_id = ?1");
    conn.query_row(&q, [id.get()], ScheduleEntry::from_row)
        .map_err(map_err("schedule entry", id))
}

/// Get an entry by id.
pub fn get_entry(conn: &Connection, id: EntryId) -> Result<Option<ScheduleEntry>> {
    match fetch_entry(conn, id) {
        Ok(entry) => Ok(Some(entry)),
        Err(Error::NotFound { .. }) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Apply a partial update.
///
/// The overlap check only runs when the update touches the entry's bounds;
/// the entry itself is excluded from it.
pub fn update_entry(conn: &Connection, id: EntryId, update: &EntryUpdate) -> Result<ScheduleEntry> {
    let tx = begin_immediate(conn)?;
    let mut entry = fetch_entry(&tx, id)?;

    if let Some(programme_id) = update.programme_id {
        if !programmes::programme_exists(&tx, programme_id)? {
            return Err(Error::not_found("programme", programme_id));
        }
        entry.programme_id = programme_id;
    }
    if let Some(start) = update.scheduled_start {
        entry.scheduled_start = start;
    }
    if let Some(end) = update.scheduled_end {
        entry.scheduled_end = end;
    }
    if update.changes_bounds() {
        validate_no_overlap(
            &tx,
            &entry.channel_id,
            &entry.scheduled_start,
            &entry.scheduled_end,
            Some(id),
        )?;
    }
    if let Some(url) = &update.ingest_url {
        entry.ingest_url = url.clone();
    }
    if let Some(kind) = &update.ingest_type {
        entry.ingest_type = kind.clone();
    }
    if let Some(vod) = &update.vod_url {
        entry.vod_url = Some(vod.clone());
    }
    if let Some(dvr) = update.dvr {
        entry.dvr = dvr;
    }
    if let Some(archive) = update.archive {
        entry.archive = archive;
    }

    tx.execute(
        "UPDATE schedule_entries SET programme_id = ?1, ingest_url = ?2, ingest_type = ?3,
            scheduled_start = ?4, scheduled_end = ?5, vod_url = ?6, dvr = ?7, archive = ?8
         WHERE entry_id = ?9",
        rusqlite::params![
            entry.programme_id.get(),
            &entry.ingest_url,
            &entry.ingest_type,
            encode_ts(&entry.scheduled_start),
            encode_ts(&entry.scheduled_end),
            &entry.vod_url,
            entry.dvr,
            entry.archive,
            id.get(),
        ],
    )
    .map_err(|e| Error::database(e.to_string()))?;

    tx.commit().map_err(|e| Error::database(e.to_string()))?;
    Ok(entry)
}

/// Delete an entry.
pub fn delete_entry(conn: &Connection, id: EntryId) -> Result<()> {
    let changed = conn
        .execute("DELETE FROM schedule_entries WHERE entry_id = ?1", [id.get()])
        .map_err(|e| Error::database(e.to_string()))?;
    if changed == 0 {
        return Err(Error::not_found("schedule entry", id));
    }
    Ok(())
}

fn query_entries(
    conn: &Connection,
    q: &str,
    params: &[&dyn rusqlite::types::ToSql],
) -> Result<Vec<ScheduleEntry>> {
    let mut stmt = conn.prepare(q).map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map(params, ScheduleEntry::from_row)
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(rows)
}

/// All entries of a channel ordered by scheduled start.
pub fn list_for_channel(conn: &Connection, channel: &ChannelId) -> Result<Vec<ScheduleEntry>> {
    let q = format!(
        "SELECT {COLS} FROM schedule_entries WHERE channel_id = ?1
         ORDER BY scheduled_start, entry_id"
    );
    query_entries(conn, &q, &[&channel.as_str()])
}

/// Entries of a channel intersecting `[from, to)`.
pub fn list_range(
    conn: &Connection,
    channel: &ChannelId,
    from: &DateTime<Utc>,
    to: &DateTime<Utc>,
) -> Result<Vec<ScheduleEntry>> {
    let q = format!(
        "SELECT {COLS} FROM schedule_entries
         WHERE channel_id = ?1 AND scheduled_start < ?3 AND scheduled_end > ?2
         ORDER BY scheduled_start, entry_id"
    );
    query_entries(
        conn,
        &q,
        &[&channel.as_str(), &encode_ts(from), &encode_ts(to)],
    )
}

/// The next `limit` entries across all channels starting strictly after
/// `after`, earliest first.
pub fn list_upcoming(
    conn: &Connection,
    after: &DateTime<Utc>,
    limit: usize,
) -> Result<Vec<ScheduleEntry>> {
    let q = format!(
        "SELECT {COLS} FROM schedule_entries WHERE scheduled_start > ?1
         ORDER BY scheduled_start, entry_id LIMIT ?2"
    );
    query_entries(conn, &q, &[&encode_ts(after), &(limit as i64)])
}

/// Record when an entry actually went on air.
pub fn mark_broadcast_start(conn: &Connection, id: EntryId, at: &DateTime<Utc>) -> Result<()> {
    set_broadcast_column(conn, id, "broadcast_start", at)
}

/// Record when an entry actually came off air.
pub fn mark_broadcast_end(conn: &Connection, id: EntryId, at: &DateTime<Utc>) -> Result<()> {
    set_broadcast_column(conn, id, "broadcast_end", at)
}

fn set_broadcast_column(
    conn: &Connection,
    id: EntryId,
    column: &'static str,
    at: &DateTime<Utc>,
) -> Result<()> {
    let q = format!("UPDATE schedule_entries SET {column} = ?1 WHERE entry_id = ?2");
    let changed = conn
        .execute(&q, rusqlite::params![encode_ts(at), id.get()])
        .map_err(|e| Error::database(e.to_string()))?;
    if changed == 0 {
        return Err(Error::not_found("schedule entry", id));
    }
    Ok(())
}

/// Entries that actually started broadcasting within `[from, to)`.
pub fn list_broadcast_between(
    conn: &Connection,
    from: &DateTime<Utc>,
    to: &DateTime<Utc>,
) -> Result<Vec<ScheduleEntry>> {
    let q = format!(
        "SELECT {COLS} FROM schedule_entries
         WHERE broadcast_start IS NOT NULL AND broadcast_start >= ?1 AND broadcast_start < ?2
         ORDER BY broadcast_start, entry_id"
    );
    query_entries(conn, &q, &[&encode_ts(from), &encode_ts(to)])
}

/// Islands of a channel's timeline.
pub fn find_islands(conn: &Connection, channel: &ChannelId) -> Result<Vec<Island>> {
    let spans = list_for_channel(conn, channel)?
        .iter()
        .map(EntrySpan::from)
        .collect();
    Ok(islands::find_islands(spans))
}

/// Coverage report of a channel; `NotFound` if the channel does not exist.
pub fn health(conn: &Connection, channel: &ChannelId) -> Result<ScheduleHealth> {
    if !channels::channel_exists(conn, channel)? {
        return Err(Error::not_found("channel", channel));
    }
    Ok(ScheduleHealth::from_islands(find_islands(conn, channel)?))
}
