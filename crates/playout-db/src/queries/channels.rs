//! Channel persistence.

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension};
use playout_common::{ChannelId, ChannelStatus, Error, Output, Result};

use super::is_constraint_violation;
use crate::models::{encode_ts, Channel, NewChannel};

const COLS: &str = "short_name, name, description, thumbnail_url, channel_type,
    ingest_url, ingest_type, slate_url, outputs, archive, dvr, visibility,
    mixer_kind, mixer_endpoint, status, created_at";

/// Insert a channel with status `pending`.
///
/// Fails with `Conflict` when the short name is already taken.
pub fn create_channel(conn: &Connection, new: &NewChannel) -> Result<Channel> {
    let outputs =
        serde_json::to_string(&new.outputs).map_err(|e| Error::internal(e.to_string()))?;
    let now = encode_ts(&Utc::now());

    conn.execute(
        "INSERT INTO channels (short_name, name, description, thumbnail_url, channel_type,
            ingest_url, ingest_type, slate_url, outputs, archive, dvr, visibility,
            mixer_kind, mixer_endpoint, status, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
        rusqlite::params![
            new.short_name.as_str(),
            &new.name,
            &new.description,
            &new.thumbnail_url,
            new.channel_type.to_string(),
            &new.ingest.url,
            &new.ingest.protocol,
            &new.slate_url,
            outputs,
            new.archive,
            new.dvr,
            &new.visibility,
            &new.mixer_kind,
            &new.mixer_endpoint,
            ChannelStatus::Pending.to_string(),
            now,
        ],
    )
    .map_err(|e| {
        if is_constraint_violation(&e) {
            Error::Conflict(format!("channel {} already exists", new.short_name))
        } else {
            Error::database(e.to_string())
        }
    })?;

    get_channel(conn, &new.short_name)?
        .ok_or_else(|| Error::not_found("channel", &new.short_name))
}

/// Get a channel by short name.
pub fn get_channel(conn: &Connection, short_name: &ChannelId) -> Result<Option<Channel>> {
    let q = format!("SELECT {COLS} FROM channels WHERE short_name = ?1");
    conn.query_row(&q, [short_name.as_str()], Channel::from_row)
        .optional()
        .map_err(|e| Error::database(e.to_string()))
}

/// Whether a channel with this short name exists.
pub fn channel_exists(conn: &Connection, short_name: &ChannelId) -> Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM channels WHERE short_name = ?1)",
        [short_name.as_str()],
        |row| row.get(0),
    )
    .map_err(|e| Error::database(e.to_string()))
}

/// List all channels ordered by short name.
pub fn list_channels(conn: &Connection) -> Result<Vec<Channel>> {
    query_channels(conn, &format!("SELECT {COLS} FROM channels ORDER BY short_name"))
}

/// List channels visible on the public API.
pub fn list_public_channels(conn: &Connection) -> Result<Vec<Channel>> {
    query_channels(
        conn,
        &format!("SELECT {COLS} FROM channels WHERE visibility = 'public' ORDER BY short_name"),
    )
}

fn query_channels(conn: &Connection, q: &str) -> Result<Vec<Channel>> {
    let mut stmt = conn.prepare(q).map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map([], Channel::from_row)
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(rows)
}

/// Set a channel's lifecycle status.
pub fn update_channel_status(
    conn: &Connection,
    short_name: &ChannelId,
    status: ChannelStatus,
) -> Result<()> {
    let changed = conn
        .execute(
            "UPDATE channels SET status = ?1 WHERE short_name = ?2",
            rusqlite::params![status.to_string(), short_name.as_str()],
        )
        .map_err(|e| Error::database(e.to_string()))?;
    if changed == 0 {
        return Err(Error::not_found("channel", short_name));
    }
    Ok(())
}

/// Replace a channel's outputs.
pub fn update_channel_outputs(
    conn: &Connection,
    short_name: &ChannelId,
    outputs: &[Output],
) -> Result<()> {
    let json = serde_json::to_string(outputs).map_err(|e| Error::internal(e.to_string()))?;
    let changed = conn
        .execute(
            "UPDATE channels SET outputs = ?1 WHERE short_name = ?2",
            rusqlite::params![json, short_name.as_str()],
        )
        .map_err(|e| Error::database(e.to_string()))?;
    if changed == 0 {
        return Err(Error::not_found("channel", short_name));
    }
    Ok(())
}

/// Delete a channel and, by cascade, its schedule entries.
pub fn delete_channel(conn: &Connection, short_name: &ChannelId) -> Result<()> {
    let changed = conn
        .execute(
            "DELETE FROM channels WHERE short_name = ?1",
            [short_name.as_str()],
        )
        .map_err(|e| Error::database(e.to_string()))?;
    if changed == 0 {
        return Err(Error::not_found("channel", short_name));
    }
    Ok(())
}
