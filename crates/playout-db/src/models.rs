//! Rust structs mapping to database tables.
//!
//! Each model implements `from_row` for constructing itself from a
//! `rusqlite::Row`. Timestamps are stored as fixed-width UTC RFC 3339 text
//! (millisecond precision, `Z` suffix) so that SQL string comparison orders
//! them chronologically.

use chrono::{DateTime, SecondsFormat, Utc};
use playout_common::{
    ChannelId, ChannelStatus, ChannelType, EntryId, Ingest, Output, ProgrammeId,
};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// helpers
// ---------------------------------------------------------------------------

/// Encode a timestamp in the stored text format.
pub fn encode_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn conversion_err(
    idx: usize,
    e: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
}

fn parse_ts(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let s: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_err(idx, e))
}

fn parse_opt_ts(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let s: Option<String> = row.get(idx)?;
    s.map(|v| {
        DateTime::parse_from_rfc3339(&v)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| conversion_err(idx, e))
    })
    .transpose()
}

fn parse_enum<T: std::str::FromStr<Err = String>>(
    row: &rusqlite::Row,
    idx: usize,
) -> rusqlite::Result<T> {
    let s: String = row.get(idx)?;
    s.parse().map_err(|e: String| {
        conversion_err(
            idx,
            std::io::Error::new(std::io::ErrorKind::InvalidData, e),
        )
    })
}

// ---------------------------------------------------------------------------
// Channel
// ---------------------------------------------------------------------------

/// A provisioned channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    pub short_name: ChannelId,
    pub name: String,
    pub description: String,
    pub thumbnail_url: String,
    pub channel_type: ChannelType,
    pub ingest: Ingest,
    /// Fallback shown when nothing is scheduled.
    pub slate_url: String,
    pub outputs: Vec<Output>,
    pub archive: bool,
    pub dvr: bool,
    pub visibility: String,
    pub mixer_kind: Option<String>,
    pub mixer_endpoint: Option<String>,
    pub status: ChannelStatus,
    pub created_at: DateTime<Utc>,
}

impl Channel {
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        let outputs_json: String = row.get(8)?;
        Ok(Self {
            short_name: ChannelId::from(row.get::<_, String>(0)?),
            name: row.get(1)?,
            description: row.get(2)?,
            thumbnail_url: row.get(3)?,
            channel_type: parse_enum(row, 4)?,
            ingest: Ingest {
                url: row.get(5)?,
                protocol: row.get(6)?,
            },
            slate_url: row.get(7)?,
            outputs: serde_json::from_str(&outputs_json).map_err(|e| conversion_err(8, e))?,
            archive: row.get(9)?,
            dvr: row.get(10)?,
            visibility: row.get(11)?,
            mixer_kind: row.get(12)?,
            mixer_endpoint: row.get(13)?,
            status: parse_enum(row, 14)?,
            created_at: parse_ts(row, 15)?,
        })
    }

    /// Whether the channel is listed on the public API.
    pub fn is_public(&self) -> bool {
        self.visibility == "public"
    }
}

/// Data required to insert a channel row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewChannel {
    pub short_name: ChannelId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub thumbnail_url: String,
    #[serde(default)]
    pub channel_type: ChannelType,
    pub ingest: Ingest,
    #[serde(default)]
    pub slate_url: String,
    #[serde(default)]
    pub outputs: Vec<Output>,
    #[serde(default)]
    pub archive: bool,
    #[serde(default)]
    pub dvr: bool,
    #[serde(default = "default_visibility")]
    pub visibility: String,
    #[serde(default)]
    pub mixer_kind: Option<String>,
    #[serde(default)]
    pub mixer_endpoint: Option<String>,
}

fn default_visibility() -> String {
    "public".to_string()
}

// ---------------------------------------------------------------------------
// Programme
// ---------------------------------------------------------------------------

/// A catalog programme. An empty `videos` list denotes live content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Programme {
    pub id: ProgrammeId,
    pub title: String,
    pub description: String,
    pub thumbnail: String,
    pub videos: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Programme {
    /// Build from a programme row; videos are loaded separately.
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: ProgrammeId::from(row.get::<_, i64>(0)?),
            title: row.get(1)?,
            description: row.get(2)?,
            thumbnail: row.get(3)?,
            videos: Vec::new(),
            created_at: parse_ts(row, 4)?,
        })
    }

    pub fn is_live(&self) -> bool {
        self.videos.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProgramme {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub thumbnail: String,
    #[serde(default)]
    pub videos: Vec<String>,
}

// ---------------------------------------------------------------------------
// ScheduleEntry
// ---------------------------------------------------------------------------

/// One slot on a channel's timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub id: EntryId,
    pub channel_id: ChannelId,
    pub programme_id: ProgrammeId,
    pub ingest_url: String,
    pub ingest_type: String,
    pub scheduled_start: DateTime<Utc>,
    pub scheduled_end: DateTime<Utc>,
    pub broadcast_start: Option<DateTime<Utc>>,
    pub broadcast_end: Option<DateTime<Utc>>,
    pub vod_url: Option<String>,
    pub dvr: bool,
    pub archive: bool,
}

impl ScheduleEntry {
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: EntryId::from(row.get::<_, i64>(0)?),
            channel_id: ChannelId::from(row.get::<_, String>(1)?),
            programme_id: ProgrammeId::from(row.get::<_, i64>(2)?),
            ingest_url: row.get(3)?,
            ingest_type: row.get(4)?,
            scheduled_start: parse_ts(row, 5)?,
            scheduled_end: parse_ts(row, 6)?,
            broadcast_start: parse_opt_ts(row, 7)?,
            broadcast_end: parse_opt_ts(row, 8)?,
            vod_url: row.get(9)?,
            dvr: row.get(10)?,
            archive: row.get(11)?,
        })
    }
}

/// Data required to schedule a programme on a channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewScheduleEntry {
    pub channel_id: ChannelId,
    pub programme_id: ProgrammeId,
    pub ingest_url: String,
    pub ingest_type: String,
    pub scheduled_start: DateTime<Utc>,
    pub scheduled_end: DateTime<Utc>,
    #[serde(default)]
    pub vod_url: Option<String>,
    #[serde(default)]
    pub dvr: bool,
    #[serde(default)]
    pub archive: bool,
}

/// Partial update of a schedule entry. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntryUpdate {
    #[serde(default)]
    pub programme_id: Option<ProgrammeId>,
    #[serde(default)]
    pub ingest_url: Option<String>,
    #[serde(default)]
    pub ingest_type: Option<String>,
    #[serde(default)]
    pub scheduled_start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub scheduled_end: Option<DateTime<Utc>>,
    #[serde(default)]
    pub vod_url: Option<String>,
    #[serde(default)]
    pub dvr: Option<bool>,
    #[serde(default)]
    pub archive: Option<bool>,
}

impl EntryUpdate {
    /// Whether applying this update can move the entry on the timeline.
    pub fn changes_bounds(&self) -> bool {
        self.scheduled_start.is_some() || self.scheduled_end.is_some()
    }
}
