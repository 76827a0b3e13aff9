//! Operator routes for the programme catalog, schedule entries and the
//! execution scheduler.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use playout_common::{ChannelId, EntryId, Error, ProgrammeId};
use playout_db::models::{EntryUpdate, NewProgramme, NewScheduleEntry};
use playout_db::queries;
use serde::Deserialize;
use utoipa::ToSchema;

use super::error::AppError;
use super::routes_channels::refresh_jobs;
use super::AppContext;
use crate::store::with_conn;

pub fn schedule_routes() -> Router<AppContext> {
    Router::new()
        .route("/programmes", get(list_programmes).post(create_programme))
        .route(
            "/programmes/:programme_id",
            get(get_programme).delete(delete_programme),
        )
        .route("/schedule", post(create_entry))
        .route("/schedule/broadcasts", get(list_broadcasts))
        .route(
            "/schedule/:entry_id",
            get(get_entry).patch(update_entry).delete(delete_entry),
        )
        .route("/schedule/:entry_id/ended", post(mark_ended))
        .route("/channels/:short_name/schedule", get(list_channel_schedule))
        .route("/channels/:short_name/health", get(channel_health))
        .route("/scheduler/jobs", get(list_jobs))
        .route("/scheduler/reload", post(reload_scheduler))
}

// ---------------------------------------------------------------------------
// Programmes
// ---------------------------------------------------------------------------

/// List the programme catalog, newest first.
#[utoipa::path(
    get,
    path = "/api/programmes",
    tag = "programmes",
    responses((status = 200, description = "All programmes"))
)]
pub async fn list_programmes(State(ctx): State<AppContext>) -> Result<impl IntoResponse, AppError> {
    let programmes = with_conn(&ctx.db, |conn| queries::programmes::list_programmes(conn)).await?;
    Ok(Json(programmes))
}

/// Add a programme. A programme without videos is live content.
#[utoipa::path(
    post,
    path = "/api/programmes",
    tag = "programmes",
    responses(
        (status = 201, description = "Programme created"),
        (status = 400, description = "Missing title")
    )
)]
pub async fn create_programme(
    State(ctx): State<AppContext>,
    Json(new): Json<NewProgramme>,
) -> Result<impl IntoResponse, AppError> {
    let programme =
        with_conn(&ctx.db, move |conn| queries::programmes::create_programme(conn, &new)).await?;
    tracing::info!("Created programme {} ({})", programme.id, programme.title);
    Ok((StatusCode::CREATED, Json(programme)))
}

/// Get a programme with its videos in play order.
#[utoipa::path(
    get,
    path = "/api/programmes/{programme_id}",
    tag = "programmes",
    params(("programme_id" = i64, Path, description = "Programme id")),
    responses(
        (status = 200, description = "Programme"),
        (status = 404, description = "Programme not found")
    )
)]
pub async fn get_programme(
    State(ctx): State<AppContext>,
    Path(programme_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let id = ProgrammeId::from(programme_id);
    let programme = with_conn(&ctx.db, move |conn| queries::programmes::get_programme(conn, id))
        .await?
        .ok_or_else(|| Error::not_found("programme", id))?;
    Ok(Json(programme))
}

/// Delete a programme that is no longer scheduled.
#[utoipa::path(
    delete,
    path = "/api/programmes/{programme_id}",
    tag = "programmes",
    params(("programme_id" = i64, Path, description = "Programme id")),
    responses(
        (status = 204, description = "Programme deleted"),
        (status = 404, description = "Programme not found"),
        (status = 409, description = "Programme is still scheduled")
    )
)]
pub async fn delete_programme(
    State(ctx): State<AppContext>,
    Path(programme_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let id = ProgrammeId::from(programme_id);
    with_conn(&ctx.db, move |conn| queries::programmes::delete_programme(conn, id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Schedule entries
// ---------------------------------------------------------------------------

/// Request to schedule a programme. The ingest defaults to the channel's.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateEntryRequest {
    #[schema(value_type = String)]
    pub channel_id: ChannelId,
    #[schema(value_type = i64)]
    pub programme_id: ProgrammeId,
    #[serde(default)]
    pub ingest_url: Option<String>,
    #[serde(default)]
    pub ingest_type: Option<String>,
    pub scheduled_start: DateTime<Utc>,
    pub scheduled_end: DateTime<Utc>,
    #[serde(default)]
    pub vod_url: Option<String>,
    #[serde(default)]
    pub dvr: bool,
    #[serde(default)]
    pub archive: bool,
}

/// Schedule a programme on a channel.
#[utoipa::path(
    post,
    path = "/api/schedule",
    tag = "schedule",
    request_body = CreateEntryRequest,
    responses(
        (status = 201, description = "Entry created"),
        (status = 400, description = "End not after start"),
        (status = 404, description = "Channel or programme not found"),
        (status = 409, description = "Overlaps an existing entry")
    )
)]
pub async fn create_entry(
    State(ctx): State<AppContext>,
    Json(req): Json<CreateEntryRequest>,
) -> Result<impl IntoResponse, AppError> {
    let channel = ctx
        .registry
        .get(&req.channel_id)
        .map(|e| e.channel)
        .ok_or_else(|| Error::not_found("channel", &req.channel_id))?;

    let new = NewScheduleEntry {
        channel_id: req.channel_id,
        programme_id: req.programme_id,
        ingest_url: req.ingest_url.unwrap_or(channel.ingest.url),
        ingest_type: req.ingest_type.unwrap_or(channel.ingest.protocol),
        scheduled_start: req.scheduled_start,
        scheduled_end: req.scheduled_end,
        vod_url: req.vod_url,
        dvr: req.dvr,
        archive: req.archive,
    };
    let entry =
        with_conn(&ctx.db, move |conn| queries::schedule_entries::create_entry(conn, &new)).await?;

    tracing::info!(
        "Scheduled programme {} on {} at {}",
        entry.programme_id,
        entry.channel_id,
        entry.scheduled_start
    );
    refresh_jobs(&ctx).await;
    Ok((StatusCode::CREATED, Json(entry)))
}

/// Get a schedule entry.
#[utoipa::path(
    get,
    path = "/api/schedule/{entry_id}",
    tag = "schedule",
    params(("entry_id" = i64, Path, description = "Entry id")),
    responses(
        (status = 200, description = "Entry"),
        (status = 404, description = "Entry not found")
    )
)]
pub async fn get_entry(
    State(ctx): State<AppContext>,
    Path(entry_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let id = EntryId::from(entry_id);
    let entry = with_conn(&ctx.db, move |conn| queries::schedule_entries::get_entry(conn, id))
        .await?
        .ok_or_else(|| Error::not_found("schedule entry", id))?;
    Ok(Json(entry))
}

/// Partially update a schedule entry.
#[utoipa::path(
    patch,
    path = "/api/schedule/{entry_id}",
    tag = "schedule",
    params(("entry_id" = i64, Path, description = "Entry id")),
    responses(
        (status = 200, description = "Updated entry"),
        (status = 404, description = "Entry not found"),
        (status = 409, description = "New times overlap another entry")
    )
)]
pub async fn update_entry(
    State(ctx): State<AppContext>,
    Path(entry_id): Path<i64>,
    Json(update): Json<EntryUpdate>,
) -> Result<impl IntoResponse, AppError> {
    let id = EntryId::from(entry_id);
    let entry = with_conn(&ctx.db, move |conn| {
        queries::schedule_entries::update_entry(conn, id, &update)
    })
    .await?;
    refresh_jobs(&ctx).await;
    Ok(Json(entry))
}

/// Delete a schedule entry and cancel its pending job.
#[utoipa::path(
    delete,
    path = "/api/schedule/{entry_id}",
    tag = "schedule",
    params(("entry_id" = i64, Path, description = "Entry id")),
    responses(
        (status = 204, description = "Entry deleted"),
        (status = 404, description = "Entry not found")
    )
)]
pub async fn delete_entry(
    State(ctx): State<AppContext>,
    Path(entry_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    ctx.scheduler.delete(EntryId::from(entry_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Record that an entry came off air.
#[utoipa::path(
    post,
    path = "/api/schedule/{entry_id}/ended",
    tag = "schedule",
    params(("entry_id" = i64, Path, description = "Entry id")),
    responses(
        (status = 204, description = "Broadcast end recorded"),
        (status = 404, description = "Entry not found")
    )
)]
pub async fn mark_ended(
    State(ctx): State<AppContext>,
    Path(entry_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let id = EntryId::from(entry_id);
    let now = Utc::now();
    with_conn(&ctx.db, move |conn| {
        queries::schedule_entries::mark_broadcast_end(conn, id, &now)
    })
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct RangeQuery {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

/// A channel's schedule, optionally limited to entries intersecting
/// `[from, to)`.
#[utoipa::path(
    get,
    path = "/api/channels/{short_name}/schedule",
    tag = "schedule",
    params(
        ("short_name" = String, Path, description = "Channel short name"),
        ("from" = Option<String>, Query, description = "RFC 3339 range start"),
        ("to" = Option<String>, Query, description = "RFC 3339 range end")
    ),
    responses(
        (status = 200, description = "Entries ordered by scheduled start"),
        (status = 400, description = "Only one of from/to given")
    )
)]
pub async fn list_channel_schedule(
    State(ctx): State<AppContext>,
    Path(short_name): Path<String>,
    Query(range): Query<RangeQuery>,
) -> Result<impl IntoResponse, AppError> {
    let id = ChannelId::from(short_name);
    let entries = match (range.from, range.to) {
        (None, None) => {
            with_conn(&ctx.db, move |conn| {
                queries::schedule_entries::list_for_channel(conn, &id)
            })
            .await?
        }
        (Some(from), Some(to)) => {
            with_conn(&ctx.db, move |conn| {
                queries::schedule_entries::list_range(conn, &id, &from, &to)
            })
            .await?
        }
        _ => return Err(Error::validation("from and to must be given together").into()),
    };
    Ok(Json(entries))
}

/// Islands and gaps of a channel's timeline.
#[utoipa::path(
    get,
    path = "/api/channels/{short_name}/health",
    tag = "schedule",
    params(("short_name" = String, Path, description = "Channel short name")),
    responses(
        (status = 200, description = "Islands, gaps and whether anything is scheduled"),
        (status = 404, description = "Channel not found")
    )
)]
pub async fn channel_health(
    State(ctx): State<AppContext>,
    Path(short_name): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = ChannelId::from(short_name);
    let health =
        with_conn(&ctx.db, move |conn| queries::schedule_entries::health(conn, &id)).await?;
    Ok(Json(health))
}

#[derive(Debug, Deserialize)]
pub struct BroadcastQuery {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

/// Entries that actually went on air within `[from, to)`.
#[utoipa::path(
    get,
    path = "/api/schedule/broadcasts",
    tag = "schedule",
    params(
        ("from" = String, Query, description = "RFC 3339 range start"),
        ("to" = String, Query, description = "RFC 3339 range end")
    ),
    responses((status = 200, description = "Entries ordered by broadcast start"))
)]
pub async fn list_broadcasts(
    State(ctx): State<AppContext>,
    Query(range): Query<BroadcastQuery>,
) -> Result<impl IntoResponse, AppError> {
    let entries = with_conn(&ctx.db, move |conn| {
        queries::schedule_entries::list_broadcast_between(conn, &range.from, &range.to)
    })
    .await?;
    Ok(Json(entries))
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Current jobs of the execution scheduler.
#[utoipa::path(
    get,
    path = "/api/scheduler/jobs",
    tag = "scheduler",
    responses((status = 200, description = "Jobs ordered by fire time"))
)]
pub async fn list_jobs(State(ctx): State<AppContext>) -> impl IntoResponse {
    Json(ctx.scheduler.jobs())
}

/// Reload the scheduler's window from the schedule store.
#[utoipa::path(
    post,
    path = "/api/scheduler/reload",
    tag = "scheduler",
    responses(
        (status = 200, description = "What the reload changed"),
        (status = 503, description = "Schedule store unavailable")
    )
)]
pub async fn reload_scheduler(State(ctx): State<AppContext>) -> Result<impl IntoResponse, AppError> {
    let summary = ctx.scheduler.reload().await?;
    Ok(Json(summary))
}
