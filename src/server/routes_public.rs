//! Unauthenticated, read-only channel listing for viewers.

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use playout_common::{ChannelId, Error};
use playout_db::models::Channel;
use playout_db::queries;
use serde::Serialize;
use utoipa::ToSchema;

use super::error::AppError;
use super::AppContext;
use crate::store::with_conn;

pub fn public_routes() -> Router<AppContext> {
    Router::new()
        .route("/public/channels", get(list_channels))
        .route("/public/channels/:short_name", get(get_channel))
}

/// A channel as shown to viewers.
#[derive(Debug, Serialize, ToSchema)]
pub struct PublicChannel {
    pub short_name: String,
    pub name: String,
    pub description: String,
    pub thumbnail: String,
    /// `linear` or `event`.
    pub channel_type: String,
    pub outputs: Vec<PublicOutput>,
}

/// Where viewers can pick up an output.
#[derive(Debug, Serialize, ToSchema)]
pub struct PublicOutput {
    pub name: String,
    #[serde(rename = "type")]
    pub output_type: String,
    pub destination: String,
}

impl From<Channel> for PublicChannel {
    fn from(c: Channel) -> Self {
        Self {
            short_name: c.short_name.into_inner(),
            name: c.name,
            description: c.description,
            thumbnail: c.thumbnail_url,
            channel_type: c.channel_type.to_string(),
            outputs: c
                .outputs
                .into_iter()
                .map(|o| PublicOutput {
                    name: o.name,
                    output_type: o.output_type,
                    destination: o.destination,
                })
                .collect(),
        }
    }
}

/// List public channels.
#[utoipa::path(
    get,
    path = "/api/public/channels",
    tag = "public",
    responses(
        (status = 200, description = "Public channels", body = Vec<PublicChannel>)
    )
)]
pub async fn list_channels(State(ctx): State<AppContext>) -> Result<impl IntoResponse, AppError> {
    let channels = with_conn(&ctx.db, |conn| queries::channels::list_public_channels(conn)).await?;
    let channels: Vec<PublicChannel> = channels.into_iter().map(PublicChannel::from).collect();
    Ok(Json(channels))
}

/// Get one public channel. Private channels are reported as missing.
#[utoipa::path(
    get,
    path = "/api/public/channels/{short_name}",
    tag = "public",
    params(
        ("short_name" = String, Path, description = "Channel short name")
    ),
    responses(
        (status = 200, description = "Channel", body = PublicChannel),
        (status = 404, description = "Channel not found")
    )
)]
pub async fn get_channel(
    State(ctx): State<AppContext>,
    Path(short_name): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = ChannelId::from(short_name);
    let channel = ctx
        .registry
        .get(&id)
        .map(|e| e.channel)
        .filter(Channel::is_public)
        .ok_or_else(|| Error::not_found("channel", &id))?;
    Ok(Json(PublicChannel::from(channel)))
}
