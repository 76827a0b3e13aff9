//! Operator routes for channel lifecycle, output planning and mixers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post, put},
    Json, Router,
};
use playout_av::{plan_output, EncodePlan, TaskArgs};
use playout_common::{ChannelId, Error, Ingest, Output};
use serde::{Deserialize, Serialize};

use super::error::AppError;
use super::AppContext;
use crate::mixer::{MixerHandle, NewMixerInput};
use crate::registry::ProvisionRequest;

pub fn channel_routes() -> Router<AppContext> {
    Router::new()
        .route("/channels", get(list_channels).post(provision_channel))
        .route(
            "/channels/:short_name",
            get(get_channel).delete(delete_channel),
        )
        .route("/channels/:short_name/start", post(start_channel))
        .route("/channels/:short_name/stop", post(stop_channel))
        .route("/channels/:short_name/plans", get(channel_plans))
        .route("/channels/:short_name/outputs", put(update_outputs))
        .route("/channels/:short_name/mixer", get(mixer_state))
        .route("/channels/:short_name/mixer/restart", post(restart_mixer))
        .route("/channels/:short_name/mixer/inputs", post(add_mixer_input))
        .route(
            "/channels/:short_name/mixer/inputs/:input_id",
            delete(remove_mixer_input),
        )
        .route("/plan", post(preview_plan))
}

/// List all channels.
#[utoipa::path(
    get,
    path = "/api/channels",
    tag = "channels",
    responses(
        (status = 200, description = "All channels ordered by short name")
    )
)]
pub async fn list_channels(State(ctx): State<AppContext>) -> impl IntoResponse {
    Json(ctx.registry.list())
}

/// Provision a channel.
///
/// Without a short name one is generated; without a name the configured
/// default is used.
#[utoipa::path(
    post,
    path = "/api/channels",
    tag = "channels",
    responses(
        (status = 201, description = "Channel provisioned"),
        (status = 400, description = "Invalid channel or mixer configuration"),
        (status = 409, description = "Short name already taken")
    )
)]
pub async fn provision_channel(
    State(ctx): State<AppContext>,
    Json(req): Json<ProvisionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let channel = ctx.registry.provision(req).await?;
    Ok((StatusCode::CREATED, Json(channel)))
}

/// Get a channel.
#[utoipa::path(
    get,
    path = "/api/channels/{short_name}",
    tag = "channels",
    params(("short_name" = String, Path, description = "Channel short name")),
    responses(
        (status = 200, description = "Channel"),
        (status = 404, description = "Channel not found")
    )
)]
pub async fn get_channel(
    State(ctx): State<AppContext>,
    Path(short_name): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = ChannelId::from(short_name);
    let entry = ctx
        .registry
        .get(&id)
        .ok_or_else(|| Error::not_found("channel", &id))?;
    Ok(Json(entry.channel))
}

/// Stop and delete a channel together with its schedule.
#[utoipa::path(
    delete,
    path = "/api/channels/{short_name}",
    tag = "channels",
    params(("short_name" = String, Path, description = "Channel short name")),
    responses(
        (status = 204, description = "Channel deleted"),
        (status = 404, description = "Channel not found")
    )
)]
pub async fn delete_channel(
    State(ctx): State<AppContext>,
    Path(short_name): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    ctx.registry.remove(&ChannelId::from(short_name)).await?;
    // the channel's entries went with it
    refresh_jobs(&ctx).await;
    Ok(StatusCode::NO_CONTENT)
}

/// Start a channel's outputs.
#[utoipa::path(
    post,
    path = "/api/channels/{short_name}/start",
    tag = "channels",
    params(("short_name" = String, Path, description = "Channel short name")),
    responses(
        (status = 200, description = "Per-output start report"),
        (status = 404, description = "Channel not found"),
        (status = 409, description = "Channel already running")
    )
)]
pub async fn start_channel(
    State(ctx): State<AppContext>,
    Path(short_name): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let report = ctx.registry.start(&ChannelId::from(short_name)).await?;
    Ok(Json(report))
}

#[derive(Debug, Serialize)]
struct StatusResponse {
    short_name: String,
    status: String,
}

/// Stop a channel.
#[utoipa::path(
    post,
    path = "/api/channels/{short_name}/stop",
    tag = "channels",
    params(("short_name" = String, Path, description = "Channel short name")),
    responses(
        (status = 200, description = "Channel stopped"),
        (status = 404, description = "Channel not found")
    )
)]
pub async fn stop_channel(
    State(ctx): State<AppContext>,
    Path(short_name): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = ChannelId::from(short_name);
    let status = ctx.registry.stop(&id).await?;
    Ok(Json(StatusResponse {
        short_name: id.into_inner(),
        status: status.to_string(),
    }))
}

/// Plan every output of a channel without starting anything.
#[utoipa::path(
    get,
    path = "/api/channels/{short_name}/plans",
    tag = "channels",
    params(("short_name" = String, Path, description = "Channel short name")),
    responses(
        (status = 200, description = "One plan or error per output"),
        (status = 404, description = "Channel not found")
    )
)]
pub async fn channel_plans(
    State(ctx): State<AppContext>,
    Path(short_name): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let plans = ctx.registry.plans(&ChannelId::from(short_name))?;
    Ok(Json(plans))
}

/// Replace the outputs of a stopped channel.
#[utoipa::path(
    put,
    path = "/api/channels/{short_name}/outputs",
    tag = "channels",
    params(("short_name" = String, Path, description = "Channel short name")),
    responses(
        (status = 200, description = "Updated channel"),
        (status = 404, description = "Channel not found"),
        (status = 409, description = "Channel is not stopped")
    )
)]
pub async fn update_outputs(
    State(ctx): State<AppContext>,
    Path(short_name): Path<String>,
    Json(outputs): Json<Vec<Output>>,
) -> Result<impl IntoResponse, AppError> {
    let channel = ctx
        .registry
        .update_outputs(&ChannelId::from(short_name), outputs)
        .await?;
    Ok(Json(channel))
}

fn require_mixer(ctx: &AppContext, short_name: String) -> Result<MixerHandle, Error> {
    let id = ChannelId::from(short_name);
    if ctx.registry.get(&id).is_none() {
        return Err(Error::not_found("channel", &id));
    }
    ctx.registry
        .mixer(&id)
        .ok_or_else(|| Error::validation(format!("channel {} has no mixer", id)))
}

/// Pull the current mixer state.
#[utoipa::path(
    get,
    path = "/api/channels/{short_name}/mixer",
    tag = "mixer",
    params(("short_name" = String, Path, description = "Channel short name")),
    responses(
        (status = 200, description = "Mixer inputs, outputs and composition"),
        (status = 400, description = "Channel has no mixer"),
        (status = 502, description = "Mixer unreachable")
    )
)]
pub async fn mixer_state(
    State(ctx): State<AppContext>,
    Path(short_name): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let mixer = require_mixer(&ctx, short_name)?;
    Ok(Json(mixer.refresh().await?))
}

/// Restart the mixer.
#[utoipa::path(
    post,
    path = "/api/channels/{short_name}/mixer/restart",
    tag = "mixer",
    params(("short_name" = String, Path, description = "Channel short name")),
    responses(
        (status = 204, description = "Mixer restarted"),
        (status = 502, description = "Mixer unreachable")
    )
)]
pub async fn restart_mixer(
    State(ctx): State<AppContext>,
    Path(short_name): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    require_mixer(&ctx, short_name)?.restart().await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize)]
struct InputCreated {
    id: i64,
}

/// Add a mixer input.
#[utoipa::path(
    post,
    path = "/api/channels/{short_name}/mixer/inputs",
    tag = "mixer",
    params(("short_name" = String, Path, description = "Channel short name")),
    responses(
        (status = 201, description = "Input added"),
        (status = 502, description = "Mixer unreachable")
    )
)]
pub async fn add_mixer_input(
    State(ctx): State<AppContext>,
    Path(short_name): Path<String>,
    Json(input): Json<NewMixerInput>,
) -> Result<impl IntoResponse, AppError> {
    let id = require_mixer(&ctx, short_name)?.add_input(&input).await?;
    Ok((StatusCode::CREATED, Json(InputCreated { id })))
}

/// Remove a mixer input.
#[utoipa::path(
    delete,
    path = "/api/channels/{short_name}/mixer/inputs/{input_id}",
    tag = "mixer",
    params(
        ("short_name" = String, Path, description = "Channel short name"),
        ("input_id" = i64, Path, description = "Mixer input id")
    ),
    responses(
        (status = 204, description = "Input removed"),
        (status = 502, description = "Mixer unreachable")
    )
)]
pub async fn remove_mixer_input(
    State(ctx): State<AppContext>,
    Path((short_name, input_id)): Path<(String, i64)>,
) -> Result<impl IntoResponse, AppError> {
    require_mixer(&ctx, short_name)?.remove_input(input_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct PlanPreviewRequest {
    pub ingest: Ingest,
    #[serde(default)]
    pub dvr: bool,
    pub output: Output,
}

#[derive(Debug, Serialize)]
struct PlanPreview {
    plan: EncodePlan,
    args: TaskArgs,
    instruction: String,
}

/// Plan a single output without a channel, for checking a configuration.
#[utoipa::path(
    post,
    path = "/api/plan",
    tag = "channels",
    responses(
        (status = 200, description = "Plan, worker arguments and normalized instruction"),
        (status = 400, description = "Output cannot be planned"),
        (status = 422, description = "Output type not implemented")
    )
)]
pub async fn preview_plan(Json(req): Json<PlanPreviewRequest>) -> Result<impl IntoResponse, AppError> {
    let plan = plan_output(&req.ingest, req.dvr, &req.output)?;
    let args = plan.to_task_args();
    let instruction = args.normalized();
    Ok(Json(PlanPreview {
        plan,
        args,
        instruction,
    }))
}

// Reload failures are logged by the scheduler; the request itself succeeded.
pub(super) async fn refresh_jobs(ctx: &AppContext) {
    let _ = ctx.scheduler.reload().await;
}
