//! OpenAPI documentation and Swagger UI integration.

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use super::AppContext;

/// OpenAPI documentation for the playout API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Playout API",
        version = "0.1.0",
        description = "Channel provisioning, programme scheduling and output planning",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT"),
    ),
    servers(
        (url = "/", description = "Default server")
    ),
    paths(
        super::health_check,
        // Public (routes_public.rs)
        super::routes_public::list_channels,
        super::routes_public::get_channel,
        // Channels (routes_channels.rs)
        super::routes_channels::list_channels,
        super::routes_channels::provision_channel,
        super::routes_channels::get_channel,
        super::routes_channels::delete_channel,
        super::routes_channels::start_channel,
        super::routes_channels::stop_channel,
        super::routes_channels::channel_plans,
        super::routes_channels::update_outputs,
        super::routes_channels::mixer_state,
        super::routes_channels::restart_mixer,
        super::routes_channels::add_mixer_input,
        super::routes_channels::remove_mixer_input,
        super::routes_channels::preview_plan,
        // Schedule (routes_schedule.rs)
        super::routes_schedule::list_programmes,
        super::routes_schedule::create_programme,
        super::routes_schedule::get_programme,
        super::routes_schedule::delete_programme,
        super::routes_schedule::create_entry,
        super::routes_schedule::get_entry,
        super::routes_schedule::update_entry,
        super::routes_schedule::delete_entry,
        super::routes_schedule::mark_ended,
        super::routes_schedule::list_channel_schedule,
        super::routes_schedule::channel_health,
        super::routes_schedule::list_broadcasts,
        super::routes_schedule::list_jobs,
        super::routes_schedule::reload_scheduler,
    ),
    components(
        schemas(
            super::routes_public::PublicChannel,
            super::routes_public::PublicOutput,
            super::routes_schedule::CreateEntryRequest,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "public", description = "Viewer-facing channel listing"),
        (name = "channels", description = "Channel lifecycle and output planning"),
        (name = "mixer", description = "Live mixer control"),
        (name = "programmes", description = "Programme catalog"),
        (name = "schedule", description = "Channel timelines"),
        (name = "scheduler", description = "Execution scheduler"),
    )
)]
pub struct ApiDoc;

/// Routes serving the Swagger UI and the OpenAPI JSON.
pub fn openapi_routes() -> Router<AppContext> {
    Router::new().merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
}
