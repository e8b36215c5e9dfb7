//! Axum router construction for the public API.
//!
//! All routes live under `/api/v1`. Requests from blocked addresses are
//! rejected before routing; every request carries a 15-second deadline.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Request deadline propagated to every handler.
const REQUEST_DEADLINE: Duration = Duration::from_secs(15);

/// Build the complete Axum router for the API server.
///
/// Routes:
/// - `POST /api/v1/auth/service` -- identity-token exchange
/// - `POST /api/v1/posts`, `GET/DELETE /api/v1/posts/{id}`
/// - `POST/GET /api/v1/posts/{id}/replies`, `GET/DELETE /api/v1/replies/{id}`
/// - `POST/DELETE /api/v1/votes`
/// - `GET /api/v1/feed`
/// - `GET /api/v1/search`
/// - `GET /api/v1/arguments/...` -- ADUs, claims, related posts
/// - `POST/DELETE /api/v1/follows/{id}` + follower listings
/// - `GET /api/v1/notifications` + read markers
/// - `POST /api/v1/internal/block-ip`, `GET /api/v1/internal/blocked-ips`
///   (hidden behind `x-internal-secret`)
///
/// CORS is open for development; production deployments restrict it at
/// the edge.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        // Auth
        .route("/auth/service", post(handlers::service_auth::exchange))
        // Content
        .route("/posts", post(handlers::content::create_post))
        .route(
            "/posts/{id}",
            get(handlers::content::get_post).delete(handlers::content::delete_post),
        )
        .route(
            "/posts/{id}/replies",
            post(handlers::content::create_reply).get(handlers::content::list_replies),
        )
        .route(
            "/replies/{id}",
            get(handlers::content::get_reply).delete(handlers::content::delete_reply),
        )
        // Votes
        .route(
            "/votes",
            post(handlers::votes::cast_vote).delete(handlers::votes::rescind_vote),
        )
        // Feed + search
        .route("/feed", get(handlers::feed::feed))
        .route("/search", get(handlers::search::search))
        // Legacy arguments
        .route(
            "/arguments/posts/{id}/adus",
            get(handlers::arguments::adus_for_post),
        )
        .route("/arguments/claims/{id}", get(handlers::arguments::get_claim))
        .route(
            "/arguments/claims/{id}/related",
            get(handlers::arguments::relations_for_adu),
        )
        .route(
            "/arguments/canonical-claims/{id}/related-posts",
            get(handlers::arguments::related_posts),
        )
        // Follow graph
        .route(
            "/follows/{id}",
            post(handlers::follows::follow).delete(handlers::follows::unfollow),
        )
        .route(
            "/follows/{id}/followers",
            get(handlers::follows::list_followers),
        )
        .route(
            "/follows/{id}/following",
            get(handlers::follows::list_following),
        )
        // Notifications
        .route("/notifications", get(handlers::notifications::list))
        .route(
            "/notifications/viewed",
            post(handlers::notifications::mark_viewed),
        )
        .route(
            "/notifications/{id}/read",
            post(handlers::notifications::mark_read),
        )
        // Internal (hidden)
        .route("/internal/block-ip", post(handlers::internal::block_ip))
        .route(
            "/internal/blocked-ips",
            get(handlers::internal::blocked_ips),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            enforce_blocklist,
        ));

    Router::new()
        .nest("/api/v1", api)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(REQUEST_DEADLINE))
        .with_state(state)
}

/// Reject requests from blocked addresses before any handler runs.
///
/// The client address is taken from `x-forwarded-for` (first hop); a
/// request with no address header passes through.
async fn enforce_blocklist(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let forwarded = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .map(ToOwned::to_owned);

    if let Some(ip) = forwarded {
        if state.blocklist.is_blocked(&ip).await {
            tracing::debug!(ip, "Rejected blocked address");
            return Err(StatusCode::FORBIDDEN);
        }
    }
    Ok(next.run(request).await)
}
