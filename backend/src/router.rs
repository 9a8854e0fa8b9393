//! Route table and shared layers, used by both the server binary and the
//! integration tests.

use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};
use sqlx::PgPool;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{config::Config, handlers, middleware as app_middleware};

pub fn build_router(pool: PgPool, config: Config) -> anyhow::Result<Router> {
    let allow_origin: HeaderValue = config
        .cors_allow_origin
        .parse()
        .map_err(|_| anyhow::anyhow!("Invalid FRONTEND_URL: {}", config.cors_allow_origin))?;

    // Auth endpoints reachable without a resolved identity.
    let public_routes = Router::new()
        .route("/auth/register", post(handlers::auth::register))
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/google", get(handlers::auth::google_login))
        .route("/auth/google/callback", get(handlers::auth::google_callback));

    // Everything else runs behind the identity resolver. Downstream
    // budget/expense routers are merged here the same way.
    let protected_routes = Router::new()
        .route("/auth/check", get(handlers::auth::check))
        .route("/auth/user", get(handlers::auth::get_user))
        .route("/auth/update-profile", put(handlers::auth::update_profile))
        .route("/auth/logout", post(handlers::auth::logout))
        .route(
            "/auth/change-password",
            post(handlers::auth::change_password),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            (pool.clone(), config.clone()),
            app_middleware::auth::auth,
        ));

    let router = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(
            ServiceBuilder::new()
                .layer(axum_middleware::from_fn(app_middleware::request_id))
                .layer(TraceLayer::new_for_http())
                .layer(
                    CorsLayer::new()
                        .allow_origin(allow_origin)
                        .allow_methods([
                            Method::GET,
                            Method::POST,
                            Method::PUT,
                            Method::DELETE,
                            Method::OPTIONS,
                        ])
                        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
                        .allow_credentials(true),
                ),
        )
        .with_state((pool, config));

    Ok(router)
}
