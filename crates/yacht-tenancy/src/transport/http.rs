//! HTTP transport implementation

use std::future::Future;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderName, HeaderValue, Method, StatusCode, header};
use axum::response::{IntoResponse, Json};
use axum::routing::get;
use axum::Router;
use serde::{Deserialize, Serialize};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use super::identity::RequestContext;
use crate::access::{ScopedAccessor, UnscopedAccessor};
use crate::cache::{Tag, TenantCache, create_tenant_cache};
use crate::config::{Config, ServerConfig};
use crate::constants::{STATUS_DEGRADED, STATUS_OK, headers};
use crate::query::entities::{Plan, Task};
use crate::query::{BoundQuery, CreateSpec, DeleteSpec, EntityKind, QuerySpec, UpdateSpec};
use crate::store::{FieldMap, InMemoryStore, Record, RecordId, Store};
use crate::tenant::{TenantId, TenantResolver};
use crate::translate::{ErrorTranslator, TranslatedError};
use crate::{Error, Result};

type ApiResult<T> = std::result::Result<T, TranslatedError>;

const NO_PARAMS: &[&str] = &[];

/// Shared handles for request handlers
#[derive(Clone)]
pub struct AppState {
    store: Arc<dyn Store>,
    scoped: ScopedAccessor,
    unscoped: UnscopedAccessor,
    cache: TenantCache,
    resolver: Arc<TenantResolver>,
    translator: ErrorTranslator,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("cache", &self.cache)
            .field("translator", &self.translator)
            .finish_non_exhaustive()
    }
}

impl AppState {
    #[must_use]
    pub fn new(store: Arc<dyn Store>, cache: TenantCache, config: &Config) -> Self {
        Self {
            scoped: ScopedAccessor::new(Arc::clone(&store)),
            unscoped: UnscopedAccessor::new(Arc::clone(&store)),
            store,
            cache,
            resolver: Arc::new(TenantResolver::new(config.tenancy())),
            translator: ErrorTranslator::new(config.environment()),
        }
    }

    /// State backed by an in-memory store and the configured cache
    #[must_use]
    pub fn in_memory(config: &Config) -> Self {
        Self::new(
            Arc::new(InMemoryStore::new()),
            create_tenant_cache(config.cache()),
            config,
        )
    }

    #[must_use]
    pub fn resolver(&self) -> &TenantResolver {
        &self.resolver
    }

    #[must_use]
    pub const fn translator(&self) -> &ErrorTranslator {
        &self.translator
    }

    #[must_use]
    pub const fn cache(&self) -> &TenantCache {
        &self.cache
    }

    fn reject(&self, err: &Error) -> TranslatedError {
        self.translator.translate(err)
    }

    /// Invalidate after a committed write. The write stands even if this fails.
    async fn invalidate_after_write(&self, tenant: &TenantId, kind: EntityKind) {
        if let Err(e) = self
            .cache
            .invalidate_tags(&TenantCache::write_tags(tenant, kind))
            .await
        {
            tracing::warn!(tenant.id = %tenant, entity = %kind, error = %e, "invalidation failed");
        }
    }
}

/// Health check response
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Filters accepted by `GET /tasks`
#[derive(Debug, Default, Deserialize)]
struct TaskFilter {
    status: Option<String>,
    limit: Option<usize>,
}

/// `name:-` when absent, `name:=value` when present
fn filter_param(name: &str, value: Option<impl std::fmt::Display>) -> String {
    match value {
        Some(value) => format!("{name}:={value}"),
        None => format!("{name}:-"),
    }
}

impl TaskFilter {
    fn key_params(&self) -> Vec<String> {
        vec![
            filter_param("status", self.status.as_deref()),
            filter_param("limit", self.limit),
        ]
    }

    fn bound_query(self, tenant: &TenantId) -> BoundQuery {
        self.apply(QuerySpec::new()).for_tenant(tenant)
    }

    fn apply(self, mut spec: QuerySpec<Task>) -> QuerySpec<Task> {
        if let Some(status) = self.status {
            spec = spec.where_eq("status", status);
        }
        if let Some(limit) = self.limit {
            spec = spec.limit(limit);
        }
        spec
    }
}

/// Build the application router
pub fn router(state: AppState, server: &ServerConfig) -> Router {
    #[allow(unused_mut)]
    let mut app = Router::new()
        .route("/plans", get(list_plans).post(create_plan))
        .route("/tasks", get(list_tasks).post(create_task))
        .route(
            "/tasks/{id}",
            get(get_task).patch(update_task).delete(delete_task),
        );

    #[cfg(feature = "metrics")]
    {
        app = app
            .route_layer(axum::middleware::from_fn(track_requests))
            .route("/metrics", get(metrics_handler));
    }

    app.route("/health", get(health_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            server.request_timeout,
        ))
        .layer(build_cors_layer(&server.cors_origins))
}

/// Run the HTTP server until `shutdown` resolves
pub async fn run_http(
    state: AppState,
    server: &ServerConfig,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let addr = SocketAddr::new(server.http_host, server.http_port);

    emit_security_warnings(server.http_host);

    let app = router(state, server);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| Error::Transport(format!("Failed to bind to {addr}: {e}")))?;

    tracing::info!(
        environment = server.environment.as_str(),
        "HTTP server listening on {addr}"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| Error::Transport(format!("HTTP server error: {e}")))?;

    tracing::info!("HTTP server shutdown complete");
    Ok(())
}

fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| o.parse::<HeaderValue>().ok())
        .collect();

    // Restrictive default: only localhost
    let origin = if allowed.is_empty() {
        AllowOrigin::exact(HeaderValue::from_static("http://localhost:3000"))
    } else {
        AllowOrigin::list(allowed)
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static(headers::PRINCIPAL_ID),
            HeaderName::from_static(headers::PRINCIPAL_ROLE),
            HeaderName::from_static(headers::HOME_TENANT),
            HeaderName::from_static(headers::TENANT_OVERRIDE),
        ])
}

fn emit_security_warnings(host: IpAddr) {
    let is_all_interfaces = host == IpAddr::V4(Ipv4Addr::UNSPECIFIED)
        || host == IpAddr::V6(std::net::Ipv6Addr::UNSPECIFIED);

    if is_all_interfaces {
        tracing::warn!(
            "HTTP server binding to all interfaces (0.0.0.0). \
             This exposes the server to all network interfaces."
        );
    }

    if !host.is_loopback() {
        tracing::warn!(
            "SECURITY WARNING: identity headers are trusted as sent. \
             Only expose this server behind a gateway that authenticates callers \
             and overwrites the x-principal-* headers."
        );
    }
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let store_ok = state.store.health_check().await.is_ok();
    let cache_ok = state.cache.health_check().await.is_ok();

    let (code, status) = if store_ok && cache_ok {
        (StatusCode::OK, STATUS_OK)
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, STATUS_DEGRADED)
    };

    (
        code,
        Json(HealthResponse {
            status,
            version: env!("CARGO_PKG_VERSION"),
        }),
    )
}

#[cfg(feature = "metrics")]
async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    if let Some(entries) = state.cache.stats().await.entry_count {
        crate::observability::set_cache_size(entries);
    }
    (
        [(
            header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        crate::observability::render_metrics(),
    )
}

#[cfg(feature = "metrics")]
async fn track_requests(
    request: axum::extract::Request,
    next: axum::middleware::Next,
) -> axum::response::Response {
    let route = request
        .extensions()
        .get::<axum::extract::MatchedPath>()
        .map_or_else(|| "unmatched".to_owned(), |p| p.as_str().to_owned());
    let start = std::time::Instant::now();

    let response = next.run(request).await;
    crate::observability::record_request(&route, response.status().as_u16(), start.elapsed());
    response
}

async fn list_plans(
    State(state): State<AppState>,
    RequestContext(ctx): RequestContext,
) -> ApiResult<Json<Vec<Record>>> {
    let unscoped = state.unscoped.clone();
    state
        .cache
        .cached_resource(&ctx, EntityKind::Plan, "list_plans", NO_PARAMS, |selector| {
            async move { unscoped.find(&selector, QuerySpec::<Plan>::new().global()).await }
        })
        .await
        .map(Json)
        .map_err(|e| state.reject(&e))
}

async fn create_plan(
    State(state): State<AppState>,
    RequestContext(ctx): RequestContext,
    Json(fields): Json<FieldMap>,
) -> ApiResult<(StatusCode, Json<Record>)> {
    let record = state
        .scoped
        .create_global::<Plan>(&ctx, CreateSpec::new(fields))
        .await
        .map_err(|e| state.reject(&e))?;

    // Every tenant's copy of the catalog goes stale
    state.cache.spawn_invalidation(vec![Tag::catalog::<Plan>()]);

    Ok((StatusCode::CREATED, Json(record)))
}

async fn list_tasks(
    State(state): State<AppState>,
    RequestContext(ctx): RequestContext,
    Query(filter): Query<TaskFilter>,
) -> ApiResult<Json<Vec<Record>>> {
    let params = filter.key_params();
    let unscoped = state.unscoped.clone();

    state
        .cache
        .cached_resource(&ctx, EntityKind::Task, "list_tasks", &params, |selector| {
            async move {
                let query = filter.bound_query(selector.require_tenant()?);
                unscoped.find(&selector, query).await
            }
        })
        .await
        .map(Json)
        .map_err(|e| state.reject(&e))
}

async fn create_task(
    State(state): State<AppState>,
    RequestContext(ctx): RequestContext,
    Json(fields): Json<FieldMap>,
) -> ApiResult<(StatusCode, Json<Record>)> {
    let record = state
        .scoped
        .create::<Task>(&ctx, CreateSpec::new(fields))
        .await
        .map_err(|e| state.reject(&e))?;

    if let Some(tenant) = &record.tenant_id {
        state.invalidate_after_write(tenant, EntityKind::Task).await;
    }

    Ok((StatusCode::CREATED, Json(record)))
}

async fn get_task(
    State(state): State<AppState>,
    RequestContext(ctx): RequestContext,
    Path(id): Path<String>,
) -> ApiResult<Json<Record>> {
    state
        .scoped
        .get::<Task>(&ctx, RecordId::new(id))
        .await
        .map(Json)
        .map_err(|e| state.reject(&e))
}

async fn update_task(
    State(state): State<AppState>,
    RequestContext(ctx): RequestContext,
    Path(id): Path<String>,
    Json(changes): Json<FieldMap>,
) -> ApiResult<Json<Record>> {
    let record = state
        .scoped
        .update::<Task>(&ctx, UpdateSpec::new(RecordId::new(id), changes))
        .await
        .map_err(|e| state.reject(&e))?;

    if let Some(tenant) = &record.tenant_id {
        state.invalidate_after_write(tenant, EntityKind::Task).await;
    }

    Ok(Json(record))
}

async fn delete_task(
    State(state): State<AppState>,
    RequestContext(ctx): RequestContext,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state
        .scoped
        .delete::<Task>(&ctx, DeleteSpec::new(RecordId::new(id)))
        .await
        .map_err(|e| state.reject(&e))?;

    if let Some(tenant) = ctx.tenant() {
        state.invalidate_after_write(tenant, EntityKind::Task).await;
    }

    Ok(StatusCode::NO_CONTENT)
}
