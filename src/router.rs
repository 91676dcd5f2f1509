//! 路由装配：路由表、认证门、CORS、请求追踪与共享状态。

use axum::extract::{DefaultBodyLimit, Extension, connect_info::ConnectInfo};
use axum::http::Request;
use axum::routing::{delete, get, post, put};
use axum::{Router, middleware};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::{Level, info_span};

use crate::auth::{self, AuthConfig};
use crate::files;
use crate::http::{add_security_headers, apply_cors, forwarded_ip, route_not_found};
use crate::records;
use crate::storage::Storage;
use crate::store::Catalog;
use crate::upload;

/// 请求处理共享的状态。
pub struct AppState {
    pub storage: Arc<Storage>,
    pub catalog: Arc<Catalog>,
    pub auth: Arc<AuthConfig>,
    pub max_body_size: usize,
}

/// 构建完整的应用路由。
pub fn build_router(state: AppState) -> Router {
    let body_limit = if state.max_body_size == 0 {
        DefaultBodyLimit::disable()
    } else {
        DefaultBodyLimit::max(state.max_body_size)
    };

    let gated = Router::new()
        .route("/upload", post(upload::upload))
        .route("/update", put(records::update_record))
        .route_layer(middleware::from_fn(auth::require_token));

    Router::new()
        .merge(gated)
        .route("/delete", delete(records::delete_record))
        .route("/images", get(records::list_records))
        .route("/uploads/{name}", get(files::serve_upload))
        .route("/login", post(auth::login))
        .fallback(route_not_found)
        .layer(body_limit)
        .layer(middleware::from_fn(add_security_headers))
        .layer(middleware::from_fn(apply_cors))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<_>| {
                    let connect_ip = request
                        .extensions()
                        .get::<ConnectInfo<SocketAddr>>()
                        .map(|ConnectInfo(addr)| addr.ip().to_string());
                    let client_ip = forwarded_ip(request.headers())
                        .or(connect_ip)
                        .unwrap_or_else(|| "unknown".to_string());

                    info_span!(
                        env!("CARGO_CRATE_NAME"),
                        client_ip,
                        method = ?request.method(),
                        path = ?request.uri().path(),
                    )
                })
                .on_request(DefaultOnRequest::new().level(Level::DEBUG))
                .on_response(DefaultOnResponse::new().level(Level::DEBUG)),
        )
        .layer(Extension(state.storage))
        .layer(Extension(state.catalog))
        .layer(Extension(state.auth))
}
