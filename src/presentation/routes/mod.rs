// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::services::ticket_service::TicketService;
use crate::presentation::handlers::{admin_handler, ticket_handler};
use crate::presentation::middleware::auth_middleware::{auth_middleware, AuthState};
use crate::workers::expiration_worker::ExpirationWorker;
use axum::{
    middleware,
    routing::{get, post},
    Extension, Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// 创建应用路由
///
/// # 参数
///
/// * `service` - 工单服务
/// * `sweeper` - 过期扫描器，供手动触发扫描
/// * `api_token` - 受保护接口的访问令牌
///
/// # 返回值
///
/// 返回配置好的路由
pub fn routes(
    service: Arc<TicketService>,
    sweeper: Arc<ExpirationWorker>,
    api_token: impl Into<Arc<str>>,
) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health_check))
        .route("/v1/version", get(version));

    let protected_routes = Router::new()
        .route("/v1/tickets", post(ticket_handler::create_ticket))
        .route("/v1/tickets/sweep", post(ticket_handler::sweep_expired))
        .route("/v1/tickets/{id}", get(ticket_handler::get_ticket))
        .route("/v1/tickets/{id}/assign", post(ticket_handler::assign_ticket))
        .route(
            "/v1/tickets/{id}/messages",
            post(ticket_handler::record_message),
        )
        .route("/v1/tickets/{id}/close", post(ticket_handler::close_ticket))
        .route("/v1/tickets/{id}/read", post(ticket_handler::mark_read))
        .route(
            "/v1/admins/{id}/next-ticket",
            get(admin_handler::next_ticket),
        )
        .route("/v1/admins/{id}/activity", get(admin_handler::activity))
        .route("/v1/activity", get(admin_handler::activity_log))
        .layer(middleware::from_fn_with_state(
            AuthState::new(api_token),
            auth_middleware,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(Extension(service))
        .layer(Extension(sweeper))
        .layer(TraceLayer::new_for_http())
}

/// 健康检查端点
pub async fn health_check() -> &'static str {
    "OK"
}

/// 版本信息端点
pub async fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
