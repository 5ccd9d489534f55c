// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum::{
    extract::{Extension, Json, Path, Query},
    response::IntoResponse,
};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::{
    application::dto::{
        ticket_request::ActivityQueryDto,
        ticket_response::{ActivityResponseDto, ApiResponse},
    },
    domain::services::ticket_service::TicketService,
    presentation::errors::AppError,
};

/// 管理员最早的未答复工单，没有时返回 `null`
pub async fn next_ticket(
    Extension(service): Extension<Arc<TicketService>>,
    Path(admin_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let ticket = service.next_ticket(admin_id).await?;
    Ok(Json(ApiResponse::ok(ticket)))
}

/// 管理员在区间内的操作统计与明细
pub async fn activity(
    Extension(service): Extension<Arc<TicketService>>,
    Path(admin_id): Path<Uuid>,
    Query(query): Query<ActivityQueryDto>,
) -> Result<impl IntoResponse, AppError> {
    query.validate()?;

    let range = query.range();
    let summary = service.activity_summary(admin_id, range).await?;
    let entries = service.activity_log(admin_id, range).await?;
    Ok(Json(ApiResponse::ok(ActivityResponseDto { summary, entries })))
}

/// 区间内的全部操作日志，包含系统关闭
pub async fn activity_log(
    Extension(service): Extension<Arc<TicketService>>,
    Query(query): Query<ActivityQueryDto>,
) -> Result<impl IntoResponse, AppError> {
    query.validate()?;

    let entries = service.activity_in_range(query.range()).await?;
    Ok(Json(ApiResponse::ok(entries)))
}
