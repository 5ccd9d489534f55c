// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use axum::{
    extract::{Extension, Json, Path},
    http::StatusCode,
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::{
    application::dto::{
        ticket_request::{
            AssignTicketRequestDto, CloseTicketRequestDto, CreateTicketRequestDto,
            MarkReadRequestDto, RecordMessageRequestDto,
        },
        ticket_response::{ApiResponse, AssignmentResponseDto, SweepResponseDto},
    },
    domain::services::ticket_service::TicketService,
    presentation::errors::AppError,
    workers::expiration_worker::ExpirationWorker,
};

/// 创建工单并尝试自动分配
pub async fn create_ticket(
    Extension(service): Extension<Arc<TicketService>>,
    Json(payload): Json<CreateTicketRequestDto>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let created = service.create_ticket(payload.into()).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(created))))
}

/// 查询工单及其消息
pub async fn get_ticket(
    Extension(service): Extension<Arc<TicketService>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let details = service.get_ticket(id).await?;
    Ok(Json(ApiResponse::ok(details)))
}

/// 分配或转派工单，请求体为空时自动分配
pub async fn assign_ticket(
    Extension(service): Extension<Arc<TicketService>>,
    Path(id): Path<Uuid>,
    payload: Option<Json<AssignTicketRequestDto>>,
) -> Result<impl IntoResponse, AppError> {
    let admin_id = payload.and_then(|Json(body)| body.admin_id);

    let assignment = service.assign_admin(id, admin_id).await?;
    Ok(Json(ApiResponse::ok(AssignmentResponseDto::from(assignment))))
}

pub async fn record_message(
    Extension(service): Extension<Arc<TicketService>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<RecordMessageRequestDto>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let message = service
        .record_message(
            id,
            payload.sender,
            payload.content_type,
            payload.content,
            payload.media_ref,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(message))))
}

pub async fn close_ticket(
    Extension(service): Extension<Arc<TicketService>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CloseTicketRequestDto>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let ticket = service
        .close_ticket(id, payload.closed_by, &payload.reason)
        .await?;
    Ok(Json(ApiResponse::ok(ticket)))
}

pub async fn mark_read(
    Extension(service): Extension<Arc<TicketService>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<MarkReadRequestDto>,
) -> Result<impl IntoResponse, AppError> {
    let ticket = service.mark_read(id, payload.admin_id).await?;
    Ok(Json(ApiResponse::ok(ticket)))
}

/// 立即执行一次过期扫描
pub async fn sweep_expired(
    Extension(sweeper): Extension<Arc<ExpirationWorker>>,
) -> Result<impl IntoResponse, AppError> {
    let closed = sweeper.sweep_expired().await?;
    info!(closed, "Manual sweep finished");
    Ok(Json(ApiResponse::ok(SweepResponseDto { closed })))
}
