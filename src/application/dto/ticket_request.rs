// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::message::{ContentType, Sender};
use crate::domain::models::ticket::Priority;
use crate::domain::repositories::activity_log_repository::TimeRange;
use crate::domain::services::ticket_service::NewTicket;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// 创建工单请求DTO
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct CreateTicketRequestDto {
    /// 提交工单的用户
    pub user_id: Uuid,
    /// 工单分类
    pub category_id: Uuid,
    /// 标题，省略时由描述推导
    #[validate(length(max = 200))]
    pub title: Option<String>,
    /// 问题描述（首条消息内容）
    #[validate(length(max = 4096))]
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub priority: Priority,
    /// 首条消息类型
    #[serde(default)]
    pub content_type: ContentType,
    /// 媒体句柄
    #[validate(length(min = 1, max = 512))]
    pub media_ref: Option<String>,
}

impl From<CreateTicketRequestDto> for NewTicket {
    fn from(dto: CreateTicketRequestDto) -> Self {
        Self {
            user_id: dto.user_id,
            category_id: dto.category_id,
            title: dto.title,
            description: dto.description,
            priority: dto.priority,
            content_type: dto.content_type,
            media_ref: dto.media_ref,
        }
    }
}

/// 分配请求DTO，`admin_id` 为空时自动分配
#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
pub struct AssignTicketRequestDto {
    pub admin_id: Option<Uuid>,
}

/// 记录消息请求DTO
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct RecordMessageRequestDto {
    /// `{"kind": "user" | "admin", "id": "<uuid>"}`
    pub sender: Sender,
    #[serde(default)]
    pub content_type: ContentType,
    #[validate(length(max = 4096))]
    pub content: Option<String>,
    #[validate(length(min = 1, max = 512))]
    pub media_ref: Option<String>,
}

/// 关闭工单请求DTO
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct CloseTicketRequestDto {
    /// 执行关闭的管理员，为空表示系统或用户关闭
    pub closed_by: Option<Uuid>,
    #[validate(length(min = 1, max = 500))]
    pub reason: String,
}

/// 标记已读请求DTO
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct MarkReadRequestDto {
    pub admin_id: Uuid,
}

/// 操作日志查询参数
#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
#[validate(schema(function = "validate_time_range"))]
pub struct ActivityQueryDto {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl ActivityQueryDto {
    pub fn range(&self) -> TimeRange {
        TimeRange::new(self.from, self.to)
    }
}

fn validate_time_range(query: &ActivityQueryDto) -> Result<(), ValidationError> {
    match (query.from, query.to) {
        (Some(from), Some(to)) if from > to => Err(ValidationError::new("from_after_to")),
        _ => Ok(()),
    }
}
