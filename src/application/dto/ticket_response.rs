// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::activity_log::{ActivityAction, ActivityLogEntry, ActivitySummary};
use crate::domain::models::admin::Admin;
use crate::domain::models::ticket::Ticket;
use crate::domain::services::assignment_service::Assignment;
use serde::Serialize;

/// 统一响应包装
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// 过期扫描结果
#[derive(Debug, Serialize)]
pub struct SweepResponseDto {
    /// 本次关闭的工单数
    pub closed: u64,
}

/// 分配结果DTO
#[derive(Debug, Serialize)]
pub struct AssignmentResponseDto {
    pub ticket: Ticket,
    pub admin: Admin,
    /// 本次写入的操作，工单已归属该管理员时为空
    pub action: Option<ActivityAction>,
}

impl From<Assignment> for AssignmentResponseDto {
    fn from(assignment: Assignment) -> Self {
        Self {
            ticket: assignment.ticket,
            admin: assignment.admin,
            action: assignment.action,
        }
    }
}

/// 管理员操作统计与明细
#[derive(Debug, Serialize)]
pub struct ActivityResponseDto {
    pub summary: ActivitySummary,
    pub entries: Vec<ActivityLogEntry>,
}
