// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::activity_log::ActivityAction;
use crate::domain::models::message::Message;
use crate::domain::models::ticket::Ticket;
use crate::utils::errors::RepositoryError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use uuid::Uuid;

/// 一次条件分配写入
///
/// 仅当工单仍处于活跃状态且当前负责人等于 `expected_admin_id` 时生效，
/// 工单更新、管理员 `last_assigned_at` 更新与日志追加在同一事务内完成。
#[derive(Debug, Clone)]
pub struct AssignmentWrite {
    pub ticket_id: Uuid,
    pub admin_id: Uuid,
    /// 期望的当前负责人，`None` 表示工单必须尚未分配
    pub expected_admin_id: Option<Uuid>,
    /// `assigned` 或 `transferred`
    pub action: ActivityAction,
    pub at: DateTime<Utc>,
}

/// 工单仓库特质
///
/// 多行写入（分配、答复、关闭）均为原子操作；返回 `None` / `false`
/// 表示条件未满足，没有任何写入发生。
#[async_trait]
pub trait TicketRepository: Send + Sync {
    /// 创建工单及其首条消息
    ///
    /// 编号冲突返回 `Conflict(TICKET_NUMBER_CONFLICT)`，
    /// 用户已有活跃工单返回 `Conflict(ACTIVE_TICKET_CONFLICT)`。
    async fn create(&self, ticket: &Ticket, opening: &Message) -> Result<Ticket, RepositoryError>;

    /// 根据ID查找工单
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Ticket>, RepositoryError>;

    /// 查找用户当前的活跃工单
    async fn find_active_by_user(&self, user_id: Uuid) -> Result<Option<Ticket>, RepositoryError>;

    /// 单次分组聚合统计各管理员的活跃工单数；没有工单的管理员不出现在结果中
    async fn count_active_by_admins(
        &self,
        admin_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, u64>, RepositoryError>;

    /// 条件分配
    async fn assign(&self, write: &AssignmentWrite) -> Result<Option<Ticket>, RepositoryError>;

    /// 保存管理员消息并将工单置为 `in_progress`，工单已关闭时返回 `None`
    async fn record_admin_reply(
        &self,
        message: &Message,
        at: DateTime<Utc>,
    ) -> Result<Option<Ticket>, RepositoryError>;

    /// 关闭工单并追加 `closed` 日志，工单已关闭时返回 `None`
    async fn close(
        &self,
        ticket_id: Uuid,
        closed_by: Option<Uuid>,
        reason: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<Ticket>, RepositoryError>;

    /// 查找 `updated_at <= threshold` 且无管理员答复的活跃工单
    async fn find_stale(
        &self,
        threshold: DateTime<Utc>,
        limit: u64,
    ) -> Result<Vec<Ticket>, RepositoryError>;

    /// 重新确认无管理员消息后关闭过期工单，系统关闭不记录管理员
    async fn close_if_stale(
        &self,
        ticket_id: Uuid,
        threshold: DateTime<Utc>,
        reason: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, RepositoryError>;

    /// 标记已读，只在首次生效
    async fn mark_read(&self, ticket_id: Uuid, at: DateTime<Utc>) -> Result<bool, RepositoryError>;

    /// 管理员最早的一条尚未答复的活跃工单
    async fn next_unanswered(&self, admin_id: Uuid) -> Result<Option<Ticket>, RepositoryError>;
}
