// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::activity_log::{ActivityLogEntry, ActivitySummary};
use crate::utils::errors::RepositoryError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// 时间区间，两端均为闭区间，缺省表示不限
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TimeRange {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl TimeRange {
    pub fn new(from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> Self {
        Self { from, to }
    }
}

/// 操作日志仓库特质
///
/// 只读：日志由工单仓库在状态写入的同一事务中追加，不提供更新或删除。
#[async_trait]
pub trait ActivityLogRepository: Send + Sync {
    /// 按管理员查询，按时间升序
    async fn find_by_admin(
        &self,
        admin_id: Uuid,
        range: TimeRange,
    ) -> Result<Vec<ActivityLogEntry>, RepositoryError>;
    /// 按工单查询，按时间升序
    async fn find_by_ticket(&self, ticket_id: Uuid)
        -> Result<Vec<ActivityLogEntry>, RepositoryError>;
    /// 按时间区间查询
    async fn find_in_range(&self, range: TimeRange)
        -> Result<Vec<ActivityLogEntry>, RepositoryError>;
    /// 单次分组统计管理员各类操作次数
    async fn summarize(
        &self,
        admin_id: Uuid,
        range: TimeRange,
    ) -> Result<ActivitySummary, RepositoryError>;
}
