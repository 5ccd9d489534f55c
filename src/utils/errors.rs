// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use sea_orm::DbErr;
use thiserror::Error;

/// 唯一约束冲突：工单编号重复
pub const TICKET_NUMBER_CONFLICT: &str = "ticket_number";

/// 唯一约束冲突：用户已有活跃工单
pub const ACTIVE_TICKET_CONFLICT: &str = "active_ticket";

/// 仓库层错误类型
///
/// `Database` 对应存储不可用，由触发操作的调用方决定是否重试。
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// 数据库错误
    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    /// 记录未找到
    #[error("Record not found")]
    NotFound,

    /// 唯一约束冲突
    #[error("Conflict on {0}")]
    Conflict(String),

    /// 无效参数
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// 存储中的数据无法映射为领域对象
    #[error("Corrupted record: {0}")]
    Corrupted(String),
}

impl RepositoryError {
    /// 是否为指定键上的冲突
    pub fn is_conflict_on(&self, key: &str) -> bool {
        matches!(self, RepositoryError::Conflict(k) if k == key)
    }
}
