// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::ticket::DomainError;
use crate::utils::errors::RepositoryError;
use thiserror::Error;
use uuid::Uuid;

/// 工单服务错误类型
#[derive(Error, Debug)]
pub enum TicketError {
    /// 用户已有活跃工单
    #[error("User already has an active ticket {ticket_number}")]
    DuplicateOpenTicket { ticket_number: String },

    /// 没有可处理该分类的管理员，工单保持 `open`
    #[error("No eligible admin for category {category_id}")]
    NoEligibleAdmin { category_id: Uuid },

    /// 实体不存在
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: Uuid },

    /// 无权操作
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// 工单已关闭
    #[error("Ticket {ticket_number} is closed")]
    TicketClosed { ticket_number: String },

    /// 输入校验失败
    #[error("Validation error: {0}")]
    Validation(String),

    /// 存储不可用
    #[error(transparent)]
    Store(#[from] RepositoryError),
}

impl TicketError {
    pub(crate) fn not_found(entity: &'static str, id: Uuid) -> Self {
        TicketError::NotFound { entity, id }
    }
}

impl From<DomainError> for TicketError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::ValidationError(msg) => TicketError::Validation(msg),
            DomainError::InvalidStateTransition { from, to } => TicketError::Validation(format!(
                "ticket cannot move from {} to {}",
                from, to
            )),
        }
    }
}
