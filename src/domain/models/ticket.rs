// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::message::ContentType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// 标题最大字符数，超出部分以 `...` 截断
pub const TITLE_MAX_CHARS: usize = 50;

/// 工单实体
///
/// 表示一条用户提交的支持请求，在分配、答复、关闭的生命周期中流转。
/// 同一用户在任意时刻最多拥有一条活跃工单（open / waiting_admin / in_progress）。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    /// 工单唯一标识符
    pub id: Uuid,
    /// 对外可见的工单编号
    pub ticket_number: String,
    /// 提交工单的用户
    pub user_id: Uuid,
    /// 所属分类
    pub category_id: Uuid,
    /// 标题
    pub title: String,
    /// 问题描述
    pub description: String,
    /// 当前状态
    pub status: TicketStatus,
    /// 优先级
    pub priority: Priority,
    /// 负责的管理员
    pub assigned_admin_id: Option<Uuid>,
    /// 执行关闭的管理员，系统关闭时为空
    pub closed_by_id: Option<Uuid>,
    /// 关闭原因
    pub close_reason: Option<String>,
    /// 是否已有管理员答复
    pub admin_replied: bool,
    /// 是否已读
    pub is_read: bool,
    /// 已读时间
    pub read_at: Option<DateTime<Utc>>,
    /// 关闭时间
    pub close_at: Option<DateTime<Utc>>,
    /// 创建时间
    pub created_at: DateTime<Utc>,
    /// 更新时间
    pub updated_at: DateTime<Utc>,
}

/// 工单状态枚举
///
/// 状态流转：
/// open → waiting_admin → in_progress → closed
///
/// `closed` 为终态，不接受任何后续转换。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    /// 已创建，未分配或刚分配
    #[default]
    Open,
    /// 已分配，等待管理员答复
    WaitingAdmin,
    /// 管理员已至少答复一次
    InProgress,
    WaitingUser,
    Replied,
    Escalated,
    Expired,
    /// 已关闭（终态）
    Closed,
}

impl TicketStatus {
    /// 计入工作量、参与唯一性约束和过期扫描的状态
    pub const ACTIVE: [TicketStatus; 3] = [
        TicketStatus::Open,
        TicketStatus::WaitingAdmin,
        TicketStatus::InProgress,
    ];

    /// 活跃状态的存储值
    pub fn active_values() -> Vec<String> {
        Self::ACTIVE.iter().map(ToString::to_string).collect()
    }

    pub fn is_active(self) -> bool {
        Self::ACTIVE.contains(&self)
    }

    pub fn is_terminal(self) -> bool {
        self == TicketStatus::Closed
    }

    /// 判断状态转换是否合法
    ///
    /// 只有活跃工单可以（重新）分配；答复与关闭接受任何非终态。
    pub fn can_transition_to(self, next: TicketStatus) -> bool {
        use TicketStatus::*;
        match (self, next) {
            (Closed, _) => false,
            (_, Closed) | (_, InProgress) => true,
            (from, WaitingAdmin) => from.is_active(),
            _ => false,
        }
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TicketStatus::Open => write!(f, "open"),
            TicketStatus::WaitingAdmin => write!(f, "waiting_admin"),
            TicketStatus::InProgress => write!(f, "in_progress"),
            TicketStatus::WaitingUser => write!(f, "waiting_user"),
            TicketStatus::Replied => write!(f, "replied"),
            TicketStatus::Escalated => write!(f, "escalated"),
            TicketStatus::Expired => write!(f, "expired"),
            TicketStatus::Closed => write!(f, "closed"),
        }
    }
}

impl FromStr for TicketStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(TicketStatus::Open),
            "waiting_admin" => Ok(TicketStatus::WaitingAdmin),
            "in_progress" => Ok(TicketStatus::InProgress),
            "waiting_user" => Ok(TicketStatus::WaitingUser),
            "replied" => Ok(TicketStatus::Replied),
            "escalated" => Ok(TicketStatus::Escalated),
            "expired" => Ok(TicketStatus::Expired),
            "closed" => Ok(TicketStatus::Closed),
            _ => Err(()),
        }
    }
}

/// 工单优先级
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Priority::Low => write!(f, "low"),
            Priority::Medium => write!(f, "medium"),
            Priority::High => write!(f, "high"),
        }
    }
}

impl FromStr for Priority {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            _ => Err(()),
        }
    }
}

/// 领域错误类型
#[derive(Error, Debug, PartialEq)]
pub enum DomainError {
    /// 无效的状态转换
    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition { from: TicketStatus, to: TicketStatus },

    /// 验证错误
    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl Ticket {
    /// 创建一条新的 `open` 工单
    pub fn new(
        ticket_number: String,
        user_id: Uuid,
        category_id: Uuid,
        title: String,
        description: String,
        priority: Priority,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            ticket_number,
            user_id,
            category_id,
            title,
            description,
            status: TicketStatus::Open,
            priority,
            assigned_admin_id: None,
            closed_by_id: None,
            close_reason: None,
            admin_replied: false,
            is_read: false,
            read_at: None,
            close_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// 由描述推导标题
    ///
    /// 超过 50 个字符时截断并追加 `...`；描述为空时使用 "<类型> sent"。
    pub fn derive_title(description: &str, content_type: ContentType) -> String {
        let trimmed = description.trim();
        if trimmed.is_empty() {
            return format!("{} sent", content_type.label());
        }
        if trimmed.chars().count() > TITLE_MAX_CHARS {
            let head: String = trimmed.chars().take(TITLE_MAX_CHARS).collect();
            format!("{}...", head)
        } else {
            trimmed.to_string()
        }
    }

    pub fn is_closed(&self) -> bool {
        self.status.is_terminal()
    }

    /// 校验到目标状态的转换
    pub fn ensure_transition(&self, next: TicketStatus) -> Result<(), DomainError> {
        if self.status.can_transition_to(next) {
            Ok(())
        } else {
            Err(DomainError::InvalidStateTransition {
                from: self.status,
                to: next,
            })
        }
    }
}
