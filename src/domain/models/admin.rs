// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::ticket::Ticket;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// 管理员角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AdminRole {
    #[default]
    Admin,
    SuperAdmin,
}

impl fmt::Display for AdminRole {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AdminRole::Admin => write!(f, "admin"),
            AdminRole::SuperAdmin => write!(f, "super_admin"),
        }
    }
}

impl FromStr for AdminRole {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(AdminRole::Admin),
            "super_admin" => Ok(AdminRole::SuperAdmin),
            _ => Err(()),
        }
    }
}

/// 管理员
///
/// 与用户一一对应；`last_assigned_at` 用于同负载时的轮询公平。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Admin {
    pub id: Uuid,
    pub user_id: Uuid,
    pub role: AdminRole,
    pub is_blocked: bool,
    pub last_assigned_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Admin {
    pub fn new(user_id: Uuid, role: AdminRole) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            role,
            is_blocked: false,
            last_assigned_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_super_admin(&self) -> bool {
        self.role == AdminRole::SuperAdmin
    }

    /// 是否可以对该工单执行管理员操作（答复、关闭、标记已读）
    pub fn can_act_on(&self, ticket: &Ticket) -> bool {
        !self.is_blocked && (self.is_super_admin() || ticket.assigned_admin_id == Some(self.id))
    }
}
