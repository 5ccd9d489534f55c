// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// 管理员操作类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityAction {
    Assigned,
    Replied,
    Closed,
    Transferred,
}

impl fmt::Display for ActivityAction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ActivityAction::Assigned => write!(f, "assigned"),
            ActivityAction::Replied => write!(f, "replied"),
            ActivityAction::Closed => write!(f, "closed"),
            ActivityAction::Transferred => write!(f, "transferred"),
        }
    }
}

impl FromStr for ActivityAction {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "assigned" => Ok(ActivityAction::Assigned),
            "replied" => Ok(ActivityAction::Replied),
            "closed" => Ok(ActivityAction::Closed),
            "transferred" => Ok(ActivityAction::Transferred),
            _ => Err(()),
        }
    }
}

/// 操作日志条目（只追加）
///
/// `admin_id` 为空表示系统操作，例如过期自动关闭。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityLogEntry {
    pub id: Uuid,
    pub admin_id: Option<Uuid>,
    pub ticket_id: Uuid,
    pub action: ActivityAction,
    pub created_at: DateTime<Utc>,
}

impl ActivityLogEntry {
    pub fn new(
        admin_id: Option<Uuid>,
        ticket_id: Uuid,
        action: ActivityAction,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            admin_id,
            ticket_id,
            action,
            created_at,
        }
    }
}

/// 管理员在时间区间内的操作统计
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivitySummary {
    pub admin_id: Uuid,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub assigned: u64,
    pub replied: u64,
    pub closed: u64,
    pub transferred: u64,
}

impl ActivitySummary {
    pub fn record(&mut self, action: ActivityAction, count: u64) {
        match action {
            ActivityAction::Assigned => self.assigned += count,
            ActivityAction::Replied => self.replied += count,
            ActivityAction::Closed => self.closed += count,
            ActivityAction::Transferred => self.transferred += count,
        }
    }

    pub fn total(&self) -> u64 {
        self.assigned + self.replied + self.closed + self.transferred
    }
}
