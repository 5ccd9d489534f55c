// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 终端用户（Telegram 账号）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    /// 通知投递的目标 chat id
    pub telegram_id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub is_blocked: bool,
    /// 界面语言 (uz, ru, en)
    pub language: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(telegram_id: i64, first_name: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            telegram_id,
            username: None,
            first_name,
            last_name: None,
            is_blocked: false,
            language: "uz".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    /// 展示名称：姓名优先，其次用户名，最后是 Telegram ID
    pub fn display_name(&self) -> String {
        let full = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if !full.is_empty() {
            return full;
        }
        match &self.username {
            Some(username) if !username.is_empty() => format!("@{}", username),
            _ => self.telegram_id.to_string(),
        }
    }
}
