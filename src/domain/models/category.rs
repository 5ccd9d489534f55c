// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 工单分类
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: Uuid,
    pub name_uz: String,
    pub name_ru: String,
    pub name_en: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub display_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Category {
    pub fn new(name_uz: &str, name_ru: &str, name_en: &str) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name_uz: name_uz.to_string(),
            name_ru: name_ru.to_string(),
            name_en: name_en.to_string(),
            description: None,
            is_active: true,
            display_order: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// 按语言取名称，未知语言回退到乌兹别克语
    pub fn name(&self, language: &str) -> &str {
        match language {
            "ru" => &self.name_ru,
            "en" => &self.name_en,
            _ => &self.name_uz,
        }
    }
}

/// 管理员可处理的分类（多对多）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminCategory {
    pub id: Uuid,
    pub admin_id: Uuid,
    pub category_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl AdminCategory {
    pub fn new(admin_id: Uuid, category_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            admin_id,
            category_id,
            created_at: Utc::now(),
        }
    }
}
