// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::admin::Admin;
use crate::domain::models::category::AdminCategory;
use crate::utils::errors::RepositoryError;
use async_trait::async_trait;
use uuid::Uuid;

/// 管理员仓库特质
#[async_trait]
pub trait AdminRepository: Send + Sync {
    /// 创建管理员
    async fn create(&self, admin: &Admin) -> Result<Admin, RepositoryError>;
    /// 根据ID查找管理员
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Admin>, RepositoryError>;
    /// 查找负责该分类且未被封禁的管理员
    async fn find_eligible(&self, category_id: Uuid) -> Result<Vec<Admin>, RepositoryError>;
    /// 为管理员添加可处理的分类
    async fn add_category(&self, link: &AdminCategory) -> Result<(), RepositoryError>;
    /// 设置封禁状态
    async fn set_blocked(&self, admin_id: Uuid, blocked: bool) -> Result<(), RepositoryError>;
}
