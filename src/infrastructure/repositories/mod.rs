// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 仓库实现模块
///
/// 提供领域仓库接口的SeaORM实现
pub mod activity_log_repo_impl;
pub mod admin_repo_impl;
pub mod category_repo_impl;
pub mod message_repo_impl;
pub mod ticket_repo_impl;
pub mod user_repo_impl;

use crate::domain::repositories::Repositories;
use activity_log_repo_impl::ActivityLogRepositoryImpl;
use admin_repo_impl::AdminRepositoryImpl;
use category_repo_impl::CategoryRepositoryImpl;
use message_repo_impl::MessageRepositoryImpl;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use ticket_repo_impl::TicketRepositoryImpl;
use user_repo_impl::UserRepositoryImpl;

/// 基于同一连接构建全部仓库
pub fn sea_orm_repositories(db: Arc<DatabaseConnection>) -> Repositories {
    Repositories {
        tickets: Arc::new(TicketRepositoryImpl::new(db.clone())),
        messages: Arc::new(MessageRepositoryImpl::new(db.clone())),
        admins: Arc::new(AdminRepositoryImpl::new(db.clone())),
        users: Arc::new(UserRepositoryImpl::new(db.clone())),
        categories: Arc::new(CategoryRepositoryImpl::new(db.clone())),
        activity_logs: Arc::new(ActivityLogRepositoryImpl::new(db)),
    }
}
