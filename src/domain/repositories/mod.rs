// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 仓库接口模块
///
/// 该模块定义了领域层的仓库接口，遵循依赖倒置原则。
/// 具体实现由基础设施层提供，领域服务只依赖这些抽象。
///
/// 包含的仓库接口：
/// - 工单仓库（ticket_repository）：工单及其原子状态写入
/// - 消息仓库（message_repository）
/// - 管理员仓库（admin_repository）：含分类资格查询
/// - 用户仓库（user_repository）
/// - 分类仓库（category_repository）
/// - 操作日志仓库（activity_log_repository）：只追加
pub mod activity_log_repository;
pub mod admin_repository;
pub mod category_repository;
pub mod message_repository;
pub mod ticket_repository;
pub mod user_repository;

pub use crate::utils::errors::RepositoryError;

use activity_log_repository::ActivityLogRepository;
use admin_repository::AdminRepository;
use category_repository::CategoryRepository;
use message_repository::MessageRepository;
use std::sync::Arc;
use ticket_repository::TicketRepository;
use user_repository::UserRepository;

/// 注入到服务与工作器中的仓库集合
#[derive(Clone)]
pub struct Repositories {
    pub tickets: Arc<dyn TicketRepository>,
    pub messages: Arc<dyn MessageRepository>,
    pub admins: Arc<dyn AdminRepository>,
    pub users: Arc<dyn UserRepository>,
    pub categories: Arc<dyn CategoryRepository>,
    pub activity_logs: Arc<dyn ActivityLogRepository>,
}
