// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::message::Message;
use crate::utils::errors::RepositoryError;
use async_trait::async_trait;
use uuid::Uuid;

/// 消息仓库特质
///
/// 管理员消息经由 `TicketRepository::record_admin_reply` 写入，
/// 这里只负责用户消息与读取。
#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// 保存用户消息
    async fn create(&self, message: &Message) -> Result<Message, RepositoryError>;
    /// 按时间顺序返回工单的所有消息
    async fn find_by_ticket(&self, ticket_id: Uuid) -> Result<Vec<Message>, RepositoryError>;
}
