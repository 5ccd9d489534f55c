// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::message::{Message, Sender};
use crate::domain::repositories::message_repository::MessageRepository;
use crate::infrastructure::database::entities::message as message_entity;
use crate::utils::errors::RepositoryError;
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use std::sync::Arc;
use uuid::Uuid;

/// 消息仓库实现
#[derive(Clone)]
pub struct MessageRepositoryImpl {
    db: Arc<DatabaseConnection>,
}

impl MessageRepositoryImpl {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

impl TryFrom<message_entity::Model> for Message {
    type Error = RepositoryError;

    fn try_from(model: message_entity::Model) -> Result<Self, Self::Error> {
        let sender = Sender::from_columns(model.sender_user_id, model.sender_admin_id)
            .map_err(|e| RepositoryError::Corrupted(e.to_string()))?;
        let content_type = model.content_type.parse().map_err(|_| {
            RepositoryError::Corrupted(format!("unknown content type '{}'", model.content_type))
        })?;

        Ok(Self {
            id: model.id,
            ticket_id: model.ticket_id,
            sender,
            content_type,
            content: model.content,
            media_ref: model.media_ref,
            timestamp: model.timestamp.with_timezone(&Utc),
        })
    }
}

impl From<&Message> for message_entity::ActiveModel {
    fn from(message: &Message) -> Self {
        let (sender_user_id, sender_admin_id) = message.sender.into_columns();
        Self {
            id: Set(message.id),
            ticket_id: Set(message.ticket_id),
            sender_user_id: Set(sender_user_id),
            sender_admin_id: Set(sender_admin_id),
            content_type: Set(message.content_type.to_string()),
            content: Set(message.content.clone()),
            media_ref: Set(message.media_ref.clone()),
            timestamp: Set(message.timestamp.into()),
        }
    }
}

/// 工单是否存在管理员发送的消息
///
/// 接受任意连接，过期扫描在关闭事务内调用以读取最新状态。
pub async fn admin_message_exists<C>(conn: &C, ticket_id: Uuid) -> Result<bool, RepositoryError>
where
    C: ConnectionTrait,
{
    let count = message_entity::Entity::find()
        .filter(message_entity::Column::TicketId.eq(ticket_id))
        .filter(message_entity::Column::SenderAdminId.is_not_null())
        .count(conn)
        .await?;
    Ok(count > 0)
}

#[async_trait]
impl MessageRepository for MessageRepositoryImpl {
    async fn create(&self, message: &Message) -> Result<Message, RepositoryError> {
        if message.sender.is_admin() {
            return Err(RepositoryError::InvalidParameter(
                "admin messages are written together with the ticket update".to_string(),
            ));
        }
        let model: message_entity::ActiveModel = message.into();
        let inserted = model.insert(self.db.as_ref()).await?;
        Message::try_from(inserted)
    }

    async fn find_by_ticket(&self, ticket_id: Uuid) -> Result<Vec<Message>, RepositoryError> {
        message_entity::Entity::find()
            .filter(message_entity::Column::TicketId.eq(ticket_id))
            .order_by_asc(message_entity::Column::Timestamp)
            .all(self.db.as_ref())
            .await?
            .into_iter()
            .map(Message::try_from)
            .collect()
    }
}
