// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::domain::models::activity_log::{ActivityAction, ActivityLogEntry};
use crate::domain::models::message::{Message, Sender};
use crate::domain::models::ticket::{Ticket, TicketStatus};
use crate::domain::repositories::ticket_repository::{AssignmentWrite, TicketRepository};
use crate::infrastructure::database::entities::{
    admin as admin_entity, message as message_entity, ticket as ticket_entity,
};
use crate::infrastructure::repositories::activity_log_repo_impl::insert_entry;
use crate::infrastructure::repositories::message_repo_impl::admin_message_exists;
use crate::utils::errors::{RepositoryError, ACTIVE_TICKET_CONFLICT, TICKET_NUMBER_CONFLICT};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr,
    EntityTrait, FromQueryResult, QueryFilter, QueryOrder, QuerySelect, Set,
    SqlErr, TransactionTrait,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// 工单仓库实现
///
/// 基于SeaORM实现，所有多行写入都在单个事务中完成，
/// 状态相关的更新均带条件，以 `rows_affected` 判断是否生效。
#[derive(Clone)]
pub struct TicketRepositoryImpl {
    /// 数据库连接
    db: Arc<DatabaseConnection>,
}

impl TicketRepositoryImpl {
    /// 创建新的工单仓库实例
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

impl TryFrom<ticket_entity::Model> for Ticket {
    type Error = RepositoryError;

    fn try_from(model: ticket_entity::Model) -> Result<Self, Self::Error> {
        let status = model.status.parse().map_err(|_| {
            RepositoryError::Corrupted(format!("unknown ticket status '{}'", model.status))
        })?;
        let priority = model.priority.parse().map_err(|_| {
            RepositoryError::Corrupted(format!("unknown priority '{}'", model.priority))
        })?;

        Ok(Self {
            id: model.id,
            ticket_number: model.ticket_number,
            user_id: model.user_id,
            category_id: model.category_id,
            title: model.title,
            description: model.description,
            status,
            priority,
            assigned_admin_id: model.assigned_admin_id,
            closed_by_id: model.closed_by_id,
            close_reason: model.close_reason,
            admin_replied: model.admin_replied,
            is_read: model.is_read,
            read_at: model.read_at.map(|t| t.with_timezone(&Utc)),
            close_at: model.close_at.map(|t| t.with_timezone(&Utc)),
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        })
    }
}

impl From<&Ticket> for ticket_entity::ActiveModel {
    fn from(ticket: &Ticket) -> Self {
        Self {
            id: Set(ticket.id),
            ticket_number: Set(ticket.ticket_number.clone()),
            user_id: Set(ticket.user_id),
            category_id: Set(ticket.category_id),
            title: Set(ticket.title.clone()),
            description: Set(ticket.description.clone()),
            status: Set(ticket.status.to_string()),
            priority: Set(ticket.priority.to_string()),
            assigned_admin_id: Set(ticket.assigned_admin_id),
            closed_by_id: Set(ticket.closed_by_id),
            close_reason: Set(ticket.close_reason.clone()),
            admin_replied: Set(ticket.admin_replied),
            is_read: Set(ticket.is_read),
            read_at: Set(ticket.read_at.map(Into::into)),
            close_at: Set(ticket.close_at.map(Into::into)),
            created_at: Set(ticket.created_at.into()),
            updated_at: Set(ticket.updated_at.into()),
        }
    }
}

/// 将插入时的唯一约束冲突映射为仓库冲突
fn classify_insert_error(err: DbErr) -> RepositoryError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(detail)) => {
            if detail.contains("ticket_number") {
                RepositoryError::Conflict(TICKET_NUMBER_CONFLICT.to_string())
            } else if detail.contains("user_id") || detail.contains("one_active") {
                RepositoryError::Conflict(ACTIVE_TICKET_CONFLICT.to_string())
            } else {
                RepositoryError::Database(err)
            }
        }
        _ => RepositoryError::Database(err),
    }
}

fn db_time(at: DateTime<Utc>) -> DateTimeWithTimeZone {
    at.into()
}

async fn reload<C: ConnectionTrait>(conn: &C, id: Uuid) -> Result<Option<Ticket>, RepositoryError> {
    ticket_entity::Entity::find_by_id(id)
        .one(conn)
        .await?
        .map(Ticket::try_from)
        .transpose()
}

#[derive(Debug, FromQueryResult)]
struct AdminWorkloadRow {
    assigned_admin_id: Uuid,
    workload: i64,
}

#[async_trait]
impl TicketRepository for TicketRepositoryImpl {
    async fn create(&self, ticket: &Ticket, opening: &Message) -> Result<Ticket, RepositoryError> {
        let txn = self.db.begin().await?;

        let model: ticket_entity::ActiveModel = ticket.into();
        let inserted = match model.insert(&txn).await {
            Ok(inserted) => inserted,
            Err(err) => {
                txn.rollback().await?;
                return Err(classify_insert_error(err));
            }
        };

        let message: message_entity::ActiveModel = opening.into();
        message.insert(&txn).await?;

        txn.commit().await?;
        Ticket::try_from(inserted)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Ticket>, RepositoryError> {
        reload(self.db.as_ref(), id).await
    }

    async fn find_active_by_user(&self, user_id: Uuid) -> Result<Option<Ticket>, RepositoryError> {
        ticket_entity::Entity::find()
            .filter(ticket_entity::Column::UserId.eq(user_id))
            .filter(ticket_entity::Column::Status.is_in(TicketStatus::active_values()))
            .order_by_desc(ticket_entity::Column::CreatedAt)
            .one(self.db.as_ref())
            .await?
            .map(Ticket::try_from)
            .transpose()
    }

    async fn count_active_by_admins(
        &self,
        admin_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, u64>, RepositoryError> {
        if admin_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = ticket_entity::Entity::find()
            .select_only()
            .column(ticket_entity::Column::AssignedAdminId)
            .column_as(ticket_entity::Column::Id.count(), "workload")
            .filter(ticket_entity::Column::AssignedAdminId.is_in(admin_ids.to_vec()))
            .filter(ticket_entity::Column::Status.is_in(TicketStatus::active_values()))
            .group_by(ticket_entity::Column::AssignedAdminId)
            .into_model::<AdminWorkloadRow>()
            .all(self.db.as_ref())
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| (row.assigned_admin_id, row.workload.max(0) as u64))
            .collect())
    }

    async fn assign(&self, write: &AssignmentWrite) -> Result<Option<Ticket>, RepositoryError> {
        let at = db_time(write.at);
        let txn = self.db.begin().await?;

        let owner_condition = match write.expected_admin_id {
            Some(current) => ticket_entity::Column::AssignedAdminId.eq(current),
            None => ticket_entity::Column::AssignedAdminId.is_null(),
        };

        let result = ticket_entity::Entity::update_many()
            .col_expr(
                ticket_entity::Column::AssignedAdminId,
                Expr::value(write.admin_id),
            )
            .col_expr(
                ticket_entity::Column::Status,
                Expr::value(TicketStatus::WaitingAdmin.to_string()),
            )
            .col_expr(ticket_entity::Column::UpdatedAt, Expr::value(at))
            .filter(ticket_entity::Column::Id.eq(write.ticket_id))
            .filter(ticket_entity::Column::Status.is_in(TicketStatus::active_values()))
            .filter(owner_condition)
            .exec(&txn)
            .await?;

        if result.rows_affected == 0 {
            debug!(ticket_id = %write.ticket_id, "Conditional assignment lost the race");
            txn.rollback().await?;
            return Ok(None);
        }

        admin_entity::Entity::update_many()
            .col_expr(admin_entity::Column::LastAssignedAt, Expr::value(at))
            .col_expr(admin_entity::Column::UpdatedAt, Expr::value(at))
            .filter(admin_entity::Column::Id.eq(write.admin_id))
            .exec(&txn)
            .await?;

        let entry = ActivityLogEntry::new(
            Some(write.admin_id),
            write.ticket_id,
            write.action,
            write.at,
        );
        insert_entry(&txn, &entry).await?;

        let ticket = reload(&txn, write.ticket_id).await?;
        txn.commit().await?;
        Ok(ticket)
    }

    async fn record_admin_reply(
        &self,
        message: &Message,
        at: DateTime<Utc>,
    ) -> Result<Option<Ticket>, RepositoryError> {
        let Sender::Admin(admin_id) = message.sender else {
            return Err(RepositoryError::InvalidParameter(
                "admin reply must be sent by an admin".to_string(),
            ));
        };

        let txn = self.db.begin().await?;

        let result = ticket_entity::Entity::update_many()
            .col_expr(
                ticket_entity::Column::Status,
                Expr::value(TicketStatus::InProgress.to_string()),
            )
            .col_expr(ticket_entity::Column::AdminReplied, Expr::value(true))
            .col_expr(ticket_entity::Column::UpdatedAt, Expr::value(db_time(at)))
            .filter(ticket_entity::Column::Id.eq(message.ticket_id))
            .filter(ticket_entity::Column::Status.ne(TicketStatus::Closed.to_string()))
            .exec(&txn)
            .await?;

        if result.rows_affected == 0 {
            txn.rollback().await?;
            return Ok(None);
        }

        let model: message_entity::ActiveModel = message.into();
        model.insert(&txn).await?;

        let entry =
            ActivityLogEntry::new(Some(admin_id), message.ticket_id, ActivityAction::Replied, at);
        insert_entry(&txn, &entry).await?;

        let ticket = reload(&txn, message.ticket_id).await?;
        txn.commit().await?;
        Ok(ticket)
    }

    async fn close(
        &self,
        ticket_id: Uuid,
        closed_by: Option<Uuid>,
        reason: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<Ticket>, RepositoryError> {
        let stamp = db_time(at);
        let txn = self.db.begin().await?;

        let result = ticket_entity::Entity::update_many()
            .col_expr(
                ticket_entity::Column::Status,
                Expr::value(TicketStatus::Closed.to_string()),
            )
            .col_expr(ticket_entity::Column::ClosedById, Expr::value(closed_by))
            .col_expr(
                ticket_entity::Column::CloseReason,
                Expr::value(reason.to_string()),
            )
            .col_expr(ticket_entity::Column::CloseAt, Expr::value(stamp))
            .col_expr(ticket_entity::Column::UpdatedAt, Expr::value(stamp))
            .filter(ticket_entity::Column::Id.eq(ticket_id))
            .filter(ticket_entity::Column::Status.ne(TicketStatus::Closed.to_string()))
            .exec(&txn)
            .await?;

        if result.rows_affected == 0 {
            txn.rollback().await?;
            return Ok(None);
        }

        let entry = ActivityLogEntry::new(closed_by, ticket_id, ActivityAction::Closed, at);
        insert_entry(&txn, &entry).await?;

        let ticket = reload(&txn, ticket_id).await?;
        txn.commit().await?;
        Ok(ticket)
    }

    async fn find_stale(
        &self,
        threshold: DateTime<Utc>,
        limit: u64,
    ) -> Result<Vec<Ticket>, RepositoryError> {
        ticket_entity::Entity::find()
            .filter(ticket_entity::Column::Status.is_in(TicketStatus::active_values()))
            .filter(ticket_entity::Column::AdminReplied.eq(false))
            .filter(ticket_entity::Column::UpdatedAt.lte(db_time(threshold)))
            .order_by_asc(ticket_entity::Column::UpdatedAt)
            .limit(limit)
            .all(self.db.as_ref())
            .await?
            .into_iter()
            .map(Ticket::try_from)
            .collect()
    }

    async fn close_if_stale(
        &self,
        ticket_id: Uuid,
        threshold: DateTime<Utc>,
        reason: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        let stamp = db_time(at);
        let txn = self.db.begin().await?;

        // Fresh read inside the closing transaction
        if admin_message_exists(&txn, ticket_id).await? {
            txn.rollback().await?;
            return Ok(false);
        }

        let result = ticket_entity::Entity::update_many()
            .col_expr(
                ticket_entity::Column::Status,
                Expr::value(TicketStatus::Closed.to_string()),
            )
            .col_expr(ticket_entity::Column::ClosedById, Expr::value(Option::<Uuid>::None))
            .col_expr(
                ticket_entity::Column::CloseReason,
                Expr::value(reason.to_string()),
            )
            .col_expr(ticket_entity::Column::CloseAt, Expr::value(stamp))
            .col_expr(ticket_entity::Column::UpdatedAt, Expr::value(stamp))
            .filter(ticket_entity::Column::Id.eq(ticket_id))
            .filter(ticket_entity::Column::Status.is_in(TicketStatus::active_values()))
            .filter(ticket_entity::Column::AdminReplied.eq(false))
            .filter(ticket_entity::Column::UpdatedAt.lte(db_time(threshold)))
            .exec(&txn)
            .await?;

        if result.rows_affected == 0 {
            txn.rollback().await?;
            return Ok(false);
        }

        let entry = ActivityLogEntry::new(None, ticket_id, ActivityAction::Closed, at);
        insert_entry(&txn, &entry).await?;

        txn.commit().await?;
        Ok(true)
    }

    async fn mark_read(&self, ticket_id: Uuid, at: DateTime<Utc>) -> Result<bool, RepositoryError> {
        let result = ticket_entity::Entity::update_many()
            .col_expr(ticket_entity::Column::IsRead, Expr::value(true))
            .col_expr(ticket_entity::Column::ReadAt, Expr::value(db_time(at)))
            .filter(ticket_entity::Column::Id.eq(ticket_id))
            .filter(ticket_entity::Column::IsRead.eq(false))
            .exec(self.db.as_ref())
            .await?;

        Ok(result.rows_affected > 0)
    }

    async fn next_unanswered(&self, admin_id: Uuid) -> Result<Option<Ticket>, RepositoryError> {
        ticket_entity::Entity::find()
            .filter(ticket_entity::Column::AssignedAdminId.eq(admin_id))
            .filter(ticket_entity::Column::Status.is_in(TicketStatus::active_values()))
            .filter(ticket_entity::Column::AdminReplied.eq(false))
            .order_by_asc(ticket_entity::Column::CreatedAt)
            .one(self.db.as_ref())
            .await?
            .map(Ticket::try_from)
            .transpose()
    }
}
