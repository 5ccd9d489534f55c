// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::activity_log::{ActivityAction, ActivityLogEntry, ActivitySummary};
use crate::domain::repositories::activity_log_repository::{ActivityLogRepository, TimeRange};
use crate::infrastructure::database::entities::admin_activity_log as log_entity;
use crate::utils::errors::RepositoryError;
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    FromQueryResult, QueryFilter, QueryOrder, QuerySelect, Select, Set,
};
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

/// 操作日志仓库实现
#[derive(Clone)]
pub struct ActivityLogRepositoryImpl {
    db: Arc<DatabaseConnection>,
}

impl ActivityLogRepositoryImpl {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

impl TryFrom<log_entity::Model> for ActivityLogEntry {
    type Error = RepositoryError;

    fn try_from(model: log_entity::Model) -> Result<Self, Self::Error> {
        let action = model.action.parse().map_err(|_| {
            RepositoryError::Corrupted(format!("unknown activity action '{}'", model.action))
        })?;
        Ok(Self {
            id: model.id,
            admin_id: model.admin_id,
            ticket_id: model.ticket_id,
            action,
            created_at: model.created_at.with_timezone(&Utc),
        })
    }
}

impl From<&ActivityLogEntry> for log_entity::ActiveModel {
    fn from(entry: &ActivityLogEntry) -> Self {
        Self {
            id: Set(entry.id),
            admin_id: Set(entry.admin_id),
            ticket_id: Set(entry.ticket_id),
            action: Set(entry.action.to_string()),
            created_at: Set(entry.created_at.into()),
        }
    }
}

/// 在给定连接（或事务）上追加日志
///
/// 工单仓库在分配、答复、关闭的事务中复用该函数。
pub(crate) async fn insert_entry<C>(conn: &C, entry: &ActivityLogEntry) -> Result<(), RepositoryError>
where
    C: ConnectionTrait,
{
    let model: log_entity::ActiveModel = entry.into();
    model.insert(conn).await?;
    Ok(())
}

fn within(mut query: Select<log_entity::Entity>, range: TimeRange) -> Select<log_entity::Entity> {
    if let Some(from) = range.from {
        query = query.filter(log_entity::Column::CreatedAt.gte(DateTimeWithTimeZone::from(from)));
    }
    if let Some(to) = range.to {
        query = query.filter(log_entity::Column::CreatedAt.lte(DateTimeWithTimeZone::from(to)));
    }
    query
}

fn collect(models: Vec<log_entity::Model>) -> Result<Vec<ActivityLogEntry>, RepositoryError> {
    models.into_iter().map(TryInto::try_into).collect()
}

#[derive(Debug, FromQueryResult)]
struct ActionCountRow {
    action: String,
    total: i64,
}

#[async_trait]
impl ActivityLogRepository for ActivityLogRepositoryImpl {
    async fn find_by_admin(
        &self,
        admin_id: Uuid,
        range: TimeRange,
    ) -> Result<Vec<ActivityLogEntry>, RepositoryError> {
        let query = log_entity::Entity::find().filter(log_entity::Column::AdminId.eq(admin_id));
        let models = within(query, range)
            .order_by_asc(log_entity::Column::CreatedAt)
            .all(self.db.as_ref())
            .await?;
        collect(models)
    }

    async fn find_by_ticket(
        &self,
        ticket_id: Uuid,
    ) -> Result<Vec<ActivityLogEntry>, RepositoryError> {
        let models = log_entity::Entity::find()
            .filter(log_entity::Column::TicketId.eq(ticket_id))
            .order_by_asc(log_entity::Column::CreatedAt)
            .all(self.db.as_ref())
            .await?;
        collect(models)
    }

    async fn find_in_range(&self, range: TimeRange) -> Result<Vec<ActivityLogEntry>, RepositoryError> {
        let models = within(log_entity::Entity::find(), range)
            .order_by_asc(log_entity::Column::CreatedAt)
            .all(self.db.as_ref())
            .await?;
        collect(models)
    }

    async fn summarize(
        &self,
        admin_id: Uuid,
        range: TimeRange,
    ) -> Result<ActivitySummary, RepositoryError> {
        let query = log_entity::Entity::find()
            .select_only()
            .column(log_entity::Column::Action)
            .column_as(log_entity::Column::Id.count(), "total")
            .filter(log_entity::Column::AdminId.eq(admin_id));

        let rows = within(query, range)
            .group_by(log_entity::Column::Action)
            .into_model::<ActionCountRow>()
            .all(self.db.as_ref())
            .await?;

        let mut summary = ActivitySummary {
            admin_id,
            from: range.from,
            to: range.to,
            ..Default::default()
        };
        for row in rows {
            match row.action.parse::<ActivityAction>() {
                Ok(action) => summary.record(action, row.total.max(0) as u64),
                Err(_) => warn!(action = %row.action, "Skipping unknown activity action"),
            }
        }
        Ok(summary)
    }
}
