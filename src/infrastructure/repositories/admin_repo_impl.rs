// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::admin::Admin;
use crate::domain::models::category::AdminCategory;
use crate::domain::repositories::admin_repository::AdminRepository;
use crate::infrastructure::database::entities::{
    admin as admin_entity, admin_category as admin_category_entity,
};
use crate::utils::errors::RepositoryError;
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{
    sea_query::{Expr, Query},
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use std::sync::Arc;
use uuid::Uuid;

/// 管理员仓库实现
#[derive(Clone)]
pub struct AdminRepositoryImpl {
    db: Arc<DatabaseConnection>,
}

impl AdminRepositoryImpl {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

impl TryFrom<admin_entity::Model> for Admin {
    type Error = RepositoryError;

    fn try_from(model: admin_entity::Model) -> Result<Self, Self::Error> {
        let role = model
            .role
            .parse()
            .map_err(|_| RepositoryError::Corrupted(format!("unknown admin role '{}'", model.role)))?;
        Ok(Self {
            id: model.id,
            user_id: model.user_id,
            role,
            is_blocked: model.is_blocked,
            last_assigned_at: model.last_assigned_at.map(|t| t.with_timezone(&Utc)),
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        })
    }
}

impl From<&Admin> for admin_entity::ActiveModel {
    fn from(admin: &Admin) -> Self {
        Self {
            id: Set(admin.id),
            user_id: Set(admin.user_id),
            role: Set(admin.role.to_string()),
            is_blocked: Set(admin.is_blocked),
            last_assigned_at: Set(admin.last_assigned_at.map(Into::into)),
            created_at: Set(admin.created_at.into()),
            updated_at: Set(admin.updated_at.into()),
        }
    }
}

#[async_trait]
impl AdminRepository for AdminRepositoryImpl {
    async fn create(&self, admin: &Admin) -> Result<Admin, RepositoryError> {
        let model: admin_entity::ActiveModel = admin.into();
        let inserted = model.insert(self.db.as_ref()).await?;
        Admin::try_from(inserted)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Admin>, RepositoryError> {
        admin_entity::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await?
            .map(Admin::try_from)
            .transpose()
    }

    async fn find_eligible(&self, category_id: Uuid) -> Result<Vec<Admin>, RepositoryError> {
        let responsible = Query::select()
            .column(admin_category_entity::Column::AdminId)
            .from(admin_category_entity::Entity)
            .and_where(admin_category_entity::Column::CategoryId.eq(category_id))
            .to_owned();

        admin_entity::Entity::find()
            .filter(admin_entity::Column::Id.in_subquery(responsible))
            .filter(admin_entity::Column::IsBlocked.eq(false))
            .order_by_asc(admin_entity::Column::CreatedAt)
            .all(self.db.as_ref())
            .await?
            .into_iter()
            .map(Admin::try_from)
            .collect()
    }

    async fn add_category(&self, link: &AdminCategory) -> Result<(), RepositoryError> {
        let model = admin_category_entity::ActiveModel {
            id: Set(link.id),
            admin_id: Set(link.admin_id),
            category_id: Set(link.category_id),
            created_at: Set(link.created_at.into()),
        };
        model.insert(self.db.as_ref()).await?;
        Ok(())
    }

    async fn set_blocked(&self, admin_id: Uuid, blocked: bool) -> Result<(), RepositoryError> {
        let result = admin_entity::Entity::update_many()
            .col_expr(admin_entity::Column::IsBlocked, Expr::value(blocked))
            .col_expr(
                admin_entity::Column::UpdatedAt,
                Expr::value(DateTimeWithTimeZone::from(Utc::now())),
            )
            .filter(admin_entity::Column::Id.eq(admin_id))
            .exec(self.db.as_ref())
            .await?;

        if result.rows_affected == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
