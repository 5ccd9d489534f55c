// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::user::User;
use crate::domain::repositories::user_repository::UserRepository;
use crate::infrastructure::database::entities::user as user_entity;
use crate::utils::errors::RepositoryError;
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};
use std::sync::Arc;
use uuid::Uuid;

/// 用户仓库实现
#[derive(Clone)]
pub struct UserRepositoryImpl {
    db: Arc<DatabaseConnection>,
}

impl UserRepositoryImpl {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

impl From<user_entity::Model> for User {
    fn from(model: user_entity::Model) -> Self {
        Self {
            id: model.id,
            telegram_id: model.telegram_id,
            username: model.username,
            first_name: model.first_name,
            last_name: model.last_name,
            is_blocked: model.is_blocked,
            language: model.language,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

#[async_trait]
impl UserRepository for UserRepositoryImpl {
    async fn create(&self, user: &User) -> Result<User, RepositoryError> {
        let model = user_entity::ActiveModel {
            id: Set(user.id),
            telegram_id: Set(user.telegram_id),
            username: Set(user.username.clone()),
            first_name: Set(user.first_name.clone()),
            last_name: Set(user.last_name.clone()),
            is_blocked: Set(user.is_blocked),
            language: Set(user.language.clone()),
            created_at: Set(user.created_at.into()),
            updated_at: Set(user.updated_at.into()),
        };
        Ok(model.insert(self.db.as_ref()).await?.into())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepositoryError> {
        Ok(user_entity::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await?
            .map(Into::into))
    }
}
