// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::category::Category;
use crate::domain::repositories::category_repository::CategoryRepository;
use crate::infrastructure::database::entities::category as category_entity;
use crate::utils::errors::RepositoryError;
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};
use std::sync::Arc;
use uuid::Uuid;

/// 分类仓库实现
#[derive(Clone)]
pub struct CategoryRepositoryImpl {
    db: Arc<DatabaseConnection>,
}

impl CategoryRepositoryImpl {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

impl From<category_entity::Model> for Category {
    fn from(model: category_entity::Model) -> Self {
        Self {
            id: model.id,
            name_uz: model.name_uz,
            name_ru: model.name_ru,
            name_en: model.name_en,
            description: model.description,
            is_active: model.is_active,
            display_order: model.display_order,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

#[async_trait]
impl CategoryRepository for CategoryRepositoryImpl {
    async fn create(&self, category: &Category) -> Result<Category, RepositoryError> {
        let model = category_entity::ActiveModel {
            id: Set(category.id),
            name_uz: Set(category.name_uz.clone()),
            name_ru: Set(category.name_ru.clone()),
            name_en: Set(category.name_en.clone()),
            description: Set(category.description.clone()),
            is_active: Set(category.is_active),
            display_order: Set(category.display_order),
            created_at: Set(category.created_at.into()),
            updated_at: Set(category.updated_at.into()),
        };
        Ok(model.insert(self.db.as_ref()).await?.into())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Category>, RepositoryError> {
        Ok(category_entity::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await?
            .map(Into::into))
    }
}
