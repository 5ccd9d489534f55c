// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum_test::TestServer;
use sea_orm::{sea_query::Expr, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use std::sync::{Arc, Mutex};
use ticketrs::config::settings::{DatabaseSettings, SweeperSettings};
use ticketrs::domain::models::admin::{Admin, AdminRole};
use ticketrs::domain::models::category::{AdminCategory, Category};
use ticketrs::domain::models::message::{ContentType, Message, Sender};
use ticketrs::domain::models::notification::{Notification, NotificationKind};
use ticketrs::domain::models::ticket::{Priority, Ticket, TicketStatus};
use ticketrs::domain::models::user::User;
use ticketrs::domain::repositories::Repositories;
use ticketrs::domain::services::notification_service::Notifier;
use ticketrs::domain::services::ticket_service::{NewTicket, TicketService};
use ticketrs::infrastructure::database::{connection, entities::ticket as ticket_entity};
use ticketrs::infrastructure::repositories::sea_orm_repositories;
use ticketrs::presentation::routes;
use ticketrs::utils::ticket_number;
use ticketrs::workers::expiration_worker::ExpirationWorker;
use uuid::Uuid;

pub const API_TOKEN: &str = "test-token";

/// 记录所有通知而不投递
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }

    pub fn kinds(&self) -> Vec<NotificationKind> {
        self.sent().into_iter().map(|n| n.kind).collect()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        self.sent.lock().unwrap().push(notification);
    }
}

#[allow(dead_code)]
pub struct TestContext {
    pub db: Arc<DatabaseConnection>,
    pub repos: Repositories,
    pub service: Arc<TicketService>,
    pub notifier: Arc<RecordingNotifier>,
}

pub fn memory_database() -> DatabaseSettings {
    DatabaseSettings {
        url: "sqlite::memory:".to_string(),
        max_connections: Some(1),
        min_connections: Some(1),
        connect_timeout: Some(10),
        idle_timeout: None,
    }
}

pub async fn setup() -> TestContext {
    let db = Arc::new(connection::connect_and_migrate(&memory_database()).await.unwrap());
    let repos = sea_orm_repositories(db.clone());
    let notifier = Arc::new(RecordingNotifier::default());
    let service = Arc::new(TicketService::new(repos.clone(), notifier.clone()));

    TestContext {
        db,
        repos,
        service,
        notifier,
    }
}

impl TestContext {
    pub async fn user(&self, telegram_id: i64) -> User {
        self.repos
            .users
            .create(&User::new(telegram_id, Some(format!("User {}", telegram_id))))
            .await
            .unwrap()
    }

    pub async fn category(&self, name: &str) -> Category {
        self.repos
            .categories
            .create(&Category::new(name, name, name))
            .await
            .unwrap()
    }

    /// 创建管理员并授予给定分类
    pub async fn admin(&self, telegram_id: i64, categories: &[Uuid]) -> Admin {
        self.admin_with_role(telegram_id, AdminRole::Admin, categories)
            .await
    }

    pub async fn admin_with_role(
        &self,
        telegram_id: i64,
        role: AdminRole,
        categories: &[Uuid],
    ) -> Admin {
        let user = self.user(telegram_id).await;
        let admin = self
            .repos
            .admins
            .create(&Admin::new(user.id, role))
            .await
            .unwrap();
        for category_id in categories {
            self.repos
                .admins
                .add_category(&AdminCategory::new(admin.id, *category_id))
                .await
                .unwrap();
        }
        admin
    }

    /// 直接写入一条未分配的工单，不触发自动分配
    pub async fn raw_ticket(&self, user_id: Uuid, category_id: Uuid) -> Ticket {
        let ticket = Ticket::new(
            ticket_number::generate(),
            user_id,
            category_id,
            "Seeded".to_string(),
            "Seeded ticket".to_string(),
            Priority::Medium,
        );
        let opening = Message::new(
            ticket.id,
            Sender::User(user_id),
            ContentType::Text,
            Some("Seeded ticket".to_string()),
            None,
        )
        .unwrap();
        self.repos.tickets.create(&ticket, &opening).await.unwrap()
    }

    /// 绕过服务直接改写工单状态
    pub async fn force_status(&self, ticket_id: Uuid, status: TicketStatus) {
        ticket_entity::Entity::update_many()
            .col_expr(ticket_entity::Column::Status, Expr::value(status.to_string()))
            .filter(ticket_entity::Column::Id.eq(ticket_id))
            .exec(self.db.as_ref())
            .await
            .unwrap();
    }

    /// 为管理员制造 `count` 个活跃工单
    pub async fn give_workload(&self, admin: &Admin, category_id: Uuid, count: usize, seed: i64) {
        for i in 0..count {
            let owner = self.user(seed + i as i64).await;
            let ticket = self.raw_ticket(owner.id, category_id).await;
            self.service
                .assign_admin(ticket.id, Some(admin.id))
                .await
                .unwrap();
        }
    }
}

pub fn new_ticket(user_id: Uuid, category_id: Uuid, description: &str) -> NewTicket {
    NewTicket {
        user_id,
        category_id,
        title: None,
        description: description.to_string(),
        priority: Priority::Medium,
        content_type: ContentType::Text,
        media_ref: None,
    }
}

/// 构建带认证的测试服务器
pub fn test_server(ctx: &TestContext) -> TestServer {
    let sweeper = Arc::new(ExpirationWorker::new(
        ctx.repos.tickets.clone(),
        &SweeperSettings::default(),
    ));
    let app = routes::routes(ctx.service.clone(), sweeper, API_TOKEN);
    TestServer::new(app).unwrap()
}

pub fn bearer() -> String {
    format!("Bearer {}", API_TOKEN)
}
