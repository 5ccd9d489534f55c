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

use std::sync::Arc;
use ticketrs::config::settings::Settings;
use ticketrs::domain::services::ticket_service::TicketService;
use ticketrs::infrastructure::database::connection;
use ticketrs::infrastructure::metrics;
use ticketrs::infrastructure::repositories::sea_orm_repositories;
use ticketrs::infrastructure::services::telegram_channel_impl::TelegramChannel;
use ticketrs::presentation::routes;
use ticketrs::utils::retry_policy::RetryPolicy;
use ticketrs::utils::telemetry;
use ticketrs::workers::expiration_worker::ExpirationWorker;
use ticketrs::workers::manager::WorkerManager;
use ticketrs::workers::notification_worker::NotificationWorker;
use tokio::net::TcpListener;
use tracing::{info, warn};

/// 主函数
///
/// 应用程序入口点，负责初始化所有组件并启动服务
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load configuration
    let settings = Arc::new(Settings::new()?);

    // 2. Initialize logging and metrics
    telemetry::init_telemetry(&settings.log.format);
    info!("Starting ticketrs...");
    metrics::init_metrics(&settings.metrics);

    // 3. Connect to database and apply migrations
    let db = Arc::new(connection::connect_and_migrate(&settings.database).await?);
    info!("Database ready");
    let repos = sea_orm_repositories(db);

    if settings.auth.api_token.is_empty() {
        warn!("auth.api_token is empty; all protected endpoints will reject requests");
    }
    if settings.notification.bot_token.is_empty() {
        warn!("notification.bot_token is empty; notifications will fail to deliver");
    }

    // 4. Notification pipeline
    let channel = Arc::new(TelegramChannel::new(&settings.notification));
    let (dispatcher, notification_worker) = NotificationWorker::new(
        channel,
        settings.notification.queue_capacity,
        settings.notification.concurrency,
        RetryPolicy::from(&settings.notification),
    );
    let service = Arc::new(TicketService::new(repos.clone(), Arc::new(dispatcher)));

    // 5. Start workers
    let mut worker_manager = WorkerManager::new();
    worker_manager.start_notifications(notification_worker);
    if settings.sweeper.enabled {
        worker_manager.start_sweeper(ExpirationWorker::new(
            repos.tickets.clone(),
            &settings.sweeper,
        ));
    } else {
        info!("Expiration sweeper disabled");
    }

    // 6. Start HTTP server
    let sweeper = Arc::new(ExpirationWorker::new(repos.tickets.clone(), &settings.sweeper));
    let app = routes::routes(service, sweeper, settings.auth.api_token.as_str());

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    worker_manager.shutdown();

    Ok(())
}

/// 等待 ctrl-c，监听失败时永不返回
async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => {
            warn!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
