// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::SweeperSettings;
use crate::domain::repositories::ticket_repository::TicketRepository;
use crate::utils::errors::RepositoryError;
use chrono::{DateTime, Utc};
use metrics::counter;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// 工单过期清理工作器
///
/// 周期性扫描超过阈值仍无管理员答复的活跃工单并关闭，
/// 关闭前在同一事务中重新确认没有管理员消息。重复扫描是幂等的。
pub struct ExpirationWorker {
    repository: Arc<dyn TicketRepository>,
    interval: Duration,
    threshold: chrono::Duration,
    batch_size: u64,
}

impl ExpirationWorker {
    pub fn new(repository: Arc<dyn TicketRepository>, settings: &SweeperSettings) -> Self {
        Self {
            repository,
            interval: Duration::from_secs(settings.interval_secs.max(1)),
            threshold: chrono::Duration::seconds(settings.threshold_secs as i64),
            batch_size: settings.batch_size.max(1),
        }
    }

    /// 系统关闭原因
    pub fn close_reason(&self) -> String {
        format!(
            "Automatically closed: no admin reply within {} minutes",
            self.threshold.num_minutes()
        )
    }

    /// 运行工作器
    pub async fn run(&self) {
        info!(
            interval_secs = self.interval.as_secs(),
            threshold_secs = self.threshold.num_seconds(),
            "Ticket expiration worker started"
        );

        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;

            match self.sweep_expired().await {
                Ok(count) => {
                    if count > 0 {
                        info!("Closed {} expired tickets", count);
                    }
                }
                Err(e) => {
                    error!("Failed to sweep expired tickets: {}", e);
                }
            }
        }
    }

    /// 启动后台运行
    pub fn start(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    /// 执行一次扫描，返回本次关闭的工单数
    pub async fn sweep_expired(&self) -> Result<u64, RepositoryError> {
        self.sweep_expired_at(Utc::now()).await
    }

    /// 以给定时刻为“现在”执行一次扫描
    pub async fn sweep_expired_at(&self, now: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let threshold = now - self.threshold;
        let candidates = self
            .repository
            .find_stale(threshold, self.batch_size)
            .await?;

        if candidates.is_empty() {
            return Ok(0);
        }
        debug!(candidates = candidates.len(), "Found stale tickets");

        let reason = self.close_reason();
        let mut closed = 0;
        for ticket in candidates {
            match self
                .repository
                .close_if_stale(ticket.id, threshold, &reason, now)
                .await
            {
                Ok(true) => {
                    closed += 1;
                    info!(ticket_number = %ticket.ticket_number, "Closed unanswered ticket");
                }
                // Answered or closed since the candidate list was read
                Ok(false) => {
                    debug!(ticket_number = %ticket.ticket_number, "Ticket no longer stale");
                }
                Err(e) => {
                    warn!(ticket_number = %ticket.ticket_number, "Failed to close stale ticket: {}", e);
                }
            }
        }

        counter!("tickets_swept_total").increment(closed);
        counter!("tickets_closed_total", "reason" => "expired").increment(closed);
        Ok(closed)
    }
}

#[cfg(test)]
#[path = "expiration_worker_test.rs"]
mod tests;
