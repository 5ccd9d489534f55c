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

use crate::domain::models::notification::Notification;
use crate::domain::services::notification_service::{ChannelError, NotificationChannel, Notifier};
use crate::utils::retry_policy::RetryPolicy;
use metrics::{counter, histogram};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

/// 单条通知的投递结果
#[derive(Debug, Clone, PartialEq)]
pub enum DeliveryOutcome {
    /// 投递成功
    Delivered { attempts: u32 },
    /// 放弃投递
    Dead { attempts: u32, error: ChannelError },
}

/// 通知分发入口
///
/// 写入有界队列后立即返回；队列已满或已关闭时丢弃并告警。
#[derive(Clone)]
pub struct NotificationDispatcher {
    sender: mpsc::Sender<Notification>,
}

impl Notifier for NotificationDispatcher {
    fn notify(&self, notification: Notification) {
        match self.sender.try_send(notification) {
            Ok(()) => {}
            Err(TrySendError::Full(n)) => {
                counter!("notification_dropped_total", "reason" => "queue_full").increment(1);
                warn!(notification_id = %n.id, recipient = n.recipient_id, "Notification queue full; dropping");
            }
            Err(TrySendError::Closed(n)) => {
                counter!("notification_dropped_total", "reason" => "closed").increment(1);
                warn!(notification_id = %n.id, recipient = n.recipient_id, "Notification worker stopped; dropping");
            }
        }
    }
}

/// 通知投递工作器
///
/// 从队列读取通知，在信号量限制的并发下投递，瞬时失败按退避策略重试。
pub struct NotificationWorker {
    receiver: mpsc::Receiver<Notification>,
    channel: Arc<dyn NotificationChannel>,
    semaphore: Arc<Semaphore>,
    policy: RetryPolicy,
}

impl NotificationWorker {
    /// 创建分发入口与配对的工作器
    ///
    /// # 参数
    ///
    /// * `channel` - 通知通道
    /// * `capacity` - 队列容量
    /// * `concurrency` - 并发投递数
    /// * `policy` - 重试策略
    pub fn new(
        channel: Arc<dyn NotificationChannel>,
        capacity: usize,
        concurrency: usize,
        policy: RetryPolicy,
    ) -> (NotificationDispatcher, Self) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let worker = Self {
            receiver,
            channel,
            semaphore: Arc::new(Semaphore::new(concurrency.max(1))),
            policy,
        };
        (NotificationDispatcher { sender }, worker)
    }

    /// 运行工作器，所有发送端关闭后退出
    pub async fn run(mut self) {
        info!("Notification worker started");

        while let Some(notification) = self.receiver.recv().await {
            let permit = match self.semaphore.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => {
                    error!("Notification semaphore closed: {}", e);
                    break;
                }
            };

            let channel = self.channel.clone();
            let policy = self.policy.clone();
            tokio::spawn(async move {
                let _permit = permit;
                deliver(channel.as_ref(), &policy, &notification).await;
            });
        }

        info!("Notification worker stopped");
    }

    /// 启动后台运行
    pub fn start(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }
}

/// 投递一条通知，按策略重试瞬时失败
///
/// 尝试次数与总耗时都有上限，耗尽后记录日志并放弃。
pub async fn deliver(
    channel: &dyn NotificationChannel,
    policy: &RetryPolicy,
    notification: &Notification,
) -> DeliveryOutcome {
    let started = Instant::now();
    let mut attempts = 0;

    loop {
        attempts += 1;
        counter!("notification_delivery_attempts_total").increment(1);

        let error = match channel.send(notification).await {
            Ok(()) => {
                histogram!("notification_delivery_duration_seconds")
                    .record(started.elapsed().as_secs_f64());
                counter!("notification_delivered_total").increment(1);
                debug!(
                    notification_id = %notification.id,
                    recipient = notification.recipient_id,
                    attempts,
                    "Notification delivered"
                );
                return DeliveryOutcome::Delivered { attempts };
            }
            Err(error) => error,
        };

        let backoff = policy.calculate_backoff(attempts);
        let retry = error.is_transient()
            && policy.should_retry(attempts)
            && policy.within_budget(started.elapsed(), backoff);

        if !retry {
            histogram!("notification_delivery_duration_seconds")
                .record(started.elapsed().as_secs_f64());
            counter!("notification_dead_total").increment(1);
            error!(
                notification_id = %notification.id,
                recipient = notification.recipient_id,
                attempts,
                "Giving up on notification: {}",
                error
            );
            return DeliveryOutcome::Dead { attempts, error };
        }

        warn!(
            notification_id = %notification.id,
            attempts,
            backoff_ms = backoff.as_millis() as u64,
            "Notification delivery failed, retrying: {}",
            error
        );
        sleep(backoff).await;
    }
}
