// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::workers::expiration_worker::ExpirationWorker;
use crate::workers::notification_worker::NotificationWorker;
use tokio::task::JoinHandle;
use tracing::info;

/// 工作管理器
///
/// 持有后台任务句柄，收到关闭信号后统一终止。
#[derive(Default)]
pub struct WorkerManager {
    handles: Vec<JoinHandle<()>>,
}

impl WorkerManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// 启动过期清理工作器
    pub fn start_sweeper(&mut self, worker: ExpirationWorker) {
        self.handles.push(worker.start());
    }

    /// 启动通知投递工作器
    pub fn start_notifications(&mut self, worker: NotificationWorker) {
        self.handles.push(worker.start());
    }

    /// 正在管理的任务数
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// 终止所有工作器
    pub fn shutdown(&mut self) {
        info!("Shutting down workers...");
        for handle in self.handles.drain(..) {
            handle.abort();
        }
        info!("Workers shut down successfully");
    }
}
