// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 工作器模块
///
/// 提供后台任务处理和工作器管理功能
/// 包括过期工单清理、通知投递和工作器生命周期管理
pub mod expiration_worker;
pub mod manager;
pub mod notification_worker;

pub use expiration_worker::ExpirationWorker;
pub use manager::WorkerManager;
pub use notification_worker::{NotificationDispatcher, NotificationWorker};
