// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::notification::Notification;
use async_trait::async_trait;
use thiserror::Error;

/// 通知通道错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChannelError {
    /// 超时、限流、服务端错误，可以重试
    #[error("Transient delivery failure: {0}")]
    Transient(String),

    /// 请求被拒绝（如 chat 不存在），重试无意义
    #[error("Permanent delivery failure: {0}")]
    Permanent(String),
}

impl ChannelError {
    pub fn is_transient(&self) -> bool {
        matches!(self, ChannelError::Transient(_))
    }
}

/// 通知通道特质
///
/// 单向投递原语，以接收方标识为键。
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    /// 投递一条通知
    ///
    /// # 参数
    ///
    /// * `notification` - 已包含渲染所需上下文的通知
    ///
    /// # 返回值
    ///
    /// * `Ok(())` - 投递成功
    /// * `Err(ChannelError)` - 投递失败
    async fn send(&self, notification: &Notification) -> Result<(), ChannelError>;
}

/// 通知入口
///
/// 同步且不阻塞：调用方在状态写入提交后调用，投递结果不回传。
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}
