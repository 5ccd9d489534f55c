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

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// 应用程序配置设置
///
/// 包含数据库、服务器、认证、过期清理、通知分发、指标和日志等所有配置项
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// 数据库配置
    pub database: DatabaseSettings,
    /// 服务器配置
    pub server: ServerSettings,
    /// 认证配置
    pub auth: AuthSettings,
    /// 过期清理配置
    pub sweeper: SweeperSettings,
    /// 通知分发配置
    pub notification: NotificationSettings,
    /// 指标配置
    pub metrics: MetricsSettings,
    /// 日志配置
    pub log: LogSettings,
}

/// 数据库配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    /// 数据库连接URL
    pub url: String,
    /// 最大连接数
    pub max_connections: Option<u32>,
    /// 最小连接数
    pub min_connections: Option<u32>,
    /// 连接超时时间（秒）
    pub connect_timeout: Option<u64>,
    /// 空闲连接超时时间（秒）
    pub idle_timeout: Option<u64>,
}

/// 服务器配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    /// 服务器监听主机地址
    pub host: String,
    /// 服务器监听端口
    pub port: u16,
}

/// 认证配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct AuthSettings {
    /// API 访问令牌，为空时拒绝所有受保护请求
    pub api_token: String,
}

/// 过期清理配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct SweeperSettings {
    /// 是否启用周期清理
    pub enabled: bool,
    /// 扫描间隔（秒）
    pub interval_secs: u64,
    /// 未答复超时阈值（秒）
    pub threshold_secs: u64,
    /// 单次扫描的最大工单数
    pub batch_size: u64,
}

impl Default for SweeperSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 60,
            threshold_secs: 600,
            batch_size: 500,
        }
    }
}

/// 通知分发配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct NotificationSettings {
    /// Telegram Bot 令牌
    pub bot_token: String,
    /// Bot API 基础地址
    pub api_base_url: String,
    /// 待发送队列容量
    pub queue_capacity: usize,
    /// 并发投递数
    pub concurrency: usize,
    /// 最大尝试次数
    pub max_attempts: u32,
    /// 初始退避（毫秒）
    pub initial_backoff_ms: u64,
    /// 最大退避（毫秒）
    pub max_backoff_ms: u64,
    /// 单条通知的总投递时限（秒）
    pub max_elapsed_secs: u64,
    /// 单次请求超时（秒）
    pub request_timeout_secs: u64,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            api_base_url: "https://api.telegram.org".to_string(),
            queue_capacity: 1024,
            concurrency: 8,
            max_attempts: 5,
            initial_backoff_ms: 500,
            max_backoff_ms: 30_000,
            max_elapsed_secs: 120,
            request_timeout_secs: 10,
        }
    }
}

/// 指标配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsSettings {
    /// 是否启用 Prometheus 导出
    pub enabled: bool,
    /// 导出监听地址
    pub address: String,
}

/// 日志配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct LogSettings {
    /// 输出格式 (text, json)
    pub format: String,
}

impl Settings {
    /// 创建新的配置实例
    ///
    /// 按顺序叠加：内置默认值 → `config/default` → `config/{APP_ENVIRONMENT}` → `TICKETRS__*` 环境变量
    ///
    /// # Returns
    ///
    /// * `Ok(Settings)` - 成功加载的配置
    /// * `Err(ConfigError)` - 配置加载失败
    pub fn new() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "default".to_string());
        Self::build(
            Config::builder()
                .add_source(File::with_name("config/default").required(false))
                .add_source(File::with_name(&format!("config/{}", env)).required(false))
                .add_source(Environment::with_prefix("TICKETRS").separator("__")),
        )
    }

    /// 在默认值之上叠加给定来源构建配置
    pub fn build(
        sources: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, ConfigError> {
        let sweeper = SweeperSettings::default();
        let notification = NotificationSettings::default();

        let builder = sources
            // Server
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            // Database
            .set_default("database.url", "sqlite://ticketrs.db?mode=rwc")?
            .set_default("database.max_connections", 20)?
            .set_default("database.min_connections", 1)?
            .set_default("database.connect_timeout", 10)?
            .set_default("database.idle_timeout", 300)?
            // Auth
            .set_default("auth.api_token", "")?
            // Sweeper
            .set_default("sweeper.enabled", sweeper.enabled)?
            .set_default("sweeper.interval_secs", sweeper.interval_secs)?
            .set_default("sweeper.threshold_secs", sweeper.threshold_secs)?
            .set_default("sweeper.batch_size", sweeper.batch_size)?
            // Notification
            .set_default("notification.bot_token", notification.bot_token)?
            .set_default("notification.api_base_url", notification.api_base_url)?
            .set_default("notification.queue_capacity", notification.queue_capacity as u64)?
            .set_default("notification.concurrency", notification.concurrency as u64)?
            .set_default("notification.max_attempts", notification.max_attempts)?
            .set_default("notification.initial_backoff_ms", notification.initial_backoff_ms)?
            .set_default("notification.max_backoff_ms", notification.max_backoff_ms)?
            .set_default("notification.max_elapsed_secs", notification.max_elapsed_secs)?
            .set_default(
                "notification.request_timeout_secs",
                notification.request_timeout_secs,
            )?
            // Metrics
            .set_default("metrics.enabled", false)?
            .set_default("metrics.address", "0.0.0.0:9000")?
            // Log
            .set_default("log.format", "text")?;

        builder.build()?.try_deserialize()
    }
}

#[cfg(test)]
#[path = "settings_test.rs"]
mod tests;
