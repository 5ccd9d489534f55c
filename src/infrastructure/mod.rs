// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 基础设施层模块
///
/// 该模块包含系统的技术实现细节，提供对具体技术的抽象和封装。
///
/// 包含的子模块：
/// - 数据库（database）：提供数据库连接和实体映射
/// - 指标（metrics）：Prometheus 导出器
/// - 仓库实现（repositories）：提供领域仓库接口的具体实现
/// - 服务（services）：Telegram 通知通道
///
/// 基础设施层遵循依赖倒置原则，依赖于领域层的抽象接口。
pub mod database;
pub mod metrics;
pub mod repositories;
pub mod services;
