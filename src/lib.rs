// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 应用程序模块
///
/// 请求与响应 DTO
pub mod application;

/// 配置模块
///
/// 处理应用程序的配置设置和环境变量
pub mod config;

/// 领域模块
///
/// 包含工单、管理员等核心实体，以及仓库接口与业务服务
pub mod domain;

/// 基础设施模块
///
/// 数据库、指标导出与 Telegram 通知通道
pub mod infrastructure;

/// 表示层模块
///
/// 处理HTTP请求和响应，包括路由、处理器和中间件
pub mod presentation;

/// 工具模块
pub mod utils;

/// 工作器模块
///
/// 过期扫描与通知投递的后台任务
pub mod workers;
