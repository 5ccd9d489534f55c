// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域模型模块
///
/// 该模块定义了系统的核心业务实体，包括：
/// - 工单（ticket）：支持请求及其状态机
/// - 消息（message）：工单下的对话，发送方为用户或管理员之一
/// - 管理员（admin）与用户（user）
/// - 分类（category）：工单分类及管理员与分类的关联
/// - 操作日志（activity_log）：只追加的审计记录
/// - 通知（notification）：投递给 Telegram 的事件与负载
pub mod activity_log;
pub mod admin;
pub mod category;
pub mod message;
pub mod notification;
pub mod ticket;
pub mod user;
