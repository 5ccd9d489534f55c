// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域服务模块
///
/// 该模块包含系统的核心业务逻辑服务，协调多个领域对象来完成业务操作。
///
/// 包含的服务：
/// - 分配服务（assignment_service）：分类资格匹配与最小负载选择
/// - 工单服务（ticket_service）：建单、消息、关闭等生命周期操作
/// - 通知服务（notification_service）：通知通道与通知入口的抽象
pub mod assignment_service;
pub mod errors;
pub mod notification_service;
pub mod ticket_service;

pub use errors::TicketError;
