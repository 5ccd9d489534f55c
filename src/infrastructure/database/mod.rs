// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 数据库模块
///
/// 提供数据库连接和实体管理功能
/// 包括数据库连接池和实体定义
/// 连接池与启动迁移
pub mod connection;
pub mod entities;
