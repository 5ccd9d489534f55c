// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// 初始化日志
///
/// `format` 为 `json` 时输出结构化日志，其余值使用默认文本格式。
pub fn init_telemetry(format: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| "info,ticketrs=debug".into());

    let registry = tracing_subscriber::registry().with(filter);

    if format.eq_ignore_ascii_case("json") {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(false))
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
