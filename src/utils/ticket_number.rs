// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use regex::Regex;
use std::sync::LazyLock;
use uuid::Uuid;

/// 工单编号前缀
pub const TICKET_NUMBER_PREFIX: &str = "TKT-";

static TICKET_NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^TKT-[0-9A-F]{8}$").expect("valid ticket number pattern"));

/// 生成对外可见的工单编号，例如 `TKT-1A2B3C4D`
///
/// 唯一性由存储层的唯一索引保证，冲突时由调用方重新生成。
pub fn generate() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("{}{}", TICKET_NUMBER_PREFIX, hex[..8].to_uppercase())
}

/// 校验工单编号格式
pub fn is_valid(number: &str) -> bool {
    TICKET_NUMBER_RE.is_match(number)
}
