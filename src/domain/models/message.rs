// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::ticket::DomainError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// 消息内容类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    #[default]
    Text,
    Image,
    File,
    Video,
    Audio,
    Location,
}

impl ContentType {
    /// 人类可读名称
    pub fn label(self) -> &'static str {
        match self {
            ContentType::Text => "Text",
            ContentType::Image => "Image",
            ContentType::File => "File",
            ContentType::Video => "Video",
            ContentType::Audio => "Audio",
            ContentType::Location => "Location",
        }
    }

    /// 是否需要媒体句柄
    pub fn is_media(self) -> bool {
        matches!(
            self,
            ContentType::Image | ContentType::File | ContentType::Video | ContentType::Audio
        )
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ContentType::Text => write!(f, "text"),
            ContentType::Image => write!(f, "image"),
            ContentType::File => write!(f, "file"),
            ContentType::Video => write!(f, "video"),
            ContentType::Audio => write!(f, "audio"),
            ContentType::Location => write!(f, "location"),
        }
    }
}

impl FromStr for ContentType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(ContentType::Text),
            "image" => Ok(ContentType::Image),
            "file" => Ok(ContentType::File),
            "video" => Ok(ContentType::Video),
            "audio" => Ok(ContentType::Audio),
            "location" => Ok(ContentType::Location),
            _ => Err(()),
        }
    }
}

/// 消息发送方
///
/// 用户与管理员二者恰好其一。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Sender {
    User(Uuid),
    Admin(Uuid),
}

impl Sender {
    /// 从两个可空列还原发送方
    pub fn from_columns(user: Option<Uuid>, admin: Option<Uuid>) -> Result<Self, DomainError> {
        match (user, admin) {
            (Some(user), None) => Ok(Sender::User(user)),
            (None, Some(admin)) => Ok(Sender::Admin(admin)),
            (Some(_), Some(_)) => Err(DomainError::ValidationError(
                "message has both a user and an admin sender".to_string(),
            )),
            (None, None) => Err(DomainError::ValidationError(
                "message has no sender".to_string(),
            )),
        }
    }

    /// 拆分为 (用户, 管理员) 两列
    pub fn into_columns(self) -> (Option<Uuid>, Option<Uuid>) {
        match self {
            Sender::User(id) => (Some(id), None),
            Sender::Admin(id) => (None, Some(id)),
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Sender::Admin(_))
    }
}

/// 工单消息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub ticket_id: Uuid,
    pub sender: Sender,
    pub content_type: ContentType,
    pub content: Option<String>,
    /// 不透明的媒体句柄（如 Telegram file_id）
    pub media_ref: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// 创建并校验一条新消息
    ///
    /// 文本和位置消息需要非空内容，媒体消息需要媒体句柄。
    pub fn new(
        ticket_id: Uuid,
        sender: Sender,
        content_type: ContentType,
        content: Option<String>,
        media_ref: Option<String>,
    ) -> Result<Self, DomainError> {
        let content = content.filter(|c| !c.trim().is_empty());
        let media_ref = media_ref.filter(|m| !m.trim().is_empty());

        if content_type.is_media() {
            if media_ref.is_none() {
                return Err(DomainError::ValidationError(format!(
                    "{} message requires a media reference",
                    content_type
                )));
            }
        } else if content.is_none() {
            return Err(DomainError::ValidationError(format!(
                "{} message requires content",
                content_type
            )));
        }

        Ok(Self {
            id: Uuid::new_v4(),
            ticket_id,
            sender,
            content_type,
            content,
            media_ref,
            timestamp: Utc::now(),
        })
    }
}
