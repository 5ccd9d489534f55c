// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::message::{ContentType, Message};
use crate::domain::models::ticket::{Priority, Ticket};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 通知正文中消息内容的最大字符数
pub const CONTENT_PREVIEW_CHARS: usize = 500;

/// 通知事件类型
///
/// 前三种都是“通知管理员有新的/更新的分配”，区别只在标题文案；
/// `AdminReplied` 通知用户管理员已答复。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    TicketAssigned,
    TicketTransferred,
    UserFollowUp,
    AdminReplied,
}

impl NotificationKind {
    /// 接收方是否为管理员
    pub fn targets_admin(self) -> bool {
        !matches!(self, NotificationKind::AdminReplied)
    }

    fn headline(self) -> &'static str {
        match self {
            NotificationKind::TicketAssigned => "🆕 *New ticket assigned*",
            NotificationKind::TicketTransferred => "🔁 *Ticket transferred to you*",
            NotificationKind::UserFollowUp => "💬 *New message from user*",
            NotificationKind::AdminReplied => "✅ *Admin replied*",
        }
    }
}

/// 媒体类型，决定 Bot API 的投递方法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Photo,
    Video,
    Audio,
    Document,
}

impl MediaKind {
    pub fn from_content_type(content_type: ContentType) -> Option<Self> {
        match content_type {
            ContentType::Image => Some(MediaKind::Photo),
            ContentType::Video => Some(MediaKind::Video),
            ContentType::Audio => Some(MediaKind::Audio),
            ContentType::File => Some(MediaKind::Document),
            ContentType::Text | ContentType::Location => None,
        }
    }
}

/// 通知负载
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotificationPayload {
    Text {
        text: String,
    },
    Media {
        kind: MediaKind,
        media_ref: String,
        caption: Option<String>,
    },
    Location {
        latitude: f64,
        longitude: f64,
        caption: Option<String>,
    },
}

impl NotificationPayload {
    /// 由消息构造负载
    ///
    /// 缺少媒体句柄的媒体消息、无法解析坐标的位置消息都降级为文本。
    pub fn from_message(message: &Message) -> Self {
        let content = message.content.clone();

        if let Some(kind) = MediaKind::from_content_type(message.content_type) {
            if let Some(media_ref) = &message.media_ref {
                return NotificationPayload::Media {
                    kind,
                    media_ref: media_ref.clone(),
                    caption: content,
                };
            }
        }

        if message.content_type == ContentType::Location {
            if let Some((latitude, longitude)) =
                content.as_deref().and_then(parse_location)
            {
                return NotificationPayload::Location {
                    latitude,
                    longitude,
                    caption: content,
                };
            }
        }

        NotificationPayload::Text {
            text: content.unwrap_or_else(|| format!("{} sent", message.content_type.label())),
        }
    }

    /// 消息正文（文本或说明文字）
    pub fn body(&self) -> Option<&str> {
        match self {
            NotificationPayload::Text { text } => Some(text),
            NotificationPayload::Media { caption, .. }
            | NotificationPayload::Location { caption, .. } => caption.as_deref(),
        }
    }
}

/// 解析 `Latitude: <f>` / `Longitude: <f>` 行
pub fn parse_location(content: &str) -> Option<(f64, f64)> {
    let mut latitude = None;
    let mut longitude = None;

    for line in content.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim().parse::<f64>().ok();
        match key.trim().to_ascii_lowercase().as_str() {
            "latitude" => latitude = value,
            "longitude" => longitude = value,
            _ => {}
        }
    }

    match (latitude, longitude) {
        (Some(lat), Some(lon))
            if (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon) =>
        {
            Some((lat, lon))
        }
        _ => None,
    }
}

/// 渲染通知所需的工单上下文，由调用方一次性提供
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketContext {
    pub ticket_id: Uuid,
    pub ticket_number: String,
    pub title: String,
    pub priority: Priority,
    pub category_name: Option<String>,
    pub user_name: Option<String>,
}

impl TicketContext {
    pub fn from_ticket(ticket: &Ticket) -> Self {
        Self {
            ticket_id: ticket.id,
            ticket_number: ticket.ticket_number.clone(),
            title: ticket.title.clone(),
            priority: ticket.priority,
            category_name: None,
            user_name: None,
        }
    }

    pub fn with_category(mut self, name: Option<String>) -> Self {
        self.category_name = name;
        self
    }

    pub fn with_user(mut self, name: Option<String>) -> Self {
        self.user_name = name;
        self
    }
}

/// 内联按钮
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InlineAction {
    pub text: String,
    pub callback_data: String,
}

/// 一条待投递的通知
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    /// 接收方 chat id
    pub recipient_id: i64,
    pub kind: NotificationKind,
    pub context: TicketContext,
    pub payload: NotificationPayload,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(
        recipient_id: i64,
        kind: NotificationKind,
        context: TicketContext,
        payload: NotificationPayload,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            recipient_id,
            kind,
            context,
            payload,
            created_at: Utc::now(),
        }
    }

    /// 渲染 Markdown 文本：标题、工单摘要，以及截断后的消息正文
    pub fn render(&self) -> String {
        let ctx = &self.context;
        let mut lines = vec![
            self.kind.headline().to_string(),
            String::new(),
            format!("📋 Ticket: `{}`", ctx.ticket_number),
        ];

        if self.kind.targets_admin() {
            if let Some(category) = &ctx.category_name {
                lines.push(format!("📁 Category: {}", escape_markdown(category)));
            }
            if let Some(user) = &ctx.user_name {
                lines.push(format!("👤 User: {}", escape_markdown(user)));
            }
            lines.push(format!("⚡ Priority: {}", ctx.priority));
        }

        if let Some(body) = self.payload.body() {
            let preview: String = body.chars().take(CONTENT_PREVIEW_CHARS).collect();
            lines.push(String::new());
            lines.push(escape_markdown(&preview));
        }

        lines.join("\n")
    }

    /// 管理员通知附带答复、关闭按钮
    pub fn actions(&self) -> Vec<InlineAction> {
        if !self.kind.targets_admin() {
            return Vec::new();
        }
        vec![
            InlineAction {
                text: "💬 Reply".to_string(),
                callback_data: format!("admin_reply_{}", self.context.ticket_id),
            },
            InlineAction {
                text: "✅ Close".to_string(),
                callback_data: format!("admin_close_{}", self.context.ticket_id),
            },
        ]
    }
}

/// 转义 legacy Markdown 的控制字符
pub fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        if matches!(ch, '_' | '*' | '`' | '[') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}
