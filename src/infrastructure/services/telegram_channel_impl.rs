// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::NotificationSettings;
use crate::domain::models::notification::{MediaKind, Notification, NotificationPayload};
use crate::domain::services::notification_service::{ChannelError, NotificationChannel};
use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

/// Telegram Bot API 通知通道
pub struct TelegramChannel {
    /// HTTP 客户端
    client: Client,
    /// `{api_base_url}/bot{token}`
    endpoint: String,
    /// 定位已送达、说明文字尚未送达的通知
    pinned: Mutex<HashSet<Uuid>>,
}

impl TelegramChannel {
    /// 创建新的 Telegram 通道
    pub fn new(settings: &NotificationSettings) -> Self {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::USER_AGENT,
            header::HeaderValue::from_static("ticketrs-notifier/0.1.0"),
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()
            .unwrap_or_default();

        Self {
            client,
            endpoint: format!(
                "{}/bot{}",
                settings.api_base_url.trim_end_matches('/'),
                settings.bot_token
            ),
            pinned: Mutex::new(HashSet::new()),
        }
    }

    fn pinned(&self) -> std::sync::MutexGuard<'_, HashSet<Uuid>> {
        self.pinned.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn media_method(kind: MediaKind) -> (&'static str, &'static str) {
        match kind {
            MediaKind::Photo => ("sendPhoto", "photo"),
            MediaKind::Video => ("sendVideo", "video"),
            MediaKind::Audio => ("sendAudio", "audio"),
            MediaKind::Document => ("sendDocument", "document"),
        }
    }

    fn reply_markup(notification: &Notification) -> Option<Value> {
        let actions = notification.actions();
        if actions.is_empty() {
            return None;
        }
        let rows: Vec<Value> = actions
            .iter()
            .map(|a| json!([{ "text": a.text, "callback_data": a.callback_data }]))
            .collect();
        Some(json!({ "inline_keyboard": rows }))
    }

    fn text_request(notification: &Notification) -> Value {
        let mut body = json!({
            "chat_id": notification.recipient_id,
            "text": notification.render(),
            "parse_mode": "Markdown",
        });
        if let Some(markup) = Self::reply_markup(notification) {
            body["reply_markup"] = markup;
        }
        body
    }

    async fn call(&self, method: &str, body: &Value) -> Result<(), ChannelError> {
        let url = format!("{}/{}", self.endpoint, method);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_builder() {
                    ChannelError::Permanent(e.to_string())
                } else {
                    ChannelError::Transient(e.to_string())
                }
            })?;

        let status = response.status();
        if status.is_success() {
            debug!(method, "Bot API call succeeded");
            return Ok(());
        }

        let detail = response.text().await.unwrap_or_default();
        let message = format!("{} returned {}: {}", method, status, detail);
        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            Err(ChannelError::Transient(message))
        } else {
            Err(ChannelError::Permanent(message))
        }
    }
}

#[async_trait]
impl NotificationChannel for TelegramChannel {
    async fn send(&self, notification: &Notification) -> Result<(), ChannelError> {
        match &notification.payload {
            NotificationPayload::Text { .. } => {
                self.call("sendMessage", &Self::text_request(notification))
                    .await
            }
            NotificationPayload::Media { kind, media_ref, .. } => {
                let (method, field) = Self::media_method(*kind);
                let mut body = json!({
                    "chat_id": notification.recipient_id,
                    "caption": notification.render(),
                    "parse_mode": "Markdown",
                });
                body[field] = json!(media_ref);
                if let Some(markup) = Self::reply_markup(notification) {
                    body["reply_markup"] = markup;
                }
                self.call(method, &body).await
            }
            NotificationPayload::Location {
                latitude,
                longitude,
                ..
            } => {
                let pin = json!({
                    "chat_id": notification.recipient_id,
                    "latitude": latitude,
                    "longitude": longitude,
                });
                // A retry after a failed caption must not repeat the pin
                if !self.pinned().contains(&notification.id) {
                    self.call("sendLocation", &pin).await?;
                    self.pinned().insert(notification.id);
                }

                let result = self
                    .call("sendMessage", &Self::text_request(notification))
                    .await;
                if !matches!(result, Err(ChannelError::Transient(_))) {
                    self.pinned().remove(&notification.id);
                }
                result
            }
        }
    }
}
