// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde_json::json;
use ticketrs::config::settings::NotificationSettings;
use ticketrs::domain::models::notification::{
    MediaKind, Notification, NotificationKind, NotificationPayload, TicketContext,
};
use ticketrs::domain::models::ticket::Priority;
use ticketrs::domain::services::notification_service::{ChannelError, NotificationChannel};
use ticketrs::infrastructure::services::telegram_channel_impl::TelegramChannel;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn channel(server: &MockServer) -> TelegramChannel {
    TelegramChannel::new(&NotificationSettings {
        bot_token: "123:abc".to_string(),
        api_base_url: server.uri(),
        request_timeout_secs: 2,
        ..NotificationSettings::default()
    })
}

fn notification(kind: NotificationKind, payload: NotificationPayload) -> Notification {
    Notification::new(
        4242,
        kind,
        TicketContext {
            ticket_id: Uuid::nil(),
            ticket_number: "TKT-00C0FFEE".to_string(),
            title: "Refund".to_string(),
            priority: Priority::High,
            category_name: Some("Billing".to_string()),
            user_name: Some("Ali".to_string()),
        },
        payload,
    )
}

#[tokio::test]
async fn test_text_notification_uses_send_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/bot123:abc/sendMessage"))
        .and(body_partial_json(json!({ "chat_id": 4242, "parse_mode": "Markdown" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .expect(1)
        .mount(&server)
        .await;

    let result = channel(&server)
        .send(&notification(
            NotificationKind::TicketAssigned,
            NotificationPayload::Text {
                text: "Charged twice".to_string(),
            },
        ))
        .await;
    assert_eq!(result, Ok(()));
}

#[tokio::test]
async fn test_media_notification_uses_media_method() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/bot123:abc/sendPhoto"))
        .and(body_partial_json(json!({ "chat_id": 4242, "photo": "file-abc" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .expect(1)
        .mount(&server)
        .await;

    let result = channel(&server)
        .send(&notification(
            NotificationKind::UserFollowUp,
            NotificationPayload::Media {
                kind: MediaKind::Photo,
                media_ref: "file-abc".to_string(),
                caption: Some("Receipt".to_string()),
            },
        ))
        .await;
    assert_eq!(result, Ok(()));
}

#[tokio::test]
async fn test_location_sends_pin_then_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/bot123:abc/sendLocation"))
        .and(body_partial_json(json!({ "latitude": 41.3, "longitude": 69.2 })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/bot123:abc/sendMessage"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let result = channel(&server)
        .send(&notification(
            NotificationKind::AdminReplied,
            NotificationPayload::Location {
                latitude: 41.3,
                longitude: 69.2,
                caption: None,
            },
        ))
        .await;
    assert_eq!(result, Ok(()));
}

#[tokio::test]
async fn test_location_retry_resends_only_the_caption() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/bot123:abc/sendLocation"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    // First caption attempt fails transiently, the next one succeeds
    Mock::given(method("POST"))
        .and(path("/bot123:abc/sendMessage"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/bot123:abc/sendMessage"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let channel = channel(&server);
    let location = notification(
        NotificationKind::AdminReplied,
        NotificationPayload::Location {
            latitude: 41.3,
            longitude: 69.2,
            caption: Some("Office".to_string()),
        },
    );

    assert!(channel.send(&location).await.unwrap_err().is_transient());
    assert_eq!(channel.send(&location).await, Ok(()));

    let pins = server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.url.path().ends_with("/sendLocation"))
        .count();
    assert_eq!(pins, 1);
}

#[tokio::test]
async fn test_error_statuses_are_classified() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/bot123:abc/sendMessage"))
        .and(body_partial_json(json!({ "chat_id": 1 })))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/bot123:abc/sendMessage"))
        .and(body_partial_json(json!({ "chat_id": 2 })))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/bot123:abc/sendMessage"))
        .and(body_partial_json(json!({ "chat_id": 3 })))
        .respond_with(ResponseTemplate::new(400).set_body_string("chat not found"))
        .mount(&server)
        .await;

    let channel = channel(&server);
    let mut outcomes = Vec::new();
    for chat in [1, 2, 3] {
        let mut n = notification(
            NotificationKind::AdminReplied,
            NotificationPayload::Text {
                text: "hi".to_string(),
            },
        );
        n.recipient_id = chat;
        outcomes.push(channel.send(&n).await.unwrap_err());
    }

    assert!(outcomes[0].is_transient());
    assert!(outcomes[1].is_transient());
    assert!(matches!(&outcomes[2], ChannelError::Permanent(msg) if msg.contains("chat not found")));
}

#[tokio::test]
async fn test_unreachable_api_is_transient() {
    let channel = TelegramChannel::new(&NotificationSettings {
        bot_token: "123:abc".to_string(),
        api_base_url: "http://127.0.0.1:1".to_string(),
        request_timeout_secs: 2,
        ..NotificationSettings::default()
    });

    let err = channel
        .send(&notification(
            NotificationKind::AdminReplied,
            NotificationPayload::Text {
                text: "hi".to_string(),
            },
        ))
        .await
        .unwrap_err();
    assert!(err.is_transient());
}
