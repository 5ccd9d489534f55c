// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::{new_ticket, setup};
use chrono::{Duration, Utc};
use ticketrs::config::settings::SweeperSettings;
use ticketrs::domain::models::activity_log::ActivityAction;
use ticketrs::domain::models::message::{ContentType, Sender};
use ticketrs::domain::models::ticket::TicketStatus;
use ticketrs::workers::expiration_worker::ExpirationWorker;

fn sweeper(ctx: &super::helpers::TestContext) -> ExpirationWorker {
    ExpirationWorker::new(
        ctx.repos.tickets.clone(),
        &SweeperSettings {
            threshold_secs: 600,
            ..SweeperSettings::default()
        },
    )
}

/// 十分钟内无人分配、无人答复的工单被系统关闭
#[tokio::test]
async fn test_unassigned_ticket_expires() {
    let ctx = setup().await;
    let category = ctx.category("Nobody").await;
    let user = ctx.user(1).await;
    let created = ctx
        .service
        .create_ticket(new_ticket(user.id, category.id, "Hello?"))
        .await
        .unwrap();
    assert!(created.assigned_admin.is_none());

    let worker = sweeper(&ctx);
    let later = Utc::now() + Duration::minutes(10) + Duration::seconds(1);
    assert_eq!(worker.sweep_expired_at(later).await.unwrap(), 1);

    let ticket = ctx
        .repos
        .tickets
        .find_by_id(created.ticket.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(ticket.status, TicketStatus::Closed);
    assert_eq!(ticket.closed_by_id, None);
    assert_eq!(ticket.close_reason, Some(worker.close_reason()));

    let log = ctx.service.ticket_activity(ticket.id).await.unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].action, ActivityAction::Closed);
    assert_eq!(log[0].admin_id, None);

    // The user may open a fresh ticket afterwards
    ctx.service
        .create_ticket(new_ticket(user.id, category.id, "Trying again"))
        .await
        .unwrap();
}

/// 分配后仍未答复的工单同样过期
#[tokio::test]
async fn test_assigned_but_unanswered_ticket_expires() {
    let ctx = setup().await;
    let category = ctx.category("Billing").await;
    ctx.admin(900, &[category.id]).await;
    let user = ctx.user(1).await;
    let ticket = ctx
        .service
        .create_ticket(new_ticket(user.id, category.id, "Hello?"))
        .await
        .unwrap()
        .ticket;

    let later = Utc::now() + Duration::minutes(15);
    assert_eq!(sweeper(&ctx).sweep_expired_at(later).await.unwrap(), 1);
    assert!(ctx
        .repos
        .tickets
        .find_by_id(ticket.id)
        .await
        .unwrap()
        .unwrap()
        .is_closed());
}

/// 有管理员答复的工单不会被扫描关闭
#[tokio::test]
async fn test_replied_ticket_survives_sweeps() {
    let ctx = setup().await;
    let category = ctx.category("Billing").await;
    let admin = ctx.admin(900, &[category.id]).await;
    let user = ctx.user(1).await;
    let ticket = ctx
        .service
        .create_ticket(new_ticket(user.id, category.id, "Hello?"))
        .await
        .unwrap()
        .ticket;
    ctx.service
        .record_message(
            ticket.id,
            Sender::Admin(admin.id),
            ContentType::Text,
            Some("Hi".to_string()),
            None,
        )
        .await
        .unwrap();

    let worker = sweeper(&ctx);
    for days in [1, 7, 30] {
        let later = Utc::now() + Duration::days(days);
        assert_eq!(worker.sweep_expired_at(later).await.unwrap(), 0);
    }
    let stored = ctx.repos.tickets.find_by_id(ticket.id).await.unwrap().unwrap();
    assert_eq!(stored.status, TicketStatus::InProgress);
}
