// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::{new_ticket, setup, TestContext};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use ticketrs::domain::models::activity_log::ActivityAction;
use ticketrs::domain::models::admin::AdminRole;
use ticketrs::domain::models::message::{ContentType, Message, Sender};
use ticketrs::domain::models::notification::{NotificationKind, NotificationPayload};
use ticketrs::domain::models::ticket::{Ticket, TicketStatus};
use ticketrs::domain::models::user::User;
use ticketrs::domain::repositories::activity_log_repository::TimeRange;
use ticketrs::domain::repositories::ticket_repository::{AssignmentWrite, TicketRepository};
use ticketrs::domain::repositories::RepositoryError;
use ticketrs::domain::services::ticket_service::TicketService;
use ticketrs::domain::services::TicketError;
use ticketrs::utils::errors::TICKET_NUMBER_CONFLICT;
use ticketrs::utils::ticket_number;
use uuid::Uuid;

#[tokio::test]
async fn test_create_ticket_persists_opening_message() {
    let ctx = setup().await;
    let category = ctx.category("Billing").await;
    let user = ctx.user(1).await;

    let created = ctx
        .service
        .create_ticket(new_ticket(user.id, category.id, "  My card was charged twice  "))
        .await
        .unwrap();
    let ticket = created.ticket;

    assert!(ticket_number::is_valid(&ticket.ticket_number));
    assert_eq!(ticket.description, "My card was charged twice");
    assert!(!ticket.title.is_empty());
    assert!(!ticket.admin_replied);

    let details = ctx.service.get_ticket(ticket.id).await.unwrap();
    assert_eq!(details.messages.len(), 1);
    assert_eq!(details.messages[0].sender, Sender::User(user.id));
    assert_eq!(
        details.messages[0].content.as_deref(),
        Some("My card was charged twice")
    );
}

/// 用户已有进行中的工单时拒绝新建，原工单不受影响
#[tokio::test]
async fn test_duplicate_open_ticket_is_rejected() {
    let ctx = setup().await;
    let category = ctx.category("Billing").await;
    let admin = ctx.admin(900, &[category.id]).await;
    let user = ctx.user(1).await;

    let first = ctx
        .service
        .create_ticket(new_ticket(user.id, category.id, "First problem"))
        .await
        .unwrap()
        .ticket;
    ctx.service
        .record_message(
            first.id,
            Sender::Admin(admin.id),
            ContentType::Text,
            Some("Checking".to_string()),
            None,
        )
        .await
        .unwrap();
    let before = ctx.repos.tickets.find_by_id(first.id).await.unwrap().unwrap();
    assert_eq!(before.status, TicketStatus::InProgress);

    let err = ctx
        .service
        .create_ticket(new_ticket(user.id, category.id, "Second problem"))
        .await
        .unwrap_err();
    match err {
        TicketError::DuplicateOpenTicket { ticket_number } => {
            assert_eq!(ticket_number, first.ticket_number)
        }
        other => panic!("expected duplicate error, got {:?}", other),
    }

    let after = ctx.repos.tickets.find_by_id(first.id).await.unwrap().unwrap();
    assert_eq!(after, before);
}

/// 关闭后可以再次建单
#[tokio::test]
async fn test_new_ticket_allowed_after_close() {
    let ctx = setup().await;
    let category = ctx.category("Billing").await;
    let user = ctx.user(1).await;

    let first = ctx
        .service
        .create_ticket(new_ticket(user.id, category.id, "First"))
        .await
        .unwrap()
        .ticket;
    ctx.service
        .close_ticket(first.id, None, "Resolved by user")
        .await
        .unwrap();

    let second = ctx
        .service
        .create_ticket(new_ticket(user.id, category.id, "Second"))
        .await
        .unwrap()
        .ticket;
    assert_ne!(second.ticket_number, first.ticket_number);
}

#[tokio::test]
async fn test_blocked_user_and_inactive_category() {
    let ctx = setup().await;
    let category = ctx.category("Billing").await;
    let mut user = User::new(1, Some("Spammer".to_string()));
    user.is_blocked = true;
    let blocked = ctx.repos.users.create(&user).await.unwrap();

    let err = ctx
        .service
        .create_ticket(new_ticket(blocked.id, category.id, "Let me in"))
        .await
        .unwrap_err();
    assert!(matches!(err, TicketError::Forbidden(_)));

    let other = ctx.user(2).await;
    let err = ctx
        .service
        .create_ticket(new_ticket(other.id, Uuid::new_v4(), "Unknown category"))
        .await
        .unwrap_err();
    assert!(matches!(err, TicketError::NotFound { entity: "category", .. }));
}

/// 管理员答复：状态转为 in_progress，写入日志，通知用户
#[tokio::test]
async fn test_admin_reply_moves_ticket_in_progress() {
    let ctx = setup().await;
    let category = ctx.category("Billing").await;
    let admin = ctx.admin(900, &[category.id]).await;
    let user = ctx.user(1).await;
    let ticket = ctx
        .service
        .create_ticket(new_ticket(user.id, category.id, "Refund"))
        .await
        .unwrap()
        .ticket;
    ctx.notifier.clear();

    let reply = ctx
        .service
        .record_message(
            ticket.id,
            Sender::Admin(admin.id),
            ContentType::Text,
            Some("Refund issued".to_string()),
            None,
        )
        .await
        .unwrap();
    assert_eq!(reply.sender, Sender::Admin(admin.id));

    let stored = ctx.repos.tickets.find_by_id(ticket.id).await.unwrap().unwrap();
    assert_eq!(stored.status, TicketStatus::InProgress);
    assert!(stored.admin_replied);
    assert!(stored.updated_at >= ticket.updated_at);

    let sent = ctx.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].kind, NotificationKind::AdminReplied);
    assert_eq!(sent[0].recipient_id, 1);
    assert_eq!(
        sent[0].payload,
        NotificationPayload::Text {
            text: "Refund issued".to_string()
        }
    );

    let actions: Vec<_> = ctx
        .service
        .ticket_activity(ticket.id)
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.action)
        .collect();
    assert_eq!(actions, vec![ActivityAction::Assigned, ActivityAction::Replied]);
}

/// 用户追加消息通知负责人，不改变状态
#[tokio::test]
async fn test_user_follow_up_notifies_assigned_admin() {
    let ctx = setup().await;
    let category = ctx.category("Billing").await;
    ctx.admin(900, &[category.id]).await;
    let user = ctx.user(1).await;
    let ticket = ctx
        .service
        .create_ticket(new_ticket(user.id, category.id, "Refund"))
        .await
        .unwrap()
        .ticket;
    ctx.notifier.clear();

    ctx.service
        .record_message(
            ticket.id,
            Sender::User(user.id),
            ContentType::Image,
            Some("Screenshot".to_string()),
            Some("file-123".to_string()),
        )
        .await
        .unwrap();

    let stored = ctx.repos.tickets.find_by_id(ticket.id).await.unwrap().unwrap();
    assert_eq!(stored.status, TicketStatus::WaitingAdmin);
    assert!(!stored.admin_replied);

    let sent = ctx.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].kind, NotificationKind::UserFollowUp);
    assert_eq!(sent[0].recipient_id, 900);
    assert!(matches!(sent[0].payload, NotificationPayload::Media { .. }));
    assert_eq!(ctx.service.get_ticket(ticket.id).await.unwrap().messages.len(), 2);
}

#[tokio::test]
async fn test_message_authorization() {
    let ctx = setup().await;
    let category = ctx.category("Billing").await;
    ctx.admin(900, &[category.id]).await;
    let outsider = ctx.admin(901, &[]).await;
    let super_admin = ctx
        .admin_with_role(902, AdminRole::SuperAdmin, &[])
        .await;
    let owner = ctx.user(1).await;
    let stranger = ctx.user(2).await;
    let ticket = ctx
        .service
        .create_ticket(new_ticket(owner.id, category.id, "Help"))
        .await
        .unwrap()
        .ticket;

    let err = ctx
        .service
        .record_message(ticket.id, Sender::User(stranger.id), ContentType::Text, Some("hi".into()), None)
        .await
        .unwrap_err();
    assert!(matches!(err, TicketError::Forbidden(_)));

    let err = ctx
        .service
        .record_message(ticket.id, Sender::Admin(outsider.id), ContentType::Text, Some("hi".into()), None)
        .await
        .unwrap_err();
    assert!(matches!(err, TicketError::Forbidden(_)));

    ctx.service
        .record_message(ticket.id, Sender::Admin(super_admin.id), ContentType::Text, Some("On it".into()), None)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_closed_ticket_rejects_messages_and_close_is_idempotent() {
    let ctx = setup().await;
    let category = ctx.category("Billing").await;
    let admin = ctx.admin(900, &[category.id]).await;
    let user = ctx.user(1).await;
    let ticket = ctx
        .service
        .create_ticket(new_ticket(user.id, category.id, "Help"))
        .await
        .unwrap()
        .ticket;

    let closed = ctx
        .service
        .close_ticket(ticket.id, Some(admin.id), "Resolved")
        .await
        .unwrap();
    assert_eq!(closed.status, TicketStatus::Closed);
    assert_eq!(closed.closed_by_id, Some(admin.id));
    assert_eq!(closed.close_reason.as_deref(), Some("Resolved"));
    assert!(closed.close_at.is_some());

    let again = ctx
        .service
        .close_ticket(ticket.id, Some(admin.id), "Resolved again")
        .await
        .unwrap();
    assert_eq!(again.close_reason.as_deref(), Some("Resolved"));

    let closes = ctx
        .service
        .ticket_activity(ticket.id)
        .await
        .unwrap()
        .into_iter()
        .filter(|e| e.action == ActivityAction::Closed)
        .count();
    assert_eq!(closes, 1);

    let err = ctx
        .service
        .record_message(ticket.id, Sender::User(user.id), ContentType::Text, Some("hello?".into()), None)
        .await
        .unwrap_err();
    assert!(matches!(err, TicketError::TicketClosed { .. }));
}

#[tokio::test]
async fn test_close_requires_reason_and_authorized_admin() {
    let ctx = setup().await;
    let category = ctx.category("Billing").await;
    ctx.admin(900, &[category.id]).await;
    let outsider = ctx.admin(901, &[]).await;
    let user = ctx.user(1).await;
    let ticket = ctx
        .service
        .create_ticket(new_ticket(user.id, category.id, "Help"))
        .await
        .unwrap()
        .ticket;

    let err = ctx.service.close_ticket(ticket.id, None, "   ").await.unwrap_err();
    assert!(matches!(err, TicketError::Validation(_)));

    let err = ctx
        .service
        .close_ticket(ticket.id, Some(outsider.id), "Not mine")
        .await
        .unwrap_err();
    assert!(matches!(err, TicketError::Forbidden(_)));

    // Closing without an admin is allowed
    let closed = ctx.service.close_ticket(ticket.id, None, "User withdrew").await.unwrap();
    assert_eq!(closed.closed_by_id, None);
}

#[tokio::test]
async fn test_mark_read_and_next_ticket() {
    let ctx = setup().await;
    let category = ctx.category("Billing").await;
    let admin = ctx.admin(900, &[category.id]).await;
    let first_user = ctx.user(1).await;
    let second_user = ctx.user(2).await;

    let first = ctx
        .service
        .create_ticket(new_ticket(first_user.id, category.id, "First"))
        .await
        .unwrap()
        .ticket;
    let second = ctx
        .service
        .create_ticket(new_ticket(second_user.id, category.id, "Second"))
        .await
        .unwrap()
        .ticket;

    let next = ctx.service.next_ticket(admin.id).await.unwrap().unwrap();
    assert_eq!(next.id, first.id);

    let read = ctx.service.mark_read(first.id, admin.id).await.unwrap();
    assert!(read.is_read);
    let read_at = read.read_at;
    assert!(read_at.is_some());
    // Marking twice keeps the first timestamp
    let again = ctx.service.mark_read(first.id, admin.id).await.unwrap();
    assert_eq!(again.read_at, read_at);

    ctx.service
        .record_message(first.id, Sender::Admin(admin.id), ContentType::Text, Some("Done".into()), None)
        .await
        .unwrap();
    let next = ctx.service.next_ticket(admin.id).await.unwrap().unwrap();
    assert_eq!(next.id, second.id);

    ctx.service
        .record_message(second.id, Sender::Admin(admin.id), ContentType::Text, Some("Done".into()), None)
        .await
        .unwrap();
    assert!(ctx.service.next_ticket(admin.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_activity_summary_counts_actions() {
    let ctx = setup().await;
    let category = ctx.category("Billing").await;
    let admin = ctx.admin(900, &[category.id]).await;
    let user = ctx.user(1).await;
    let ticket = ctx
        .service
        .create_ticket(new_ticket(user.id, category.id, "Help"))
        .await
        .unwrap()
        .ticket;
    for text in ["One", "Two"] {
        ctx.service
            .record_message(ticket.id, Sender::Admin(admin.id), ContentType::Text, Some(text.into()), None)
            .await
            .unwrap();
    }
    ctx.service
        .close_ticket(ticket.id, Some(admin.id), "Resolved")
        .await
        .unwrap();

    let summary = ctx
        .service
        .activity_summary(admin.id, TimeRange::default())
        .await
        .unwrap();
    assert_eq!(summary.assigned, 1);
    assert_eq!(summary.replied, 2);
    assert_eq!(summary.closed, 1);
    assert_eq!(summary.transferred, 0);

    let entries = ctx
        .service
        .activity_log(admin.id, TimeRange::default())
        .await
        .unwrap();
    assert_eq!(entries.len(), 4);
}

/// 在真实仓库之上注入故障：编号冲突与失效的活跃工单预查
struct FlakyTickets {
    inner: Arc<dyn TicketRepository>,
    number_collisions: AtomicUsize,
    hidden_active_lookups: AtomicUsize,
    attempted_numbers: Mutex<Vec<String>>,
}

impl FlakyTickets {
    fn new(inner: Arc<dyn TicketRepository>, collisions: usize, hidden_lookups: usize) -> Self {
        Self {
            inner,
            number_collisions: AtomicUsize::new(collisions),
            hidden_active_lookups: AtomicUsize::new(hidden_lookups),
            attempted_numbers: Mutex::new(Vec::new()),
        }
    }

    fn take(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl TicketRepository for FlakyTickets {
    async fn create(&self, ticket: &Ticket, opening: &Message) -> Result<Ticket, RepositoryError> {
        self.attempted_numbers
            .lock()
            .unwrap()
            .push(ticket.ticket_number.clone());
        if Self::take(&self.number_collisions) {
            return Err(RepositoryError::Conflict(TICKET_NUMBER_CONFLICT.to_string()));
        }
        self.inner.create(ticket, opening).await
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Ticket>, RepositoryError> {
        self.inner.find_by_id(id).await
    }

    async fn find_active_by_user(
        &self,
        user_id: Uuid,
    ) -> Result<Option<Ticket>, RepositoryError> {
        if Self::take(&self.hidden_active_lookups) {
            return Ok(None);
        }
        self.inner.find_active_by_user(user_id).await
    }

    async fn count_active_by_admins(
        &self,
        admin_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, u64>, RepositoryError> {
        self.inner.count_active_by_admins(admin_ids).await
    }

    async fn assign(&self, write: &AssignmentWrite) -> Result<Option<Ticket>, RepositoryError> {
        self.inner.assign(write).await
    }

    async fn record_admin_reply(
        &self,
        message: &Message,
        at: DateTime<Utc>,
    ) -> Result<Option<Ticket>, RepositoryError> {
        self.inner.record_admin_reply(message, at).await
    }

    async fn close(
        &self,
        ticket_id: Uuid,
        closed_by: Option<Uuid>,
        reason: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<Ticket>, RepositoryError> {
        self.inner.close(ticket_id, closed_by, reason, at).await
    }

    async fn find_stale(
        &self,
        threshold: DateTime<Utc>,
        limit: u64,
    ) -> Result<Vec<Ticket>, RepositoryError> {
        self.inner.find_stale(threshold, limit).await
    }

    async fn close_if_stale(
        &self,
        ticket_id: Uuid,
        threshold: DateTime<Utc>,
        reason: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        self.inner
            .close_if_stale(ticket_id, threshold, reason, at)
            .await
    }

    async fn mark_read(
        &self,
        ticket_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        self.inner.mark_read(ticket_id, at).await
    }

    async fn next_unanswered(
        &self,
        admin_id: Uuid,
    ) -> Result<Option<Ticket>, RepositoryError> {
        self.inner.next_unanswered(admin_id).await
    }
}

fn service_over(ctx: &TestContext, tickets: Arc<FlakyTickets>) -> TicketService {
    let mut repos = ctx.repos.clone();
    repos.tickets = tickets;
    TicketService::new(repos, ctx.notifier.clone())
}

/// 同一用户并发建单只有一条成功，其余都指向这条工单
#[tokio::test]
async fn test_concurrent_creates_leave_one_active_ticket() {
    let ctx = setup().await;
    let category = ctx.category("Billing").await;
    ctx.admin(900, &[category.id]).await;
    let user = ctx.user(1).await;

    let handles = (0..6).map(|i| {
        let service = ctx.service.clone();
        let request = new_ticket(user.id, category.id, &format!("Attempt {}", i));
        tokio::spawn(async move { service.create_ticket(request).await })
    });
    let results: Vec<_> = join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    let created: Vec<_> = results
        .iter()
        .filter_map(|r| r.as_ref().ok())
        .map(|c| c.ticket.ticket_number.clone())
        .collect();
    assert_eq!(created.len(), 1);

    for result in results.iter().filter_map(|r| r.as_ref().err()) {
        match result {
            TicketError::DuplicateOpenTicket { ticket_number } => {
                assert_eq!(ticket_number, &created[0])
            }
            other => panic!("expected duplicate error, got {:?}", other),
        }
    }

    let active = ctx
        .repos
        .tickets
        .find_active_by_user(user.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(active.ticket_number, created[0]);
}

/// 预查漏掉已有工单时，由存储层唯一约束拒绝第二条活跃工单
#[tokio::test]
async fn test_store_rejects_second_active_ticket_when_precheck_misses() {
    let ctx = setup().await;
    let category = ctx.category("Billing").await;
    let user = ctx.user(1).await;
    let first = ctx
        .service
        .create_ticket(new_ticket(user.id, category.id, "First problem"))
        .await
        .unwrap()
        .ticket;

    let tickets = Arc::new(FlakyTickets::new(ctx.repos.tickets.clone(), 0, 1));
    let service = service_over(&ctx, tickets.clone());

    let err = service
        .create_ticket(new_ticket(user.id, category.id, "Second problem"))
        .await
        .unwrap_err();
    match err {
        TicketError::DuplicateOpenTicket { ticket_number } => {
            assert_eq!(ticket_number, first.ticket_number)
        }
        other => panic!("expected duplicate error, got {:?}", other),
    }
    // The insert reached the store once and was not retried
    assert_eq!(tickets.attempted_numbers.lock().unwrap().len(), 1);

    let messages = ctx.repos.messages.find_by_ticket(first.id).await.unwrap();
    assert_eq!(messages.len(), 1);
}

/// 编号冲突时重新生成编号并重试
#[tokio::test]
async fn test_ticket_number_collision_is_retried_with_fresh_number() {
    let ctx = setup().await;
    let category = ctx.category("Billing").await;
    let user = ctx.user(1).await;

    let tickets = Arc::new(FlakyTickets::new(ctx.repos.tickets.clone(), 1, 0));
    let service = service_over(&ctx, tickets.clone());

    let created = service
        .create_ticket(new_ticket(user.id, category.id, "Printer jam"))
        .await
        .unwrap()
        .ticket;

    let attempted = tickets.attempted_numbers.lock().unwrap().clone();
    assert_eq!(attempted.len(), 2);
    assert_eq!(attempted[1], created.ticket_number);
    assert!(ticket_number::is_valid(&created.ticket_number));
}

/// 编号冲突次数用尽后以存储冲突返回，不写入任何工单
#[tokio::test]
async fn test_ticket_number_collisions_give_up_after_three_attempts() {
    let ctx = setup().await;
    let category = ctx.category("Billing").await;
    let user = ctx.user(1).await;

    let tickets = Arc::new(FlakyTickets::new(ctx.repos.tickets.clone(), 3, 0));
    let service = service_over(&ctx, tickets.clone());

    let err = service
        .create_ticket(new_ticket(user.id, category.id, "Printer jam"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        TicketError::Store(RepositoryError::Conflict(ref what)) if what == TICKET_NUMBER_CONFLICT
    ));
    assert_eq!(tickets.attempted_numbers.lock().unwrap().len(), 3);
    assert!(ctx
        .repos
        .tickets
        .find_active_by_user(user.id)
        .await
        .unwrap()
        .is_none());
}
