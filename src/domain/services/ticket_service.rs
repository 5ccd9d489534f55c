// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::activity_log::{ActivityLogEntry, ActivitySummary};
use crate::domain::models::admin::Admin;
use crate::domain::models::message::{ContentType, Message, Sender};
use crate::domain::models::notification::{Notification, NotificationKind, NotificationPayload};
use crate::domain::models::ticket::{Priority, Ticket, TicketStatus};
use crate::domain::repositories::activity_log_repository::TimeRange;
use crate::domain::repositories::Repositories;
use crate::domain::services::assignment_service::{Assignment, AssignmentService};
use crate::domain::services::errors::TicketError;
use crate::domain::services::notification_service::Notifier;
use crate::utils::errors::{RepositoryError, ACTIVE_TICKET_CONFLICT, TICKET_NUMBER_CONFLICT};
use crate::utils::ticket_number;
use chrono::Utc;
use metrics::counter;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// 编号冲突时重新生成的次数上限
const TICKET_NUMBER_ATTEMPTS: usize = 3;

/// 新建工单请求
#[derive(Debug, Clone)]
pub struct NewTicket {
    pub user_id: Uuid,
    pub category_id: Uuid,
    /// 为空时由描述推导
    pub title: Option<String>,
    pub description: String,
    pub priority: Priority,
    /// 首条消息的内容类型
    pub content_type: ContentType,
    pub media_ref: Option<String>,
}

/// 建单结果
#[derive(Debug, Clone, Serialize)]
pub struct TicketCreated {
    pub ticket: Ticket,
    pub assigned_admin: Option<Admin>,
    /// 未能分配时的原因，工单保持 `open`
    pub assignment_warning: Option<String>,
}

/// 工单详情
#[derive(Debug, Clone, Serialize)]
pub struct TicketDetails {
    pub ticket: Ticket,
    pub messages: Vec<Message>,
}

/// 工单服务
///
/// 对外暴露建单、分配、消息、关闭等操作，负责授权、状态校验和通知触发。
/// 状态写入提交之后才投递通知，通知失败不影响操作结果。
pub struct TicketService {
    repos: Repositories,
    assignment: Arc<AssignmentService>,
    notifier: Arc<dyn Notifier>,
}

impl TicketService {
    pub fn new(repos: Repositories, notifier: Arc<dyn Notifier>) -> Self {
        let assignment = Arc::new(AssignmentService::new(repos.clone(), notifier.clone()));
        Self {
            repos,
            assignment,
            notifier,
        }
    }

    pub fn repositories(&self) -> &Repositories {
        &self.repos
    }

    /// 创建工单并尝试自动分配
    ///
    /// # 返回值
    ///
    /// * `Ok(TicketCreated)` - 工单已创建；无合格管理员时 `assigned_admin` 为空
    /// * `Err(TicketError::DuplicateOpenTicket)` - 用户已有活跃工单
    pub async fn create_ticket(&self, request: NewTicket) -> Result<TicketCreated, TicketError> {
        let user = self
            .repos
            .users
            .find_by_id(request.user_id)
            .await?
            .ok_or_else(|| TicketError::not_found("user", request.user_id))?;
        if user.is_blocked {
            return Err(TicketError::Forbidden(format!("user {} is blocked", user.id)));
        }

        match self.repos.categories.find_by_id(request.category_id).await? {
            Some(category) if category.is_active => {}
            _ => return Err(TicketError::not_found("category", request.category_id)),
        }

        if let Some(existing) = self.repos.tickets.find_active_by_user(user.id).await? {
            return Err(TicketError::DuplicateOpenTicket {
                ticket_number: existing.ticket_number,
            });
        }

        let description = request.description.trim().to_string();
        let title = request
            .title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| Ticket::derive_title(&description, request.content_type));

        let mut ticket = Ticket::new(
            String::new(),
            user.id,
            request.category_id,
            title,
            description.clone(),
            request.priority,
        );
        let opening = Message::new(
            ticket.id,
            Sender::User(user.id),
            request.content_type,
            Some(description),
            request.media_ref,
        )?;

        let ticket = self.insert_with_fresh_number(&mut ticket, &opening).await?;
        counter!("tickets_created_total").increment(1);
        info!(
            ticket_number = %ticket.ticket_number,
            user_id = %ticket.user_id,
            category_id = %ticket.category_id,
            "Ticket created"
        );

        let payload = NotificationPayload::from_message(&opening);
        match self
            .assignment
            .assign_with_payload(ticket.id, None, Some(payload))
            .await
        {
            Ok(Assignment { ticket, admin, .. }) => Ok(TicketCreated {
                ticket,
                assigned_admin: Some(admin),
                assignment_warning: None,
            }),
            // The ticket is committed; a failed assignment leaves it open
            Err(err) => {
                warn!(ticket_number = %ticket.ticket_number, "Ticket left unassigned: {}", err);
                Ok(TicketCreated {
                    ticket,
                    assigned_admin: None,
                    assignment_warning: Some(err.to_string()),
                })
            }
        }
    }

    async fn insert_with_fresh_number(
        &self,
        ticket: &mut Ticket,
        opening: &Message,
    ) -> Result<Ticket, TicketError> {
        for attempt in 1..=TICKET_NUMBER_ATTEMPTS {
            ticket.ticket_number = ticket_number::generate();
            match self.repos.tickets.create(ticket, opening).await {
                Ok(created) => return Ok(created),
                Err(err) if err.is_conflict_on(TICKET_NUMBER_CONFLICT) => {
                    debug!(attempt, "Ticket number collision, regenerating");
                }
                Err(err) if err.is_conflict_on(ACTIVE_TICKET_CONFLICT) => {
                    let existing = self.repos.tickets.find_active_by_user(ticket.user_id).await?;
                    return Err(TicketError::DuplicateOpenTicket {
                        ticket_number: existing
                            .map(|t| t.ticket_number)
                            .unwrap_or_default(),
                    });
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(RepositoryError::Conflict(TICKET_NUMBER_CONFLICT.to_string()).into())
    }

    /// 分配或转派工单
    pub async fn assign_admin(
        &self,
        ticket_id: Uuid,
        admin_id: Option<Uuid>,
    ) -> Result<Assignment, TicketError> {
        self.assignment.assign(ticket_id, admin_id).await
    }

    /// 记录一条消息并触发相应的状态转换与通知
    ///
    /// 用户消息通知已分配的管理员；管理员消息将工单置为 `in_progress` 并通知用户。
    pub async fn record_message(
        &self,
        ticket_id: Uuid,
        sender: Sender,
        content_type: ContentType,
        content: Option<String>,
        media_ref: Option<String>,
    ) -> Result<Message, TicketError> {
        let ticket = self.load_ticket(ticket_id).await?;
        if ticket.is_closed() {
            return Err(TicketError::TicketClosed {
                ticket_number: ticket.ticket_number,
            });
        }

        let message = Message::new(ticket.id, sender, content_type, content, media_ref)?;

        match sender {
            Sender::User(user_id) => {
                if ticket.user_id != user_id {
                    return Err(TicketError::Forbidden(format!(
                        "user {} does not own ticket {}",
                        user_id, ticket.ticket_number
                    )));
                }
                let saved = self.repos.messages.create(&message).await?;
                self.notify_follow_up(&ticket, &saved).await;
                Ok(saved)
            }
            Sender::Admin(admin_id) => {
                let admin = self.authorize_admin(admin_id, &ticket).await?;
                ticket.ensure_transition(TicketStatus::InProgress)?;
                let Some(updated) = self
                    .repos
                    .tickets
                    .record_admin_reply(&message, Utc::now())
                    .await?
                else {
                    return Err(TicketError::TicketClosed {
                        ticket_number: ticket.ticket_number,
                    });
                };
                info!(
                    ticket_number = %updated.ticket_number,
                    admin_id = %admin.id,
                    "Admin replied"
                );
                self.notify_user(&updated, &message).await;
                Ok(message)
            }
        }
    }

    /// 关闭工单
    ///
    /// 已关闭的工单直接返回，不重复记录日志。
    /// `closed_by` 为空表示系统或用户关闭。
    pub async fn close_ticket(
        &self,
        ticket_id: Uuid,
        closed_by: Option<Uuid>,
        reason: &str,
    ) -> Result<Ticket, TicketError> {
        let ticket = self.load_ticket(ticket_id).await?;
        // Closing a closed ticket is a no-op
        if ticket.ensure_transition(TicketStatus::Closed).is_err() {
            debug!(ticket_number = %ticket.ticket_number, "Ticket already closed");
            return Ok(ticket);
        }

        let reason = reason.trim();
        if reason.is_empty() {
            return Err(TicketError::Validation("close reason must not be empty".to_string()));
        }

        if let Some(admin_id) = closed_by {
            self.authorize_admin(admin_id, &ticket).await?;
        }

        match self
            .repos
            .tickets
            .close(ticket.id, closed_by, reason, Utc::now())
            .await?
        {
            Some(closed) => {
                counter!("tickets_closed_total", "reason" => "manual").increment(1);
                info!(
                    ticket_number = %closed.ticket_number,
                    closed_by = ?closed_by,
                    "Ticket closed"
                );
                Ok(closed)
            }
            // Closed concurrently
            None => self.load_ticket(ticket_id).await,
        }
    }

    /// 管理员标记工单已读
    pub async fn mark_read(&self, ticket_id: Uuid, admin_id: Uuid) -> Result<Ticket, TicketError> {
        let ticket = self.load_ticket(ticket_id).await?;
        self.authorize_admin(admin_id, &ticket).await?;

        if self.repos.tickets.mark_read(ticket.id, Utc::now()).await? {
            debug!(ticket_number = %ticket.ticket_number, admin_id = %admin_id, "Ticket marked read");
        }
        self.load_ticket(ticket_id).await
    }

    /// 管理员最早的未答复工单
    pub async fn next_ticket(&self, admin_id: Uuid) -> Result<Option<Ticket>, TicketError> {
        self.load_admin(admin_id).await?;
        Ok(self.repos.tickets.next_unanswered(admin_id).await?)
    }

    /// 查询工单及其消息
    pub async fn get_ticket(&self, ticket_id: Uuid) -> Result<TicketDetails, TicketError> {
        let ticket = self.load_ticket(ticket_id).await?;
        let messages = self.repos.messages.find_by_ticket(ticket.id).await?;
        Ok(TicketDetails { ticket, messages })
    }

    /// 管理员在区间内的操作统计
    pub async fn activity_summary(
        &self,
        admin_id: Uuid,
        range: TimeRange,
    ) -> Result<ActivitySummary, TicketError> {
        self.load_admin(admin_id).await?;
        Ok(self.repos.activity_logs.summarize(admin_id, range).await?)
    }

    /// 管理员在区间内的操作日志
    pub async fn activity_log(
        &self,
        admin_id: Uuid,
        range: TimeRange,
    ) -> Result<Vec<ActivityLogEntry>, TicketError> {
        Ok(self.repos.activity_logs.find_by_admin(admin_id, range).await?)
    }

    /// 区间内所有管理员与系统的操作日志
    pub async fn activity_in_range(
        &self,
        range: TimeRange,
    ) -> Result<Vec<ActivityLogEntry>, TicketError> {
        Ok(self.repos.activity_logs.find_in_range(range).await?)
    }

    /// 工单的全部操作日志
    pub async fn ticket_activity(&self, ticket_id: Uuid) -> Result<Vec<ActivityLogEntry>, TicketError> {
        Ok(self.repos.activity_logs.find_by_ticket(ticket_id).await?)
    }

    async fn load_ticket(&self, ticket_id: Uuid) -> Result<Ticket, TicketError> {
        self.repos
            .tickets
            .find_by_id(ticket_id)
            .await?
            .ok_or_else(|| TicketError::not_found("ticket", ticket_id))
    }

    async fn load_admin(&self, admin_id: Uuid) -> Result<Admin, TicketError> {
        self.repos
            .admins
            .find_by_id(admin_id)
            .await?
            .ok_or_else(|| TicketError::not_found("admin", admin_id))
    }

    /// 管理员必须未被封禁，且是负责人或超级管理员
    async fn authorize_admin(&self, admin_id: Uuid, ticket: &Ticket) -> Result<Admin, TicketError> {
        let admin = self.load_admin(admin_id).await?;
        if !admin.can_act_on(ticket) {
            warn!(
                admin_id = %admin_id,
                ticket_number = %ticket.ticket_number,
                "Admin is not allowed to act on ticket"
            );
            return Err(TicketError::Forbidden(format!(
                "admin {} is not assigned to ticket {}",
                admin_id, ticket.ticket_number
            )));
        }
        Ok(admin)
    }

    async fn notify_follow_up(&self, ticket: &Ticket, message: &Message) {
        let Some(admin_id) = ticket.assigned_admin_id else {
            return;
        };
        match self.repos.admins.find_by_id(admin_id).await {
            Ok(Some(admin)) => {
                self.assignment
                    .notify_admin(
                        ticket,
                        &admin,
                        NotificationKind::UserFollowUp,
                        NotificationPayload::from_message(message),
                    )
                    .await;
            }
            Ok(None) => warn!(admin_id = %admin_id, "Assigned admin no longer exists"),
            Err(e) => warn!(admin_id = %admin_id, "Failed to load assigned admin: {}", e),
        }
    }

    async fn notify_user(&self, ticket: &Ticket, message: &Message) {
        let user = match self.repos.users.find_by_id(ticket.user_id).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                warn!(user_id = %ticket.user_id, "Ticket owner no longer exists");
                return;
            }
            Err(e) => {
                warn!(user_id = %ticket.user_id, "Failed to load ticket owner: {}", e);
                return;
            }
        };

        let context = self.assignment.ticket_context(ticket, &user.language).await;
        self.notifier.notify(Notification::new(
            user.telegram_id,
            NotificationKind::AdminReplied,
            context,
            NotificationPayload::from_message(message),
        ));
    }
}
