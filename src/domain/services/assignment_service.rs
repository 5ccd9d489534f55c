// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::activity_log::ActivityAction;
use crate::domain::models::admin::Admin;
use crate::domain::models::notification::{
    Notification, NotificationKind, NotificationPayload, TicketContext,
};
use crate::domain::models::ticket::{Ticket, TicketStatus};
use crate::domain::repositories::ticket_repository::AssignmentWrite;
use crate::domain::repositories::Repositories;
use crate::domain::services::errors::TicketError;
use crate::domain::services::notification_service::Notifier;
use chrono::Utc;
use metrics::counter;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// 条件写入竞争失败后重新读取并重试的次数上限
const MAX_ASSIGN_ATTEMPTS: usize = 3;

/// 分配结果
#[derive(Debug, Clone)]
pub struct Assignment {
    pub ticket: Ticket,
    pub admin: Admin,
    /// 本次调用写入的操作；为空表示工单已归属该管理员，未发生写入
    pub action: Option<ActivityAction>,
}

impl Assignment {
    fn unchanged(ticket: Ticket, admin: Admin) -> Self {
        Self {
            ticket,
            admin,
            action: None,
        }
    }

    pub fn changed(&self) -> bool {
        self.action.is_some()
    }
}

/// 按 (工作量, 上次分配时间) 选出负载最轻的管理员
///
/// 从未分配过的管理员（`last_assigned_at` 为空）在同负载时优先。
pub fn select_least_loaded<'a>(
    admins: &'a [Admin],
    workloads: &HashMap<Uuid, u64>,
) -> Option<&'a Admin> {
    admins.iter().min_by_key(|admin| {
        (
            workloads.get(&admin.id).copied().unwrap_or(0),
            admin.last_assigned_at,
        )
    })
}

/// 管理员分配服务
///
/// 自动分配：分类资格 → 单次分组统计工作量 → 最小负载选择 → 条件写入。
/// 手动分配跳过工作量计算；工单已有其他负责人时即为转派。
pub struct AssignmentService {
    repos: Repositories,
    notifier: Arc<dyn Notifier>,
}

impl AssignmentService {
    pub fn new(repos: Repositories, notifier: Arc<dyn Notifier>) -> Self {
        Self { repos, notifier }
    }

    /// 分配工单
    ///
    /// # 参数
    ///
    /// * `ticket_id` - 工单ID
    /// * `admin_id` - 指定的管理员；为空时自动选择
    ///
    /// # 返回值
    ///
    /// * `Ok(Assignment)` - 分配后的工单与负责人
    /// * `Err(TicketError::NoEligibleAdmin)` - 没有合格管理员，工单保持 `open`
    pub async fn assign(
        &self,
        ticket_id: Uuid,
        admin_id: Option<Uuid>,
    ) -> Result<Assignment, TicketError> {
        self.assign_with_payload(ticket_id, admin_id, None).await
    }

    /// 分配工单，并以给定负载通知管理员（缺省为工单描述）
    pub(crate) async fn assign_with_payload(
        &self,
        ticket_id: Uuid,
        admin_id: Option<Uuid>,
        payload: Option<NotificationPayload>,
    ) -> Result<Assignment, TicketError> {
        let assignment = match admin_id {
            Some(admin_id) => self.assign_manually(ticket_id, admin_id).await?,
            None => self.assign_automatically(ticket_id).await?,
        };

        if let Some(action) = assignment.action {
            let kind = match action {
                ActivityAction::Transferred => NotificationKind::TicketTransferred,
                _ => NotificationKind::TicketAssigned,
            };
            let payload = payload.unwrap_or_else(|| NotificationPayload::Text {
                text: assignment.ticket.description.clone(),
            });
            self.notify_admin(&assignment.ticket, &assignment.admin, kind, payload)
                .await;
        }

        Ok(assignment)
    }

    async fn load_ticket(&self, ticket_id: Uuid) -> Result<Ticket, TicketError> {
        let ticket = self
            .repos
            .tickets
            .find_by_id(ticket_id)
            .await?
            .ok_or_else(|| TicketError::not_found("ticket", ticket_id))?;

        if ticket.is_closed() {
            return Err(TicketError::TicketClosed {
                ticket_number: ticket.ticket_number,
            });
        }
        Ok(ticket)
    }

    async fn load_admin(&self, admin_id: Uuid) -> Result<Admin, TicketError> {
        self.repos
            .admins
            .find_by_id(admin_id)
            .await?
            .ok_or_else(|| TicketError::not_found("admin", admin_id))
    }

    async fn assign_automatically(&self, ticket_id: Uuid) -> Result<Assignment, TicketError> {
        for attempt in 1..=MAX_ASSIGN_ATTEMPTS {
            let ticket = self.load_ticket(ticket_id).await?;

            // Already routed; exactly one assignment per ticket
            if let Some(current) = ticket.assigned_admin_id {
                let admin = self.load_admin(current).await?;
                return Ok(Assignment::unchanged(ticket, admin));
            }
            ticket.ensure_transition(TicketStatus::WaitingAdmin)?;

            let eligible = self.repos.admins.find_eligible(ticket.category_id).await?;
            if eligible.is_empty() {
                counter!("tickets_unassigned_total").increment(1);
                warn!(
                    ticket_id = %ticket.id,
                    category_id = %ticket.category_id,
                    "No eligible admin; ticket stays open"
                );
                return Err(TicketError::NoEligibleAdmin {
                    category_id: ticket.category_id,
                });
            }

            let ids: Vec<Uuid> = eligible.iter().map(|a| a.id).collect();
            let workloads = self.repos.tickets.count_active_by_admins(&ids).await?;
            let Some(selected) = select_least_loaded(&eligible, &workloads) else {
                return Err(TicketError::NoEligibleAdmin {
                    category_id: ticket.category_id,
                });
            };

            debug!(
                ticket_id = %ticket.id,
                admin_id = %selected.id,
                workload = workloads.get(&selected.id).copied().unwrap_or(0),
                "Selected least loaded admin"
            );

            let write = AssignmentWrite {
                ticket_id: ticket.id,
                admin_id: selected.id,
                expected_admin_id: None,
                action: ActivityAction::Assigned,
                at: Utc::now(),
            };

            if let Some(updated) = self.repos.tickets.assign(&write).await? {
                counter!("tickets_assigned_total", "mode" => "auto").increment(1);
                info!(
                    ticket_number = %updated.ticket_number,
                    admin_id = %selected.id,
                    "Ticket assigned"
                );
                let mut admin = selected.clone();
                admin.last_assigned_at = Some(write.at);
                return Ok(Assignment {
                    ticket: updated,
                    admin,
                    action: Some(write.action),
                });
            }

            debug!(ticket_id = %ticket_id, attempt, "Assignment raced, re-reading ticket");
        }

        self.settled(ticket_id).await
    }

    async fn assign_manually(
        &self,
        ticket_id: Uuid,
        admin_id: Uuid,
    ) -> Result<Assignment, TicketError> {
        let admin = self.load_admin(admin_id).await?;
        if admin.is_blocked {
            return Err(TicketError::Forbidden(format!(
                "admin {} is blocked",
                admin_id
            )));
        }

        for attempt in 1..=MAX_ASSIGN_ATTEMPTS {
            let ticket = self.load_ticket(ticket_id).await?;

            if ticket.assigned_admin_id == Some(admin.id) {
                return Ok(Assignment::unchanged(ticket, admin));
            }
            ticket.ensure_transition(TicketStatus::WaitingAdmin)?;

            let action = if ticket.assigned_admin_id.is_some() {
                ActivityAction::Transferred
            } else {
                ActivityAction::Assigned
            };

            let write = AssignmentWrite {
                ticket_id: ticket.id,
                admin_id: admin.id,
                expected_admin_id: ticket.assigned_admin_id,
                action,
                at: Utc::now(),
            };

            if let Some(updated) = self.repos.tickets.assign(&write).await? {
                counter!("tickets_assigned_total", "mode" => "manual").increment(1);
                info!(
                    ticket_number = %updated.ticket_number,
                    admin_id = %admin.id,
                    previous_admin_id = ?ticket.assigned_admin_id,
                    action = %action,
                    "Ticket assigned manually"
                );
                let mut admin = admin;
                admin.last_assigned_at = Some(write.at);
                return Ok(Assignment {
                    ticket: updated,
                    admin,
                    action: Some(action),
                });
            }

            debug!(ticket_id = %ticket_id, attempt, "Manual assignment raced, re-reading ticket");
        }

        self.settled(ticket_id).await
    }

    /// 多次竞争失败后返回工单的当前归属
    async fn settled(&self, ticket_id: Uuid) -> Result<Assignment, TicketError> {
        let ticket = self.load_ticket(ticket_id).await?;
        match ticket.assigned_admin_id {
            Some(current) => {
                let admin = self.load_admin(current).await?;
                Ok(Assignment::unchanged(ticket, admin))
            }
            None => Err(TicketError::NoEligibleAdmin {
                category_id: ticket.category_id,
            }),
        }
    }

    /// 构造通知上下文：分类名称按接收方语言，用户名取工单提交者
    pub(crate) async fn ticket_context(&self, ticket: &Ticket, language: &str) -> TicketContext {
        let category = match self.repos.categories.find_by_id(ticket.category_id).await {
            Ok(category) => category.map(|c| c.name(language).to_string()),
            Err(e) => {
                warn!(ticket_id = %ticket.id, "Failed to load category for notification: {}", e);
                None
            }
        };
        let user = match self.repos.users.find_by_id(ticket.user_id).await {
            Ok(user) => user.map(|u| u.display_name()),
            Err(e) => {
                warn!(ticket_id = %ticket.id, "Failed to load user for notification: {}", e);
                None
            }
        };

        TicketContext::from_ticket(ticket)
            .with_category(category)
            .with_user(user)
    }

    /// 通知管理员；查找失败只记录日志
    pub(crate) async fn notify_admin(
        &self,
        ticket: &Ticket,
        admin: &Admin,
        kind: NotificationKind,
        payload: NotificationPayload,
    ) {
        let recipient = match self.repos.users.find_by_id(admin.user_id).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                warn!(admin_id = %admin.id, "Admin has no user record; skipping notification");
                return;
            }
            Err(e) => {
                warn!(admin_id = %admin.id, "Failed to load admin user: {}", e);
                return;
            }
        };

        let context = self.ticket_context(ticket, &recipient.language).await;
        self.notifier
            .notify(Notification::new(recipient.telegram_id, kind, context, payload));
    }
}
