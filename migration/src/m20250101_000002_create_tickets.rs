// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::m20250101_000001_create_users_and_admins::{Admins, Categories, Users};
use sea_orm_migration::prelude::*;

/// 工单与消息表迁移
#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Tickets::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Tickets::Id).uuid().not_null().primary_key())
                    .col(
                        ColumnDef::new(Tickets::TicketNumber)
                            .string_len(20)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Tickets::UserId).uuid().not_null())
                    .col(ColumnDef::new(Tickets::CategoryId).uuid().not_null())
                    .col(ColumnDef::new(Tickets::Title).string().not_null())
                    .col(ColumnDef::new(Tickets::Description).text().not_null())
                    .col(
                        ColumnDef::new(Tickets::Status)
                            .string()
                            .not_null()
                            .default("open"),
                    )
                    .col(
                        ColumnDef::new(Tickets::Priority)
                            .string()
                            .not_null()
                            .default("medium"),
                    )
                    .col(ColumnDef::new(Tickets::AssignedAdminId).uuid())
                    .col(ColumnDef::new(Tickets::ClosedById).uuid())
                    .col(ColumnDef::new(Tickets::CloseReason).text())
                    .col(
                        ColumnDef::new(Tickets::AdminReplied)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Tickets::IsRead)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Tickets::ReadAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Tickets::CloseAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Tickets::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Tickets::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_tickets_user_id")
                            .from(Tickets::Table, Tickets::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_tickets_category_id")
                            .from(Tickets::Table, Tickets::CategoryId)
                            .to(Categories::Table, Categories::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_tickets_assigned_admin_id")
                            .from(Tickets::Table, Tickets::AssignedAdminId)
                            .to(Admins::Table, Admins::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_tickets_closed_by_id")
                            .from(Tickets::Table, Tickets::ClosedById)
                            .to(Admins::Table, Admins::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        // Workload aggregation and stale scans
        manager
            .create_index(
                Index::create()
                    .name("idx_tickets_assigned_admin_status")
                    .table(Tickets::Table)
                    .col(Tickets::AssignedAdminId)
                    .col(Tickets::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_tickets_status_updated_at")
                    .table(Tickets::Table)
                    .col(Tickets::Status)
                    .col(Tickets::UpdatedAt)
                    .to_owned(),
            )
            .await?;

        // One active ticket per user, enforced by the store itself.
        // Partial indexes are supported by both Postgres and SQLite.
        manager
            .get_connection()
            .execute_unprepared(
                "CREATE UNIQUE INDEX IF NOT EXISTS idx_tickets_one_active_per_user \
                 ON tickets (user_id) \
                 WHERE status IN ('open', 'waiting_admin', 'in_progress')",
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Messages::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Messages::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Messages::TicketId).uuid().not_null())
                    .col(ColumnDef::new(Messages::SenderUserId).uuid())
                    .col(ColumnDef::new(Messages::SenderAdminId).uuid())
                    .col(
                        ColumnDef::new(Messages::ContentType)
                            .string()
                            .not_null()
                            .default("text"),
                    )
                    .col(ColumnDef::new(Messages::Content).text())
                    .col(ColumnDef::new(Messages::MediaRef).string())
                    .col(
                        ColumnDef::new(Messages::Timestamp)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_messages_ticket_id")
                            .from(Messages::Table, Messages::TicketId)
                            .to(Tickets::Table, Tickets::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_messages_ticket_id")
                    .table(Messages::Table)
                    .col(Messages::TicketId)
                    .col(Messages::Timestamp)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Messages::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Tickets::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Tickets {
    Table,
    Id,
    TicketNumber,
    UserId,
    CategoryId,
    Title,
    Description,
    Status,
    Priority,
    AssignedAdminId,
    ClosedById,
    CloseReason,
    AdminReplied,
    IsRead,
    ReadAt,
    CloseAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Messages {
    Table,
    Id,
    TicketId,
    SenderUserId,
    SenderAdminId,
    ContentType,
    Content,
    MediaRef,
    Timestamp,
}
