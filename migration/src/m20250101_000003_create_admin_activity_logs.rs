// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::m20250101_000001_create_users_and_admins::Admins;
use crate::m20250101_000002_create_tickets::Tickets;
use sea_orm_migration::prelude::*;

/// 管理员操作日志表迁移（只追加）
#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AdminActivityLogs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AdminActivityLogs::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    // NULL for system-driven closures
                    .col(ColumnDef::new(AdminActivityLogs::AdminId).uuid())
                    .col(ColumnDef::new(AdminActivityLogs::TicketId).uuid().not_null())
                    .col(ColumnDef::new(AdminActivityLogs::Action).string().not_null())
                    .col(
                        ColumnDef::new(AdminActivityLogs::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_admin_activity_logs_admin_id")
                            .from(AdminActivityLogs::Table, AdminActivityLogs::AdminId)
                            .to(Admins::Table, Admins::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_admin_activity_logs_ticket_id")
                            .from(AdminActivityLogs::Table, AdminActivityLogs::TicketId)
                            .to(Tickets::Table, Tickets::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_admin_activity_logs_admin_created")
                    .table(AdminActivityLogs::Table)
                    .col(AdminActivityLogs::AdminId)
                    .col(AdminActivityLogs::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_admin_activity_logs_ticket_id")
                    .table(AdminActivityLogs::Table)
                    .col(AdminActivityLogs::TicketId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AdminActivityLogs::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum AdminActivityLogs {
    Table,
    Id,
    AdminId,
    TicketId,
    Action,
    CreatedAt,
}
