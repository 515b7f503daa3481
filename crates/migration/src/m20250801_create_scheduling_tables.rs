use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Identity store, read-only to the scheduler
        manager
            .create_table(
                Table::create()
                    .table(Profiles::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Profiles::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Profiles::DisplayName).string().not_null())
                    .col(ColumnDef::new(Profiles::Role).string().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Classes::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Classes::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Classes::Title).string().not_null())
                    .col(ColumnDef::new(Classes::Subject).string().not_null())
                    .col(ColumnDef::new(Classes::Timezone).string().not_null())
                    .col(ColumnDef::new(Classes::StartDate).date().not_null())
                    .col(ColumnDef::new(Classes::EndDate).date().not_null())
                    .col(ColumnDef::new(Classes::DaysPattern).string().not_null())
                    .col(ColumnDef::new(Classes::GeneratedThrough).date())
                    .col(
                        ColumnDef::new(Classes::Archived)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Classes::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // One row per scheduled weekday of a class
        manager
            .create_table(
                Table::create()
                    .table(ClassSlots::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ClassSlots::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ClassSlots::ClassId).uuid().not_null())
                    .col(ColumnDef::new(ClassSlots::Weekday).small_integer().not_null())
                    .col(ColumnDef::new(ClassSlots::StartTime).time().not_null())
                    .col(ColumnDef::new(ClassSlots::EndTime).time().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-class_slots-class_id")
                            .from(ClassSlots::Table, ClassSlots::ClassId)
                            .to(Classes::Table, Classes::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create class_participants junction table (many-to-many)
        manager
            .create_table(
                Table::create()
                    .table(ClassParticipants::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ClassParticipants::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ClassParticipants::ClassId).uuid().not_null())
                    .col(ColumnDef::new(ClassParticipants::PartyId).uuid().not_null())
                    .col(ColumnDef::new(ClassParticipants::Role).string().not_null())
                    .col(
                        ColumnDef::new(ClassParticipants::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-class_participants-class_id")
                            .from(ClassParticipants::Table, ClassParticipants::ClassId)
                            .to(Classes::Table, Classes::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Sessions::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Sessions::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Sessions::ClassId).uuid().not_null())
                    .col(
                        ColumnDef::new(Sessions::StartAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Sessions::EndAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Sessions::Status).string().not_null())
                    .col(ColumnDef::new(Sessions::CancellationReason).text())
                    .col(ColumnDef::new(Sessions::CancelledBy).uuid())
                    .col(ColumnDef::new(Sessions::ActualStartAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Sessions::ActualEndAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Sessions::ReschedulePending)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Sessions::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-sessions-class_id")
                            .from(Sessions::Table, Sessions::ClassId)
                            .to(Classes::Table, Classes::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(AttendanceRecords::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AttendanceRecords::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(AttendanceRecords::SessionId).uuid().not_null())
                    .col(ColumnDef::new(AttendanceRecords::PartyId).uuid().not_null())
                    .col(ColumnDef::new(AttendanceRecords::PartyRole).string().not_null())
                    .col(ColumnDef::new(AttendanceRecords::Status).string().not_null())
                    .col(ColumnDef::new(AttendanceRecords::MarkedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-attendance_records-session_id")
                            .from(AttendanceRecords::Table, AttendanceRecords::SessionId)
                            .to(Sessions::Table, Sessions::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(RescheduleRequests::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RescheduleRequests::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(RescheduleRequests::SessionId).uuid().not_null())
                    .col(ColumnDef::new(RescheduleRequests::RequesterId).uuid().not_null())
                    .col(ColumnDef::new(RescheduleRequests::Reason).text().not_null())
                    .col(
                        ColumnDef::new(RescheduleRequests::RequestedStartAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(RescheduleRequests::Status).string().not_null())
                    .col(ColumnDef::new(RescheduleRequests::ProcessedBy).uuid())
                    .col(
                        ColumnDef::new(RescheduleRequests::ProcessedAt)
                            .timestamp_with_time_zone(),
                    )
                    .col(
                        ColumnDef::new(RescheduleRequests::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-reschedule_requests-session_id")
                            .from(RescheduleRequests::Table, RescheduleRequests::SessionId)
                            .to(Sessions::Table, Sessions::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Drop tables in reverse order to handle foreign key constraints
        manager
            .drop_table(Table::drop().table(RescheduleRequests::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(AttendanceRecords::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Sessions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ClassParticipants::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ClassSlots::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Classes::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Profiles::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(Iden)]
enum Profiles {
    Table,
    Id,
    DisplayName,
    Role,
}

#[derive(Iden)]
enum Classes {
    Table,
    Id,
    Title,
    Subject,
    Timezone,
    StartDate,
    EndDate,
    DaysPattern,
    GeneratedThrough,
    Archived,
    CreatedAt,
}

#[derive(Iden)]
enum ClassSlots {
    Table,
    Id,
    ClassId,
    Weekday,
    StartTime,
    EndTime,
}

#[derive(Iden)]
enum ClassParticipants {
    Table,
    Id,
    ClassId,
    PartyId,
    Role,
    CreatedAt,
}

#[derive(Iden)]
enum Sessions {
    Table,
    Id,
    ClassId,
    StartAt,
    EndAt,
    Status,
    CancellationReason,
    CancelledBy,
    ActualStartAt,
    ActualEndAt,
    ReschedulePending,
    UpdatedAt,
}

#[derive(Iden)]
enum AttendanceRecords {
    Table,
    Id,
    SessionId,
    PartyId,
    PartyRole,
    Status,
    MarkedAt,
}

#[derive(Iden)]
enum RescheduleRequests {
    Table,
    Id,
    SessionId,
    RequesterId,
    Reason,
    RequestedStartAt,
    Status,
    ProcessedBy,
    ProcessedAt,
    CreatedAt,
}
