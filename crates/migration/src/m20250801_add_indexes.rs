use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Exactly one attendance record per (session, party)
        manager
            .create_index(
                Index::create()
                    .name("idx_attendance_records_session_party")
                    .table(AttendanceRecords::Table)
                    .col(AttendanceRecords::SessionId)
                    .col(AttendanceRecords::PartyId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Conflict detection looks up every session of a party
        manager
            .create_index(
                Index::create()
                    .name("idx_attendance_records_party_id")
                    .table(AttendanceRecords::Table)
                    .col(AttendanceRecords::PartyId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_class_participants_class_party")
                    .table(ClassParticipants::Table)
                    .col(ClassParticipants::ClassId)
                    .col(ClassParticipants::PartyId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_class_participants_party_id")
                    .table(ClassParticipants::Table)
                    .col(ClassParticipants::PartyId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_class_slots_class_weekday")
                    .table(ClassSlots::Table)
                    .col(ClassSlots::ClassId)
                    .col(ClassSlots::Weekday)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_sessions_class_start")
                    .table(Sessions::Table)
                    .col(Sessions::ClassId)
                    .col(Sessions::StartAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_reschedule_requests_session_status")
                    .table(RescheduleRequests::Table)
                    .col(RescheduleRequests::SessionId)
                    .col(RescheduleRequests::Status)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for name in [
            "idx_attendance_records_session_party",
            "idx_attendance_records_party_id",
            "idx_class_participants_class_party",
            "idx_class_participants_party_id",
            "idx_class_slots_class_weekday",
            "idx_sessions_class_start",
            "idx_reschedule_requests_session_status",
        ] {
            manager
                .drop_index(Index::drop().name(name).to_owned())
                .await?;
        }

        Ok(())
    }
}

#[derive(Iden)]
enum AttendanceRecords {
    Table,
    SessionId,
    PartyId,
}

#[derive(Iden)]
enum ClassParticipants {
    Table,
    ClassId,
    PartyId,
}

#[derive(Iden)]
enum ClassSlots {
    Table,
    ClassId,
    Weekday,
}

#[derive(Iden)]
enum Sessions {
    Table,
    ClassId,
    StartAt,
}

#[derive(Iden)]
enum RescheduleRequests {
    Table,
    SessionId,
    Status,
}
