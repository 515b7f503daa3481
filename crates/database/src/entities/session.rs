use models::{conflict::Interval, status::SessionStatus};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sessions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub class_id: Uuid,
    pub start_at: DateTimeUtc,
    pub end_at: DateTimeUtc,
    pub status: String,
    pub cancellation_reason: Option<String>,
    pub cancelled_by: Option<Uuid>,
    pub actual_start_at: Option<DateTimeUtc>,
    pub actual_end_at: Option<DateTimeUtc>,
    /// Set while a reschedule request for this session awaits a decision
    pub reschedule_pending: bool,
    pub updated_at: DateTimeUtc,
}

impl Model {
    pub fn status(&self) -> Result<SessionStatus, DbErr> {
        self.status
            .parse()
            .map_err(|_| DbErr::Type(format!("unknown session status '{}'", self.status)))
    }

    pub fn interval(&self) -> Interval {
        Interval::new(self.start_at, self.end_at)
    }

    pub fn duration(&self) -> chrono::Duration {
        self.end_at - self.start_at
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::class::Entity",
        from = "Column::ClassId",
        to = "super::class::Column::Id"
    )]
    Class,
    #[sea_orm(has_many = "super::attendance_record::Entity")]
    AttendanceRecords,
    #[sea_orm(has_many = "super::reschedule_request::Entity")]
    RescheduleRequests,
}

impl Related<super::class::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Class.def()
    }
}

impl Related<super::attendance_record::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AttendanceRecords.def()
    }
}

impl Related<super::reschedule_request::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RescheduleRequests.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
