use models::status::AttendanceStatus;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One row per (session, party); unique on that pair
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "attendance_records")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub session_id: Uuid,
    pub party_id: Uuid,
    pub party_role: String, // teacher or student
    pub status: String,     // expected, present or absent
    pub marked_at: Option<DateTimeUtc>,
}

impl Model {
    pub fn status(&self) -> Result<AttendanceStatus, DbErr> {
        self.status
            .parse()
            .map_err(|_| DbErr::Type(format!("unknown attendance status '{}'", self.status)))
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::session::Entity",
        from = "Column::SessionId",
        to = "super::session::Column::Id"
    )]
    Session,
}

impl Related<super::session::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Session.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
