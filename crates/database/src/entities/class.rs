use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "classes")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub title: String,
    pub subject: String,
    pub timezone: String, // IANA name, e.g. "America/Toronto"
    pub start_date: Date,
    pub end_date: Date,
    pub days_pattern: String, // e.g. "MW"
    /// Last local date sessions have been generated for
    pub generated_through: Option<Date>,
    pub archived: bool,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::class_slot::Entity")]
    Slots,
    #[sea_orm(has_many = "super::class_participant::Entity")]
    Participants,
    #[sea_orm(has_many = "super::session::Entity")]
    Sessions,
}

impl Related<super::class_slot::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Slots.def()
    }
}

impl Related<super::class_participant::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Participants.def()
    }
}

impl Related<super::session::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sessions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
