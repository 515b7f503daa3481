use crate::{
    entities::{class_participant, profile},
    error::SchedulingError,
};
use models::status::{PartyRole, Role};
use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter};
use uuid::Uuid;

/// Someone acting on a class, with the role they act in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: Uuid,
    pub role: Role,
}

pub struct ActorService;

impl ActorService {
    /// Participants act in their class role; anyone else must be an admin
    pub async fn resolve<C: ConnectionTrait>(
        db: &C,
        class_id: Uuid,
        actor_id: Uuid,
    ) -> Result<Actor, SchedulingError> {
        if let Some(role) = Self::participant_role(db, class_id, actor_id).await? {
            return Ok(Actor {
                id: actor_id,
                role: role.into(),
            });
        }

        match Self::profile_role(db, actor_id).await? {
            Some(Role::Admin) => Ok(Actor {
                id: actor_id,
                role: Role::Admin,
            }),
            _ => Err(SchedulingError::PermissionDenied(format!(
                "{actor_id} is not a participant of class {class_id}"
            ))),
        }
    }

    pub async fn require_admin<C: ConnectionTrait>(
        db: &C,
        actor_id: Uuid,
    ) -> Result<Actor, SchedulingError> {
        match Self::profile_role(db, actor_id).await? {
            Some(Role::Admin) => Ok(Actor {
                id: actor_id,
                role: Role::Admin,
            }),
            _ => Err(SchedulingError::PermissionDenied(format!(
                "{actor_id} is not an admin"
            ))),
        }
    }

    pub async fn participant_role<C: ConnectionTrait>(
        db: &C,
        class_id: Uuid,
        party_id: Uuid,
    ) -> Result<Option<PartyRole>, DbErr> {
        let participant = class_participant::Entity::find()
            .filter(class_participant::Column::ClassId.eq(class_id))
            .filter(class_participant::Column::PartyId.eq(party_id))
            .one(db)
            .await?;

        participant
            .map(|p| {
                p.role
                    .parse()
                    .map_err(|_| DbErr::Type(format!("unknown participant role '{}'", p.role)))
            })
            .transpose()
    }

    async fn profile_role<C: ConnectionTrait>(
        db: &C,
        profile_id: Uuid,
    ) -> Result<Option<Role>, DbErr> {
        let profile = profile::Entity::find_by_id(profile_id).one(db).await?;

        profile
            .map(|p| {
                p.role
                    .parse()
                    .map_err(|_| DbErr::Type(format!("unknown profile role '{}'", p.role)))
            })
            .transpose()
    }
}
