mod common;

use chrono::Weekday;
use common::{Fixture, date, slot, utc};
use database::{
    SchedulingError,
    entities::{attendance_record, session},
    services::{
        class::ClassService,
        conflict::{CandidateSchedule, ConflictService},
        generator::{GeneratedClass, GeneratorService},
    },
};
use models::{schedule::WeeklySchedule, status::PartyRole};
use sea_orm::{EntityTrait, PaginatorTrait};

/// Mondays and Wednesdays 09:00-10:00 Toronto through January 2024: ten sessions
async fn january_class(fx: &Fixture) -> GeneratedClass {
    fx.create_class(
        "America/Toronto",
        date(2024, 1, 1),
        date(2024, 1, 31),
        WeeklySchedule::new()
            .with(Weekday::Mon, slot("09:00", "10:00"))
            .with(Weekday::Wed, slot("09:00", "10:00")),
        utc(2023, 12, 20, 12, 0),
    )
    .await
}

#[tokio::test]
async fn test_late_participants_only_expected_at_upcoming_sessions() {
    let fx = Fixture::new().await;
    let class = january_class(&fx).await;
    assert_eq!(class.sessions.len(), 10);
    let now = utc(2024, 1, 15, 12, 0);

    ClassService::add_participant(
        &fx.db,
        fx.admin,
        class.class.id,
        fx.other_student,
        PartyRole::Student,
        now,
    )
    .await
    .unwrap();

    // Jan 15, 17, 22, 24, 29 and 31
    let upcoming = ClassService::list_party_sessions(&fx.db, fx.other_student, now)
        .await
        .unwrap();
    assert_eq!(upcoming.len(), 6);
    assert_eq!(upcoming[0].start_at, utc(2024, 1, 15, 14, 0));

    let duplicate = ClassService::add_participant(
        &fx.db,
        fx.admin,
        class.class.id,
        fx.other_student,
        PartyRole::Student,
        now,
    )
    .await;
    assert!(matches!(duplicate, Err(SchedulingError::PreconditionFailed(_))));

    let details = ClassService::get_class(&fx.db, class.class.id).await.unwrap();
    assert_eq!(details.participants.len(), 3);
}

#[tokio::test]
async fn test_removed_participants_keep_past_records() {
    let fx = Fixture::new().await;
    let class = january_class(&fx).await;
    let now = utc(2024, 1, 15, 12, 0);

    ClassService::remove_participant(&fx.db, fx.admin, class.class.id, fx.student, now)
        .await
        .unwrap();

    let remaining = attendance_record::Entity::find()
        .all(&fx.db)
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.party_id == fx.student)
        .count();
    assert_eq!(remaining, 4);
    assert!(
        ClassService::list_party_sessions(&fx.db, fx.student, now)
            .await
            .unwrap()
            .is_empty()
    );

    let missing =
        ClassService::remove_participant(&fx.db, fx.admin, class.class.id, fx.student, now).await;
    assert!(matches!(missing, Err(SchedulingError::NotFound { .. })));
}

#[tokio::test]
async fn test_archived_classes_are_frozen() {
    let fx = Fixture::new().await;
    let class = january_class(&fx).await;
    let now = utc(2024, 1, 15, 12, 0);

    let archived = ClassService::archive_class(&fx.db, fx.admin, class.class.id)
        .await
        .unwrap();
    assert!(archived.archived);

    let join = ClassService::add_participant(
        &fx.db,
        fx.admin,
        class.class.id,
        fx.other_student,
        PartyRole::Student,
        now,
    )
    .await;
    assert!(matches!(join, Err(SchedulingError::PreconditionFailed(_))));

    let extend = GeneratorService::extend_sessions(
        &fx.db,
        &fx.policy,
        fx.admin,
        class.class.id,
        date(2024, 2, 28),
        now,
    )
    .await;
    assert!(matches!(extend, Err(SchedulingError::PreconditionFailed(_))));

    // Existing sessions still count as commitments
    let itself = ConflictService::candidate_for_class(&fx.db, class.class.id)
        .await
        .unwrap();
    let conflicts = ConflictService::check_conflicts(
        &fx.db,
        fx.teacher,
        &CandidateSchedule {
            exclude_class_id: None,
            ..itself
        },
    )
    .await
    .unwrap();
    assert_eq!(conflicts.len(), 10);
}

#[tokio::test]
async fn test_deleting_a_class_cascades() {
    let fx = Fixture::new().await;
    let class = january_class(&fx).await;

    let err = ClassService::delete_class(&fx.db, fx.teacher, class.class.id).await;
    assert!(matches!(err, Err(SchedulingError::PermissionDenied(_))));

    ClassService::delete_class(&fx.db, fx.admin, class.class.id)
        .await
        .unwrap();

    assert_eq!(session::Entity::find().count(&fx.db).await.unwrap(), 0);
    assert_eq!(attendance_record::Entity::find().count(&fx.db).await.unwrap(), 0);
    assert!(matches!(
        ClassService::get_class(&fx.db, class.class.id).await,
        Err(SchedulingError::NotFound { .. })
    ));
}
