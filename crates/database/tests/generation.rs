mod common;

use chrono::Weekday;
use common::{Fixture, date, slot, utc};
use database::{
    SchedulingError, SchedulingPolicy,
    entities::{attendance_record, class, class_participant, class_slot, session},
    services::{
        class::ClassService,
        generator::{ClassDraft, GeneratorService},
    },
};
use models::{ValidationError, schedule::WeeklySchedule, status::AttendanceStatus};
use sea_orm::{ConnectionTrait, EntityTrait, PaginatorTrait};
use std::time::Instant;

fn mon_wed() -> WeeklySchedule {
    WeeklySchedule::new()
        .with(Weekday::Mon, slot("09:00", "10:00"))
        .with(Weekday::Wed, slot("09:00", "10:00"))
}

#[tokio::test]
async fn test_generates_sessions_across_dst_change() {
    let fx = Fixture::new().await;
    let created = fx
        .create_class(
            "America/Toronto",
            date(2024, 3, 4),
            date(2024, 3, 13),
            mon_wed(),
            utc(2024, 3, 1, 12, 0),
        )
        .await;

    let starts: Vec<_> = created.sessions.iter().map(|s| s.start_at).collect();
    assert_eq!(
        starts,
        vec![
            utc(2024, 3, 4, 14, 0),
            utc(2024, 3, 6, 14, 0),
            utc(2024, 3, 11, 13, 0),
            utc(2024, 3, 13, 13, 0),
        ]
    );
    assert!(created.sessions.iter().all(|s| s.status == "scheduled"));
    assert_eq!(created.class.days_pattern, "MW");
    assert_eq!(created.slots.len(), 2);

    for session in &created.sessions {
        let records = fx.attendance(session.id).await;
        assert_eq!(records.len(), 2);
        assert!(
            records
                .iter()
                .all(|r| r.status().unwrap() == AttendanceStatus::Expected)
        );
    }

    let stored = ClassService::list_sessions(&fx.db, created.class.id)
        .await
        .unwrap();
    assert_eq!(stored, created.sessions);
}

#[tokio::test]
async fn test_midnight_slot_ends_next_day() {
    let fx = Fixture::new().await;
    let schedule = WeeklySchedule::new().with(Weekday::Fri, slot("23:30", "00:00"));
    let created = fx
        .create_class(
            "America/Toronto",
            date(2024, 3, 8),
            date(2024, 3, 8),
            schedule,
            utc(2024, 3, 1, 12, 0),
        )
        .await;

    assert_eq!(created.sessions.len(), 1);
    assert_eq!(created.sessions[0].start_at, utc(2024, 3, 9, 4, 30));
    assert_eq!(created.sessions[0].end_at, utc(2024, 3, 9, 5, 0));
}

#[tokio::test]
async fn test_slot_in_spring_forward_gap_keeps_its_length() {
    let fx = Fixture::new().await;
    // 02:00-03:00 is skipped in Toronto on Sunday 2024-03-10
    let schedule = WeeklySchedule::new().with(Weekday::Sun, slot("02:30", "03:00"));
    let created = fx
        .create_class(
            "America/Toronto",
            date(2024, 3, 3),
            date(2024, 3, 10),
            schedule,
            utc(2024, 3, 1, 12, 0),
        )
        .await;

    assert_eq!(created.sessions.len(), 2);
    for session in &created.sessions {
        assert!(session.start_at < session.end_at);
        assert_eq!(session.duration(), chrono::Duration::minutes(30));
    }
    let gap_day = &created.sessions[1];
    assert_eq!(gap_day.start_at, utc(2024, 3, 10, 7, 30));
    assert_eq!(gap_day.end_at, utc(2024, 3, 10, 8, 0));
}

#[tokio::test]
async fn test_rejects_invalid_drafts_before_writing() {
    let fx = Fixture::new().await;
    let now = utc(2024, 3, 1, 12, 0);

    let mut draft = fx.draft("Mars/Olympus_Mons", date(2024, 3, 4), date(2024, 3, 13), mon_wed());
    let err = GeneratorService::generate_sessions(&fx.db, &fx.policy, fx.admin, draft.clone(), now)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SchedulingError::Validation(ValidationError::UnknownTimezone(_))
    ));

    draft.timezone = "America/Toronto".to_string();
    draft.student_ids.push(fx.teacher);
    let err = GeneratorService::generate_sessions(&fx.db, &fx.policy, fx.admin, draft, now)
        .await
        .unwrap_err();
    assert!(matches!(err, SchedulingError::Validation(_)));

    let inverted = fx.draft("America/Toronto", date(2024, 3, 13), date(2024, 3, 4), mon_wed());
    let err = GeneratorService::generate_sessions(&fx.db, &fx.policy, fx.admin, inverted, now)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SchedulingError::Validation(ValidationError::InvertedDateRange { .. })
    ));

    assert_eq!(class::Entity::find().count(&fx.db).await.unwrap(), 0);
}

#[tokio::test]
async fn test_only_admins_create_classes() {
    let fx = Fixture::new().await;
    let draft = fx.draft("America/Toronto", date(2024, 3, 4), date(2024, 3, 13), mon_wed());

    let err = GeneratorService::generate_sessions(
        &fx.db,
        &fx.policy,
        fx.teacher,
        draft,
        utc(2024, 3, 1, 12, 0),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, SchedulingError::PermissionDenied(_)));
}

#[tokio::test]
async fn test_failed_batch_rolls_back_everything() {
    let fx = Fixture::with_policy(SchedulingPolicy {
        batch_size: 2,
        ..SchedulingPolicy::default()
    })
    .await;

    // The store accepts the first two sessions, then fails
    fx.db
        .execute_unprepared(
            "CREATE TRIGGER fail_sessions BEFORE INSERT ON sessions
             WHEN (SELECT COUNT(*) FROM sessions) >= 2
             BEGIN SELECT RAISE(ABORT, 'disk full'); END;",
        )
        .await
        .unwrap();

    let weekdays = WeeklySchedule::new()
        .with(Weekday::Mon, slot("09:00", "10:00"))
        .with(Weekday::Tue, slot("09:00", "10:00"))
        .with(Weekday::Wed, slot("09:00", "10:00"))
        .with(Weekday::Thu, slot("09:00", "10:00"))
        .with(Weekday::Fri, slot("09:00", "10:00"));
    let draft: ClassDraft = fx.draft("America/Toronto", date(2024, 1, 1), date(2024, 1, 12), weekdays);

    let err = GeneratorService::generate_sessions(
        &fx.db,
        &fx.policy,
        fx.admin,
        draft,
        utc(2023, 12, 20, 12, 0),
    )
    .await
    .unwrap_err();
    assert!(matches!(
        err,
        SchedulingError::PartialFailure {
            rolled_back: true,
            ..
        }
    ));

    assert_eq!(class::Entity::find().count(&fx.db).await.unwrap(), 0);
    assert_eq!(class_slot::Entity::find().count(&fx.db).await.unwrap(), 0);
    assert_eq!(class_participant::Entity::find().count(&fx.db).await.unwrap(), 0);
    assert_eq!(session::Entity::find().count(&fx.db).await.unwrap(), 0);
    assert_eq!(attendance_record::Entity::find().count(&fx.db).await.unwrap(), 0);
}

#[tokio::test]
async fn test_passed_deadline_keeps_nothing() {
    let fx = Fixture::new().await;
    let draft = fx.draft("America/Toronto", date(2024, 3, 4), date(2024, 3, 13), mon_wed());

    let err = GeneratorService::generate_sessions_within(
        &fx.db,
        &fx.policy,
        fx.admin,
        draft,
        utc(2024, 3, 1, 12, 0),
        Some(Instant::now()),
    )
    .await
    .unwrap_err();
    assert!(matches!(
        err,
        SchedulingError::DeadlineExceeded {
            rolled_back: true,
            ..
        }
    ));

    assert_eq!(class::Entity::find().count(&fx.db).await.unwrap(), 0);
    assert_eq!(class_slot::Entity::find().count(&fx.db).await.unwrap(), 0);
    assert_eq!(class_participant::Entity::find().count(&fx.db).await.unwrap(), 0);
    assert_eq!(session::Entity::find().count(&fx.db).await.unwrap(), 0);
    assert_eq!(attendance_record::Entity::find().count(&fx.db).await.unwrap(), 0);
}

#[tokio::test]
async fn test_passed_deadline_undoes_extension() {
    let fx = Fixture::with_policy(SchedulingPolicy {
        horizon_days: 7,
        ..SchedulingPolicy::default()
    })
    .await;
    let now = utc(2024, 3, 1, 12, 0);
    let created = fx
        .create_class("America/Toronto", date(2024, 3, 4), date(2024, 3, 31), mon_wed(), now)
        .await;
    let class_id = created.class.id;

    let err = GeneratorService::extend_sessions_within(
        &fx.db,
        &fx.policy,
        fx.admin,
        class_id,
        date(2024, 3, 20),
        now,
        Some(Instant::now()),
    )
    .await
    .unwrap_err();
    assert!(matches!(
        err,
        SchedulingError::DeadlineExceeded {
            rolled_back: true,
            ..
        }
    ));

    let details = ClassService::get_class(&fx.db, class_id).await.unwrap();
    assert_eq!(details.class.generated_through, Some(date(2024, 3, 11)));
    assert_eq!(session::Entity::find().count(&fx.db).await.unwrap(), 3);
    assert_eq!(attendance_record::Entity::find().count(&fx.db).await.unwrap(), 6);

    // The same window can be generated again afterwards
    let extended = GeneratorService::extend_sessions(
        &fx.db,
        &fx.policy,
        fx.admin,
        class_id,
        date(2024, 3, 20),
        now,
    )
    .await
    .unwrap();
    assert_eq!(extended.len(), 3);
}

#[tokio::test]
async fn test_sessions_are_generated_in_windows() {
    let fx = Fixture::with_policy(SchedulingPolicy {
        horizon_days: 7,
        ..SchedulingPolicy::default()
    })
    .await;
    let now = utc(2024, 3, 1, 12, 0);

    let created = fx
        .create_class("America/Toronto", date(2024, 3, 4), date(2024, 3, 31), mon_wed(), now)
        .await;
    // Mar 4, 6 and 11
    assert_eq!(created.sessions.len(), 3);
    assert_eq!(created.class.generated_through, Some(date(2024, 3, 11)));

    let extended = GeneratorService::extend_sessions(
        &fx.db,
        &fx.policy,
        fx.admin,
        created.class.id,
        date(2024, 3, 20),
        now,
    )
    .await
    .unwrap();
    let starts: Vec<_> = extended.iter().map(|s| s.start_at).collect();
    assert_eq!(
        starts,
        vec![
            utc(2024, 3, 13, 13, 0),
            utc(2024, 3, 18, 13, 0),
            utc(2024, 3, 20, 13, 0),
        ]
    );
    for session in &extended {
        assert_eq!(fx.attendance(session.id).await.len(), 2);
    }

    let again = GeneratorService::extend_sessions(
        &fx.db,
        &fx.policy,
        fx.admin,
        created.class.id,
        date(2024, 3, 20),
        now,
    )
    .await
    .unwrap();
    assert!(again.is_empty());

    // Capped at the class's end date
    let rest = GeneratorService::extend_sessions(
        &fx.db,
        &fx.policy,
        fx.admin,
        created.class.id,
        date(2024, 12, 31),
        now,
    )
    .await
    .unwrap();
    assert_eq!(rest.len(), 2);

    let details = ClassService::get_class(&fx.db, created.class.id).await.unwrap();
    assert_eq!(details.class.generated_through, Some(date(2024, 3, 31)));
    assert_eq!(details.schedule, mon_wed());
    assert_eq!(
        ClassService::list_sessions(&fx.db, created.class.id)
            .await
            .unwrap()
            .len(),
        8
    );
}
