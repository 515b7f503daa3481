mod common;

use chrono::Weekday;
use common::{Fixture, date, slot, utc};
use database::{
    SchedulingError, SchedulingPolicy,
    services::{
        conflict::{AssignmentCheck, CandidateSchedule, ConflictService},
        generator::GeneratedClass,
        lifecycle::{LifecycleService, TransitionRequest},
    },
};
use models::{ValidationError, lifecycle::SessionAction, schedule::WeeklySchedule};

/// Wednesdays 09:00-10:00 Toronto through January 2024: five sessions
async fn wednesday_class(fx: &Fixture) -> GeneratedClass {
    fx.create_class(
        "America/Toronto",
        date(2024, 1, 1),
        date(2024, 1, 31),
        WeeklySchedule::new().with(Weekday::Wed, slot("09:00", "10:00")),
        utc(2023, 12, 31, 12, 0),
    )
    .await
}

fn candidate(timezone: &str, weekday: Weekday, start: &str, end: &str) -> CandidateSchedule {
    CandidateSchedule {
        schedule: WeeklySchedule::new().with(weekday, slot(start, end)),
        start_date: date(2024, 1, 1),
        end_date: date(2024, 1, 31),
        timezone: timezone.to_string(),
        exclude_class_id: None,
    }
}

#[tokio::test]
async fn test_one_minute_overlap_conflicts_on_both_sides() {
    let fx = Fixture::new().await;
    let class = wednesday_class(&fx).await;

    let check = AssignmentCheck {
        candidate: candidate("America/Toronto", Weekday::Wed, "09:59", "11:00"),
        teacher_ids: vec![fx.teacher, fx.other_teacher],
        student_ids: vec![fx.student],
    };
    let conflicts = ConflictService::check_assignment(&fx.db, &check).await.unwrap();

    assert_eq!(conflicts.teachers.len(), 5);
    assert_eq!(conflicts.students.len(), 5);
    assert!(conflicts.teachers.iter().all(|c| c.party_id == fx.teacher));
    assert!(conflicts.students.iter().all(|c| c.party_id == fx.student));

    let first = &conflicts.teachers[0];
    assert_eq!(first.class_id, class.class.id);
    assert_eq!(first.conflicting_session_id, Some(class.sessions[0].id));
    assert_eq!(first.overlap_start, utc(2024, 1, 3, 14, 59));
    assert_eq!(first.overlap_end, utc(2024, 1, 3, 15, 0));
}

#[tokio::test]
async fn test_adjacent_or_other_weekday_slots_never_conflict() {
    let fx = Fixture::new().await;
    wednesday_class(&fx).await;

    let back_to_back = candidate("America/Toronto", Weekday::Wed, "10:00", "11:00");
    assert!(
        ConflictService::check_conflicts(&fx.db, fx.teacher, &back_to_back)
            .await
            .unwrap()
            .is_empty()
    );

    let thursday = candidate("America/Toronto", Weekday::Thu, "09:00", "10:00");
    assert!(
        ConflictService::check_conflicts(&fx.db, fx.student, &thursday)
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn test_conflicts_are_found_across_zones() {
    let fx = Fixture::new().await;
    wednesday_class(&fx).await;

    // 06:30-07:30 in Los Angeles is 09:30-10:30 in Toronto
    let pacific = candidate("America/Los_Angeles", Weekday::Wed, "06:30", "07:30");
    let conflicts = ConflictService::check_conflicts(&fx.db, fx.teacher, &pacific)
        .await
        .unwrap();
    assert_eq!(conflicts.len(), 5);
    assert_eq!(conflicts[0].overlap_start, utc(2024, 1, 3, 14, 30));
}

#[tokio::test]
async fn test_cancelled_and_excluded_sessions_are_ignored() {
    let fx = Fixture::new().await;
    let class = wednesday_class(&fx).await;

    LifecycleService::transition(
        &fx.db,
        &fx.notifier,
        &fx.policy,
        TransitionRequest {
            session_id: class.sessions[1].id,
            action: SessionAction::Cancel,
            actor_id: fx.teacher,
            reason: Some("holiday".to_string()),
        },
        utc(2024, 1, 5, 12, 0),
    )
    .await
    .unwrap();

    let same_slot = candidate("America/Toronto", Weekday::Wed, "09:00", "10:00");
    let conflicts = ConflictService::check_conflicts(&fx.db, fx.teacher, &same_slot)
        .await
        .unwrap();
    assert_eq!(conflicts.len(), 4);
    assert!(
        conflicts
            .iter()
            .all(|c| c.conflicting_session_id != Some(class.sessions[1].id))
    );

    let itself = ConflictService::candidate_for_class(&fx.db, class.class.id)
        .await
        .unwrap();
    assert!(
        ConflictService::check_conflicts(&fx.db, fx.teacher, &itself)
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn test_ungenerated_occurrences_are_projected() {
    let fx = Fixture::with_policy(SchedulingPolicy {
        horizon_days: 7,
        ..SchedulingPolicy::default()
    })
    .await;
    let class = wednesday_class(&fx).await;
    // Only January 3rd has been generated so far
    assert_eq!(class.sessions.len(), 1);

    let same_slot = candidate("America/Toronto", Weekday::Wed, "09:30", "10:30");
    let conflicts = ConflictService::check_conflicts(&fx.db, fx.student, &same_slot)
        .await
        .unwrap();

    assert_eq!(conflicts.len(), 5);
    assert_eq!(conflicts[0].conflicting_session_id, Some(class.sessions[0].id));
    assert!(conflicts[1..].iter().all(|c| c.conflicting_session_id.is_none()));
    assert_eq!(conflicts[4].existing_start, utc(2024, 1, 31, 14, 0));
}

#[tokio::test]
async fn test_invalid_candidate_is_rejected() {
    let fx = Fixture::new().await;

    let err = ConflictService::check_conflicts(
        &fx.db,
        fx.teacher,
        &candidate("Nowhere/Special", Weekday::Mon, "09:00", "10:00"),
    )
    .await
    .unwrap_err();
    assert!(matches!(
        err,
        SchedulingError::Validation(ValidationError::UnknownTimezone(_))
    ));
}
