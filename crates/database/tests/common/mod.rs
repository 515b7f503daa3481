#![allow(dead_code)]

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use database::{
    Notifier, SchedulingPolicy, SessionEvent,
    entities::{attendance_record, profile},
    services::generator::{ClassDraft, GeneratedClass, GeneratorService},
};
use migration::{Migrator, MigratorTrait};
use models::schedule::{TimeSlot, WeeklySchedule};
use sea_orm::{
    ActiveValue::Set, ColumnTrait, ConnectOptions, Database, DatabaseConnection, EntityTrait,
    QueryFilter,
};
use std::sync::Mutex;
use uuid::Uuid;

pub struct Fixture {
    pub db: DatabaseConnection,
    pub policy: SchedulingPolicy,
    pub notifier: RecordingNotifier,
    pub admin: Uuid,
    pub teacher: Uuid,
    pub other_teacher: Uuid,
    pub student: Uuid,
    pub other_student: Uuid,
}

impl Fixture {
    pub async fn new() -> Self {
        Self::with_policy(SchedulingPolicy::default()).await
    }

    pub async fn with_policy(policy: SchedulingPolicy) -> Self {
        let mut options = ConnectOptions::new("sqlite::memory:");
        options
            .max_connections(1)
            .min_connections(1)
            .sqlx_logging(false);
        let db = Database::connect(options).await.unwrap();
        Migrator::up(&db, None).await.unwrap();

        let fixture = Self {
            db,
            policy,
            notifier: RecordingNotifier::default(),
            admin: Uuid::new_v4(),
            teacher: Uuid::new_v4(),
            other_teacher: Uuid::new_v4(),
            student: Uuid::new_v4(),
            other_student: Uuid::new_v4(),
        };

        let profiles = [
            (fixture.admin, "Ada Admin", "admin"),
            (fixture.teacher, "Tom Teacher", "teacher"),
            (fixture.other_teacher, "Tia Teacher", "teacher"),
            (fixture.student, "Sam Student", "student"),
            (fixture.other_student, "Sol Student", "student"),
        ];
        profile::Entity::insert_many(profiles.into_iter().map(|(id, name, role)| {
            profile::ActiveModel {
                id: Set(id),
                display_name: Set(name.to_string()),
                role: Set(role.to_string()),
            }
        }))
        .exec(&fixture.db)
        .await
        .unwrap();

        fixture
    }

    /// Creates a class taught by `teacher` with `student` enrolled
    pub async fn create_class(
        &self,
        timezone: &str,
        start: NaiveDate,
        end: NaiveDate,
        schedule: WeeklySchedule,
        now: DateTime<Utc>,
    ) -> GeneratedClass {
        GeneratorService::generate_sessions(
            &self.db,
            &self.policy,
            self.admin,
            self.draft(timezone, start, end, schedule),
            now,
        )
        .await
        .unwrap()
    }

    pub fn draft(
        &self,
        timezone: &str,
        start: NaiveDate,
        end: NaiveDate,
        schedule: WeeklySchedule,
    ) -> ClassDraft {
        ClassDraft {
            title: "Algebra II".to_string(),
            subject: "math".to_string(),
            timezone: timezone.to_string(),
            start_date: start,
            end_date: end,
            schedule,
            teacher_ids: vec![self.teacher],
            student_ids: vec![self.student],
        }
    }

    pub async fn attendance(&self, session_id: Uuid) -> Vec<attendance_record::Model> {
        attendance_record::Entity::find()
            .filter(attendance_record::Column::SessionId.eq(session_id))
            .all(&self.db)
            .await
            .unwrap()
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<SessionEvent>>,
}

impl RecordingNotifier {
    pub fn events(&self) -> Vec<SessionEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, event: &SessionEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
}

pub fn slot(start: &str, end: &str) -> TimeSlot {
    TimeSlot::from_strings(start, end).unwrap()
}
