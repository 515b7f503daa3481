use chrono::{DateTime, NaiveDate, Utc, Weekday};
use database::{
    entities::{class, class_participant},
    services::{class::ClassDetails, generator::GeneratedClass},
};
use models::{
    ValidationError,
    schedule::{TimeSlot, WeeklySchedule},
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::session::SessionResponse;

/// A local `HH:MM` time range; an `end` of `00:00` runs until midnight
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SlotDto {
    #[schema(example = "16:00")]
    pub start: String,
    #[schema(example = "17:30")]
    pub end: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ScheduleDto {
    #[serde(default)]
    pub monday: Option<SlotDto>,
    #[serde(default)]
    pub tuesday: Option<SlotDto>,
    #[serde(default)]
    pub wednesday: Option<SlotDto>,
    #[serde(default)]
    pub thursday: Option<SlotDto>,
    #[serde(default)]
    pub friday: Option<SlotDto>,
    #[serde(default)]
    pub saturday: Option<SlotDto>,
    #[serde(default)]
    pub sunday: Option<SlotDto>,
}

impl TryFrom<ScheduleDto> for WeeklySchedule {
    type Error = ValidationError;

    fn try_from(dto: ScheduleDto) -> Result<Self, Self::Error> {
        let days = [
            (Weekday::Mon, dto.monday),
            (Weekday::Tue, dto.tuesday),
            (Weekday::Wed, dto.wednesday),
            (Weekday::Thu, dto.thursday),
            (Weekday::Fri, dto.friday),
            (Weekday::Sat, dto.saturday),
            (Weekday::Sun, dto.sunday),
        ];

        let mut schedule = WeeklySchedule::new();
        for (weekday, slot) in days {
            if let Some(slot) = slot {
                schedule.set(weekday, Some(TimeSlot::from_strings(&slot.start, &slot.end)?));
            }
        }
        Ok(schedule)
    }
}

impl From<WeeklySchedule> for ScheduleDto {
    fn from(schedule: WeeklySchedule) -> Self {
        let slot = |s: Option<TimeSlot>| {
            s.map(|s| SlotDto {
                start: s.start.format("%H:%M").to_string(),
                end: s.end.format("%H:%M").to_string(),
            })
        };

        Self {
            monday: slot(schedule.monday),
            tuesday: slot(schedule.tuesday),
            wednesday: slot(schedule.wednesday),
            thursday: slot(schedule.thursday),
            friday: slot(schedule.friday),
            saturday: slot(schedule.saturday),
            sunday: slot(schedule.sunday),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateClassRequest {
    pub admin_id: Uuid,
    pub title: String,
    #[serde(default)]
    pub subject: String,
    /// IANA zone name the weekly slots are expressed in
    #[schema(example = "America/New_York")]
    pub timezone: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub schedule: ScheduleDto,
    #[serde(default)]
    pub teacher_ids: Vec<Uuid>,
    #[serde(default)]
    pub student_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ExtendSessionsRequest {
    pub admin_id: Uuid,
    /// Last date to generate, capped at the class end date
    pub through: NaiveDate,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddParticipantRequest {
    pub admin_id: Uuid,
    pub party_id: Uuid,
    #[schema(example = "student")]
    pub role: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AdminRequest {
    pub admin_id: Uuid,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct AdminQuery {
    pub admin_id: Uuid,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct UpcomingQuery {
    /// Only sessions ending after this instant; defaults to now
    pub after: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ClassResponse {
    pub id: Uuid,
    pub title: String,
    pub subject: String,
    pub timezone: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub days_pattern: String,
    pub generated_through: Option<NaiveDate>,
    pub archived: bool,
    pub created_at: DateTime<Utc>,
}

impl From<class::Model> for ClassResponse {
    fn from(class: class::Model) -> Self {
        Self {
            id: class.id,
            title: class.title,
            subject: class.subject,
            timezone: class.timezone,
            start_date: class.start_date,
            end_date: class.end_date,
            days_pattern: class.days_pattern,
            generated_through: class.generated_through,
            archived: class.archived,
            created_at: class.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ParticipantResponse {
    pub party_id: Uuid,
    pub role: String,
    pub joined_at: DateTime<Utc>,
}

impl From<class_participant::Model> for ParticipantResponse {
    fn from(participant: class_participant::Model) -> Self {
        Self {
            party_id: participant.party_id,
            role: participant.role,
            joined_at: participant.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ClassDetailsResponse {
    pub class: ClassResponse,
    pub schedule: ScheduleDto,
    pub participants: Vec<ParticipantResponse>,
}

impl From<ClassDetails> for ClassDetailsResponse {
    fn from(details: ClassDetails) -> Self {
        Self {
            class: details.class.into(),
            schedule: details.schedule.into(),
            participants: details.participants.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CreatedClassResponse {
    pub class: ClassResponse,
    pub participants: Vec<ParticipantResponse>,
    pub sessions: Vec<SessionResponse>,
}

impl From<GeneratedClass> for CreatedClassResponse {
    fn from(generated: GeneratedClass) -> Self {
        Self {
            class: generated.class.into(),
            participants: generated.participants.into_iter().map(Into::into).collect(),
            sessions: generated.sessions.into_iter().map(Into::into).collect(),
        }
    }
}
