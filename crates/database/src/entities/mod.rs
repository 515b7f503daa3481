pub mod attendance_record;
pub mod class;
pub mod class_participant;
pub mod class_slot;
pub mod profile;
pub mod reschedule_request;
pub mod session;
