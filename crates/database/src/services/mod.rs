pub mod actor;
pub mod attendance;
pub mod class;
pub mod conflict;
pub mod generator;
pub mod lifecycle;
pub mod reschedule;
