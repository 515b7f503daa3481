pub mod conflict;
pub mod days;
pub mod error;
pub mod lifecycle;
pub mod schedule;
pub mod status;
pub mod time;

pub use error::ValidationError;
