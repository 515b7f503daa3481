pub mod config;
pub mod db;
pub mod entities;
pub mod error;
pub mod notify;
pub mod services;

pub use config::SchedulingPolicy;
pub use error::SchedulingError;
pub use notify::{LogNotifier, Notifier, SessionEvent};
