use database::{Notifier, SchedulingPolicy};
use sea_orm::DatabaseConnection;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub notifier: Arc<dyn Notifier>,
    pub policy: SchedulingPolicy,
    /// Matches the timeout layer; writes still running past it are undone
    pub request_timeout: Duration,
}

impl AppState {
    pub fn deadline(&self) -> Instant {
        Instant::now() + self.request_timeout
    }
}
