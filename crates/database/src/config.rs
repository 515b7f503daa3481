use chrono::Duration;
use log::warn;
use models::lifecycle::TransitionGuard;
use std::{env, str::FromStr};

/// Tunables for session generation and lifecycle guards
#[derive(Debug, Clone, Copy)]
pub struct SchedulingPolicy {
    /// How long before its start a session may be initiated
    pub initiate_lead: Duration,
    /// How far past today sessions are generated up front
    pub horizon_days: u32,
    /// Sessions written per transaction
    pub batch_size: usize,
}

impl Default for SchedulingPolicy {
    fn default() -> Self {
        Self {
            initiate_lead: Duration::minutes(5),
            horizon_days: 365,
            batch_size: 200,
        }
    }
}

impl SchedulingPolicy {
    /// Reads overrides from `SCHEDULING_*` environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let lead_minutes = read_var(
            "SCHEDULING_INITIATE_LEAD_MINUTES",
            defaults.initiate_lead.num_minutes(),
        );
        Self {
            initiate_lead: Duration::minutes(lead_minutes.max(0)),
            horizon_days: read_var("SCHEDULING_HORIZON_DAYS", defaults.horizon_days).max(1),
            batch_size: read_var("SCHEDULING_BATCH_SIZE", defaults.batch_size).max(1),
        }
    }

    pub fn guard(&self) -> TransitionGuard {
        TransitionGuard {
            initiate_lead: self.initiate_lead,
        }
    }
}

fn read_var<T: FromStr + Copy>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("Ignoring {name}={raw}: not a valid value");
            default
        }),
        Err(_) => default,
    }
}
