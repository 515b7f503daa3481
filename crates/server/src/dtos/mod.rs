pub mod class;
pub mod conflict;
pub mod reschedule;
pub mod session;

use models::ValidationError;
use std::str::FromStr;

/// Parses a snake_case enum value from a request body
pub fn parse_variant<T: FromStr>(kind: &'static str, value: &str) -> Result<T, ValidationError> {
    value.parse().map_err(|_| ValidationError::UnknownVariant {
        kind,
        value: value.to_string(),
    })
}
