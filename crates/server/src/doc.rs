use utoipa::OpenApi;

/// API Documentation
///
/// Paths are collected from the router in [`crate::routes::router`].
#[derive(OpenApi)]
#[openapi(
    tags(
        (name = "Health", description = "Liveness probe"),
        (name = "Classes", description = "Class administration and session generation"),
        (name = "Sessions", description = "Session lifecycle and attendance"),
        (name = "Reschedules", description = "Reschedule requests and their resolution"),
        (name = "Conflicts", description = "Advisory schedule conflict checks"),
    ),
    info(
        title = "Tutoring Scheduler API",
        version = "1.0.0",
        description = "Recurring tutoring classes, their sessions and reschedules",
        license(
            name = "MIT OR Apache-2.0",
        )
    )
)]
pub struct ApiDoc;
