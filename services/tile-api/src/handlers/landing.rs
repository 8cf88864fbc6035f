//! Landing page.

pub const WELCOME_MESSAGE: &str = "Welcome to the tileserv API!";

/// GET /
pub async fn landing_handler() -> &'static str {
    WELCOME_MESSAGE
}
