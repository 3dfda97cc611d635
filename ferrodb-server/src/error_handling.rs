//! # Error Handling Module
//!
//! Formats every error surface the dispatcher can see — validation failures
//! and handler failures alike — into the wire protocol's single error shape:
//! `ERROR: <message>`.

use crate::validator::ValidationError;

/// Errors a verb handler can fail with. Kept small and closed: anything a
/// handler needs to report beyond a soft `NULL` goes here.
#[derive(thiserror::Error, Debug)]
pub enum HandlerError {
    #[error("cache already exists: {0}")]
    CacheAlreadyExists(String),

    #[error("cache not found: {0}")]
    CacheNotFound(String),
}

pub fn format_validation_error(error: &ValidationError) -> String {
    format!("ERROR: {error}")
}

pub fn format_handler_error(error: &HandlerError) -> String {
    format!("ERROR: {error}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handler_error_wraps_its_display_message() {
        let error = HandlerError::CacheNotFound("users".to_string());
        assert_eq!(format_handler_error(&error), "ERROR: cache not found: users");
    }
}
