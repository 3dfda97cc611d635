//! # Validator Module
//!
//! Checks a tokenized command against the [`command_spec`] registry, in the
//! fixed order the protocol design calls for: empty command, unknown verb,
//! too few tokens, too many tokens, then per-position type checks.

use crate::command_spec::{self, CommandSpec};

#[derive(Debug, Clone)]
pub enum ValidationError {
    EmptyCommand,
    UnknownCommand(String),
    TooFew { usage: &'static str },
    TooMany { usage: &'static str },
    BadType { position: usize, usage: &'static str },
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::EmptyCommand => write!(f, "Empty command"),
            ValidationError::UnknownCommand(verb) => write!(f, "Unknown command: {verb}"),
            ValidationError::TooFew { usage } => {
                write!(f, "Too few arguments. Usage: {usage}")
            }
            ValidationError::TooMany { usage } => {
                write!(f, "Too many arguments. Usage: {usage}")
            }
            ValidationError::BadType { position, usage } => {
                write!(f, "Argument {position} must be an integer. Usage: {usage}")
            }
        }
    }
}

/// Validates `tokens` (already tokenized, with any SET/CACHESET trailing
/// merge already applied) and returns the matched [`CommandSpec`] on
/// success.
pub fn validate(tokens: &[String]) -> Result<CommandSpec, ValidationError> {
    let verb = tokens.first().ok_or(ValidationError::EmptyCommand)?;
    let spec = command_spec::lookup(verb).ok_or_else(|| ValidationError::UnknownCommand(verb.clone()))?;

    if tokens.len() < spec.min_tokens {
        return Err(ValidationError::TooFew { usage: spec.usage });
    }
    if let Some(max) = spec.max_tokens {
        if tokens.len() > max {
            return Err(ValidationError::TooMany { usage: spec.usage });
        }
    }
    for &position in spec.integer_positions {
        if let Some(token) = tokens.get(position) {
            if token.parse::<i64>().is_err() {
                return Err(ValidationError::BadType {
                    position,
                    usage: spec.usage,
                });
            }
        }
    }
    Ok(spec)
}
