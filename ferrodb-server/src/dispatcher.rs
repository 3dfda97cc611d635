//! # Command Dispatcher
//!
//! Per-connection command pipeline: tokenize, apply the SET/CACHESET
//! trailing-value merge workaround, special-case `EXIT`, validate, dispatch
//! to a handler, and format the reply. Holds no per-connection state itself
//! — everything mutable lives in the store and cache manager it wraps.

use std::sync::Arc;

use ferrodb_core::{CacheManager, ExpiringStore};

use crate::error_handling::{format_handler_error, format_validation_error};
use crate::{handlers, validator};

/// What the connection worker should do with a processed line.
pub enum DispatchOutcome {
    /// Write this line back to the client and keep the connection open.
    Reply(String),
    /// Write this line back, then close the connection.
    Close(String),
}

pub struct Dispatcher {
    store: Arc<ExpiringStore<String>>,
    cache_manager: Arc<CacheManager>,
}

impl Dispatcher {
    pub fn new(store: Arc<ExpiringStore<String>>, cache_manager: Arc<CacheManager>) -> Self {
        Self { store, cache_manager }
    }

    pub async fn handle_line(&self, line: &str) -> DispatchOutcome {
        let mut tokens: Vec<String> = line.split_whitespace().map(String::from).collect();
        if tokens.is_empty() {
            return DispatchOutcome::Reply("ERROR: Empty command".to_string());
        }

        let verb = tokens[0].to_uppercase();
        if verb == "EXIT" {
            return DispatchOutcome::Close("Goodbye!".to_string());
        }

        merge_trailing_value(&verb, &mut tokens);
        tokens[0] = verb.clone();

        match validator::validate(&tokens) {
            Ok(_spec) => match handlers::dispatch(&verb, &tokens, &self.store, &self.cache_manager).await {
                Ok(reply) => DispatchOutcome::Reply(reply),
                Err(error) => DispatchOutcome::Reply(format_handler_error(&error)),
            },
            Err(error) => DispatchOutcome::Reply(format_validation_error(&error)),
        }
    }
}

/// `SET`'s and `CACHESET`'s value position is a free-form token that may
/// itself contain whitespace (a JSON object, most often). The naive
/// whitespace tokenizer splits it back apart; this folds everything from the
/// value position onward into one token before validation ever sees it.
fn merge_trailing_value(verb: &str, tokens: &mut Vec<String>) {
    let value_position = match verb {
        "SET" => 2,
        "CACHESET" => 3,
        _ => return,
    };
    if tokens.len() > value_position + 1 {
        let merged = tokens[value_position..].join(" ");
        tokens.truncate(value_position);
        tokens.push(merged);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn dispatcher() -> Dispatcher {
        Dispatcher::new(
            Arc::new(ExpiringStore::new(None, Duration::from_millis(200))),
            Arc::new(CacheManager::new(None, Duration::from_millis(200))),
        )
    }

    fn reply_text(outcome: DispatchOutcome) -> String {
        match outcome {
            DispatchOutcome::Reply(text) | DispatchOutcome::Close(text) => text,
        }
    }

    #[tokio::test]
    async fn ping_round_trips() {
        let d = dispatcher();
        assert_eq!(reply_text(d.handle_line("PING").await), "PONG");
    }

    #[tokio::test]
    async fn set_with_a_json_value_survives_the_merge_workaround() {
        let d = dispatcher();
        let reply = d.handle_line(r#"SET profile {"name": "alice"}"#).await;
        assert_eq!(reply_text(reply), "OK");
    }

    #[tokio::test]
    async fn exit_closes_with_a_goodbye() {
        let d = dispatcher();
        match d.handle_line("EXIT").await {
            DispatchOutcome::Close(text) => assert_eq!(text, "Goodbye!"),
            DispatchOutcome::Reply(_) => panic!("expected EXIT to close the connection"),
        }
    }

    #[tokio::test]
    async fn bad_arity_reports_usage_and_leaves_the_connection_usable() {
        let d = dispatcher();
        let reply = reply_text(d.handle_line("SET onlykey").await);
        assert_eq!(reply, "ERROR: Too few arguments. Usage: SET key value");
        assert_eq!(reply_text(d.handle_line("PING").await), "PONG");
    }

    #[tokio::test]
    async fn unknown_verb_is_reported() {
        let d = dispatcher();
        let reply = reply_text(d.handle_line("FROBNICATE").await);
        assert_eq!(reply, "ERROR: Unknown command: FROBNICATE");
    }
}
